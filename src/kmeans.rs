use log::{debug, info};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use rayon::prelude::*;

/// kmeans 聚类参数
#[derive(Debug, Clone)]
pub struct KMeansConfig {
    /// 聚类中心数量
    pub k: usize,
    /// 独立运行次数，保留失真度最小的一次
    pub runs: usize,
    /// 每次运行的最大迭代次数
    pub max_iter: usize,
    /// 失真度的变化不超过该值时停止迭代
    pub threshold: f64,
    pub seed: u64,
}

#[derive(Debug, Clone, Default)]
pub struct KMeansState {
    /// 所有向量到其聚类中心的平均欧氏距离
    pub distortion: f64,
    /// 聚类中心，长度为 k * d
    pub centroids: Vec<f32>,
    /// 每个聚类中心包含的向量数量
    pub centroid_frequency: Vec<usize>,
}

/// 平方欧氏距离
#[inline(always)]
pub fn squared_euclidean(va: &[f32], vb: &[f32]) -> f32 {
    va.iter().zip(vb).map(|(a, b)| (a - b) * (a - b)).sum()
}

/// 返回距离 v 最近的聚类中心的序号和平方距离，距离相同时取序号最小者
#[inline]
pub fn nearest_centroid(v: &[f32], centroids: &[f32], d: usize) -> (usize, f32) {
    let mut best = (0, f32::INFINITY);
    for (j, centroid) in centroids.chunks_exact(d).enumerate() {
        let distance = squared_euclidean(v, centroid);
        if distance < best.1 {
            best = (j, distance);
        }
    }
    best
}

/// 使用 kmeans 聚类，返回 `runs` 次运行中失真度最小的结果
///
/// 参数：
/// - x: 输入向量，长度为 n * d
/// - d: 向量维度
///
/// 每次运行使用 kmeans++ 选择初始中心点，迭代直到失真度的下降不超过 `threshold`
/// 或者达到 `max_iter`。没有分配到向量的聚类中心保持不变，因此结果总是包含 k 个中心。
pub fn kmeans(x: &[f32], d: usize, config: &KMeansConfig) -> KMeansState {
    let n = x.len() / d;
    assert!(d > 0 && x.len() % d == 0, "x 的长度必须是 d 的整数倍");
    assert!(config.k > 0 && n >= config.k, "向量数量 {n} 必须不少于聚类中心数量 {}", config.k);

    let mut rng = Pcg64::seed_from_u64(config.seed);
    let mut best: Option<KMeansState> = None;

    for run in 0..config.runs.max(1) {
        let init = init_kmeans_plusplus(x, d, config.k, &mut rng);
        let ks = kmeans_lloyd(x, d, init, config.max_iter, config.threshold);
        info!(
            "第 {} 次聚类完成 - 失真度：{:.4} | 不平衡度：{:.2}",
            run + 1,
            ks.distortion,
            imbalance_factor(&ks.centroid_frequency)
        );
        if best.as_ref().is_none_or(|b| ks.distortion < b.distortion) {
            best = Some(ks);
        }
    }

    best.unwrap_or_default()
}

/// kmeans++ 初始化：按照到已选中心点距离的平方加权抽样
///
/// 如果所有点都已经与某个中心点重合，则退化为均匀抽样
fn init_kmeans_plusplus(x: &[f32], d: usize, k: usize, rng: &mut Pcg64) -> Vec<f32> {
    let n = x.len() / d;
    let mut centroids = Vec::with_capacity(k * d);
    let first = rng.random_range(0..n);
    centroids.extend_from_slice(&x[first * d..(first + 1) * d]);

    let mut weights = x
        .par_chunks_exact(d)
        .map(|point| squared_euclidean(point, &centroids[..d]) as f64)
        .collect::<Vec<_>>();

    for _ in 1..k {
        let total = weights.iter().sum::<f64>();
        let next = if total > 0.0 {
            let mut target = rng.random::<f64>() * total;
            let mut chosen = 0;
            for (i, &w) in weights.iter().enumerate() {
                if w <= 0.0 {
                    continue;
                }
                chosen = i;
                if target < w {
                    break;
                }
                target -= w;
            }
            chosen
        } else {
            rng.random_range(0..n)
        };

        let centroid = &x[next * d..(next + 1) * d];
        centroids.extend_from_slice(centroid);
        weights.par_iter_mut().zip(x.par_chunks_exact(d)).for_each(|(w, point)| {
            let s = squared_euclidean(point, centroid) as f64;
            if s < *w {
                *w = s;
            }
        });
    }

    centroids
}

/// 从给定的初始中心点开始执行 Lloyd 迭代
fn kmeans_lloyd(
    x: &[f32],
    d: usize,
    mut centroids: Vec<f32>,
    max_iter: usize,
    threshold: f64,
) -> KMeansState {
    let k = centroids.len() / d;
    let (mut assignments, mut distortion) = update_assignments(x, d, &centroids);

    for nr in 1..=max_iter {
        centroids = update_centroids(x, d, &assignments, centroids);
        let (new_assignments, new_distortion) = update_assignments(x, d, &centroids);
        let diff = distortion - new_distortion;
        assignments = new_assignments;
        distortion = new_distortion;
        debug!("第 {nr} 轮 - 失真度：{distortion:.4} | 失真度变化：{:+.6}", -diff);
        if diff <= threshold {
            break;
        }
    }

    let mut centroid_frequency = vec![0; k];
    for &a in &assignments {
        centroid_frequency[a] += 1;
    }

    KMeansState { distortion, centroids, centroid_frequency }
}

/// 将每个点分配给最近的聚类中心，并返回聚类中心的序号和平均距离
fn update_assignments(x: &[f32], d: usize, centroids: &[f32]) -> (Vec<usize>, f64) {
    let (assignments, distances): (Vec<_>, Vec<_>) =
        x.par_chunks_exact(d).map(|point| nearest_centroid(point, centroids, d)).unzip();
    // NOTE: 按固定顺序求和，保证结果与线程数无关
    let total = distances.iter().map(|&s| (s as f64).sqrt()).sum::<f64>();
    let n = assignments.len().max(1);
    (assignments, total / n as f64)
}

/// 更新聚类中心：计算分配给该聚类的所有点的均值
fn update_centroids(x: &[f32], d: usize, assignments: &[usize], old: Vec<f32>) -> Vec<f32> {
    let k = old.len() / d;
    let mut sums = vec![0f64; k * d];
    let mut counts = vec![0usize; k];
    for (point, &a) in x.chunks_exact(d).zip(assignments) {
        counts[a] += 1;
        for (s, &v) in sums[a * d..(a + 1) * d].iter_mut().zip(point) {
            *s += v as f64;
        }
    }

    let mut centroids = old;
    for (j, &count) in counts.iter().enumerate() {
        // 空聚类沿用旧的中心点
        if count == 0 {
            continue;
        }
        for (c, s) in centroids[j * d..(j + 1) * d].iter_mut().zip(&sums[j * d..(j + 1) * d]) {
            *c = (s / count as f64) as f32;
        }
    }
    centroids
}

/// 计算不平衡因子
pub fn imbalance_factor(hist: &[usize]) -> f32 {
    let (mut tot, mut uf) = (0.0, 0.0);
    for h in hist {
        let h = *h as f32;
        tot += h;
        uf += h.powf(2.0);
    }
    uf * hist.len() as f32 / tot.powf(2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(k: usize) -> KMeansConfig {
        KMeansConfig { k, runs: 1, max_iter: 100, threshold: 1e-5, seed: 42 }
    }

    /// 在若干个中心点附近生成数据
    fn generate_clustered_data(n: usize, centers: &[[f32; 2]]) -> Vec<f32> {
        let mut rng = Pcg64::seed_from_u64(42);
        let mut data = Vec::with_capacity(n * 2);
        for i in 0..n {
            let c = centers[i % centers.len()];
            data.push(c[0] + rng.random_range(-0.5..0.5));
            data.push(c[1] + rng.random_range(-0.5..0.5));
        }
        data
    }

    #[test]
    fn test_nearest_centroid_tie_break() {
        let centroids = [1.0, 0.0, -1.0, 0.0, 1.0, 0.0];
        // 到三个中心的距离都是 1
        assert_eq!(nearest_centroid(&[0.0, 0.0], &centroids, 2), (0, 1.0));
        assert_eq!(nearest_centroid(&[-1.0, 0.0], &centroids, 2), (1, 0.0));
    }

    #[test]
    fn test_kmeans_separated_clusters() {
        let centers = [[0.0, 0.0], [10.0, 10.0], [-10.0, 10.0]];
        let data = generate_clustered_data(300, &centers);
        let ks = kmeans(&data, 2, &KMeansConfig { runs: 3, ..config(3) });

        assert_eq!(ks.centroids.len(), 6);
        assert_eq!(ks.centroid_frequency.iter().sum::<usize>(), 300);
        for c in &centers {
            let (_, dist) = nearest_centroid(c, &ks.centroids, 2);
            assert!(dist < 0.1, "中心点 {c:?} 没有被找到");
        }
        assert!(ks.distortion < 0.5);
    }

    #[test]
    fn test_kmeans_deterministic() {
        let data = generate_clustered_data(200, &[[0.0, 0.0], [5.0, 5.0]]);
        let a = kmeans(&data, 2, &config(4));
        let b = kmeans(&data, 2, &config(4));
        assert_eq!(a.centroids, b.centroids);
        assert_eq!(a.distortion, b.distortion);
    }

    #[test]
    fn test_kmeans_duplicate_points_keep_k() {
        // 只有两个不同的点，但需要 3 个中心
        let data = vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        let ks = kmeans(&data, 2, &config(3));
        assert_eq!(ks.centroids.len(), 6);
        assert!(ks.centroids.iter().all(|c| c.is_finite()));
        assert_eq!(ks.centroid_frequency.iter().sum::<usize>(), 4);
    }

    #[test]
    fn test_kmeans_k_equals_n() {
        let data = vec![0.0, 1.0, 2.0, 3.0];
        let ks = kmeans(&data, 1, &config(4));
        let mut centroids = ks.centroids.clone();
        centroids.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(centroids, data);
        assert_eq!(ks.distortion, 0.0);
    }

    #[test]
    fn test_kmeans_plusplus_distinct() {
        let data = vec![0.0, 1.0, 2.0, 3.0, 3.0];
        let mut rng = Pcg64::seed_from_u64(1);
        let mut init = init_kmeans_plusplus(&data, 1, 4, &mut rng);
        init.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(init, vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_kmeans_zero_iterations() {
        let data = vec![0.0, 1.0, 2.0, 3.0];
        let ks = kmeans(&data, 1, &KMeansConfig { max_iter: 0, ..config(2) });
        assert_eq!(ks.centroids.len(), 2);
        assert!(ks.centroids.iter().all(|c| data.contains(c)));
    }

    #[test]
    #[should_panic]
    fn test_kmeans_not_enough_points() {
        kmeans(&[0.0, 1.0], 1, &config(3));
    }

    #[test]
    fn test_imbalance_factor() {
        assert_eq!(imbalance_factor(&[5, 5]), 1.0);
        assert_eq!(imbalance_factor(&[10, 0]), 2.0);
    }
}
