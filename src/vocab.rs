use std::collections::{BTreeSet, HashMap};

use indicatif::{ParallelProgressIterator, ProgressBar};
use log::{info, warn};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use rayon::prelude::*;

use crate::codebook::Codebook;
use crate::config::PipelineConfig;
use crate::corpus::Corpus;
use crate::descriptor::{Descriptors, Extractor};
use crate::error::{BovwError, Result};
use crate::kmeans::{KMeansConfig, kmeans};
use crate::utils::pb_style;

/// 从 `0..n` 中有放回地均匀抽取 `count` 个下标
pub fn sample_indices(n: usize, count: usize, seed: u64) -> Vec<usize> {
    if n == 0 {
        return vec![];
    }
    let mut rng = Pcg64::seed_from_u64(seed);
    (0..count).map(|_| rng.random_range(0..n)).collect()
}

/// 用于训练词典的特征点集合
#[derive(Debug, Clone, Default)]
pub struct TrainingPool {
    /// 描述符维度
    pub dim: usize,
    /// 所有描述符，长度为 rows * dim
    pub descriptors: Vec<f32>,
    /// 抽样次数（包括重复）
    pub sampled: usize,
    /// 抽到的不同图片数量
    pub distinct: usize,
    /// 没有贡献任何特征点的抽样次数
    pub skipped: usize,
}

impl TrainingPool {
    pub fn rows(&self) -> usize {
        if self.dim == 0 { 0 } else { self.descriptors.len() / self.dim }
    }
}

/// 提取抽样图片的特征点并合并到一起
///
/// 每张不同的图片只提取一次，但按抽样次数重复加入。
/// 无法解码或没有特征点的图片会被跳过。
pub fn pool_descriptors<E: Extractor>(
    corpus: &Corpus,
    extractor: &E,
    sample: &[usize],
) -> Result<TrainingPool> {
    let distinct = sample.iter().copied().collect::<BTreeSet<_>>().into_iter().collect::<Vec<_>>();
    info!("抽样 {} 次，共 {} 张不同的图片", sample.len(), distinct.len());

    let pb = ProgressBar::new(distinct.len() as u64).with_style(pb_style());
    let extracted = distinct
        .par_iter()
        .progress_with(pb.clone())
        .map(|&i| {
            let Some(entry) = corpus.get(i) else {
                return (i, None);
            };
            let des = entry.load().and_then(|record| extractor.extract(&record.id, &record.bytes));
            match des {
                Ok(des) => (i, des),
                Err(e) => {
                    warn!("跳过训练图片 {}: {}", entry.id(), e);
                    (i, None)
                }
            }
        })
        .collect::<HashMap<usize, Option<Descriptors>>>();
    pb.finish_with_message("特征点提取完成");

    let mut pool = TrainingPool { sampled: sample.len(), distinct: distinct.len(), ..Default::default() };
    for i in sample {
        match extracted.get(i) {
            Some(Some(des)) => {
                if pool.dim == 0 {
                    pool.dim = des.dim();
                } else if pool.dim != des.dim() {
                    return Err(BovwError::DimensionMismatch { expected: pool.dim, found: des.dim() });
                }
                pool.descriptors.extend_from_slice(des.as_slice());
            }
            _ => pool.skipped += 1,
        }
    }

    info!("训练集大小：{} x {}，跳过 {} 次抽样", pool.rows(), pool.dim, pool.skipped);
    Ok(pool)
}

/// 对特征点集合聚类，生成视觉词典
pub fn cluster_pool(pool: &TrainingPool, config: &PipelineConfig) -> Result<Codebook> {
    let required = config.vocabulary_size;
    if pool.rows() < required {
        return Err(BovwError::InsufficientData { available: pool.rows(), required });
    }

    info!("对 {} 组向量进行聚类，中心点数量 = {}", pool.rows(), required);
    let ks = kmeans(
        &pool.descriptors,
        pool.dim,
        &KMeansConfig {
            k: required,
            runs: config.clustering_iterations,
            max_iter: config.max_iter,
            threshold: config.threshold,
            seed: config.random_seed,
        },
    );
    info!("词典大小：{} x {}，失真度：{:.4}", required, pool.dim, ks.distortion);

    Codebook::new(pool.dim, ks.centroids)
}

/// 抽样、提取特征点并训练视觉词典
pub fn train_codebook<E: Extractor>(
    corpus: &Corpus,
    extractor: &E,
    config: &PipelineConfig,
) -> Result<Codebook> {
    config.validate()?;
    if corpus.is_empty() {
        return Err(BovwError::EmptyCorpus);
    }
    let sample = sample_indices(corpus.len(), config.training_sample_size, config.random_seed);
    let pool = pool_descriptors(corpus, extractor, &sample)?;
    cluster_pool(&pool, config)
}
