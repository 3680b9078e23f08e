use log::info;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// 统计每个视觉单词在多少张图片中出现过（计数大于 0）
pub fn document_frequency(vectors: &[Vec<u32>], k: usize) -> Vec<u32> {
    let mut df = vec![0u32; k];
    for v in vectors {
        for (d, &c) in df.iter_mut().zip(v) {
            if c > 0 {
                *d += 1;
            }
        }
    }
    df
}

/// idf[k] = ln(n / df[k])
///
/// 没有任何图片使用的视觉单词（df = 0）权重为 0，而不是无穷大
pub fn inverse_document_frequency(df: &[u32], n: usize) -> Vec<f64> {
    df.iter()
        .map(|&d| if d == 0 || n == 0 { 0.0 } else { (n as f64 / d as f64).ln() })
        .collect()
}

/// 词频向量逐项乘以 idf
pub fn weight(tf: &[u32], idf: &[f64]) -> Vec<f64> {
    tf.iter().zip(idf).map(|(&t, &w)| t as f64 * w).collect()
}

/// 在整个图片集上拟合得到的 TF-IDF 参数
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TfIdf {
    /// 参与统计的图片数量
    pub n: usize,
    pub df: Vec<u32>,
    pub idf: Vec<f64>,
}

impl TfIdf {
    pub fn fit(vectors: &[Vec<u32>], k: usize) -> Self {
        let n = vectors.len();
        let df = document_frequency(vectors, k);
        let idf = inverse_document_frequency(&df, n);
        let unused = df.iter().filter(|&&d| d == 0).count();
        info!("TF-IDF：{n} 张图片，{k} 个视觉单词，其中 {unused} 个未被使用");
        Self { n, df, idf }
    }

    pub fn transform(&self, tf: &[u32]) -> Vec<f64> {
        weight(tf, &self.idf)
    }

    pub fn transform_all(&self, vectors: &[Vec<u32>]) -> Vec<Vec<f64>> {
        vectors.par_iter().map(|tf| self.transform(tf)).collect()
    }
}
