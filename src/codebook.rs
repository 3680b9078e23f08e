use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::descriptor::Descriptors;
use crate::error::{BovwError, Result};
use crate::kmeans::nearest_centroid;

/// 视觉词典：K 个聚类中心，每个中心与描述符维度相同
///
/// 训练完成后不再修改，可以在多个线程间共享只读访问
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Codebook {
    dim: usize,
    centroids: Vec<f32>,
}

impl Codebook {
    pub fn new(dim: usize, centroids: Vec<f32>) -> Result<Self> {
        if dim == 0 || centroids.is_empty() || centroids.len() % dim != 0 {
            return Err(BovwError::DimensionMismatch { expected: dim, found: centroids.len() });
        }
        Ok(Self { dim, centroids })
    }

    pub fn from_rows<const D: usize>(rows: &[[f32; D]]) -> Result<Self> {
        let des = Descriptors::from_rows(rows)?;
        Self::new(des.dim(), des.as_slice().to_vec())
    }

    /// 视觉单词数量
    pub fn len(&self) -> usize {
        self.centroids.len() / self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.centroids.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn centroid(&self, i: usize) -> &[f32] {
        &self.centroids[i * self.dim..(i + 1) * self.dim]
    }

    pub fn centroids(&self) -> &[f32] {
        &self.centroids
    }

    /// 返回最近的视觉单词序号和平方欧氏距离，距离相同时取序号最小者
    pub fn nearest(&self, v: &[f32]) -> (usize, f32) {
        nearest_centroid(v, &self.centroids, self.dim)
    }

    /// 将每个描述符映射到最近的视觉单词
    pub fn quantize(&self, descriptors: &Descriptors) -> Result<Vec<usize>> {
        self.check_dim(descriptors)?;
        Ok(descriptors.iter().map(|v| self.nearest(v).0).collect())
    }

    /// 统计每个视觉单词出现的次数，总和等于描述符数量
    pub fn histogram(&self, descriptors: &Descriptors) -> Result<Vec<u32>> {
        self.check_dim(descriptors)?;
        let mut hist = vec![0u32; self.len()];
        for v in descriptors.iter() {
            hist[self.nearest(v).0] += 1;
        }
        Ok(hist)
    }

    fn check_dim(&self, descriptors: &Descriptors) -> Result<()> {
        if descriptors.dim() != self.dim {
            return Err(BovwError::DimensionMismatch {
                expected: self.dim,
                found: descriptors.dim(),
            });
        }
        Ok(())
    }

    /// 从文件加载词典
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let buffer = std::fs::read(path)?;
        let codebook: Self = bincode::deserialize(&buffer)?;
        Self::new(codebook.dim, codebook.centroids)
    }

    /// 保存词典到文件
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let serialized = bincode::serialize(self)?;
        std::fs::write(path, serialized)?;
        Ok(())
    }
}
