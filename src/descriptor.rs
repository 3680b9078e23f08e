use std::slice::ChunksExact;

use crate::error::{BovwError, Result};

/// 一张图片的局部特征描述符，按行连续存储
///
/// 每行是一个 `dim` 维的描述符，行数随图片变化
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptors {
    dim: usize,
    data: Vec<f32>,
}

impl Descriptors {
    pub fn new(dim: usize, data: Vec<f32>) -> Result<Self> {
        if dim == 0 || data.len() % dim != 0 {
            return Err(BovwError::DimensionMismatch { expected: dim, found: data.len() });
        }
        Ok(Self { dim, data })
    }

    pub fn from_rows<const D: usize>(rows: &[[f32; D]]) -> Result<Self> {
        Self::new(D, rows.iter().flatten().copied().collect())
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// 描述符数量
    pub fn len(&self) -> usize {
        self.data.len() / self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.dim..(i + 1) * self.dim]
    }

    pub fn iter(&self) -> ChunksExact<'_, f32> {
        self.data.chunks_exact(self.dim)
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

/// 局部特征提取器：输入编码后的图片，输出描述符
///
/// 返回 `Ok(None)` 表示图片中没有检测到任何特征点，这不是错误；
/// 图片无法解码时返回 [`BovwError::Decode`]。
/// 实现必须可以在多个线程中同时调用。
pub trait Extractor: Sync {
    fn extract(&self, id: &str, bytes: &[u8]) -> Result<Option<Descriptors>>;
}

impl<F> Extractor for F
where
    F: Fn(&str, &[u8]) -> Result<Option<Descriptors>> + Sync,
{
    fn extract(&self, id: &str, bytes: &[u8]) -> Result<Option<Descriptors>> {
        self(id, bytes)
    }
}
