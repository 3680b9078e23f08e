use std::fmt;

use indicatif::{ParallelProgressIterator, ProgressBar};
use log::{info, warn};
use rayon::prelude::*;

use crate::codebook::Codebook;
use crate::corpus::{ActiveSet, Corpus, CorpusEntry};
use crate::descriptor::Extractor;
use crate::error::{BovwError, Result};
use crate::utils::pb_style;

/// 图片被排除的原因
#[derive(Debug, Clone, PartialEq)]
pub enum ExclusionReason {
    /// 没有检测到任何特征点
    NoDescriptors,
    /// 读取或解码失败
    Decode(String),
    /// 描述符维度与词典不一致
    DimensionMismatch { expected: usize, found: usize },
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoDescriptors => write!(f, "没有特征点"),
            Self::Decode(reason) => write!(f, "解码失败: {reason}"),
            Self::DimensionMismatch { expected, found } => {
                write!(f, "特征点维度不一致：期望 {expected}，实际 {found}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Exclusion {
    pub id: String,
    pub reason: ExclusionReason,
}

/// 词频统计结果
#[derive(Debug, Clone, Default)]
pub struct Frequencies {
    /// 剪除后仍然有效的图片
    pub active: ActiveSet,
    /// 与 `active` 一一对应的词频向量
    pub vectors: Vec<Vec<u32>>,
    /// 被剪除的图片，按图片集顺序排列
    pub exclusions: Vec<Exclusion>,
}

impl Frequencies {
    /// 有效图片的 (下标, 词频向量)
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[u32])> + '_ {
        self.active.iter().zip(self.vectors.iter().map(|v| v.as_slice()))
    }
}

/// 计算单张图片的词频向量，没有特征点时返回 `None`
pub fn image_frequency<E: Extractor>(
    entry: &CorpusEntry,
    extractor: &E,
    codebook: &Codebook,
) -> Result<Option<Vec<u32>>> {
    let record = entry.load()?;
    match extractor.extract(&record.id, &record.bytes)? {
        Some(des) if !des.is_empty() => codebook.histogram(&des).map(Some),
        _ => Ok(None),
    }
}

/// 对 `active` 中的每张图片统计词频
///
/// 没有特征点或处理失败的图片会从结果中剪除，不会使整个流程失败。
/// 每张图片处理完后只保留词频向量，不保留描述符。
pub fn build_frequencies<E: Extractor>(
    corpus: &Corpus,
    active: &ActiveSet,
    extractor: &E,
    codebook: &Codebook,
) -> Frequencies {
    let pb = ProgressBar::new(active.len() as u64).with_style(pb_style());
    let outcomes = active
        .indices()
        .par_iter()
        .progress_with(pb.clone())
        .filter_map(|&i| corpus.get(i).map(|entry| (i, entry)))
        .map(|(i, entry)| {
            let outcome = match image_frequency(entry, extractor, codebook) {
                Ok(Some(hist)) => Ok(hist),
                Ok(None) => Err(ExclusionReason::NoDescriptors),
                Err(BovwError::DimensionMismatch { expected, found }) => {
                    Err(ExclusionReason::DimensionMismatch { expected, found })
                }
                Err(e) => Err(ExclusionReason::Decode(e.to_string())),
            };
            (i, entry.id(), outcome)
        })
        .collect::<Vec<_>>();
    pb.finish_with_message("词频统计完成");

    let mut kept = Vec::with_capacity(outcomes.len());
    let mut frequencies = Frequencies::default();
    for (i, id, outcome) in outcomes {
        match outcome {
            Ok(hist) => {
                kept.push(i);
                frequencies.vectors.push(hist);
            }
            Err(reason) => {
                warn!("排除图片 {id}: {reason}");
                frequencies.exclusions.push(Exclusion { id: id.to_owned(), reason });
            }
        }
    }
    frequencies.active = ActiveSet::from_indices(kept);

    info!(
        "词频统计：有效图片 {} 张，排除 {} 张",
        frequencies.active.len(),
        frequencies.exclusions.len()
    );
    frequencies
}
