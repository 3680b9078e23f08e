use std::collections::BTreeMap;
use std::path::Path;

use log::{info, warn};

use crate::codebook::Codebook;
use crate::config::PipelineConfig;
use crate::corpus::Corpus;
use crate::descriptor::Extractor;
use crate::error::{BovwError, Result};
use crate::frequency::{Exclusion, ExclusionReason, Frequencies, build_frequencies};
use crate::tfidf::TfIdf;
use crate::vocab::train_codebook;
use crate::writer::{ResultMap, build_result_map, write_results};

/// 使用词典编码整个图片集的结果
#[derive(Debug, Clone)]
pub struct Encoded {
    pub frequencies: Frequencies,
    pub tfidf: TfIdf,
    pub results: ResultMap,
}

/// 一次运行的统计信息
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// 图片集大小
    pub corpus_size: usize,
    /// 写入结果的图片数量
    pub active_size: usize,
    pub exclusions: Vec<Exclusion>,
}

impl RunReport {
    /// 按原因统计被排除的图片数量
    pub fn exclusion_summary(&self) -> BTreeMap<&'static str, usize> {
        let mut summary = BTreeMap::new();
        for e in &self.exclusions {
            let key = match e.reason {
                ExclusionReason::NoDescriptors => "没有特征点",
                ExclusionReason::Decode(_) => "解码失败",
                ExclusionReason::DimensionMismatch { .. } => "维度不一致",
            };
            *summary.entry(key).or_insert(0) += 1;
        }
        summary
    }

    pub fn log(&self) {
        info!("共 {} 张图片，输出 {} 张", self.corpus_size, self.active_size);
        for (reason, count) in self.exclusion_summary() {
            warn!("排除 {count} 张图片：{reason}");
        }
    }
}

/// 对图片集的每张图片计算 TF-IDF 向量，没有特征点的图片不会出现在结果中
pub fn encode_corpus<E: Extractor>(
    corpus: &Corpus,
    extractor: &E,
    codebook: &Codebook,
) -> Result<Encoded> {
    if corpus.is_empty() {
        return Err(BovwError::EmptyCorpus);
    }
    let frequencies = build_frequencies(corpus, &corpus.all(), extractor, codebook);
    if frequencies.active.is_empty() {
        return Err(all_pruned_error(&frequencies.exclusions));
    }
    let tfidf = TfIdf::fit(&frequencies.vectors, codebook.len());
    let weighted = tfidf.transform_all(&frequencies.vectors);
    let results = build_result_map(corpus, &frequencies.active, weighted);
    Ok(Encoded { frequencies, tfidf, results })
}

/// 所有图片都被排除时的错误
///
/// 存在维度不一致的图片时，通常是词典与特征点算法不匹配，此时报告维度错误
fn all_pruned_error(exclusions: &[Exclusion]) -> BovwError {
    exclusions
        .iter()
        .find_map(|e| match e.reason {
            ExclusionReason::DimensionMismatch { expected, found } => {
                Some(BovwError::DimensionMismatch { expected, found })
            }
            _ => None,
        })
        .unwrap_or(BovwError::EmptyCorpus)
}

/// 编码并写入结果文件
pub fn encode_to_file<E: Extractor, P: AsRef<Path>>(
    corpus: &Corpus,
    extractor: &E,
    codebook: &Codebook,
    output: P,
) -> Result<RunReport> {
    let encoded = encode_corpus(corpus, extractor, codebook)?;
    write_results(output, &encoded.results)?;
    let report = RunReport {
        corpus_size: corpus.len(),
        active_size: encoded.results.len(),
        exclusions: encoded.frequencies.exclusions,
    };
    report.log();
    Ok(report)
}

/// 词袋模型流程：训练词典 -> 统计词频 -> TF-IDF -> 写入结果
pub struct Pipeline<'a, E> {
    config: &'a PipelineConfig,
    extractor: &'a E,
}

impl<'a, E: Extractor> Pipeline<'a, E> {
    pub fn new(config: &'a PipelineConfig, extractor: &'a E) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, extractor })
    }

    pub fn train(&self, corpus: &Corpus) -> Result<Codebook> {
        train_codebook(corpus, self.extractor, self.config)
    }

    pub fn encode(&self, corpus: &Corpus, codebook: &Codebook) -> Result<Encoded> {
        encode_corpus(corpus, self.extractor, codebook)
    }

    /// 完整流程
    pub fn run<P: AsRef<Path>>(&self, corpus: &Corpus, output: P) -> Result<(Codebook, RunReport)> {
        info!("图片集共 {} 张图片，配置：{:?}", corpus.len(), self.config);
        let codebook = self.train(corpus)?;
        let report = encode_to_file(corpus, self.extractor, &codebook, output)?;
        Ok((codebook, report))
    }
}
