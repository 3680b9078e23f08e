use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::error::{BovwError, Result};

/// 局部特征检测算法
#[derive(ValueEnum, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// SIFT，128 维浮点描述符
    #[default]
    Sift,
    /// ORB，32 字节二进制描述符
    Orb,
}

#[derive(Parser, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ExtractorOptions {
    /// 特征点检测算法
    #[arg(short, long, value_enum, default_value_t = Algorithm::Sift)]
    pub algorithm: Algorithm,
    /// ORB 特征点最大保留数量
    #[arg(long, value_name = "N", default_value_t = 500)]
    pub orb_nfeatures: u32,
    /// ORB 特征金字塔缩放因子
    #[arg(long, value_name = "SCALE", default_value_t = 1.2)]
    pub orb_scale_factor: f32,
    /// ORB 特征金字塔层数
    #[arg(long, value_name = "N", default_value_t = 8)]
    pub orb_nlevels: u32,
    /// ORB FAST 角点检测器阈值
    #[arg(long, value_name = "THRESHOLD", default_value_t = 20)]
    pub orb_fast_threshold: u32,
    /// 图片最大尺寸，如果宽高**均**超过这个尺寸，则等比缩放，0x0 表示不缩放
    #[arg(short = 'S', long, value_name = "WIDTHxHEIGHT", value_parser = parse_size, verbatim_doc_comment, default_value = "0x0")]
    pub max_size: (i32, i32),
}

impl Default for ExtractorOptions {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Sift,
            orb_nfeatures: 500,
            orb_scale_factor: 1.2,
            orb_nlevels: 8,
            orb_fast_threshold: 20,
            max_size: (0, 0),
        }
    }
}

/// 词典训练与编码参数
#[derive(Parser, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// 词典大小，即聚类中心数量，也是最终向量的维度
    #[arg(short = 'k', long, value_name = "K", default_value_t = 200)]
    pub vocabulary_size: usize,
    /// 用于训练词典的图片数量（有放回抽样）
    #[arg(short = 'n', long, value_name = "N", default_value_t = 3000)]
    pub training_sample_size: usize,
    /// kmeans 重复运行次数，保留失真度最小的结果
    #[arg(short = 'i', long, value_name = "N", default_value_t = 1)]
    pub clustering_iterations: usize,
    /// 每次 kmeans 的最大迭代次数
    #[arg(long, value_name = "N", default_value_t = 100)]
    pub max_iter: usize,
    /// 失真度变化小于该值时认为 kmeans 已收敛
    #[arg(long, value_name = "DELTA", default_value_t = 1e-5)]
    pub threshold: f64,
    /// 随机数种子，决定抽样和聚类结果
    #[arg(long = "seed", value_name = "SEED", default_value_t = 42)]
    pub random_seed: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            vocabulary_size: 200,
            training_sample_size: 3000,
            clustering_iterations: 1,
            max_iter: 100,
            threshold: 1e-5,
            random_seed: 42,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.vocabulary_size == 0 {
            return Err(BovwError::InvalidConfig("vocabulary_size 必须大于 0".into()));
        }
        if self.training_sample_size == 0 {
            return Err(BovwError::InvalidConfig("training_sample_size 必须大于 0".into()));
        }
        if self.clustering_iterations == 0 {
            return Err(BovwError::InvalidConfig("clustering_iterations 必须大于 0".into()));
        }
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(BovwError::InvalidConfig(format!("无效的收敛阈值: {}", self.threshold)));
        }
        Ok(())
    }
}

#[cfg(feature = "opencv")]
pub use self::opts::*;

#[cfg(feature = "opencv")]
mod opts {
    use clap::{Parser, Subcommand};

    use crate::cli::*;

    #[derive(Parser, Debug, Clone)]
    #[command(name = "bovw", version)]
    pub struct Opts {
        #[command(subcommand)]
        pub subcmd: SubCommand,
        /// 并行线程数量，0 表示使用全部 CPU
        #[arg(short = 'j', long, global = true, default_value_t = 0)]
        pub threads: usize,
    }

    #[derive(Subcommand, Debug, Clone)]
    pub enum SubCommand {
        /// 训练词典并计算所有图片的 TF-IDF 向量
        Run(RunCommand),
        /// 只训练词典并保存到文件
        Train(TrainCommand),
        /// 使用已保存的词典计算所有图片的 TF-IDF 向量
        Encode(EncodeCommand),
        /// 在结果文件中搜索相似图片
        Search(SearchCommand),
        /// 显示单张图片的特征点
        Show(ShowCommand),
    }
}

fn parse_size(s: &str) -> anyhow::Result<(i32, i32)> {
    let parts: Vec<&str> = s.split('x').collect();
    if parts.len() != 2 {
        return Err(anyhow::anyhow!("无效的尺寸: {}", s));
    }
    Ok((parts[0].parse()?, parts[1].parse()?))
}
