use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use crate::cli::SubCommandExtend;
use crate::config::{ExtractorOptions, Opts};
use crate::pipeline::encode_to_file;
use crate::{Codebook, Corpus, FeatureExtractor};

#[derive(Parser, Debug, Clone)]
pub struct EncodeCommand {
    #[command(flatten)]
    pub extractor: ExtractorOptions,
    /// 图片所在目录
    #[arg(short, long, default_value = "files")]
    pub files: PathBuf,
    /// 训练好的词典，必须使用相同的特征点算法
    #[arg(short, long, default_value = "codebook.bin")]
    pub codebook: PathBuf,
    /// 结果文件路径
    #[arg(short, long, default_value = "cover.json")]
    pub output: PathBuf,
}

impl SubCommandExtend for EncodeCommand {
    fn run(&self, _opts: &Opts) -> Result<()> {
        let codebook = Codebook::open(&self.codebook)
            .with_context(|| format!("无法加载词典 {}", self.codebook.display()))?;
        info!("词典大小：{} x {}", codebook.len(), codebook.dim());

        let corpus = Corpus::scan(&self.files)?;
        let extractor = FeatureExtractor::new(self.extractor.clone());
        encode_to_file(&corpus, &extractor, &codebook, &self.output)?;
        Ok(())
    }
}
