use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;

use crate::cli::SubCommandExtend;
use crate::config::{ExtractorOptions, Opts, PipelineConfig};
use crate::vocab::train_codebook;
use crate::{Corpus, FeatureExtractor};

#[derive(Parser, Debug, Clone)]
pub struct TrainCommand {
    #[command(flatten)]
    pub extractor: ExtractorOptions,
    #[command(flatten)]
    pub pipeline: PipelineConfig,
    /// 图片所在目录
    #[arg(short, long, default_value = "files")]
    pub files: PathBuf,
    /// 词典保存路径
    #[arg(short, long, default_value = "codebook.bin")]
    pub codebook: PathBuf,
}

impl SubCommandExtend for TrainCommand {
    fn run(&self, _opts: &Opts) -> Result<()> {
        let corpus = Corpus::scan(&self.files)?;
        let extractor = FeatureExtractor::new(self.extractor.clone());
        let codebook = train_codebook(&corpus, &extractor, &self.pipeline)?;
        codebook.save(&self.codebook)?;
        info!("词典已保存到 {}", self.codebook.display());
        Ok(())
    }
}
