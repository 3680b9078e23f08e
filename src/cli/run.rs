use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;

use crate::cli::SubCommandExtend;
use crate::config::{ExtractorOptions, Opts, PipelineConfig};
use crate::{Corpus, FeatureExtractor, Pipeline};

#[derive(Parser, Debug, Clone)]
pub struct RunCommand {
    #[command(flatten)]
    pub extractor: ExtractorOptions,
    #[command(flatten)]
    pub pipeline: PipelineConfig,
    /// 图片所在目录，每个文件是一张 base64 编码的图片
    #[arg(short, long, default_value = "files")]
    pub files: PathBuf,
    /// 结果文件路径
    #[arg(short, long, default_value = "cover.json")]
    pub output: PathBuf,
    /// 同时把训练得到的词典保存到该路径
    #[arg(long, value_name = "FILE")]
    pub codebook: Option<PathBuf>,
}

impl SubCommandExtend for RunCommand {
    fn run(&self, _opts: &Opts) -> Result<()> {
        let corpus = Corpus::scan(&self.files)?;
        let extractor = FeatureExtractor::new(self.extractor.clone());
        let pipeline = Pipeline::new(&self.pipeline, &extractor)?;

        let (codebook, _) = pipeline.run(&corpus, &self.output)?;

        if let Some(path) = &self.codebook {
            codebook.save(path)?;
            info!("词典已保存到 {}", path.display());
        }
        Ok(())
    }
}
