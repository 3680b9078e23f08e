use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use opencv::prelude::*;

use crate::cli::SubCommandExtend;
use crate::config::{ExtractorOptions, Opts};
use crate::corpus::CorpusEntry;
use crate::{FeatureExtractor, utils};

#[derive(Parser, Debug, Clone)]
pub struct ShowCommand {
    #[command(flatten)]
    pub extractor: ExtractorOptions,
    /// base64 编码的图片文件
    pub image: PathBuf,
    /// 把特征点绘制到图片并保存到该路径
    pub output: Option<String>,
}

impl SubCommandExtend for ShowCommand {
    fn run(&self, _opts: &Opts) -> Result<()> {
        let record = CorpusEntry::file(self.image.clone()).load()?;
        let extractor = FeatureExtractor::new(self.extractor.clone());
        let (image, kps, des) = extractor.detect(&record.id, &record.bytes)?;

        println!("图片尺寸：{}x{}", image.cols(), image.rows());
        println!("特征点数量：{}", kps.len());
        println!("描述符：{} x {}", des.rows(), des.cols());

        if let Some(file) = &self.output {
            let output = utils::draw_keypoints(&image, &kps)?;
            utils::imwrite(file, &output)?;
        }
        Ok(())
    }
}
