use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};

use crate::cli::SubCommandExtend;
use crate::config::Opts;
use crate::similarity::rank;
use crate::writer::read_results;

#[derive(Parser, Debug, Clone)]
pub struct SearchCommand {
    /// 结果文件路径
    #[arg(short, long, default_value = "cover.json")]
    pub results: PathBuf,
    /// 被搜索的图片名称
    pub image: String,
    /// 显示的结果数量
    #[arg(long, value_name = "COUNT", default_value_t = 10)]
    pub count: usize,
    /// 输出格式
    #[arg(long, value_name = "FORMAT", value_enum, default_value_t = OutputFormat::Table)]
    pub output_format: OutputFormat,
}

impl SubCommandExtend for SearchCommand {
    fn run(&self, _opts: &Opts) -> Result<()> {
        let results = read_results(&self.results)?;
        let ranked = rank(&results, &self.image, self.count)?;
        print_result(&ranked, self)
    }
}

fn print_result(result: &[(f64, String)], opts: &SearchCommand) -> Result<()> {
    match opts.output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(result)?)
        }
        OutputFormat::Table => {
            for (k, v) in result {
                println!("{:.4}\t{}", k, v);
            }
        }
    }
    Ok(())
}

#[derive(ValueEnum, Debug, Clone)]
pub enum OutputFormat {
    Json,
    Table,
}
