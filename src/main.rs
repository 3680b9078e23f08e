use anyhow::Result;
use bovw::Opts;
use bovw::cli::SubCommandExtend;
use bovw::config::SubCommand;
use clap::Parser;
use log::debug;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opts = Opts::parse();

    let threads = if opts.threads == 0 { num_cpus::get() } else { opts.threads };
    rayon::ThreadPoolBuilder::new().num_threads(threads).build_global()?;
    debug!("使用 {threads} 个线程");

    match &opts.subcmd {
        SubCommand::Run(config) => config.run(&opts),
        SubCommand::Train(config) => config.run(&opts),
        SubCommand::Encode(config) => config.run(&opts),
        SubCommand::Search(config) => config.run(&opts),
        SubCommand::Show(config) => config.run(&opts),
    }
}
