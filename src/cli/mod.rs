mod encode;
mod run;
mod search;
mod show;
mod train;

pub use encode::*;
pub use run::*;
pub use search::*;
pub use show::*;
pub use train::*;

use crate::config::Opts;

pub trait SubCommandExtend {
    fn run(&self, opts: &Opts) -> anyhow::Result<()>;
}
