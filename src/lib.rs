#[cfg(feature = "opencv")]
pub mod cli;
pub mod codebook;
pub mod config;
pub mod corpus;
pub mod descriptor;
pub mod error;
#[cfg(feature = "opencv")]
pub mod extractor;
pub mod frequency;
pub mod kmeans;
pub mod pipeline;
pub mod similarity;
pub mod tfidf;
pub mod utils;
pub mod vocab;
pub mod writer;

pub use codebook::Codebook;
#[cfg(feature = "opencv")]
pub use config::Opts;
pub use config::{Algorithm, ExtractorOptions, PipelineConfig};
pub use corpus::{ActiveSet, Corpus, CorpusEntry};
pub use descriptor::{Descriptors, Extractor};
pub use error::{BovwError, Result};
#[cfg(feature = "opencv")]
pub use extractor::FeatureExtractor;
pub use pipeline::{Pipeline, RunReport};
