//! Configuration structures mapping the suggestion.toml document.

#![deny(missing_docs)]

mod completion;
mod loader;
mod model;

use std::path::Path;

pub use completion::{CompletionConfig, RequestStrategyId};
pub use model::{
    ChatModelConfig, ChatModelFormat, CompletionModelConfig, CompletionModelFormat, FimModelConfig, FimModelFormat,
    ModelConfig, TabbyAuthMode, TabbyModelConfig,
};
use serde::Deserialize;

/// Main configuration structure for the suggestion service.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// The model the completions are requested from.
    pub model: ModelConfig,
    /// Tuning knobs for prompt construction and post-processing.
    #[serde(default)]
    pub completion: CompletionConfig,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
        loader::load(path)
    }
}
