use std::{fs, path::Path};

use anyhow::Context;

use crate::Config;

pub(crate) fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let path = path.as_ref();

    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read configuration from {}", path.display()))?;

    toml::from_str(&content).context("failed to parse configuration")
}
