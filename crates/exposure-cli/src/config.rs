//! Optional TOML configuration file.
//!
//! ```toml
//! profile = "prod"
//! region = "eu-west-1"
//! vpc_id = "vpc-0abc"
//! snapshot = "inventory.json"
//! view = "attack-surface"
//! output = "report.md"
//! split_dir = "diagrams"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use exposure_error::Error;

use crate::options::View;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExposureConfig {
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub vpc_id: Option<String>,
    #[serde(default)]
    pub snapshot: Option<PathBuf>,
    #[serde(default)]
    pub view: Option<View>,
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(default)]
    pub split_dir: Option<PathBuf>,
}

impl ExposureConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid TOML in {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|err| {
            anyhow::Error::from(
                Error::config_invalid(err.message().to_string())
                    .with_operation("config::parse")
                    .set_source(err),
            )
        })
    }
}
