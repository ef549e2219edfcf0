//! Command-line options for the `exposure` binary.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use serde::Deserialize;

use exposure_core::SnapshotRequest;
use exposure_error::Error;

use crate::config::ExposureConfig;

pub const DEFAULT_PROFILE: &str = "default";
pub const DEFAULT_REGION: &str = "us-east-1";

/// Which diagram to produce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum View {
    /// One section per external range
    #[default]
    AttackSurface,
    /// Scoped view around a load balancer, or the whole environment
    LoadBalancer,
}

#[derive(Parser, Debug, Clone, Default)]
#[command(
    name = "exposure",
    about = "exposure: which external ranges reach what, as Mermaid diagrams",
    version
)]
pub struct Cli {
    /// Inventory JSON to read the snapshot from
    #[arg(long, value_name = "FILE")]
    pub snapshot: Option<PathBuf>,

    /// Credential profile the snapshot belongs to
    #[arg(long, value_name = "NAME")]
    pub profile: Option<String>,

    #[arg(long, value_name = "REGION")]
    pub region: Option<String>,

    /// Only keep resources in this VPC
    #[arg(long = "vpc-id", value_name = "VPC")]
    pub vpc_id: Option<String>,

    #[arg(long, value_enum)]
    pub view: Option<View>,

    /// Focus the load-balancer view on the load balancer with this name
    #[arg(long = "load-balancer", value_name = "NAME")]
    pub load_balancer: Option<String>,

    /// Output file path (writes to file instead of stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Also write each report section to DIR as a `.mmd` file
    #[arg(long = "split-dir", value_name = "DIR")]
    pub split_dir: Option<PathBuf>,

    /// Print the assembled snapshot as JSON instead of a diagram
    #[arg(long = "print-snapshot", default_value_t = false)]
    pub print_snapshot: bool,

    /// TOML file with defaults for the options above
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Fully resolved options for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExposureOptions {
    pub snapshot: PathBuf,
    pub request: SnapshotRequest,
    pub view: View,
    pub load_balancer: Option<String>,
    pub output: Option<PathBuf>,
    pub split_dir: Option<PathBuf>,
    pub print_snapshot: bool,
}

impl Cli {
    /// Load the config file named by `--config`, if any, and resolve.
    pub fn into_options(self) -> Result<ExposureOptions> {
        let config = match &self.config {
            Some(path) => ExposureConfig::from_path(path)?,
            None => ExposureConfig::default(),
        };
        self.resolve(config)
    }

    /// Merge with `config`. Flags win over file values.
    pub fn resolve(self, config: ExposureConfig) -> Result<ExposureOptions> {
        let Some(snapshot) = self.snapshot.or(config.snapshot) else {
            return Err(Error::invalid_argument(
                "no snapshot given: pass --snapshot or set `snapshot` in the config file",
            )
            .with_operation("options::resolve")
            .into());
        };

        let view = self.view.or(config.view).unwrap_or_default();
        let misplaced_focus = self
            .load_balancer
            .as_deref()
            .filter(|_| view != View::LoadBalancer);
        if let Some(name) = misplaced_focus {
            return Err(Error::invalid_argument(
                "--load-balancer only applies to --view load-balancer",
            )
            .with_operation("options::resolve")
            .with_context("load_balancer", name)
            .into());
        }

        let profile = self
            .profile
            .or(config.profile)
            .unwrap_or_else(|| DEFAULT_PROFILE.to_string());
        let region = self
            .region
            .or(config.region)
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        let request =
            SnapshotRequest::new(profile, region).with_vpc_id(self.vpc_id.or(config.vpc_id));

        Ok(ExposureOptions {
            snapshot,
            request,
            view,
            load_balancer: self.load_balancer,
            output: self.output.or(config.output),
            split_dir: self.split_dir.or(config.split_dir),
            print_snapshot: self.print_snapshot,
        })
    }
}
