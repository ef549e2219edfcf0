//! exposure command-line interface.
//!
pub mod config;
pub mod options;
pub mod output;
pub mod pipeline;

pub use config::ExposureConfig;
pub use options::{Cli, ExposureOptions, View};
pub use output::{write_output, write_sections};
pub use pipeline::{run_main, run_with};
