use std::process::ExitCode;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;

use exposure_cli::{Cli, run_main, write_output, write_sections};
use exposure_error::{Error, ErrorKind};

fn run(args: Cli) -> Result<()> {
    let opts = args.into_options()?;
    let text = run_main(&opts)?;

    if let Some(dir) = &opts.split_dir {
        write_sections(&text, dir)?;
    }
    write_output(&text, opts.output.as_deref())?;
    Ok(())
}

fn main() -> ExitCode {
    let args = Cli::parse();
    let total_start = Instant::now();

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
    }

    let code = match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match err.downcast_ref::<Error>() {
                Some(e) if e.kind() == ErrorKind::SnapshotUnavailable => {
                    eprintln!("Error loading infrastructure: {}", e.message());
                }
                _ => eprintln!("Error: {err:#}"),
            }
            tracing::error!(error = ?err, "execution failed");
            ExitCode::FAILURE
        }
    };

    tracing::info!(total_secs = total_start.elapsed().as_secs_f64(), "complete");
    code
}
