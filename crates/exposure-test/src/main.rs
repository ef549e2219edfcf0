use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use exposure_test::{CaseStatus, Corpus, RunnerConfig, run_cases};

#[derive(Parser, Debug)]
#[command(name = "exposure-test", about = "Corpus runner for exposure", version)]
struct Cli {
    /// Root directory containing `.exposure` corpus files
    #[arg(long, value_name = "DIR", default_value = "tests/corpus")]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the corpus expectations
    Run {
        /// Only run cases whose id contains this substring
        #[arg(long)]
        filter: Option<String>,
        /// Update expectation sections with current output (bless)
        #[arg(long)]
        update: bool,
        /// Keep each case's materialized inventory directory
        #[arg(long = "keep-temps")]
        keep_temps: bool,
    },
    /// List available cases (optionally filtering by substring)
    List {
        #[arg(long)]
        filter: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            filter,
            update,
            keep_temps,
        } => run_command(
            cli.root,
            RunnerConfig {
                filter,
                update,
                keep_temps,
            },
        ),
        Command::List { filter } => list_command(cli.root, filter),
    }
}

fn run_command(root: PathBuf, config: RunnerConfig) -> Result<()> {
    let update = config.update;
    let mut corpus = Corpus::load(&root)?;
    let outcomes = run_cases(&mut corpus, config)?;

    let count = |status: CaseStatus| outcomes.iter().filter(|o| o.status == status).count();
    let passed = count(CaseStatus::Passed);
    let updated = count(CaseStatus::Updated);
    let failed = count(CaseStatus::Failed);
    let skipped = count(CaseStatus::NoExpectations);

    if update {
        corpus.write_updates()?;
    }

    println!("\nSummary: {passed} passed, {updated} updated, {failed} failed, {skipped} skipped");

    if failed > 0 {
        anyhow::bail!("{} case(s) failed", failed);
    }
    Ok(())
}

fn list_command(root: PathBuf, filter: Option<String>) -> Result<()> {
    let corpus = Corpus::load(&root)?;
    let ids: Vec<String> = corpus
        .files()
        .iter()
        .flat_map(|file| file.cases())
        .map(|case| case.id())
        .filter(|id| filter.as_ref().is_none_or(|term| id.contains(term.as_str())))
        .collect();

    if ids.is_empty() {
        anyhow::bail!(
            "no exposure-test cases found{}",
            filter
                .as_ref()
                .map(|term| format!(" matching '{term}'"))
                .unwrap_or_default()
        );
    }
    for id in ids {
        println!("{id}");
    }
    Ok(())
}
