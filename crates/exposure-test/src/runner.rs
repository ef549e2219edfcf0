use std::fmt::Write as _;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use similar::{ChangeTag, TextDiff};
use tempfile::TempDir;

use exposure_core::{
    Components, JsonInventoryProvider, SnapshotProvider, SnapshotRequest, detect_external_ranges,
    find_token_collisions,
};
use exposure_mermaid::{generate_report, render_load_balancer_view};

use crate::corpus::{Corpus, CorpusCase, CorpusFile};

/// Name of the inventory file every case must declare.
pub const INVENTORY_FILE: &str = "inventory.json";

#[derive(Debug, Clone, Default)]
pub struct RunnerConfig {
    pub filter: Option<String>,
    pub update: bool,
    /// Keep the materialized case directories for inspection.
    pub keep_temps: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseStatus {
    Passed,
    Failed,
    Updated,
    NoExpectations,
}

#[derive(Debug, Clone)]
pub struct CaseOutcome {
    pub id: String,
    pub status: CaseStatus,
    pub message: Option<String>,
}

/// Per-case arguments, written after `args:` in the corpus file.
#[derive(Parser, Debug)]
#[command(no_binary_name = true)]
struct CaseArgs {
    #[arg(long, default_value = "default")]
    profile: String,
    #[arg(long, default_value = "us-east-1")]
    region: String,
    #[arg(long = "vpc-id")]
    vpc_id: Option<String>,
    /// Focus of the `load-balancer` expectation
    #[arg(long = "load-balancer")]
    load_balancer: Option<String>,
}

/// What a case produced, ready to be rendered per expectation kind.
struct CaseSummary {
    components: Components,
    load_balancer: Option<String>,
}

pub fn run_cases(corpus: &mut Corpus, config: RunnerConfig) -> Result<Vec<CaseOutcome>> {
    let mut outcomes = Vec::new();
    let mut matched = 0usize;

    for file in corpus.files_mut() {
        outcomes.extend(run_cases_in_file(
            file,
            config.update,
            config.filter.as_deref(),
            &mut matched,
            config.keep_temps,
        )?);
    }

    if matched == 0 {
        return Err(anyhow!(
            "no exposure-test cases matched filter {:?}",
            config.filter
        ));
    }

    Ok(outcomes)
}

pub fn run_cases_for_file(file: &mut CorpusFile, update: bool) -> Result<Vec<CaseOutcome>> {
    let mut matched = 0usize;
    run_cases_in_file(file, update, None, &mut matched, false)
}

fn run_cases_in_file(
    file: &mut CorpusFile,
    update: bool,
    filter: Option<&str>,
    matched: &mut usize,
    keep_temps: bool,
) -> Result<Vec<CaseOutcome>> {
    let mut file_outcomes = Vec::new();
    let mut mutated_file = false;

    for case in file.cases.iter_mut() {
        if filter.is_some_and(|term| !case.id().contains(term)) {
            continue;
        }

        *matched += 1;
        print!("  {} ... ", case.id());
        let _ = std::io::stdout().flush();

        let (outcome, mutated) = evaluate_case(case, update, keep_temps)?;

        match outcome.status {
            CaseStatus::Passed => println!("ok"),
            CaseStatus::Updated => println!("updated"),
            CaseStatus::Failed => {
                println!("FAILED");
                if let Some(message) = &outcome.message {
                    for line in message.lines() {
                        println!("        {line}");
                    }
                }
            }
            CaseStatus::NoExpectations => println!("skipped (no expectations)"),
        }

        mutated_file |= mutated;
        file_outcomes.push(outcome);
    }

    if mutated_file {
        file.mark_dirty();
    }
    Ok(file_outcomes)
}

fn evaluate_case(
    case: &mut CorpusCase,
    update: bool,
    keep_temps: bool,
) -> Result<(CaseOutcome, bool)> {
    let case_id = case.id();

    if case.expectations.is_empty() {
        return Ok((
            CaseOutcome {
                id: case_id,
                status: CaseStatus::NoExpectations,
                message: Some("no expectation blocks declared".to_string()),
            },
            false,
        ));
    }

    let summary = build_case_summary(case, keep_temps)?;
    let mut mutated = false;
    let mut status = CaseStatus::Passed;
    let mut failures = Vec::new();

    for expect in &mut case.expectations {
        let actual = render_expectation(&expect.kind, &summary, &case_id)?;
        let expected_norm = normalize(&expect.value);
        let actual_norm = normalize(&actual);

        if expected_norm == actual_norm {
            continue;
        }

        if update {
            expect.value = ensure_trailing_newline(actual);
            mutated = true;
            status = CaseStatus::Updated;
        } else {
            status = CaseStatus::Failed;
            failures.push(format_expectation_diff(
                &expect.kind,
                &expected_norm,
                &actual_norm,
            ));
        }
    }

    let message = (!failures.is_empty()).then(|| failures.join("\n"));
    Ok((
        CaseOutcome {
            id: case_id,
            status,
            message,
        },
        mutated,
    ))
}

/// Materialize the case, then load its snapshot through the file provider.
fn build_case_summary(case: &CorpusCase, keep_temps: bool) -> Result<CaseSummary> {
    let args = CaseArgs::try_parse_from(&case.args)
        .map_err(|err| anyhow!("invalid args for {}: {}", case.id(), err))?;

    if case.file(INVENTORY_FILE).is_none() {
        return Err(anyhow!(
            "case {} does not declare --- file: {} ---",
            case.id(),
            INVENTORY_FILE
        ));
    }

    let materialized = materialize_case(case, keep_temps)?;
    if materialized.is_persistent() {
        println!("(kept {}) ", materialized.root().display());
    }

    let request = SnapshotRequest::new(args.profile, args.region).with_vpc_id(args.vpc_id);
    let components = JsonInventoryProvider::new(materialized.root().join(INVENTORY_FILE))
        .fetch(&request)
        .with_context(|| format!("failed to load snapshot for {}", case.id()))?;

    Ok(CaseSummary {
        components,
        load_balancer: args.load_balancer,
    })
}

fn render_expectation(kind: &str, summary: &CaseSummary, case_id: &str) -> Result<String> {
    let components = &summary.components;
    match kind {
        "report" => Ok(generate_report(components)),
        "load-balancer" => {
            let focus = summary
                .load_balancer
                .as_deref()
                .map(|name| {
                    components.load_balancer_by_name(name).ok_or_else(|| {
                        anyhow!("case {case_id} focuses on unknown load balancer '{name}'")
                    })
                })
                .transpose()?;
            Ok(render_load_balancer_view(components, focus))
        }
        "ranges" => Ok(render_ranges(components)),
        "collisions" => Ok(render_collisions(components)),
        other => Err(anyhow!(
            "case {case_id} uses unsupported expectation '{other}'"
        )),
    }
}

fn render_ranges(components: &Components) -> String {
    let ranges = detect_external_ranges(components);
    if ranges.is_empty() {
        return "none\n".to_string();
    }
    let mut buf = String::new();
    for range in ranges {
        let _ = writeln!(buf, "{range}");
    }
    buf
}

fn render_collisions(components: &Components) -> String {
    let collisions = find_token_collisions(components);
    if collisions.is_empty() {
        return "none\n".to_string();
    }
    let mut buf = String::new();
    for collision in collisions {
        let identifiers: Vec<String> = collision
            .identifiers
            .iter()
            .map(|(kind, ident)| format!("{kind} {ident}"))
            .collect();
        let _ = writeln!(buf, "{}: {}", collision.token, identifiers.join(", "));
    }
    buf
}

fn format_expectation_diff(kind: &str, expected: &str, actual: &str) -> String {
    let diff = TextDiff::from_lines(expected, actual);
    let mut buf = String::new();
    let _ = writeln!(buf, "Expectation '{kind}' mismatch:");
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => "-",
            ChangeTag::Insert => "+",
            ChangeTag::Equal => " ",
        };
        let _ = write!(buf, "{sign}{change}");
        if change.missing_newline() {
            buf.push('\n');
        }
    }
    buf
}

fn normalize(text: &str) -> String {
    text.replace("\r\n", "\n").trim_end_matches('\n').to_string()
}

fn ensure_trailing_newline(mut text: String) -> String {
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text
}

struct MaterializedCase {
    // Dropping it deletes the directory.
    temp_dir: Option<TempDir>,
    root_path: PathBuf,
}

impl MaterializedCase {
    fn root(&self) -> &Path {
        &self.root_path
    }

    fn is_persistent(&self) -> bool {
        self.temp_dir.is_none()
    }
}

fn materialize_case(case: &CorpusCase, keep_temps: bool) -> Result<MaterializedCase> {
    let temp_dir = tempfile::tempdir().context("failed to create temp dir for exposure-test")?;
    let root_path = temp_dir.path().to_path_buf();

    for file in &case.files {
        let abs_path = root_path.join(&file.path);
        if let Some(parent) = abs_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(&abs_path, file.contents.as_bytes()).with_context(|| {
            format!(
                "failed to write virtual file {} for {}",
                abs_path.display(),
                case.id()
            )
        })?;
    }

    if keep_temps {
        let preserved = temp_dir.keep();
        return Ok(MaterializedCase {
            temp_dir: None,
            root_path: preserved,
        });
    }

    Ok(MaterializedCase {
        temp_dir: Some(temp_dir),
        root_path,
    })
}
