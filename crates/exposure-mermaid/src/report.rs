//! Report composition and section splitting.

use std::fmt::Write;

use rayon::prelude::*;
use tracing::{debug, info};

use exposure_core::{
    Components, LoadBalancer, build_load_balancer_subgraph, build_subgraph, detect_external_ranges,
};

use crate::render::render;

/// Whole-report output when no external range exists.
pub const NO_EXPOSURES: &str = "No external CIDR exposures found.";

/// Title prefix of every attack-surface section.
pub const SECTION_TITLE_PREFIX: &str = "Attack Surface: ";

const DELIMITER: &str = "===";

/// `=== Attack Surface: {range} ===`
pub fn section_header(range: &str) -> String {
    format!("{DELIMITER} {SECTION_TITLE_PREFIX}{range} {DELIMITER}")
}

/// Render one external range as a complete report section.
pub fn render_section(components: &Components, range: &str) -> String {
    let body = render(&build_subgraph(components, range));
    let mut section = String::with_capacity(body.len() + range.len() + 32);
    let _ = writeln!(section, "{}", section_header(range));
    section.push('\n');
    section.push_str(&body);
    section.push('\n');
    section
}

/// Compose the attack-surface report: one section per external range, in
/// lexicographic range order.
///
/// Sections are rendered in parallel and joined in order, so the text is the
/// same as a sequential run.
pub fn generate_report(components: &Components) -> String {
    let ranges: Vec<String> = detect_external_ranges(components).into_iter().collect();
    if ranges.is_empty() {
        info!("no external ranges, nothing to render");
        return NO_EXPOSURES.to_string();
    }

    let sections: Vec<String> = ranges
        .par_iter()
        .map(|range| render_section(components, range))
        .collect();

    info!(sections = sections.len(), "composed attack-surface report");
    sections.concat()
}

/// Render the load-balancer view, focused on `focus` or covering everything.
pub fn render_load_balancer_view(components: &Components, focus: Option<&LoadBalancer>) -> String {
    let graph = build_load_balancer_subgraph(components, focus);
    debug!(
        focus = focus.map(|lb| lb.name.as_str()).unwrap_or("<all>"),
        "rendering load-balancer view"
    );
    render(&graph)
}

/// One `(title, body)` pair recovered from a composed report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSection {
    /// Header text without the `===` markers, e.g. `Attack Surface: 0.0.0.0/0`.
    pub title: String,
    /// Non-blank lines up to the next header, joined with `\n`.
    pub body: String,
}

impl ReportSection {
    /// The range named by an attack-surface title.
    pub fn range(&self) -> Option<&str> {
        self.title.strip_prefix(SECTION_TITLE_PREFIX)
    }
}

fn header_title(line: &str) -> Option<&str> {
    let trimmed = line.trim_end();
    let inner = trimmed
        .strip_prefix("=== ")?
        .strip_suffix(" ===")?;
    Some(inner.trim())
}

/// Split composed text back into sections.
///
/// Headers are lines starting with `=== ` and ending with ` ===`. Text
/// before the first header, and text with no header at all, is ignored.
pub fn split_sections(text: &str) -> Vec<ReportSection> {
    let mut sections = Vec::new();
    let mut current: Option<(String, Vec<&str>)> = None;

    for line in text.lines() {
        if let Some(title) = header_title(line) {
            if let Some((title, body)) = current.take() {
                sections.push(finish_section(title, body));
            }
            current = Some((title.to_string(), Vec::new()));
        } else if let Some((_, body)) = current.as_mut() {
            if !line.trim().is_empty() {
                body.push(line);
            }
        }
    }

    if let Some((title, body)) = current {
        sections.push(finish_section(title, body));
    }
    sections
}

fn finish_section(title: String, body: Vec<&str>) -> ReportSection {
    ReportSection {
        title,
        body: body.join("\n").trim().to_string(),
    }
}
