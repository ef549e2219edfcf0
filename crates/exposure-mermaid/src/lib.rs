//! Mermaid output for exposure diagrams.
//!
//! Turns the format-agnostic [`Subgraph`](exposure_core::Subgraph) built by
//! `exposure-core` into Mermaid flowchart text, and composes the per-range
//! sections into the full attack-surface report.
//!
//! # Module Structure
//!
//! - [`mermaid`]: statement-level builder and escaping helpers
//! - [`render`]: subgraph serialization
//! - [`report`]: report composition and section splitting

pub mod mermaid;
pub mod render;
pub mod report;

pub use mermaid::MermaidBuilder;
pub use render::render;
pub use report::{
    NO_EXPOSURES, ReportSection, SECTION_TITLE_PREFIX, generate_report, render_load_balancer_view,
    render_section, section_header, split_sections,
};
