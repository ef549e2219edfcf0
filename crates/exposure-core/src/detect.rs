//! External-exposure detection.
//!
//! A range counts as external when it is one of the anywhere ranges or when
//! it *contains* `/32` or `/128`, so `10.0.0.32/320` qualifies too. The
//! per-range builder requires an exact source match, so a range found here
//! can still render as "no exposure".

use std::collections::BTreeSet;

use tracing::debug;

use crate::model::{Components, is_anywhere, is_security_group_reference};

/// True when a rule source qualifies as an external range.
pub fn is_external_source(source: &str) -> bool {
    if is_security_group_reference(source) {
        return false;
    }
    is_anywhere(source) || source.contains("/32") || source.contains("/128")
}

/// Collect every external range mentioned by any rule, in either direction.
///
/// Returned sorted so callers iterate deterministically.
pub fn detect_external_ranges(components: &Components) -> BTreeSet<String> {
    let ranges: BTreeSet<String> = components
        .security_groups
        .iter()
        .flat_map(|sg| sg.rules.iter())
        .filter(|rule| is_external_source(&rule.source))
        .map(|rule| rule.source.clone())
        .collect();

    debug!(count = ranges.len(), "detected external ranges");
    ranges
}
