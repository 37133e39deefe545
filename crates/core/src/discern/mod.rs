//! Title discernment.
//!
//! Runs a filename through an ordered list of naming rules and ranks the
//! resulting interpretations so callers can try them best-first:
//!
//! 1. Candidates with both a title and a year, in rule order
//! 2. Candidates with only a title, in rule order
//! 3. Everything else, in rule order
//!
//! When no rule matches, a single fallback candidate carrying the bare file
//! stem is returned, so the ranked list is never empty.

mod rule;
mod types;

pub use rule::{match_rule, CompiledRule};
pub use types::{CandidateOrigin, ParsedIdentity, TitleCaptures};

use crate::config::MediaType;
use crate::source::FileDescriptor;

/// Filename without its last extension. Names without a dot, or whose only
/// dot is the leading one, are returned unchanged.
pub fn strip_extension(filename: &str) -> &str {
    match filename.rfind('.') {
        Some(idx) if idx > 0 => &filename[..idx],
        _ => filename,
    }
}

/// Evaluate every rule against a file and rank the results.
pub fn discern<'a>(
    file: &'a FileDescriptor,
    rules: &'a [CompiledRule],
    media_type: MediaType,
) -> Vec<ParsedIdentity<'a>> {
    let mut results: Vec<ParsedIdentity<'a>> = rules
        .iter()
        .enumerate()
        .filter_map(|(order, rule)| {
            match_rule(file, rule, media_type).map(|mut parsed| {
                parsed.order = order;
                parsed
            })
        })
        .collect();

    if !results.iter().any(|parsed| parsed.is_match()) {
        results.push(ParsedIdentity::fallback(file, media_type));
    }

    // Stable: equal keys keep rule order.
    results.sort_by_key(|parsed| (parsed.tier(), parsed.order));
    results
}
