//! Types produced by title discernment.

use crate::config::{MediaType, NamingRule};
use crate::source::FileDescriptor;

/// Fields a naming rule extracted from a filename.
///
/// Empty captures are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleCaptures {
    pub title: Option<String>,
    pub nonengtitle: Option<String>,
    pub subtitle: Option<String>,
    pub year: Option<String>,
}

/// Where a candidate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateOrigin<'a> {
    /// The rule's pattern matched the filename.
    Matched(&'a NamingRule),
    /// The rule applied to the media type but its pattern did not match.
    Unmatched(&'a NamingRule),
    /// No rule matched; the title is the bare file stem.
    Fallback,
}

/// One interpretation of a filename.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedIdentity<'a> {
    pub title: Option<String>,
    pub nonengtitle: Option<String>,
    pub subtitle: Option<String>,
    pub year: Option<String>,
    pub media_type: MediaType,
    pub file: &'a FileDescriptor,
    pub origin: CandidateOrigin<'a>,
    /// Position of the producing rule in the evaluated rule list.
    pub order: usize,
}

impl<'a> ParsedIdentity<'a> {
    pub(crate) fn matched(
        file: &'a FileDescriptor,
        rule: &'a NamingRule,
        media_type: MediaType,
        captures: TitleCaptures,
    ) -> Self {
        Self {
            title: captures.title,
            nonengtitle: captures.nonengtitle,
            subtitle: captures.subtitle,
            year: captures.year,
            media_type,
            file,
            origin: CandidateOrigin::Matched(rule),
            order: 0,
        }
    }

    pub(crate) fn unmatched(
        file: &'a FileDescriptor,
        rule: &'a NamingRule,
        media_type: MediaType,
    ) -> Self {
        Self {
            title: None,
            nonengtitle: None,
            subtitle: None,
            year: None,
            media_type,
            file,
            origin: CandidateOrigin::Unmatched(rule),
            order: 0,
        }
    }

    pub(crate) fn fallback(file: &'a FileDescriptor, media_type: MediaType) -> Self {
        Self {
            title: Some(super::strip_extension(&file.filename).to_string()),
            nonengtitle: None,
            subtitle: None,
            year: None,
            media_type,
            file,
            origin: CandidateOrigin::Fallback,
            order: 0,
        }
    }

    /// Whether a rule's pattern actually matched.
    pub fn is_match(&self) -> bool {
        matches!(self.origin, CandidateOrigin::Matched(_))
    }

    /// The rule that produced this candidate, absent for the fallback.
    pub fn rule(&self) -> Option<&'a NamingRule> {
        match self.origin {
            CandidateOrigin::Matched(rule) | CandidateOrigin::Unmatched(rule) => Some(rule),
            CandidateOrigin::Fallback => None,
        }
    }

    /// Ranking tier: title and year, title only, neither.
    pub(crate) fn tier(&self) -> u8 {
        match (&self.title, &self.year) {
            (Some(_), Some(_)) => 0,
            (Some(_), None) => 1,
            _ => 2,
        }
    }
}
