//! Single-rule matching.

use regex_lite::Regex;
use tracing::{debug, warn};

use super::strip_extension;
use super::types::{ParsedIdentity, TitleCaptures};
use crate::config::{MediaType, NamingRule};
use crate::source::FileDescriptor;

/// A naming rule with its pattern compiled once.
///
/// A pattern that fails to compile leaves the rule in place but it never
/// matches.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub rule: NamingRule,
    regex: Option<Regex>,
}

impl CompiledRule {
    pub fn compile(rule: NamingRule) -> Self {
        let regex = match Regex::new(&rule.regex) {
            Ok(regex) => Some(regex),
            Err(e) => {
                warn!("Naming rule '{}' has an invalid pattern: {}", rule.name, e);
                None
            }
        };
        Self { rule, regex }
    }

    pub fn compile_all(rules: impl IntoIterator<Item = NamingRule>) -> Vec<Self> {
        rules.into_iter().map(Self::compile).collect()
    }

    pub fn is_valid(&self) -> bool {
        self.regex.is_some()
    }

    /// Run the pattern against an extension-stripped filename.
    ///
    /// Returns `None` when the pattern is invalid or does not match.
    pub fn captures(&self, stem: &str) -> Option<TitleCaptures> {
        let caps = self.regex.as_ref()?.captures(stem)?;
        let group = |name: &str| {
            caps.name(name)
                .map(|m| m.as_str())
                .filter(|s| !s.is_empty())
        };

        Some(TitleCaptures {
            title: group("title").map(dots_to_spaces),
            nonengtitle: group("nonengtitle").map(dots_to_spaces),
            subtitle: group("subtitle").map(String::from),
            year: group("year").map(String::from),
        })
    }
}

fn dots_to_spaces(value: &str) -> String {
    value.replace('.', " ")
}

/// Evaluate one rule against one file.
///
/// `None` when the rule does not support `media_type` or its pattern is
/// invalid. A valid pattern that does not match still yields a candidate,
/// tagged as unmatched.
pub fn match_rule<'a>(
    file: &'a FileDescriptor,
    rule: &'a CompiledRule,
    media_type: MediaType,
) -> Option<ParsedIdentity<'a>> {
    if !rule.rule.supports(media_type) {
        debug!(
            "Rule '{}' does not support media type {}",
            rule.rule.name, media_type
        );
        return None;
    }
    if !rule.is_valid() {
        return None;
    }

    let stem = strip_extension(&file.filename);
    debug!("Matching '{}' against rule '{}'", stem, rule.rule.name);

    match rule.captures(stem) {
        Some(captures) => Some(ParsedIdentity::matched(file, &rule.rule, media_type, captures)),
        None => {
            debug!("'{}' does not match rule '{}'", stem, rule.rule.name);
            Some(ParsedIdentity::unmatched(file, &rule.rule, media_type))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discern::CandidateOrigin;
    use crate::testing::fixtures;

    const TITLE_YEAR: &str = r"(?<title>.+?)\.(?<year>19[0-9]{2}|20[0-2][0-9]|2030)\..*";

    #[test]
    fn test_title_year_scene_name() {
        let file = fixtures::file("Inception.2010.1080p.BluRay.x264-Group.mkv");
        let rule = CompiledRule::compile(fixtures::rule("title_year", TITLE_YEAR, &[MediaType::Movie]));

        let parsed = match_rule(&file, &rule, MediaType::Movie).unwrap();
        assert!(parsed.is_match());
        assert_eq!(parsed.title.as_deref(), Some("Inception"));
        assert_eq!(parsed.year.as_deref(), Some("2010"));
        assert_eq!(parsed.rule().unwrap().name, "title_year");
    }

    #[test]
    fn test_dots_in_title_become_spaces() {
        let file = fixtures::file("The.Dark.Knight.2008.720p.mkv");
        let rule = CompiledRule::compile(fixtures::rule("title_year", TITLE_YEAR, &[MediaType::Movie]));

        let parsed = match_rule(&file, &rule, MediaType::Movie).unwrap();
        assert_eq!(parsed.title.as_deref(), Some("The Dark Knight"));
    }

    #[test]
    fn test_nonengtitle_and_subtitle() {
        let file = fixtures::file(
            "Assassins.1995.刺客战场.双语字幕.HR-HDTV.AC3.1024x576.x264-人人影视制作.mkv",
        );
        let rule = CompiledRule::compile(fixtures::rule(
            "bilingual",
            r"(?<title>[\w.]+)\.(?<year>19[0-9]{2}|20[0-2][0-9]|2030)\.(?<nonengtitle>[一-龥]+)\.(?<subtitle>[一-龥]{2}字幕)\..*",
            &[MediaType::Movie],
        ));

        let parsed = match_rule(&file, &rule, MediaType::Movie).unwrap();
        assert!(parsed.is_match());
        assert_eq!(parsed.title.as_deref(), Some("Assassins"));
        assert_eq!(parsed.year.as_deref(), Some("1995"));
        assert_eq!(parsed.nonengtitle.as_deref(), Some("刺客战场"));
        assert_eq!(parsed.subtitle.as_deref(), Some("双语字幕"));
    }

    #[test]
    fn test_unsupported_media_type_short_circuits() {
        let file = fixtures::file("Inception.2010.1080p.mkv");
        let rule = CompiledRule::compile(fixtures::rule("tv_only", TITLE_YEAR, &[MediaType::TvShow]));

        for media_type in [MediaType::Movie, MediaType::Album, MediaType::EpisodeDetails] {
            assert!(match_rule(&file, &rule, media_type).is_none());
        }
        assert!(match_rule(&file, &rule, MediaType::TvShow).is_some());
    }

    #[test]
    fn test_invalid_pattern_never_matches() {
        let file = fixtures::file("Inception.2010.mkv");
        let rule = CompiledRule::compile(fixtures::rule("broken", r"(?<title>.+", &[MediaType::Movie]));

        assert!(!rule.is_valid());
        assert!(match_rule(&file, &rule, MediaType::Movie).is_none());
    }

    #[test]
    fn test_non_match_is_tagged_with_rule() {
        let file = fixtures::file("home_video.mp4");
        let rule = CompiledRule::compile(fixtures::rule("title_year", TITLE_YEAR, &[MediaType::Movie]));

        let parsed = match_rule(&file, &rule, MediaType::Movie).unwrap();
        assert!(!parsed.is_match());
        assert!(parsed.title.is_none());
        assert!(parsed.year.is_none());
        assert!(matches!(parsed.origin, CandidateOrigin::Unmatched(r) if r.name == "title_year"));
        assert_eq!(parsed.media_type, MediaType::Movie);
    }

    #[test]
    fn test_extension_is_stripped_before_matching() {
        // Anchored on the end: only matches when ".mkv" is gone.
        let file = fixtures::file("Heat.1995.mkv");
        let rule = CompiledRule::compile(fixtures::rule(
            "anchored",
            r"^(?<title>[A-Za-z.]+)\.(?<year>\d{4})$",
            &[MediaType::Movie],
        ));

        let parsed = match_rule(&file, &rule, MediaType::Movie).unwrap();
        assert!(parsed.is_match());
        assert_eq!(parsed.year.as_deref(), Some("1995"));
    }

    #[test]
    fn test_empty_capture_is_absent() {
        let rule = CompiledRule::compile(fixtures::rule(
            "optional_year",
            r"^(?<title>[A-Za-z]+)(?<year>\d*)$",
            &[MediaType::Movie],
        ));
        let caps = rule.captures("Heat").unwrap();
        assert_eq!(caps.title.as_deref(), Some("Heat"));
        assert!(caps.year.is_none());
    }
}
