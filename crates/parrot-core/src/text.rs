//! Text normalization applied before speech and before fingerprinting.
//!
//! Both the speech path and the de-duplication record go through
//! [`normalize_for_speech`], so two replies that would sound the same
//! produce the same fingerprint.

use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::LazyLock;

/// Markdown rewrite rules, applied in order.
const MARKUP_RULES: &[(&str, &str)] = &[
    // Fenced code blocks are never read aloud
    (r"(?s)```.*?```", " "),
    (r"(?s)~~~.*?~~~", " "),
    (r"!\[([^\]]*)\]\([^)]*\)", "${1}"),
    (r"\[([^\]]+)\]\([^)]*\)", "${1}"),
    (r"`([^`]*)`", "${1}"),
    (r"</?[A-Za-z][^>]*>", ""),
    (r"(?m)^[ \t]{0,3}#{1,6}[ \t]+", ""),
    (r"(?m)^[ \t]*>[ \t]?", ""),
    (r"(?m)^[ \t]*(?:[-*+]|\d+\.)[ \t]+", ""),
    (r"(?m)^[ \t]*(?:-{3,}|\*{3,}|_{3,})[ \t]*$", ""),
    (r"__([^_\n]+)__", "${1}"),
    // Emphasis only when the markers hug the text, so `2 * 3` survives
    (r"\*\*([^*\s](?:[^*\n]*[^*\s])?)\*\*", "${1}"),
    (r"\*([^*\s](?:[^*\n]*[^*\s])?)\*", "${1}"),
    (r"~~([^~\n]+)~~", "${1}"),
];

static MARKUP: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    MARKUP_RULES
        .iter()
        .filter_map(|(pattern, replacement)| {
            Regex::new(pattern).ok().map(|re| (re, *replacement))
        })
        .collect()
});

/// Strips markdown markup and collapses whitespace.
///
/// Line structure is kept (reading mode `short` needs the first line), but
/// every line is trimmed, inner runs of blanks become one space and empty
/// lines are dropped.
pub fn normalize_for_speech(text: &str) -> String {
    let mut stripped = text.replace("\r\n", "\n");
    for (re, replacement) in MARKUP.iter() {
        stripped = re.replace_all(&stripped, *replacement).into_owned();
    }

    stripped
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// SHA-256 hex digest of the normalized text.
pub fn fingerprint(text: &str) -> String {
    let normalized = normalize_for_speech(text);
    format!("{:x}", Sha256::digest(normalized.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_rules_compile() {
        assert_eq!(MARKUP.len(), MARKUP_RULES.len());
    }

    #[test]
    fn test_strips_emphasis_and_headings() {
        assert_eq!(normalize_for_speech("## Summary\n**Done.**"), "Summary\nDone.");
    }

    #[test]
    fn test_drops_code_fences_and_unwraps_inline_code() {
        let text = "Run `cargo fmt` first.\n```rust\nfn main() {}\n```\nThen commit.";
        assert_eq!(normalize_for_speech(text), "Run cargo fmt first.\nThen commit.");
    }

    #[test]
    fn test_links_become_labels() {
        assert_eq!(
            normalize_for_speech("See [the docs](https://example.com/x) now"),
            "See the docs now"
        );
    }

    #[test]
    fn test_list_markers_and_quotes() {
        assert_eq!(
            normalize_for_speech("- one\n* two\n1. three\n> quoted"),
            "one\ntwo\nthree\nquoted"
        );
    }

    #[test]
    fn test_collapses_whitespace_and_blank_lines() {
        assert_eq!(normalize_for_speech("  a   b \n\n\t c  "), "a b\nc");
    }

    #[test]
    fn test_bare_asterisks_survive() {
        assert_eq!(normalize_for_speech("2 * 3 = 6"), "2 * 3 = 6");
        assert_eq!(normalize_for_speech("a * b * c"), "a * b * c");
        assert_eq!(
            normalize_for_speech("*really* ~~not~~ **bold**"),
            "really not bold"
        );
    }

    #[test]
    fn test_snake_case_survives() {
        assert_eq!(normalize_for_speech("call read_file now"), "call read_file now");
    }

    #[test]
    fn test_fingerprint_ignores_markup_and_padding() {
        assert_eq!(fingerprint("**Done.**  "), fingerprint("Done."));
        assert_ne!(fingerprint("Done."), fingerprint("Done!"));
        assert_eq!(fingerprint("x").len(), 64);
    }
}
