//! Text cleanup applied to extracted documents before chunking, plus the
//! value normalization shared by metadata storage and filtering.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

/// Compiles a pattern known at build time.
pub(crate) fn static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static regex must compile")
}

/// A line holding nothing but a page number: `12`, `- 3 -`, `Page 5`.
static PAGE_NUMBER_LINE: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"(?i)^\s*(?:[-–]?\s*\d+\s*[-–]?|page\s+\d+)\s*$"));

static BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| static_regex(r"\n[ \t]*\n(?:[ \t]*\n)+"));

static INLINE_SPACE: LazyLock<Regex> = LazyLock::new(|| static_regex(r"[ \t]+"));

const TABLE_MARKERS: &[char] = &['|', '─', '│', '┌', '┐', '└', '┘'];

/// True for lines that belong to a rendered table and must keep their layout.
pub fn is_table_line(line: &str) -> bool {
    line.contains(TABLE_MARKERS)
}

/// Cleans extracted syllabus text.
///
/// - Drops page-number lines.
/// - Collapses three or more line breaks (blank lines in between) to one blank line.
/// - Collapses spaces/tabs and trims each line, except table rows.
/// - Trims the result.
pub fn clean_text(raw: &str) -> String {
    let without_pages: Vec<&str> = raw
        .lines()
        .map(|l| if PAGE_NUMBER_LINE.is_match(l) { "" } else { l })
        .collect();
    let joined = without_pages.join("\n");
    let collapsed = BLANK_RUN.replace_all(&joined, "\n\n");

    let mut out = String::with_capacity(collapsed.len());
    for (i, line) in collapsed.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        if is_table_line(line) {
            out.push_str(line);
        } else {
            out.push_str(INLINE_SPACE.replace_all(line, " ").trim());
        }
    }

    let cleaned = out.trim().to_string();
    debug!(
        raw_chars = raw.chars().count(),
        clean_chars = cleaned.chars().count(),
        "clean_text"
    );
    cleaned
}

/// Canonical form of a metadata value: trimmed, inner whitespace collapsed, lowercase.
///
/// Applied when metadata is stored and when a filter is built, so `"CS "`,
/// `"cs"` and `" Cs"` all match.
pub fn normalize_value(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
