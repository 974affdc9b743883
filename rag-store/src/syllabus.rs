//! Syllabus-specific metadata: section kinds, section headers and subject info.
//!
//! Everything here is heuristic and best-effort; a chunk that matches nothing
//! is simply `general` with no subject info.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::normalize::{is_table_line, static_regex};

/// Coarse kind of content a chunk holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Table,
    CourseHeader,
    Syllabus,
    Objectives,
    References,
    Evaluation,
    Prerequisites,
    Schedule,
    CreditsInfo,
    General,
}

impl SectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::Table => "table",
            SectionKind::CourseHeader => "course_header",
            SectionKind::Syllabus => "syllabus",
            SectionKind::Objectives => "objectives",
            SectionKind::References => "references",
            SectionKind::Evaluation => "evaluation",
            SectionKind::Prerequisites => "prerequisites",
            SectionKind::Schedule => "schedule",
            SectionKind::CreditsInfo => "credits_info",
            SectionKind::General => "general",
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static DATE_LIKE: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"[0-9]{1,2}\s+[A-Z][a-z]+\s+[0-9]{4}"));
static CREDITS_OR_HOURS: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"credits?|hrs?\.|hours\s+per\s+week"));

/// Keyword groups checked in order; the first hit wins.
const KEYWORD_KINDS: &[(SectionKind, &[&str])] = &[
    (
        SectionKind::CourseHeader,
        &["course code", "course name", "credits", "core course", "f.y.", "s.y.", "t.y."],
    ),
    (
        SectionKind::Syllabus,
        &["syllabus", "course content", "topics covered", "module"],
    ),
    (
        SectionKind::Objectives,
        &["learning objectives", "course objectives", "outcomes", "learning outcomes"],
    ),
    (
        SectionKind::References,
        &["textbook", "reference", "recommended", "book", "publication"],
    ),
    (
        SectionKind::Evaluation,
        &["evaluation", "marks", "assessment", "grading", "weightage", "internal", "end term"],
    ),
    (
        SectionKind::Prerequisites,
        &["prerequisite", "prior knowledge", "pre-requisite"],
    ),
];

/// Classifies a chunk of syllabus text.
pub fn detect_section_type(text: &str) -> SectionKind {
    if text.lines().any(is_table_line) || text.matches('\t').count() > 3 {
        return SectionKind::Table;
    }

    let lower = text.to_lowercase();
    for (kind, words) in KEYWORD_KINDS {
        if words.iter().any(|w| lower.contains(w)) {
            return *kind;
        }
    }

    if DATE_LIKE.is_match(text) {
        return SectionKind::Schedule;
    }
    if CREDITS_OR_HOURS.is_match(&lower) {
        return SectionKind::CreditsInfo;
    }
    SectionKind::General
}

static COURSE_CODE: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"\b([A-Z]{2,4}\s*-?\s*\d{3,4})\b"));
static COURSE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(r"(?im)(?:Course|Subject)?[ \t]*(?:Title|Name)[: \t]+([^\n]+?)[ \t]*$")
});
static CREDITS: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"(?i)\bCredits?\s*[:=]?\s*(\d+(?:\.\d)?)"));
static SEMESTER: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"(?i)\b(?:Sem|Semester)\b\.?\s*[:=-]?\s*([IVX]+|[1-8])\b"));
static TEACHING_HOURS: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"(?i)(\d+)\s*(?:hrs?|hours)\s*/\s*(?:week|wk)"));
static COURSE_TYPE: LazyLock<Regex> =
    LazyLock::new(|| static_regex(r"(?im)\b(?:Course\s+)?Type[: \t]+([^\n]+?)[ \t]*$"));

/// Course facts found in a piece of syllabus text.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectInfo {
    pub course_code: Option<String>,
    pub course_name: Option<String>,
    pub credits: Option<String>,
    /// Lowercased, e.g. `iii` or `5`.
    pub semester: Option<String>,
    pub teaching_hours: Option<String>,
    pub course_type: Option<String>,
}

impl SubjectInfo {
    pub fn extract(text: &str) -> Self {
        let first = |re: &Regex| {
            re.captures(text)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string())
                .filter(|s| !s.is_empty())
        };
        Self {
            course_code: first(&COURSE_CODE),
            course_name: first(&COURSE_NAME),
            credits: first(&CREDITS),
            semester: first(&SEMESTER).map(|s| s.to_lowercase()),
            teaching_hours: first(&TEACHING_HOURS),
            course_type: first(&COURSE_TYPE),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_map().is_empty()
    }

    /// Present fields keyed by name, for storage as flat metadata.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        [
            ("course_code", &self.course_code),
            ("course_name", &self.course_name),
            ("credits", &self.credits),
            ("semester", &self.semester),
            ("teaching_hours", &self.teaching_hours),
            ("course_type", &self.course_type),
        ]
        .into_iter()
        .filter_map(|(k, v)| v.as_ref().map(|v| (k.to_string(), v.clone())))
        .collect()
    }
}

static SECTION_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    static_regex(
        r"^(?:[A-Z][.)]|[IVX]+[.)]|\d+[.)]|SEM-[IVX]+|MODULE\s+\d+)\s+\S.*",
    )
});

const MAX_HEADER_CHARS: usize = 120;

/// Header lines of a document with their char offsets.
#[derive(Clone, Debug, Default)]
pub struct SectionIndex {
    headers: Vec<(usize, String)>,
}

impl SectionIndex {
    pub fn build(text: &str) -> Self {
        let mut headers = Vec::new();
        let mut offset = 0usize;
        for line in text.split('\n') {
            let trimmed = line.trim();
            if SECTION_HEADER.is_match(trimmed) {
                headers.push((offset, trimmed.chars().take(MAX_HEADER_CHARS).collect()));
            }
            offset += line.chars().count() + 1;
        }
        Self { headers }
    }

    /// Nearest header at or before `char_pos`, `"general"` if none.
    pub fn header_at(&self, char_pos: usize) -> &str {
        let i = self.headers.partition_point(|(off, _)| *off <= char_pos);
        match i {
            0 => "general",
            i => &self.headers[i - 1].1,
        }
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}
