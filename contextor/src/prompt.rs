//! Prompt builder: strict system message + budgeted context block.

use rag_store::RetrievalMatch;

/// System instructions for syllabus answers.
pub const SYSTEM_PROMPT: &str = "You are an academic assistant helping students understand their syllabus.

STRICT RULES:
- Answer ONLY from the provided context
- If the answer is not in the context, say: \"This information is not available in your syllabus\"
- Be concise and direct
- Use bullet points for lists
- Quote exact text when mentioning policies or rules
- If multiple sources mention the same thing, synthesize them into a clear answer";

/// Fixed answer when retrieval finds nothing for the student's scope.
pub const NO_MATCH_ANSWER: &str = "I couldn't find relevant information in your syllabus. \
Please rephrase your question or contact your department.";

const SEPARATOR: &str = "\n\n";

/// Joins matches (already best first) into a context block of at most
/// `max_chars` characters.
///
/// Each match is prefixed with its source attribution. Matches that do not
/// fit are dropped from the bottom of the ranking; a top match that alone
/// exceeds the budget is cut on a char boundary. Returns the block and how
/// many matches it uses.
pub fn build_context(matches: &[RetrievalMatch], max_chars: usize) -> (String, usize) {
    let mut out = String::new();
    let mut used_chars = 0usize;
    let mut used = 0usize;

    for (rank, m) in matches.iter().enumerate() {
        let entry = format_entry(rank + 1, m);
        let entry_chars = entry.chars().count();
        let sep_chars = if used == 0 { 0 } else { SEPARATOR.len() };

        if used_chars + sep_chars + entry_chars <= max_chars {
            if used > 0 {
                out.push_str(SEPARATOR);
            }
            out.push_str(&entry);
            used_chars += sep_chars + entry_chars;
            used += 1;
            continue;
        }

        if used == 0 && max_chars > 0 {
            out.push_str(truncate_chars(&entry, max_chars));
            used = 1;
        }
        break;
    }

    (out, used)
}

fn format_entry(rank: usize, m: &RetrievalMatch) -> String {
    let meta = &m.metadata;
    format!(
        "[{rank}] Source: {} | {} {} | section: {} (part {})\n{}",
        meta.source,
        meta.dept,
        meta.year,
        meta.section,
        meta.chunk_index + 1,
        meta.chunk_text.trim()
    )
}

fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((byte, _)) => &s[..byte],
        None => s,
    }
}

/// User turn: the context block followed by the student's question.
pub fn build_user_prompt(question: &str, context: &str, sections: usize) -> String {
    format!(
        "Context from syllabus (from {sections} relevant sections):\n{context}\n\n\
         Student question:\n{question}\n\nAnswer:"
    )
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rag_store::{ChunkMetadata, DOC_TYPE_SYLLABUS};

    use super::*;

    fn hit(score: f32, idx: usize, text: &str) -> RetrievalMatch {
        RetrievalMatch {
            id: format!("id-{idx}"),
            score,
            metadata: ChunkMetadata {
                dept: "cs".into(),
                year: "2024".into(),
                semester: None,
                course_code: None,
                doc_type: DOC_TYPE_SYLLABUS.into(),
                source: "cs.pdf".into(),
                chunk_text: text.into(),
                chunk_index: idx,
                char_start: 0,
                char_end: text.chars().count(),
                section: "4. Evaluation".into(),
                section_type: "evaluation".into(),
                course_info: BTreeMap::new(),
            },
        }
    }

    #[test]
    fn every_entry_is_attributed() {
        let (ctx, used) = build_context(&[hit(0.9, 0, "Mid term 30"), hit(0.7, 3, "Quiz 10")], 10_000);
        assert_eq!(used, 2);
        assert!(ctx.starts_with("[1] Source: cs.pdf | cs 2024 | section: 4. Evaluation (part 1)\nMid term 30"));
        assert!(ctx.contains("[2] Source: cs.pdf"));
        assert!(ctx.find("Mid term").unwrap() < ctx.find("Quiz").unwrap());
    }

    #[test]
    fn budget_drops_lowest_ranked_first() {
        let hits = [hit(0.9, 0, &"a".repeat(100)), hit(0.8, 1, &"b".repeat(100))];
        let one = format_entry(1, &hits[0]).chars().count();
        let (ctx, used) = build_context(&hits, one + 10);
        assert_eq!(used, 1);
        assert!(ctx.contains('a'));
        assert!(!ctx.contains('b'));
    }

    #[test]
    fn oversized_top_match_is_truncated_on_char_boundary() {
        let hits = [hit(0.9, 0, &"é".repeat(500))];
        let (ctx, used) = build_context(&hits, 120);
        assert_eq!(used, 1);
        assert_eq!(ctx.chars().count(), 120);
    }

    #[test]
    fn user_prompt_layout() {
        let p = build_user_prompt("What is the marking scheme?", "[1] ctx", 1);
        assert!(p.starts_with("Context from syllabus (from 1 relevant sections):\n[1] ctx"));
        assert!(p.ends_with("Student question:\nWhat is the marking scheme?\n\nAnswer:"));
    }
}
