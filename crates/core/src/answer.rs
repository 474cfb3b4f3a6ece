use crate::models::QaRecord;
use tracing::warn;

pub const UNPARSABLE_ANSWER: &str = "Sorry, could not extract the answer properly.";

const ANSWER_MARKER: &str = "answer:";

/// Returns the text following the first `Answer:` marker of a record, trimmed.
///
/// Records built by the segmenter always carry a marker; anything else gets
/// [`UNPARSABLE_ANSWER`] instead of an error.
pub fn extract_answer(record: &QaRecord) -> String {
    match answer_body(&record.content) {
        Some(answer) => answer.to_string(),
        None => {
            warn!(position = record.position, "record has no parsable answer");
            UNPARSABLE_ANSWER.to_string()
        }
    }
}

fn answer_body(content: &str) -> Option<&str> {
    let start = find_ignore_ascii_case(content, ANSWER_MARKER)? + ANSWER_MARKER.len();
    let body = content[start..].trim();
    (!body.is_empty()).then_some(body)
}

// The needle is ASCII, so every match offset is a char boundary.
fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    let needle = needle.as_bytes();
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
}
