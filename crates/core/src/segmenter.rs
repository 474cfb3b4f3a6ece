use crate::error::IngestError;
use crate::models::QaRecord;
use regex::Regex;
use tracing::debug;

const MARKER_PATTERN: &str = r"(?i-u)question:|answer:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Question,
    Answer,
}

impl Marker {
    fn from_match(matched: &str) -> Self {
        if matched.starts_with(['q', 'Q']) {
            Marker::Question
        } else {
            Marker::Answer
        }
    }
}

/// Byte span of a body inside the scanned text.
type Span = (usize, usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Outside,
    InQuestion { body_start: usize },
    InAnswer { question: Span, body_start: usize },
}

/// Splits document text into Question/Answer records, in document order.
///
/// A question body runs up to the next `Answer:` marker and an answer body up
/// to the next `Question:` marker or the end of the text. Markers match
/// case-insensitively. A trailing question without an answer is dropped, as is
/// any pair whose trimmed question or answer is empty.
pub fn segment(text: &str) -> Result<Vec<QaRecord>, IngestError> {
    let markers = Regex::new(MARKER_PATTERN)?;
    let mut records = Vec::new();
    let mut state = ScanState::Outside;

    for found in markers.find_iter(text) {
        let marker = Marker::from_match(found.as_str());
        state = match (state, marker) {
            (ScanState::Outside, Marker::Question) => ScanState::InQuestion {
                body_start: found.end(),
            },
            (ScanState::Outside, Marker::Answer) => ScanState::Outside,
            (ScanState::InQuestion { body_start }, Marker::Answer) => ScanState::InAnswer {
                question: (body_start, found.start()),
                body_start: found.end(),
            },
            (ScanState::InQuestion { .. }, Marker::Question) => state,
            (ScanState::InAnswer { question, body_start }, Marker::Question) => {
                push_pair(&mut records, text, question, (body_start, found.start()));
                ScanState::InQuestion {
                    body_start: found.end(),
                }
            }
            (ScanState::InAnswer { .. }, Marker::Answer) => state,
        };
    }

    match state {
        ScanState::InAnswer { question, body_start } => {
            push_pair(&mut records, text, question, (body_start, text.len()));
        }
        ScanState::InQuestion { body_start } => {
            debug!(offset = body_start, "dropping trailing question without an answer");
        }
        ScanState::Outside => {}
    }

    Ok(records)
}

fn push_pair(records: &mut Vec<QaRecord>, text: &str, question: Span, answer: Span) {
    let question_body = text[question.0..question.1].trim();
    let answer_body = text[answer.0..answer.1].trim();

    if question_body.is_empty() || answer_body.is_empty() {
        debug!(
            question_offset = question.0,
            answer_offset = answer.0,
            "dropping pair with an empty question or answer"
        );
        return;
    }

    records.push(QaRecord::new(records.len(), question_body, answer_body));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answer::extract_answer;

    #[test]
    fn two_pair_document_yields_two_records() {
        let text = "Question: What is 2+2?\nAnswer: 4\nQuestion: What color is the sky?\nAnswer: Blue";
        let records = segment(text).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].content, "Question: What is 2+2?\nAnswer: 4");
        assert_eq!(
            records[1].content,
            "Question: What color is the sky?\nAnswer: Blue"
        );
    }

    #[test]
    fn well_formed_blocks_reconstruct_in_order() {
        let pairs: Vec<(String, String)> = (0..25)
            .map(|index| (format!("Question number {index}?"), format!("Answer body {index}")))
            .collect();
        let text: String = pairs
            .iter()
            .map(|(question, answer)| format!("Question: {question}\nAnswer: {answer}\n"))
            .collect();

        let records = segment(&text).unwrap();
        assert_eq!(records.len(), pairs.len());
        for (index, (record, (question, answer))) in records.iter().zip(&pairs).enumerate() {
            assert_eq!(record.position, index);
            assert_eq!(record.question(), Some(question.as_str()));
            assert_eq!(extract_answer(record), *answer);
        }
    }

    #[test]
    fn trailing_question_without_answer_is_dropped() {
        let text = "Question: A?\nAnswer: a\nQuestion: B?\nAnswer: b\nQuestion: dangling";
        let records = segment(text).unwrap();

        let question_markers = text.matches("Question:").count();
        assert_eq!(records.len(), question_markers - 1);
        assert_eq!(records[1].question(), Some("B?"));
    }

    #[test]
    fn markers_match_case_insensitively_and_span_lines() {
        let text = "intro text\nQUESTION:  How do I\nreset the device?\n answer:\nHold the button\nfor ten seconds.\n";
        let records = segment(text).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].question(), Some("How do I\nreset the device?"));
        assert_eq!(extract_answer(&records[0]), "Hold the button\nfor ten seconds.");
    }

    #[test]
    fn answer_stops_at_inline_question_marker() {
        let text = "Question: one Answer: first Question: two Answer: second";
        let records = segment(text).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].content, "Question: one\nAnswer: first");
        assert_eq!(records[1].content, "Question: two\nAnswer: second");
    }

    #[test]
    fn nested_markers_follow_first_marker_semantics() {
        let text = "Question: A\nQuestion: B\nAnswer: C\nAnswer: D";
        let records = segment(text).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].question(), Some("A\nQuestion: B"));
        assert_eq!(extract_answer(&records[0]), "C\nAnswer: D");
    }

    #[test]
    fn records_do_not_share_source_text() {
        let text = "Question: alpha\nAnswer: one\nQuestion: beta\nAnswer: two\nQuestion: gamma\nAnswer: three";
        let records = segment(text).unwrap();

        let answers: Vec<String> = records.iter().map(extract_answer).collect();
        assert_eq!(answers, vec!["one", "two", "three"]);
        for answer in &answers {
            assert_eq!(
                records
                    .iter()
                    .filter(|record| record.content.contains(answer.as_str()))
                    .count(),
                1
            );
        }
    }

    #[test]
    fn empty_bodies_and_marker_free_text_yield_nothing() {
        assert!(segment("").unwrap().is_empty());
        assert!(segment("no markers at all\njust prose").unwrap().is_empty());
        assert!(segment("Answer: orphan answer").unwrap().is_empty());
        assert!(segment("Question:   \nAnswer: value").unwrap().is_empty());
        assert!(segment("Question: value\nAnswer:   ").unwrap().is_empty());
    }

    #[test]
    fn positions_stay_dense_when_pairs_are_dropped() {
        let text = "Question: \nAnswer: skipped\nQuestion: kept\nAnswer: yes";
        let records = segment(text).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].position, 0);
    }

    #[test]
    fn multibyte_text_around_markers_is_preserved() {
        let text = "Question: ¿Qué hora es?\nAnswer: Las tres — más o menos";
        let records = segment(text).unwrap();

        assert_eq!(records[0].question(), Some("¿Qué hora es?"));
        assert_eq!(extract_answer(&records[0]), "Las tres — más o menos");
    }
}
