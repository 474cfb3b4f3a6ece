use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

const QUESTION_PREFIX: &str = "Question: ";
const ANSWER_SEPARATOR: &str = "\nAnswer: ";

/// One Question/Answer unit, stored as `"Question: <q>\nAnswer: <a>"`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QaRecord {
    pub position: usize,
    pub content: String,
}

impl QaRecord {
    pub fn new(position: usize, question: &str, answer: &str) -> Self {
        Self {
            position,
            content: format!(
                "{QUESTION_PREFIX}{}{ANSWER_SEPARATOR}{}",
                question.trim(),
                answer.trim()
            ),
        }
    }

    pub fn question(&self) -> Option<&str> {
        self.content
            .strip_prefix(QUESTION_PREFIX)
            .and_then(|rest| rest.split_once(ANSWER_SEPARATOR))
            .map(|(question, _)| question)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentFingerprint {
    pub document_id: Uuid,
    pub file_name: String,
    pub checksum: String,
    pub page_count: usize,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Exchange {
    pub question: String,
    pub answer: String,
    pub asked_at: DateTime<Utc>,
}

impl Exchange {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            asked_at: Utc::now(),
        }
    }

    pub fn as_pair(&self) -> (String, String) {
        (self.question.clone(), self.answer.clone())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub record: QaRecord,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadReceipt {
    pub document_id: Uuid,
    pub file_name: String,
    pub pairs: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AskOutcome {
    pub answer: String,
    pub found: bool,
    pub score: Option<f32>,
    pub history: Vec<Exchange>,
}

#[derive(Debug, Clone)]
pub struct ServiceOptions {
    pub top_k: usize,
    pub upload_timeout: Duration,
    pub query_timeout: Duration,
    pub max_upload_bytes: usize,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            top_k: 1,
            upload_timeout: Duration::from_secs(120),
            query_timeout: Duration::from_secs(30),
            max_upload_bytes: 25 * 1024 * 1024,
        }
    }
}
