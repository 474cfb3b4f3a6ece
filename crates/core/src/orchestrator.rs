use crate::answer::extract_answer;
use crate::embeddings::Embedder;
use crate::error::QaError;
use crate::ingest::{extract_upload, is_pdf_file_name};
use crate::knowledge::KnowledgeBase;
use crate::models::{AskOutcome, Exchange, ServiceOptions, UploadReceipt};
use crate::segmenter::segment;
use crate::session::SessionState;
use crate::traits::PdfExtractor;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Drives upload, ask and reset against one shared session.
pub struct QaCoordinator {
    session: SessionState,
    embedder: Arc<dyn Embedder>,
    extractor: Arc<dyn PdfExtractor>,
    options: ServiceOptions,
    upload_gate: Mutex<()>,
}

impl QaCoordinator {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        extractor: Arc<dyn PdfExtractor>,
        options: ServiceOptions,
    ) -> Self {
        Self {
            session: SessionState::new(),
            embedder,
            extractor,
            options,
            upload_gate: Mutex::new(()),
        }
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    pub fn options(&self) -> &ServiceOptions {
        &self.options
    }

    /// Builds a knowledge base from an uploaded PDF and installs it.
    /// On any failure the session is left as it was.
    pub async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<UploadReceipt, QaError> {
        if !is_pdf_file_name(file_name) {
            return Err(QaError::InvalidFileType);
        }
        if bytes.len() > self.options.max_upload_bytes {
            return Err(QaError::UploadTooLarge {
                limit: self.options.max_upload_bytes,
            });
        }

        let _gate = self.upload_gate.lock().await;
        let knowledge = with_timeout(
            "upload",
            self.options.upload_timeout,
            self.build_knowledge(file_name.to_string(), bytes),
        )
        .await?;

        let receipt = UploadReceipt {
            document_id: knowledge.fingerprint().document_id,
            file_name: knowledge.fingerprint().file_name.clone(),
            pairs: knowledge.len(),
        };

        let knowledge = Arc::new(knowledge);
        let replaced = self.session.install_index(knowledge.clone()).await;
        info!(
            document_id = %receipt.document_id,
            file = %receipt.file_name,
            pairs = receipt.pairs,
            replaced = replaced.is_some(),
            "installed knowledge base"
        );

        Ok(receipt)
    }

    async fn build_knowledge(
        &self,
        file_name: String,
        bytes: Vec<u8>,
    ) -> Result<KnowledgeBase, QaError> {
        let extractor = self.extractor.clone();
        let upload = tokio::task::spawn_blocking(move || {
            extract_upload(extractor.as_ref(), &file_name, &bytes)
        })
        .await
        .map_err(|error| QaError::Processing(format!("extraction task failed: {error}")))??;

        let records = segment(&upload.text)?;
        if records.is_empty() {
            return Err(QaError::NoPairsFound);
        }

        let knowledge =
            KnowledgeBase::build(upload.fingerprint, records, self.embedder.as_ref()).await?;
        Ok(knowledge)
    }

    /// Answers `question` from the active knowledge base and logs the exchange.
    pub async fn ask(&self, question: &str) -> Result<AskOutcome, QaError> {
        let knowledge = self
            .session
            .current_index()
            .await
            .ok_or(QaError::NoActiveIndex)?;

        let hits = with_timeout(
            "query",
            self.options.query_timeout,
            async {
                knowledge
                    .retrieve(question, self.options.top_k.max(1), self.embedder.as_ref())
                    .await
                    .map_err(QaError::from)
            },
        )
        .await?;

        let (answer, found, score) = match hits.first() {
            Some(best) => (extract_answer(&best.record), true, Some(best.score)),
            None => (QaError::AnswerNotFound.to_string(), false, None),
        };

        let history = match self
            .session
            .append_exchange(knowledge.id(), Exchange::new(question, answer.clone()))
            .await
        {
            Some(history) => history,
            None => {
                warn!(
                    document_id = %knowledge.fingerprint().document_id,
                    "knowledge base replaced while answering; exchange not logged"
                );
                self.session.history().await
            }
        };

        Ok(AskOutcome {
            answer,
            found,
            score,
            history,
        })
    }

    /// Clears the exchange log. The active knowledge base stays installed.
    pub async fn reset(&self) {
        let cleared = self.session.clear_history().await;
        info!(cleared, "conversation history reset");
    }

    pub async fn history(&self) -> Vec<Exchange> {
        self.session.history().await
    }
}

async fn with_timeout<T, F>(
    operation: &'static str,
    budget: Duration,
    work: F,
) -> Result<T, QaError>
where
    F: Future<Output = Result<T, QaError>>,
{
    match tokio::time::timeout(budget, work).await {
        Ok(result) => result,
        Err(_) => {
            let millis = u64::try_from(budget.as_millis()).unwrap_or(u64::MAX);
            warn!(operation, millis, "request timed out");
            Err(QaError::Timeout { operation, millis })
        }
    }
}
