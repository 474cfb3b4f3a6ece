use crate::embeddings::Embedder;
use crate::error::SearchError;
use crate::models::{DocumentFingerprint, QaRecord, SearchHit};
use crate::stores::FlatIndex;
use crate::traits::VectorIndex;
use tracing::debug;
use uuid::Uuid;

/// Records of one uploaded document and the vector index built over them.
/// Immutable once built; replaced wholesale on the next upload.
#[derive(Debug)]
pub struct KnowledgeBase<I = FlatIndex> {
    id: Uuid,
    fingerprint: DocumentFingerprint,
    model_id: String,
    records: Vec<QaRecord>,
    index: I,
}

impl KnowledgeBase<FlatIndex> {
    pub async fn build(
        fingerprint: DocumentFingerprint,
        records: Vec<QaRecord>,
        embedder: &dyn Embedder,
    ) -> Result<Self, SearchError> {
        Self::build_with(fingerprint, records, embedder, FlatIndex::from_vectors).await
    }
}

impl<I: VectorIndex> KnowledgeBase<I> {
    /// Embeds every record with `embedder` and hands the vectors to `make_index`.
    pub async fn build_with<F>(
        fingerprint: DocumentFingerprint,
        records: Vec<QaRecord>,
        embedder: &dyn Embedder,
        make_index: F,
    ) -> Result<Self, SearchError>
    where
        F: FnOnce(Vec<Vec<f32>>) -> Result<I, SearchError>,
    {
        if records.is_empty() {
            return Err(SearchError::EmptyCorpus);
        }

        let mut vectors = Vec::with_capacity(records.len());
        for record in &records {
            vectors.push(embedder.embed(&record.content).await?);
        }

        let index = make_index(vectors)?;
        if index.len() != records.len() {
            return Err(SearchError::InvalidVector(format!(
                "index holds {} vectors for {} records",
                index.len(),
                records.len()
            )));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            fingerprint,
            model_id: embedder.model_id().to_string(),
            records,
            index,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn fingerprint(&self) -> &DocumentFingerprint {
        &self.fingerprint
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn records(&self) -> &[QaRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Top `k` records for `query`, best first.
    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
        embedder: &dyn Embedder,
    ) -> Result<Vec<SearchHit>, SearchError> {
        if embedder.model_id() != self.model_id {
            return Err(SearchError::ModelMismatch {
                indexed: self.model_id.clone(),
                query: embedder.model_id().to_string(),
            });
        }
        if self.index.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query_vector = embedder.embed(query).await?;
        let neighbors = self.index.nearest(&query_vector, k)?;

        let hits = neighbors
            .into_iter()
            .filter_map(|neighbor| {
                self.records.get(neighbor.position).map(|record| SearchHit {
                    record: record.clone(),
                    score: neighbor.score,
                })
            })
            .collect::<Vec<_>>();

        if let Some(best) = hits.first() {
            debug!(
                position = best.record.position,
                score = best.score,
                candidates = hits.len(),
                "retrieved best record"
            );
        }

        Ok(hits)
    }
}
