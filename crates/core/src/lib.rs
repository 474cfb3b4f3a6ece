pub mod answer;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod knowledge;
pub mod models;
pub mod orchestrator;
pub mod segmenter;
pub mod session;
pub mod stores;
pub mod traits;

pub use answer::{extract_answer, UNPARSABLE_ANSWER};
pub use embeddings::{
    CharacterNgramEmbedder, Embedder, HttpEmbedder, HttpEmbedderConfig,
    DEFAULT_EMBEDDING_DIMENSIONS, EMBEDDING_MODEL_ID, MINILM_DIMENSIONS,
};
pub use error::{IngestError, QaError, SearchError};
pub use extractor::{extract_page_texts, join_pages, LopdfExtractor, PageText};
pub use ingest::{extract_upload, is_pdf_file_name, ExtractedUpload};
pub use knowledge::KnowledgeBase;
pub use models::{
    AskOutcome, DocumentFingerprint, Exchange, QaRecord, SearchHit, ServiceOptions, UploadReceipt,
};
pub use orchestrator::QaCoordinator;
pub use segmenter::segment;
pub use session::SessionState;
pub use stores::FlatIndex;
pub use traits::{Neighbor, PdfExtractor, VectorIndex};
