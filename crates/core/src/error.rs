use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("cannot build an index from an empty record list")]
    EmptyCorpus,

    #[error("invalid vector: {0}")]
    InvalidVector(String),

    #[error("vector dimension {actual} does not match index dimension {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("index was built with embedding model {indexed} but query used {query}")]
    ModelMismatch { indexed: String, query: String },

    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
}

/// Failures surfaced to the caller of an upload/ask request.
#[derive(Debug, Error)]
pub enum QaError {
    #[error("Only PDF files are supported.")]
    InvalidFileType,

    #[error("Uploaded PDF has no extractable text.")]
    EmptyDocument,

    #[error("Could not extract any Q&A pairs from the PDF.")]
    NoPairsFound,

    #[error("No PDF uploaded yet. Please upload a PDF first.")]
    NoActiveIndex,

    #[error("Sorry, the answer to this question was not found in the uploaded PDF.")]
    AnswerNotFound,

    #[error("Uploaded file exceeds the {limit} byte limit.")]
    UploadTooLarge { limit: usize },

    #[error("The {operation} request timed out after {millis} ms.")]
    Timeout { operation: &'static str, millis: u64 },

    #[error("Processing failed: {0}")]
    Processing(String),
}

impl QaError {
    pub fn kind(&self) -> &'static str {
        match self {
            QaError::InvalidFileType => "invalid_file_type",
            QaError::EmptyDocument => "empty_document",
            QaError::NoPairsFound => "no_pairs_found",
            QaError::NoActiveIndex => "no_active_index",
            QaError::AnswerNotFound => "answer_not_found",
            QaError::UploadTooLarge { .. } => "upload_too_large",
            QaError::Timeout { .. } => "timeout",
            QaError::Processing(_) => "processing_error",
        }
    }
}

impl From<IngestError> for QaError {
    fn from(error: IngestError) -> Self {
        QaError::Processing(error.to_string())
    }
}

impl From<SearchError> for QaError {
    fn from(error: SearchError) -> Self {
        QaError::Processing(error.to_string())
    }
}
