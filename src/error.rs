/// Centralized error types for pdf-rag-chunker using thiserror
///
/// Structural ambiguities are not errors; they are reported as
/// [`crate::structure::StructureWarning`] values and processing continues.
use thiserror::Error;

/// Main error type for the chunking pipeline
#[derive(Error, Debug)]
pub enum ChunkerError {
    #[error("Input error: {0}")]
    Input(#[from] InputError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Chunking error: {0}")]
    Chunking(#[from] ChunkingError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Processing of '{0}' was cancelled")]
    Cancelled(String),

    #[error("{0}")]
    Other(String),
}

/// Errors related to the fragment stream handed over by extraction
#[derive(Error, Debug)]
pub enum InputError {
    #[error("Input file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse fragment stream '{file}': {reason}")]
    ParseFailed { file: String, reason: String },

    #[error("Fragment {index} has invalid page number {page}")]
    InvalidPage { index: usize, page: u32 },

    #[error("Fragment {index} goes back to page {page} after page {previous}")]
    NonMonotonicPages {
        index: usize,
        page: u32,
        previous: u32,
    },

    #[error("Fragment {index} has a malformed bounding box")]
    InvalidBoundingBox { index: usize },

    #[error("Fragment {index} has a non-positive font size")]
    InvalidFontSize { index: usize },
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {0}")]
    LoadFailed(String),

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Invalid regex pattern for '{key}' ({pattern}): {reason}")]
    InvalidPattern {
        key: String,
        pattern: String,
        reason: String,
    },

    #[error("No classification method enabled: at least one of use_bookmarks, use_heuristics, use_regex must be true")]
    NoClassificationMethod,

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
}

/// Errors raised while packing chunks
#[derive(Error, Debug)]
pub enum ChunkingError {
    /// A produced chunk exceeds the budget. This is a defect in the packer,
    /// never a user-facing condition; the document's chunks are discarded.
    #[error(
        "Size invariant violated in '{node}': chunk {sequence} has {size} characters, limit is {max}"
    )]
    SizeInvariantViolation {
        node: String,
        sequence: usize,
        size: usize,
        max: usize,
    },

    #[error("Invalid chunk size: {0}")]
    InvalidChunkSize(String),
}

/// Errors related to persisting chunks and manifests
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to create output directory '{path}': {reason}")]
    DirectoryCreationFailed { path: String, reason: String },

    #[error("Failed to write '{path}': {reason}")]
    WriteFailed { path: String, reason: String },

    #[error("Failed to serialize {what}: {reason}")]
    SerializationFailed { what: String, reason: String },
}

// Conversion from anyhow::Error to ChunkerError
impl From<anyhow::Error> for ChunkerError {
    fn from(err: anyhow::Error) -> Self {
        ChunkerError::Other(format!("{:#}", err))
    }
}

impl ChunkerError {
    /// Create a new error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        ChunkerError::Other(msg.into())
    }

    /// Check if this is a user error (bad input or configuration) vs system error
    pub fn is_user_error(&self) -> bool {
        matches!(self, ChunkerError::Input(_) | ChunkerError::Config(_))
    }

    /// Fatal errors stop the run before or during a document; everything
    /// else is reported per document.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ChunkerError::Config(_)
                | ChunkerError::Chunking(ChunkingError::SizeInvariantViolation { .. })
        )
    }
}
