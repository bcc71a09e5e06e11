use thiserror::Error;

pub type Result<T> = std::result::Result<T, CodecError>;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Invalid quantization bounds: [{min}, {max}]")]
    InvalidBounds { min: f32, max: f32 },

    #[error("Body size mismatch: header expects {expected} bytes, assembled {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("Bad magic tag: {0:?}")]
    BadMagic([u8; 3]),

    #[error("Unsupported format version: {0}")]
    UnsupportedVersion(u8),

    #[error("Truncated stream: need {expected} bytes, have {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Compression error: {0}")]
    Compression(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Manifest error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Async task error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}
