use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Transfer failed: {0}")]
    Transfer(String),

    #[error("No playable URL: {0}")]
    NoPlayableUrl(String),

    #[error("Tag write failed: {0}")]
    TagWrite(String),

    #[error("No FLAC tool available (install metaflac or flac)")]
    NoCodecToolAvailable,

    #[error("Codec tool failed: {0}")]
    CodecTool(String),

    #[error("Unsupported container: {0}")]
    UnsupportedContainer(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
