use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid destination surface: {width}x{height}")]
    InvalidSurface { width: u32, height: u32 },

    #[error("Source frame has no pixels")]
    EmptyFrame,

    #[error("Failed to load overlay asset {reference:?}: {reason}")]
    AssetLoad { reference: String, reason: String },

    #[error("Encoding failed: {0}")]
    Encoding(String),

    #[error("Background task failed: {0}")]
    TaskJoin(String),

    #[error("No Tokio runtime available to run the load")]
    NoRuntime,

    #[error("Session has been stopped")]
    SessionStopped,
}

pub type Result<T> = std::result::Result<T, Error>;
