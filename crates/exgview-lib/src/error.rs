use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExgError>;

#[derive(Debug, Error)]
pub enum ExgError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("input has no header row")]
    MissingHeader,
    #[error("invalid config {path}: {message}")]
    Config { path: PathBuf, message: String },
    #[error("downsample factor must be a positive integer, got {0}")]
    InvalidDownsample(usize),
    #[error("no plottable channels found")]
    NoPlottableChannels,
    #[error("failed to render chart: {0}")]
    Render(String),
}

impl ExgError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
