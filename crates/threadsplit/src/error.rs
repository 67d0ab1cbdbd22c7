use std::path::PathBuf;

use threadsplit_core::SplitError;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Split(#[from] SplitError),

    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Worker for {0} stopped unexpectedly: {1}")]
    Task(PathBuf, String),
}

impl From<pdf::PdfError> for Error {
    fn from(err: pdf::PdfError) -> Self {
        Error::Split(SplitError::UnreadablePdf(err.to_string()))
    }
}

impl Error {
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Read {
            path: path.into(),
            source,
        }
    }
}
