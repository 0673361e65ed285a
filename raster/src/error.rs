use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RasterError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("missing header key '{0}' in {1}")]
    HdrMissing(&'static str, PathBuf),

    #[error("invalid value '{1}' for header key '{0}'")]
    HdrValue(String, String),

    #[error("invalid FLT file len {0} for {1}")]
    FltLen(u64, PathBuf),

    #[error("expected {expected} samples, got {found}")]
    SampleCount { expected: usize, found: usize },

    #[error("cell size must be positive, got {0}")]
    CellSize(f64),
}
