use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid filter pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("Data file not found for {}", executable.display())]
    DataFileNotFound { executable: PathBuf },

    #[error("Not a test executable path: {}", .0.display())]
    InvalidExecutable(PathBuf),

    #[error("Interrupted")]
    Interrupted,

    #[error("Failed to install interrupt handler: {0}")]
    InterruptHandler(#[from] ctrlc::Error),

    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
