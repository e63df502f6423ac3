use std::io;

use thiserror::Error;

pub type FsResult<T> = Result<T, FsError>;

/// Every failure a volume operation can surface. Nothing is retried and
/// nothing rolls back; a failed command leaves the on-disk state consistent
/// up to its last successful write.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("backing file i/o failed: {0}")]
    Io(#[from] io::Error),

    #[error("on-disk record inconsistent: {0}")]
    Format(String),

    #[error("out of space: {0}")]
    NoSpace(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid argument: {0}")]
    InvalidArg(String),

    #[error("operation requires an active session")]
    Unauthorized,

    #[error("block pointer {0} is outside the block area")]
    BadPointer(i32),

    #[error("directory exhausted its direct and single-indirect capacity")]
    DirFull,

    #[error("unsupported: {0}")]
    Unsupported(&'static str),
}

impl From<bincode::Error> for FsError {
    fn from(err: bincode::Error) -> Self {
        match *err {
            bincode::ErrorKind::Io(io) => FsError::Io(io),
            other => FsError::Format(other.to_string()),
        }
    }
}
