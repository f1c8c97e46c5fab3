//! Error types for plinth.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid logger name: name must not be empty")]
    InvalidName,

    #[error("cannot open sink destination {path}: {source}")]
    SinkOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("worker has not been started")]
    NotStarted,

    #[error("worker was already started")]
    AlreadyStarted,

    #[error("worker was already joined")]
    AlreadyJoined,
}

pub type Result<T> = std::result::Result<T, Error>;
