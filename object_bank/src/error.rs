use std::io;
use std::path::PathBuf;

use object_formats::DecodeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BankError {
    #[error("object folder {} is missing or not a directory", .0.display())]
    MissingFolder(PathBuf),
    #[error("failed to persist {file}")]
    Persist {
        file: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to read {file}")]
    Read {
        file: String,
        #[source]
        source: io::Error,
    },
    #[error("object file {file} is malformed")]
    Decode {
        file: String,
        #[source]
        source: DecodeError,
    },
    #[error("folder cache {file} is corrupt")]
    Cache {
        file: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to read bank configuration {}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse bank configuration {}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to read sprite manifest {}", .path.display())]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse sprite manifest {}", .path.display())]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type BankResult<T> = Result<T, BankError>;
