use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything exabgpctl can report back to the operator
#[derive(Debug, Error)]
pub enum Error {
    #[error("ExaBGP conf file {} doesn't exists", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("ExaBGP state dir {} doesn't exists", .0.display())]
    StateDirNotFound(PathBuf),

    /// Malformed ExaBGP configuration [line, reason]
    #[error("Syntax error line {line}: {reason}")]
    Syntax { line: usize, reason: String },

    /// The `run` line of a process is not a healthcheck invocation
    #[error("Process {process} has an invalid healthcheck: {reason}")]
    Healthcheck { process: String, reason: String },

    #[error("Neighbor {neighbor} is invalid: {reason}")]
    InvalidNeighbor { neighbor: String, reason: String },

    #[error("Process {0} is declared more than once")]
    DuplicateProcess(String),

    #[error("Neighbor {0} is declared more than once")]
    DuplicateNeighbor(String),

    #[error("Neighbor {neighbor} references unknown process {process}")]
    UnknownProcess { neighbor: String, process: String },

    #[error("Process {0} not found")]
    ProcessNotFound(String),

    #[error("Neighbor {0} not found")]
    NeighborNotFound(String),

    /// Process has no `--disable` maintenance file
    #[error("Process {0} has no maintenance file configured")]
    NoMaintenanceFile(String),

    #[error("Unknown version key {0}")]
    UnknownVersionKey(String),

    #[error("Invalid settings file {}: {reason}", .path.display())]
    Settings { path: PathBuf, reason: String },

    #[error("Editor '{editor}' failed: {reason}")]
    Editor { editor: String, reason: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// Output encoding failures
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML encoding failed: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Wrap an io::Error with the operation/path it happened on
    pub fn io<C: Into<String>>(context: C, source: io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Encode(EncodeError::Json(error))
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(error: serde_yaml::Error) -> Self {
        Error::Encode(EncodeError::Yaml(error))
    }
}
