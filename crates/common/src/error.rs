use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Registry file '{path}' is unreadable: {source}")]
    RegistryUnreadable {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Registry file '{path}': {source}")]
    RegistryIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Registry file '{0}' is locked by another eden process")]
    RegistryLocked(PathBuf),

    #[error("Service instance '{0}' was not found")]
    InstanceNotFound(String),

    #[error("Binding '{binding}' was not found for instance '{instance}'")]
    BindingNotFound { instance: String, binding: String },

    #[error("Binding '{binding}' already exists for instance '{instance}'")]
    DuplicateBinding { instance: String, binding: String },

    #[error("Service instance '{0}' already exists")]
    DuplicateInstanceName(String),

    #[error("Remote operation failed: {0}")]
    RemoteOperationFailed(String),

    #[error("Could not decode last operation response: {0}")]
    PollDecodeAmbiguous(String),

    #[error("{operation} failed on the broker: {description}")]
    OperationFailed {
        operation: String,
        description: String,
    },

    #[error("Gave up waiting for the operation after {0} status queries")]
    PollLimitReached(u32),

    #[error("Catalog lookup failed: {0}")]
    CatalogLookup(String),

    #[error("Catalog validation failed:\n  - {}", .0.join("\n  - "))]
    InvalidCatalog(Vec<String>),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
