use thiserror::Error;

/// Failures while decoding or encoding scene documents.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("glTF error: {0}")]
    Gltf(#[from] gltf::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed GLBS stream: {0}")]
    Glbs(String),

    #[error("invalid document: {0}")]
    Invalid(String),
}

/// Failures surfaced by scene composition. Either one aborts the operation
/// and leaves the published state untouched.
#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("failed to merge model {name:?}")]
    Merge {
        name: String,
        #[source]
        source: CodecError,
    },

    #[error("failed to serialize scene")]
    Serialization(#[source] CodecError),

    #[error("merge worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl ComposeError {
    pub fn merge(name: &str, source: impl Into<CodecError>) -> Self {
        ComposeError::Merge {
            name: name.to_string(),
            source: source.into(),
        }
    }

    pub fn is_merge_failure(&self) -> bool {
        matches!(self, ComposeError::Merge { .. })
    }

    pub fn is_serialization_failure(&self) -> bool {
        matches!(self, ComposeError::Serialization(_))
    }
}
