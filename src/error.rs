use thiserror::Error;

#[derive(Debug, Error)]
#[error("{message}")]
pub struct EmbedError {
    pub message: String,
}

impl EmbedError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to parse document '{document}': {reason}")]
    Parse { document: String, reason: String },

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("embedding failed for {scope}")]
    Embedding {
        scope: String,
        #[source]
        source: EmbedError,
    },

    #[error("result assembly failed: {0}")]
    Assembly(String),
}

impl PipelineError {
    pub fn parse(document: impl Into<String>, reason: impl ToString) -> Self {
        Self::Parse {
            document: document.into(),
            reason: reason.to_string(),
        }
    }
}
