use thiserror::Error;

/// Top-level error type for the DPR review service.
#[derive(Debug, Error)]
pub enum DprError {
    #[error("missing input: {0}")]
    MissingInput(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("upstream service error ({service}): {message}")]
    Upstream { service: String, message: String },

    #[error("prediction failed: {0}")]
    PredictionFailed(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DprError {
    pub fn upstream(service: impl Into<String>, message: impl ToString) -> Self {
        Self::Upstream {
            service: service.into(),
            message: message.to_string(),
        }
    }

    /// True for errors caused by the caller rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            DprError::MissingInput(_) | DprError::InvalidInput(_) | DprError::NotFound(_)
        )
    }
}

pub type DprResult<T> = Result<T, DprError>;
