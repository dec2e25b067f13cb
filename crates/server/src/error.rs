use thiserror::Error;

/// Rejections raised while turning a submission into an [`crate::alerts::Alert`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Unknown alert type: {0}")]
    UnknownAlertType(String),
    #[error("Unknown severity: {0}")]
    UnknownSeverity(String),
    #[error("Detail '{0}' must be a string, number or boolean")]
    NonScalarDetail(String),
    #[error("source_component must not be empty")]
    MissingSourceComponent,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("Store operation timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Corrupt stored value: {0}")]
    Corrupt(String),
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Channel {0} is not configured")]
    NotConfigured(String),
    #[error("Channel timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Rejected by remote with status {status}: {context}")]
    Rejected { status: u16, context: String },
    #[error("Message build error: {0}")]
    Message(String),
    #[error("Delivery cancelled")]
    Cancelled,
}

impl ChannelError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ChannelError::Timeout(_) | ChannelError::Transport(_)
        ) || matches!(self, ChannelError::Rejected { status, .. } if *status >= 500)
    }
}
