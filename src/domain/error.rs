use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("malformed upstream data: {message}")]
    MalformedUpstreamData { message: String },
}

impl DomainError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedUpstreamData {
            message: message.into(),
        }
    }
}
