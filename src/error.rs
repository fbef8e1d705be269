#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("illegal state transition: {0}")]
    IllegalStateTransition(String),
    #[error("truncated sample: {} samples salvaged, {remainder} trailing bytes left over", .salvaged.len())]
    TruncatedSample { salvaged: Vec<i32>, remainder: usize },
    #[error("probe error: {0}")]
    Probe(String),
}

impl IngestError {
    /// Recovers the complete leading samples of a truncated buffer.
    ///
    /// Every other variant yields `None`.
    pub fn into_salvaged(self) -> Option<(Vec<i32>, usize)> {
        match self {
            IngestError::TruncatedSample { salvaged, remainder } => Some((salvaged, remainder)),
            _ => None,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, IngestError::TruncatedSample { .. })
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
