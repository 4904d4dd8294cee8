use alloy_primitives::TxHash;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SdkError {
    /// The wallet owner declined the request. Not a fault.
    #[error("Request rejected by the user")]
    UserRejected,

    #[error("Network error: {0}")]
    Network(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Transaction {0} reverted")]
    Reverted(TxHash),

    #[error("Transaction {0} not confirmed in time, check the explorer")]
    TimedOut(TxHash),

    #[error("Invalid parameters: {0}")]
    Validation(String),

    #[error("A transaction is already in progress")]
    TransactionInProgress,

    #[error("Decoding error: {0}")]
    Decode(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SdkError {
    /// Transient failures that the caller may simply retry.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SdkError::Network(_) | SdkError::Rpc { .. })
    }

    /// Whether the failure should be surfaced to the user as an error.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, SdkError::UserRejected)
    }
}

impl From<reqwest::Error> for SdkError {
    fn from(err: reqwest::Error) -> Self {
        SdkError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SdkError {
    fn from(err: serde_json::Error) -> Self {
        SdkError::Decode(err.to_string())
    }
}

impl From<alloy_sol_types::Error> for SdkError {
    fn from(err: alloy_sol_types::Error) -> Self {
        SdkError::Decode(err.to_string())
    }
}

impl From<config::ConfigError> for SdkError {
    fn from(err: config::ConfigError) -> Self {
        SdkError::Config(err.to_string())
    }
}

pub type SdkResult<T> = Result<T, SdkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_rejection_is_silent() {
        assert!(!SdkError::UserRejected.is_user_visible());
        assert!(!SdkError::UserRejected.is_recoverable());
        assert!(SdkError::Network("timeout".into()).is_recoverable());
        assert!(SdkError::Reverted(TxHash::ZERO).is_user_visible());
    }
}
