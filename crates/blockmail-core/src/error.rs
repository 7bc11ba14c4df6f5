use std::fmt::Display;

/// Failures surfaced to the user. Every worker command converts its error
/// into one of these before it reaches the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MailError {
    /// No wallet provider could be reached. Fatal for the session.
    #[error("Wallet unavailable: {message}")]
    WalletUnavailable { message: String },
    #[error("Wallet connection request was rejected")]
    UserRejected,
    #[error("Please fill in all fields: {field} ({reason})")]
    Validation { field: &'static str, reason: String },
    /// A contract call reverted, timed out or could not be decoded.
    #[error("Contract call failed: {message}")]
    Chain { message: String },
    #[error("Not connected to a wallet")]
    NotConnected,
    #[error("Another operation is still in progress")]
    Busy,
    #[error("Mail worker is not running")]
    WorkerStopped,
}

pub type MailResult<T> = Result<T, MailError>;

impl MailError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        MailError::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn chain(message: impl Display) -> Self {
        MailError::Chain {
            message: message.to_string(),
        }
    }

    pub fn wallet_unavailable(message: impl Display) -> Self {
        MailError::WalletUnavailable {
            message: message.to_string(),
        }
    }

    /// Whether the caller should abandon the dashboard and return to the
    /// connect view.
    pub fn requires_reconnect(&self) -> bool {
        matches!(self, MailError::WalletUnavailable { .. } | MailError::NotConnected)
    }
}

impl From<crate::rpc::RpcError> for MailError {
    fn from(err: crate::rpc::RpcError) -> Self {
        MailError::chain(err)
    }
}

impl From<crate::abi::AbiError> for MailError {
    fn from(err: crate::abi::AbiError) -> Self {
        MailError::chain(format!("could not decode contract response: {}", err))
    }
}
