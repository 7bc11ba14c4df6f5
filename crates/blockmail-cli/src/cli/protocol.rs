use blockmail_core::models::{Address, Mailbox, MessageRef};
use blockmail_core::views::Tab;
use blockmail_core::MailError;
use serde::Serialize;

/// Outcome of one command, printed as JSON.
#[derive(Debug, Serialize)]
pub struct Response {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

#[derive(Debug, Serialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl Response {
    pub fn success(result: serde_json::Value) -> Self {
        Self {
            result: Some(result),
            error: None,
        }
    }

    pub fn error(err: &MailError) -> Self {
        Self {
            result: None,
            error: Some(ErrorInfo {
                code: error_code(err).to_string(),
                message: err.to_string(),
            }),
        }
    }
}

pub fn error_code(err: &MailError) -> &'static str {
    match err {
        MailError::WalletUnavailable { .. } => "wallet_unavailable",
        MailError::UserRejected => "user_rejected",
        MailError::Validation { .. } => "validation",
        MailError::Chain { .. } => "chain",
        MailError::NotConnected => "not_connected",
        MailError::Busy => "busy",
        MailError::WorkerStopped => "worker_stopped",
    }
}

/// CLI command parsed from arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    /// Session, profile and mailbox counts
    Status,
    /// Prompt the wallet for authorization
    Connect,
    /// List one tab, optionally searching instead
    List { tab: Tab, search: Option<String> },
    Send {
        to: String,
        subject: String,
        body: String,
    },
    Star(MessageRef),
    Unstar(MessageRef),
    Delete(MessageRef),
    /// Show the profile, or update it when a name or avatar is given
    Profile {
        name: Option<String>,
        avatar: Option<String>,
    },
    SwitchAccount(Address),
}

impl CliCommand {
    /// Whether the command needs an already-connected session.
    pub fn requires_session(&self) -> bool {
        !matches!(self, CliCommand::Status | CliCommand::Connect)
    }
}

pub fn message_ref(index: u64, sent: bool) -> MessageRef {
    MessageRef {
        index,
        mailbox: Mailbox::from_is_sent(sent),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_carries_code() {
        let response = Response::error(&MailError::validation("subject", "subject is required"));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["error"]["code"], "validation");
        assert!(json.get("result").is_none());
    }

    #[test]
    fn test_requires_session() {
        assert!(!CliCommand::Status.requires_session());
        assert!(!CliCommand::Connect.requires_session());
        assert!(CliCommand::Star(message_ref(0, false)).requires_session());
    }
}
