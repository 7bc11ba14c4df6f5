use serde::{Deserialize, Serialize};

use super::Address;
use crate::error::{MailError, MailResult};

/// Compose form contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeDraft {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl ComposeDraft {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Check required fields in form order and parse the recipient.
    pub fn validate(&self) -> MailResult<Address> {
        if self.to.trim().is_empty() {
            return Err(MailError::validation("to", "recipient is required"));
        }
        if self.subject.is_empty() {
            return Err(MailError::validation("subject", "subject is required"));
        }
        if self.body.is_empty() {
            return Err(MailError::validation("body", "message body is required"));
        }
        self.to
            .parse()
            .map_err(|e| MailError::validation("to", format!("{}", e)))
    }

    pub fn is_empty(&self) -> bool {
        self.to.is_empty() && self.subject.is_empty() && self.body.is_empty()
    }
}
