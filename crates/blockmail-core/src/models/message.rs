use serde::{Deserialize, Serialize};

use super::Address;

/// One email-like message as returned by the mail contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub from: Address,
    pub to: Address,
    pub subject: String,
    pub content: String,
    /// Seconds since the unix epoch
    pub timestamp: u64,
    /// True when the viewing account is the sender
    pub is_sent: bool,
    pub is_starred: bool,
    /// Soft-deleted by the contract; sent/received lists drop these before display
    #[serde(default)]
    pub is_deleted: bool,
}

impl Message {
    /// Whether two copies refer to the same message, ignoring per-copy flags.
    pub fn same_message(&self, other: &Message) -> bool {
        self.from == other.from
            && self.to == other.to
            && self.timestamp == other.timestamp
            && self.subject == other.subject
            && self.content == other.content
    }

    /// The address on the other side of the conversation from `viewer`.
    pub fn counterpart(&self, viewer: Option<&Address>) -> &Address {
        if viewer == Some(&self.from) {
            &self.to
        } else {
            &self.from
        }
    }
}

/// Which contract-maintained list an index refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mailbox {
    Sent,
    Received,
}

impl Mailbox {
    pub fn from_is_sent(is_sent: bool) -> Self {
        if is_sent {
            Mailbox::Sent
        } else {
            Mailbox::Received
        }
    }

    pub fn is_sent(self) -> bool {
        matches!(self, Mailbox::Sent)
    }
}

/// Mutation key for star/unstar/delete. Only valid within the fetch cycle
/// that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    pub index: u64,
    pub mailbox: Mailbox,
}

/// A live (not soft-deleted) message together with its contract index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailEntry {
    /// Position in the list as the contract returned it, before filtering
    pub index: u64,
    pub mailbox: Mailbox,
    pub message: Message,
}

impl MailEntry {
    pub fn reference(&self) -> MessageRef {
        MessageRef {
            index: self.index,
            mailbox: self.mailbox,
        }
    }
}

/// Drop soft-deleted messages while keeping each survivor's contract index.
pub fn live_entries(messages: Vec<Message>, mailbox: Mailbox) -> Vec<MailEntry> {
    messages
        .into_iter()
        .enumerate()
        .filter(|(_, message)| !message.is_deleted)
        .map(|(index, message)| MailEntry {
            index: index as u64,
            mailbox,
            message,
        })
        .collect()
}
