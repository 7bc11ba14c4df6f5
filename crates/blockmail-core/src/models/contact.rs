use serde::{Deserialize, Serialize};

use crate::error::{MailError, MailResult};

/// A session-local address-book entry. Never written to the contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl Contact {
    /// Name and address are required; the avatar is optional.
    pub fn new(name: &str, address: &str, avatar: Option<&str>) -> MailResult<Self> {
        let name = name.trim();
        let address = address.trim();
        if name.is_empty() {
            return Err(MailError::validation("name", "contact name is required"));
        }
        if address.is_empty() {
            return Err(MailError::validation("address", "contact address is required"));
        }
        Ok(Self {
            name: name.to_string(),
            address: address.to_string(),
            avatar: avatar
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(str::to_string),
        })
    }
}

/// In-memory contact list; gone when the process exits. Duplicates are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContactBook {
    contacts: Vec<Contact>,
}

impl ContactBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, contact: Contact) {
        self.contacts.push(contact);
    }

    pub fn all(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn get(&self, position: usize) -> Option<&Contact> {
        self.contacts.get(position)
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }
}
