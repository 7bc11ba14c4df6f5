//! Free-text search over cached messages.
//!
//! A query matches a message when it appears, case-insensitively, as a
//! substring of the subject, body, sender or recipient.

use crate::models::{MailEntry, Message};
use crate::sync::MailboxSnapshot;

/// Check if text contains an already-lowercased term (case-insensitive).
pub fn text_contains_term(text: &str, term_lower: &str) -> bool {
    term_lower.is_empty() || text.to_lowercase().contains(term_lower)
}

pub fn message_matches(message: &Message, query: &str) -> bool {
    let term = query.to_lowercase();
    text_contains_term(&message.subject, &term)
        || text_contains_term(&message.content, &term)
        || text_contains_term(&message.from.to_hex(), &term)
        || text_contains_term(&message.to.to_hex(), &term)
}

/// Sent then received entries matching `query`. An empty query matches all.
pub fn search_entries<'a>(snapshot: &'a MailboxSnapshot, query: &str) -> Vec<&'a MailEntry> {
    snapshot
        .all_entries()
        .filter(|entry| message_matches(&entry.message, query))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{live_entries, Address, Mailbox};

    fn message(from: u8, to: u8, subject: &str, content: &str) -> Message {
        Message {
            from: Address::new([from; 20]),
            to: Address::new([to; 20]),
            subject: subject.to_string(),
            content: content.to_string(),
            timestamp: 0,
            is_sent: false,
            is_starred: false,
            is_deleted: false,
        }
    }

    fn snapshot() -> MailboxSnapshot {
        MailboxSnapshot {
            sent: live_entries(vec![message(0xaa, 0xbb, "Lunch", "Noon at the Café")], Mailbox::Sent),
            received: live_entries(
                vec![
                    message(0xbb, 0xaa, "Invoice", "Please pay"),
                    message(0xcc, 0xaa, "Hello", "lunch tomorrow?"),
                ],
                Mailbox::Received,
            ),
            starred: Vec::new(),
            generation: 1,
        }
    }

    #[test]
    fn test_text_contains_term() {
        assert!(text_contains_term("Hello World", "hello"));
        assert!(text_contains_term("Hello World", "lo wo"));
        assert!(!text_contains_term("Hello World", "xyz"));
        assert!(text_contains_term("Hello World", ""));
        assert!(text_contains_term("Noon at the CAFÉ", "café"));
    }

    #[test]
    fn test_search_covers_every_field() {
        let snap = snapshot();
        let subjects = |query: &str| -> Vec<String> {
            search_entries(&snap, query)
                .into_iter()
                .map(|e| e.message.subject.clone())
                .collect()
        };
        // Subject of the sent entry and body of a received one, sent first.
        assert_eq!(subjects("LUNCH"), vec!["Lunch", "Hello"]);
        assert_eq!(subjects("pay"), vec!["Invoice"]);
        // Sender address
        assert_eq!(subjects(&"cc".repeat(20)), vec!["Hello"]);
        // Recipient of the sent entry and sender of a received one
        assert_eq!(
            subjects(&format!("0x{}", "bb".repeat(20))),
            vec!["Lunch", "Invoice"]
        );
        assert!(subjects("nothing like this").is_empty());
    }

    #[test]
    fn test_empty_query_matches_everything() {
        let snap = snapshot();
        assert_eq!(search_entries(&snap, "").len(), 3);
    }
}
