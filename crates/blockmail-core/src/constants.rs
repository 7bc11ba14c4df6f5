use crate::models::Address;

/// Address of the deployed mail contract used when none is configured.
pub const DEFAULT_CONTRACT_ADDRESS: Address = Address::new([
    0x20, 0x7b, 0x75, 0xd3, 0x9e, 0x54, 0x0b, 0x16, 0xe9, 0xa3, 0x8b, 0x56, 0xab, 0xe2, 0x4e, 0x57,
    0xb0, 0x3d, 0xc1, 0x1d,
]);

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";

pub const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_RECEIPT_POLL_MS: u64 = 1_000;
pub const DEFAULT_ACCOUNT_POLL_MS: u64 = 2_000;

// Notification texts shown by the dashboard
pub const NO_SEARCH_RESULTS: &str = "No emails found matching your search";
pub const NO_RECEIVED_EMAILS: &str = "No received emails";
pub const NO_SENT_EMAILS: &str = "No sent emails";
pub const NO_STARRED_EMAILS: &str = "No starred emails";
pub const DRAFTS_PLACEHOLDER: &str = "Drafts coming soon";
pub const TRASH_PLACEHOLDER: &str = "Trash coming soon";
