use std::time::Duration;

use crate::constants::{
    DEFAULT_ACCOUNT_POLL_MS, DEFAULT_CONFIRMATION_TIMEOUT_SECS, DEFAULT_CONTRACT_ADDRESS,
    DEFAULT_RECEIPT_POLL_MS, DEFAULT_RPC_URL,
};
use crate::models::Address;

#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// JSON-RPC endpoint of the wallet / node
    pub rpc_url: String,
    pub contract_address: Address,
    /// Upper bound on waiting for a write to be mined
    pub confirmation_timeout: Duration,
    pub receipt_poll_interval: Duration,
    /// How often the worker re-checks the wallet's account list
    pub account_poll_interval: Duration,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            contract_address: DEFAULT_CONTRACT_ADDRESS,
            confirmation_timeout: Duration::from_secs(DEFAULT_CONFIRMATION_TIMEOUT_SECS),
            receipt_poll_interval: Duration::from_millis(DEFAULT_RECEIPT_POLL_MS),
            account_poll_interval: Duration::from_millis(DEFAULT_ACCOUNT_POLL_MS),
        }
    }
}
