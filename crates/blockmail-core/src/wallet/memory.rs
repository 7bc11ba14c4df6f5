use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::WalletProvider;
use crate::error::{MailError, MailResult};
use crate::models::Address;

/// In-process wallet with a fixed set of accounts. Backs demo mode and tests.
pub struct MemoryWallet {
    accounts: Mutex<Vec<Address>>,
    authorized: AtomicBool,
    reject_prompts: bool,
    available: AtomicBool,
}

impl MemoryWallet {
    pub fn new(accounts: Vec<Address>) -> Self {
        Self {
            accounts: Mutex::new(accounts),
            authorized: AtomicBool::new(false),
            reject_prompts: false,
            available: AtomicBool::new(true),
        }
    }

    /// A wallet that has already authorized this client.
    pub fn authorized(accounts: Vec<Address>) -> Self {
        let wallet = Self::new(accounts);
        wallet.authorized.store(true, Ordering::SeqCst);
        wallet
    }

    /// A wallet whose user declines every connection prompt.
    pub fn rejecting(mut self) -> Self {
        self.reject_prompts = true;
        self
    }

    /// Stands in for a missing wallet extension.
    pub fn unavailable() -> Self {
        let wallet = Self::new(Vec::new());
        wallet.set_available(false);
        wallet
    }

    /// Simulate the user switching or removing accounts in the wallet.
    pub fn set_accounts(&self, accounts: Vec<Address>) {
        *self.accounts.lock() = accounts;
    }

    /// Simulate the wallet endpoint going away or coming back.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> MailResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(MailError::wallet_unavailable("no wallet provider detected"))
        }
    }
}

#[async_trait]
impl WalletProvider for MemoryWallet {
    async fn accounts(&self) -> MailResult<Vec<Address>> {
        self.ensure_available()?;
        if self.authorized.load(Ordering::SeqCst) {
            Ok(self.accounts.lock().clone())
        } else {
            Ok(Vec::new())
        }
    }

    async fn request_accounts(&self) -> MailResult<Vec<Address>> {
        self.ensure_available()?;
        if self.reject_prompts {
            return Err(MailError::UserRejected);
        }
        self.authorized.store(true, Ordering::SeqCst);
        Ok(self.accounts.lock().clone())
    }
}
