//! Wallet Session Adapter: connection to the external wallet and the local
//! session record built on top of it.

pub mod memory;
pub mod rpc;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{MailError, MailResult};
use crate::models::{Address, Session};

pub use memory::MemoryWallet;
pub use rpc::RpcWallet;

/// The external wallet. Key management and signing stay on the other side.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Already-authorized accounts, without prompting (`eth_accounts`).
    async fn accounts(&self) -> MailResult<Vec<Address>>;

    /// Prompt the user for authorization (`eth_requestAccounts`).
    async fn request_accounts(&self) -> MailResult<Vec<Address>>;
}

/// Reported when the wallet's account list no longer matches the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountChange {
    pub previous: Option<Address>,
    pub current: Option<Address>,
    pub accounts: Vec<Address>,
}

pub struct WalletSession {
    provider: Arc<dyn WalletProvider>,
    session: Session,
}

impl WalletSession {
    pub fn new(provider: Arc<dyn WalletProvider>) -> Self {
        Self {
            provider,
            session: Session::default(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Silent reconnect: connects when the wallet already authorized us.
    pub async fn check_existing_session(&mut self) -> MailResult<Vec<Address>> {
        let accounts = self.provider.accounts().await?;
        if !accounts.is_empty() {
            tracing::info!(account = %accounts[0], "restored existing wallet session");
            self.session.connect(accounts.clone());
        }
        Ok(accounts)
    }

    pub async fn request_connection(&mut self) -> MailResult<Vec<Address>> {
        let accounts = self.provider.request_accounts().await?;
        if accounts.is_empty() {
            return Err(MailError::UserRejected);
        }
        tracing::info!(account = %accounts[0], count = accounts.len(), "wallet connected");
        self.session.connect(accounts.clone());
        Ok(accounts)
    }

    /// Local only; the wallet keeps its authorization.
    pub fn disconnect(&mut self) {
        tracing::info!("wallet session disconnected");
        self.session.disconnect();
    }

    pub fn switch_account(&mut self, address: Address) -> MailResult<()> {
        if !self.session.connected {
            return Err(MailError::NotConnected);
        }
        if self.session.switch_to(address) {
            Ok(())
        } else {
            Err(MailError::validation(
                "account",
                format!("{} is not an authorized account", address),
            ))
        }
    }

    /// Re-query the wallet and apply any change to the account list. Does
    /// nothing while disconnected, so a local disconnect is never undone.
    pub async fn poll_accounts(&mut self) -> MailResult<Option<AccountChange>> {
        if !self.session.connected {
            return Ok(None);
        }
        let accounts = self.provider.accounts().await?;
        if accounts == self.session.accounts {
            return Ok(None);
        }

        let previous = self.session.active();
        if accounts.is_empty() {
            self.session.disconnect();
        } else {
            self.session.connect(accounts.clone());
        }
        let change = AccountChange {
            previous,
            current: self.session.active(),
            accounts,
        };
        tracing::info!(previous = ?change.previous, current = ?change.current, "wallet accounts changed");
        Ok(Some(change))
    }
}
