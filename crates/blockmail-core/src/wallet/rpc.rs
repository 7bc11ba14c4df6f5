use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::WalletProvider;
use crate::error::{MailError, MailResult};
use crate::models::Address;
use crate::rpc::{JsonRpcClient, RpcError, CODE_METHOD_NOT_FOUND, CODE_USER_REJECTED};

/// Wallet reached over JSON-RPC: a signer-enabled node or a wallet bridge
/// that answers `eth_accounts` / `eth_requestAccounts`.
pub struct RpcWallet {
    client: Arc<JsonRpcClient>,
}

impl RpcWallet {
    pub fn new(client: Arc<JsonRpcClient>) -> Self {
        Self { client }
    }

    async fn fetch(&self, method: &str) -> Result<Vec<Address>, RpcError> {
        let raw: Vec<String> = self.client.request(method, json!([])).await?;
        raw.iter()
            .map(|account| {
                account
                    .parse()
                    .map_err(|e| RpcError::InvalidResponse(format!("account {}: {}", account, e)))
            })
            .collect()
    }
}

#[async_trait]
impl WalletProvider for RpcWallet {
    async fn accounts(&self) -> MailResult<Vec<Address>> {
        self.fetch("eth_accounts").await.map_err(|e| {
            tracing::error!(url = self.client.url(), error = %e, "eth_accounts failed");
            MailError::wallet_unavailable(e)
        })
    }

    async fn request_accounts(&self) -> MailResult<Vec<Address>> {
        match self.fetch("eth_requestAccounts").await {
            Ok(accounts) => Ok(accounts),
            Err(e) if e.code() == Some(CODE_USER_REJECTED) => Err(MailError::UserRejected),
            Err(e) if e.code() == Some(CODE_METHOD_NOT_FOUND) => {
                tracing::debug!("eth_requestAccounts unsupported, falling back to eth_accounts");
                self.accounts().await
            }
            Err(e) => {
                tracing::error!(url = self.client.url(), error = %e, "eth_requestAccounts failed");
                Err(MailError::wallet_unavailable(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_endpoint_is_wallet_unavailable() {
        // Nothing listens on port 1, so the connection is refused.
        let wallet = RpcWallet::new(Arc::new(JsonRpcClient::new("http://127.0.0.1:1")));
        assert!(matches!(
            wallet.accounts().await,
            Err(MailError::WalletUnavailable { .. })
        ));
        assert!(matches!(
            wallet.request_accounts().await,
            Err(MailError::WalletUnavailable { .. })
        ));
    }
}
