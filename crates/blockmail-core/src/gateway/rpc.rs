use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::ContractGateway;
use crate::abi::{self, Token};
use crate::config::CoreConfig;
use crate::error::{MailError, MailResult};
use crate::models::{Address, Message, Profile};
use crate::rpc::{from_hex_data, to_hex_data, JsonRpcClient};

#[derive(Debug, Deserialize)]
struct Receipt {
    #[serde(default)]
    status: Option<String>,
    #[serde(default, rename = "blockNumber")]
    block_number: Option<String>,
}

/// Gateway talking to the deployed mail contract through a JSON-RPC endpoint
/// that holds the caller's keys (`eth_sendTransaction`).
pub struct RpcGateway {
    client: Arc<JsonRpcClient>,
    contract: Address,
    confirmation_timeout: Duration,
    receipt_poll: Duration,
}

impl RpcGateway {
    pub fn new(client: Arc<JsonRpcClient>, config: &CoreConfig) -> Self {
        Self {
            client,
            contract: config.contract_address,
            confirmation_timeout: config.confirmation_timeout,
            receipt_poll: config.receipt_poll_interval,
        }
    }

    async fn call(&self, caller: Address, data: Vec<u8>) -> MailResult<Vec<u8>> {
        let result: String = self
            .client
            .request(
                "eth_call",
                json!([
                    {
                        "from": caller.to_hex(),
                        "to": self.contract.to_hex(),
                        "data": to_hex_data(&data),
                    },
                    "latest"
                ]),
            )
            .await?;
        Ok(from_hex_data(&result)?)
    }

    async fn read_messages(&self, caller: Address, signature: &str) -> MailResult<Vec<Message>> {
        let data = self.call(caller, abi::encode_call(signature, &[])).await?;
        let messages = abi::decode_messages(&data)?;
        tracing::debug!(%caller, signature, count = messages.len(), "read message list");
        Ok(messages)
    }

    /// Submit a transaction and wait until it is mined.
    async fn transact(&self, caller: Address, data: Vec<u8>) -> MailResult<()> {
        let tx_hash: String = self
            .client
            .request(
                "eth_sendTransaction",
                json!([{
                    "from": caller.to_hex(),
                    "to": self.contract.to_hex(),
                    "data": to_hex_data(&data),
                }]),
            )
            .await?;
        tracing::info!(%caller, tx = %tx_hash, "transaction submitted");

        match tokio::time::timeout(self.confirmation_timeout, self.wait_for_receipt(&tx_hash)).await {
            Ok(result) => result,
            Err(_) => Err(MailError::chain(format!(
                "transaction {} not confirmed within {}s",
                tx_hash,
                self.confirmation_timeout.as_secs()
            ))),
        }
    }

    async fn wait_for_receipt(&self, tx_hash: &str) -> MailResult<()> {
        loop {
            let receipt: Option<Receipt> = self
                .client
                .request("eth_getTransactionReceipt", json!([tx_hash]))
                .await?;
            match receipt_outcome(tx_hash, receipt.as_ref()) {
                Some(outcome) => return outcome,
                None => tokio::time::sleep(self.receipt_poll).await,
            }
        }
    }
}

/// `None` while the transaction is not mined yet.
fn receipt_outcome(tx_hash: &str, receipt: Option<&Receipt>) -> Option<MailResult<()>> {
    let receipt = receipt.filter(|r| r.block_number.is_some())?;
    match receipt.status.as_deref() {
        Some("0x0") => Some(Err(MailError::chain(format!(
            "transaction {} reverted",
            tx_hash
        )))),
        _ => {
            tracing::info!(tx = %tx_hash, "transaction confirmed");
            Some(Ok(()))
        }
    }
}

#[async_trait]
impl ContractGateway for RpcGateway {
    async fn send_email(&self, caller: Address, to: Address, subject: &str, body: &str) -> MailResult<()> {
        let data = abi::encode_call(
            abi::SEND_EMAIL,
            &[
                Token::Address(to),
                Token::String(subject.to_string()),
                Token::String(body.to_string()),
            ],
        );
        self.transact(caller, data).await
    }

    async fn sent_emails(&self, caller: Address) -> MailResult<Vec<Message>> {
        self.read_messages(caller, abi::GET_SENT_EMAILS).await
    }

    async fn received_emails(&self, caller: Address) -> MailResult<Vec<Message>> {
        self.read_messages(caller, abi::GET_RECEIVED_EMAILS).await
    }

    async fn starred_emails(&self, caller: Address) -> MailResult<Vec<Message>> {
        self.read_messages(caller, abi::GET_STARRED_EMAILS).await
    }

    async fn star(&self, caller: Address, index: u64, is_sent: bool) -> MailResult<()> {
        let data = abi::encode_call(abi::STAR_EMAIL, &[Token::Uint(index), Token::Bool(is_sent)]);
        self.transact(caller, data).await
    }

    async fn unstar(&self, caller: Address, index: u64, is_sent: bool) -> MailResult<()> {
        let data = abi::encode_call(abi::UNSTAR_EMAIL, &[Token::Uint(index), Token::Bool(is_sent)]);
        self.transact(caller, data).await
    }

    async fn delete(&self, caller: Address, index: u64, is_sent: bool) -> MailResult<()> {
        let data = abi::encode_call(abi::DELETE_EMAIL, &[Token::Uint(index), Token::Bool(is_sent)]);
        self.transact(caller, data).await
    }

    async fn get_profile(&self, caller: Address, address: Address) -> MailResult<Profile> {
        let data = self
            .call(caller, abi::encode_call(abi::GET_PROFILE, &[Token::Address(address)]))
            .await?;
        Ok(abi::decode_profile(&data)?)
    }

    async fn update_profile(&self, caller: Address, name: &str, avatar: &str) -> MailResult<()> {
        let data = abi::encode_call(
            abi::UPDATE_PROFILE,
            &[Token::String(name.to_string()), Token::String(avatar.to_string())],
        );
        self.transact(caller, data).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    fn receipt(status: Option<&str>, block_number: Option<&str>) -> Receipt {
        Receipt {
            status: status.map(str::to_string),
            block_number: block_number.map(str::to_string),
        }
    }

    #[test]
    fn test_receipt_outcome() {
        assert!(receipt_outcome("0x1", None).is_none());
        assert!(receipt_outcome("0x1", Some(&receipt(Some("0x1"), None))).is_none());
        assert_eq!(
            receipt_outcome("0x1", Some(&receipt(Some("0x1"), Some("0x10")))),
            Some(Ok(()))
        );
        assert!(matches!(
            receipt_outcome("0x1", Some(&receipt(Some("0x0"), Some("0x10")))),
            Some(Err(MailError::Chain { .. }))
        ));
    }

    /// Split one HTTP request body off the front of `buf` once it is complete.
    fn take_request(buf: &mut Vec<u8>) -> Option<Vec<u8>> {
        let header_end = buf.windows(4).position(|w| w == b"\r\n\r\n")? + 4;
        let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
        let len = headers
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if buf.len() < header_end + len {
            return None;
        }
        let body = buf[header_end..header_end + len].to_vec();
        buf.drain(..header_end + len);
        Some(body)
    }

    /// JSON-RPC node that accepts every transaction and always answers
    /// receipt queries with `receipt`.
    async fn stub_node(receipt: Value) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let receipt = receipt.clone();
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    let mut chunk = [0u8; 4096];
                    loop {
                        let n = match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => n,
                        };
                        buf.extend_from_slice(&chunk[..n]);
                        while let Some(body) = take_request(&mut buf) {
                            let request: Value = serde_json::from_slice(&body).unwrap();
                            let result = match request["method"].as_str() {
                                Some("eth_sendTransaction") => json!("0xfeed"),
                                _ => receipt.clone(),
                            };
                            let payload =
                                json!({"jsonrpc": "2.0", "id": request["id"], "result": result}).to_string();
                            let response = format!(
                                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\n\r\n{}",
                                payload.len(),
                                payload
                            );
                            if socket.write_all(response.as_bytes()).await.is_err() {
                                return;
                            }
                        }
                    }
                });
            }
        });
        url
    }

    fn gateway(url: String) -> RpcGateway {
        let mut config = CoreConfig::default();
        config.confirmation_timeout = Duration::from_millis(300);
        config.receipt_poll_interval = Duration::from_millis(20);
        RpcGateway::new(Arc::new(JsonRpcClient::new(url)), &config)
    }

    fn addr(byte: u8) -> Address {
        Address::new([byte; 20])
    }

    #[tokio::test]
    async fn test_write_confirmed() {
        let url = stub_node(json!({"status": "0x1", "blockNumber": "0x2"})).await;
        let gateway = gateway(url);
        gateway.send_email(addr(1), addr(2), "Hi", "hello").await.unwrap();
        gateway.star(addr(1), 0, false).await.unwrap();
    }

    #[tokio::test]
    async fn test_reverted_write_is_chain_error() {
        let url = stub_node(json!({"status": "0x0", "blockNumber": "0x2"})).await;
        let err = gateway(url).delete(addr(1), 3, true).await.unwrap_err();
        match err {
            MailError::Chain { message } => assert!(message.contains("reverted")),
            other => panic!("expected chain error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unmined_write_times_out() {
        let url = stub_node(Value::Null).await;
        let err = gateway(url).unstar(addr(1), 0, false).await.unwrap_err();
        match err {
            MailError::Chain { message } => assert!(message.contains("not confirmed")),
            other => panic!("expected chain error, got {:?}", other),
        }
    }
}
