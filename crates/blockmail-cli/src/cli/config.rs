use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use blockmail_core::models::Address;
use blockmail_core::CoreConfig;
use serde::{Deserialize, Serialize};

/// CLI configuration that can be loaded from a JSON file. Every key is
/// optional; missing ones fall back to the core defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CliConfig {
    /// JSON-RPC endpoint exposing the wallet accounts and the chain
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<String>,

    /// Deployed mail contract (0x-prefixed hex)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation_timeout_secs: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_poll_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_poll_ms: Option<u64>,

    /// Append logs to this file instead of stderr
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl CliConfig {
    /// Load config from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: CliConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// `$CONFIG_DIR/blockmail/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("blockmail").join("config.json"))
    }

    /// The file at the default location, or an empty config if there is none.
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("Failed to serialize config")
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to deserialize config")
    }

    pub fn to_core_config(&self) -> Result<CoreConfig> {
        let mut config = CoreConfig::default();
        if let Some(url) = &self.rpc_url {
            config.rpc_url = url.clone();
        }
        if let Some(address) = &self.contract_address {
            config.contract_address = address
                .parse::<Address>()
                .with_context(|| format!("Invalid contractAddress: {}", address))?;
        }
        if let Some(secs) = self.confirmation_timeout_secs {
            config.confirmation_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = self.receipt_poll_ms {
            config.receipt_poll_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = self.account_poll_ms {
            config.account_poll_interval = Duration::from_millis(ms);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use blockmail_core::constants::{DEFAULT_CONTRACT_ADDRESS, DEFAULT_RPC_URL};

    use super::*;

    #[test]
    fn test_parse_config_minimal() {
        let config = CliConfig::from_json("{}").unwrap();
        assert_eq!(config, CliConfig::default());

        let core = config.to_core_config().unwrap();
        assert_eq!(core.rpc_url, DEFAULT_RPC_URL);
        assert_eq!(core.contract_address, DEFAULT_CONTRACT_ADDRESS);
    }

    #[test]
    fn test_parse_config_with_overrides() {
        let json = r#"{
            "rpcUrl": "http://localhost:9999",
            "contractAddress": "0x1111111111111111111111111111111111111111",
            "confirmationTimeoutSecs": 5,
            "accountPollMs": 250
        }"#;
        let core = CliConfig::from_json(json).unwrap().to_core_config().unwrap();
        assert_eq!(core.rpc_url, "http://localhost:9999");
        assert_eq!(core.contract_address, Address::new([0x11; 20]));
        assert_eq!(core.confirmation_timeout, Duration::from_secs(5));
        assert_eq!(core.account_poll_interval, Duration::from_millis(250));
    }

    #[test]
    fn test_invalid_contract_address_is_rejected() {
        let config = CliConfig {
            contract_address: Some("0x1234".to_string()),
            ..CliConfig::default()
        };
        let err = config.to_core_config().unwrap_err();
        assert!(err.to_string().contains("contractAddress"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"rpcUrl": "http://node:8545", "logFile": "/tmp/blockmail.log"}}"#).unwrap();

        let config = CliConfig::load(file.path()).unwrap();
        assert_eq!(config.rpc_url.as_deref(), Some("http://node:8545"));
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/blockmail.log")));

        let round_trip = CliConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(round_trip, config);
    }

    #[test]
    fn test_load_missing_file_fails_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let err = CliConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("absent.json"));
    }
}
