//! Configuration module
//!
//! This module handles configuration loading from TOML files and
//! environment variables, and provides structured configuration types.
//! Endpoint and account addresses live here rather than in constants so
//! tests can point everything at fixtures.

use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use solana_sdk::native_token::LAMPORTS_PER_SOL;

use crate::rpc_manager::{ConfirmationLevel, SendOptions};
use crate::submit::SubmissionConfig;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// RPC endpoint configuration
    pub rpc: RpcConfig,

    /// Wallet configuration
    #[serde(default)]
    pub wallet: WalletConfig,

    /// Quote provider configuration
    #[serde(default)]
    pub quote: QuoteConfig,

    /// Send / confirm behaviour
    #[serde(default)]
    pub submission: SubmissionSection,

    /// Optional transfer written into every assembled transaction
    #[serde(default)]
    pub auxiliary_transfer: AuxiliaryTransferConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Ledger RPC endpoint
    pub url: String,

    /// Request timeout in seconds
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Path to a keypair JSON file
    #[serde(default)]
    pub keypair_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteConfig {
    /// Swap API base URL
    #[serde(default = "default_quote_url")]
    pub base_url: String,

    /// Slippage tolerance passed to the provider (percent)
    #[serde(default = "default_slippage")]
    pub slippage: f64,

    /// Priority fee passed to the provider (SOL)
    #[serde(default = "default_priority_fee")]
    pub priority_fee: f64,

    /// Request legacy transactions for Jupiter routes
    #[serde(default)]
    pub force_legacy: bool,

    /// HTTP timeout in seconds
    #[serde(default = "default_quote_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionSection {
    /// Skip preflight simulation
    #[serde(default = "default_true")]
    pub skip_preflight: bool,

    /// Max resend attempts after the first send
    #[serde(default = "default_confirmation_retries")]
    pub confirmation_retries: u32,

    /// Delay between resends in milliseconds
    #[serde(default = "default_interval_ms")]
    pub confirmation_retry_timeout_ms: u64,

    /// Delay between status polls in milliseconds
    #[serde(default = "default_interval_ms")]
    pub confirmation_check_interval_ms: u64,

    /// Blocks subtracted from the blockhash's last valid height
    #[serde(default = "default_block_height_buffer")]
    pub last_valid_block_height_buffer: u64,

    /// Declare success once the RPC accepts the transaction
    #[serde(default)]
    pub skip_confirmation_check: bool,

    /// Target confirmation level
    #[serde(default)]
    pub commitment: ConfirmationLevel,
}

/// Auxiliary transfer settings
///
/// When enabled, instruction `instruction_index` of every assembled
/// transaction is replaced by a transfer of
/// `round(native_amount × scale_factor × units_per_whole)` lamports from the
/// wallet to `recipient`. Disabled by default.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuxiliaryTransferConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Base58 destination account; required when enabled
    #[serde(default)]
    pub recipient: Option<String>,

    /// Fraction of the native trade value to transfer
    #[serde(default)]
    pub scale_factor: f64,

    /// Instruction slot to overwrite
    #[serde(default = "default_instruction_index")]
    pub instruction_index: usize,

    /// Smallest units per whole native token
    #[serde(default = "default_units_per_whole")]
    pub units_per_whole: u64,
}

// Default value functions
fn default_rpc_timeout() -> u64 { 30 }
fn default_quote_url() -> String { "https://swap-api.solanatracker.io".to_string() }
fn default_slippage() -> f64 { 20.0 }
fn default_priority_fee() -> f64 { 0.0005 }
fn default_quote_timeout() -> u64 { 10 }
fn default_true() -> bool { true }
fn default_confirmation_retries() -> u32 { 30 }
fn default_interval_ms() -> u64 { 1000 }
fn default_block_height_buffer() -> u64 { 150 }
fn default_instruction_index() -> usize { 1 }
fn default_units_per_whole() -> u64 { LAMPORTS_PER_SOL }

impl Default for QuoteConfig {
    fn default() -> Self {
        Self {
            base_url: default_quote_url(),
            slippage: default_slippage(),
            priority_fee: default_priority_fee(),
            force_legacy: false,
            timeout_secs: default_quote_timeout(),
        }
    }
}

impl Default for SubmissionSection {
    fn default() -> Self {
        Self {
            skip_preflight: default_true(),
            confirmation_retries: default_confirmation_retries(),
            confirmation_retry_timeout_ms: default_interval_ms(),
            confirmation_check_interval_ms: default_interval_ms(),
            last_valid_block_height_buffer: default_block_height_buffer(),
            skip_confirmation_check: false,
            commitment: ConfirmationLevel::default(),
        }
    }
}

impl Default for AuxiliaryTransferConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            recipient: None,
            scale_factor: 0.0,
            instruction_index: default_instruction_index(),
            units_per_whole: default_units_per_whole(),
        }
    }
}

impl SubmissionSection {
    /// Immutable submission config for the waiter
    pub fn submission_config(&self) -> SubmissionConfig {
        SubmissionConfig {
            send_options: SendOptions {
                skip_preflight: self.skip_preflight,
                preflight_commitment: None,
            },
            confirmation_retries: self.confirmation_retries,
            confirmation_retry_timeout: Duration::from_millis(self.confirmation_retry_timeout_ms),
            confirmation_check_interval: Duration::from_millis(
                self.confirmation_check_interval_ms,
            ),
            skip_confirmation_check: self.skip_confirmation_check,
            commitment: self.commitment,
            last_valid_block_height_buffer: self.last_valid_block_height_buffer,
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides
    ///
    /// `.env` is honoured; `SWAP_RPC_URL` and `SWAP_KEYPAIR_PATH` override
    /// the file values.
    pub fn from_file_with_env(path: &str) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::from_file(path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus the same environment overrides, for runs without a file
    pub fn default_with_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("SWAP_RPC_URL") {
            self.rpc.url = url;
        }
        if let Some(path) = lookup("SWAP_KEYPAIR_PATH") {
            self.wallet.keypair_path = Some(path);
        }
    }

    /// Reject configurations that cannot be run as written
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.rpc.url.trim().is_empty() {
            anyhow::bail!("rpc.url must not be empty");
        }

        let aux = &self.auxiliary_transfer;
        if aux.enabled {
            let recipient = aux
                .recipient
                .as_deref()
                .context("auxiliary_transfer.recipient is required when enabled")?;
            recipient
                .parse::<solana_sdk::pubkey::Pubkey>()
                .with_context(|| format!("auxiliary_transfer.recipient is not a pubkey: {}", recipient))?;
            if !(aux.scale_factor.is_finite() && aux.scale_factor > 0.0) {
                anyhow::bail!(
                    "auxiliary_transfer.scale_factor must be positive when enabled (got {})",
                    aux.scale_factor
                );
            }
        }
        Ok(())
    }

    /// Create default configuration
    pub fn default() -> Self {
        Self {
            rpc: RpcConfig {
                url: "https://api.mainnet-beta.solana.com".to_string(),
                timeout_secs: default_rpc_timeout(),
            },
            wallet: WalletConfig::default(),
            quote: QuoteConfig::default(),
            submission: SubmissionSection::default(),
            auxiliary_transfer: AuxiliaryTransferConfig::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert!(!config.rpc.url.is_empty());
        assert!(!config.auxiliary_transfer.enabled);
        assert_eq!(config.submission.confirmation_retries, 30);
        assert_eq!(config.submission.last_valid_block_height_buffer, 150);
        config.validate().unwrap();
    }

    #[test]
    fn test_minimal_file_uses_defaults() {
        let file = write_config("[rpc]\nurl = \"http://localhost:8899\"\n");
        let config = Config::from_file(file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.rpc.url, "http://localhost:8899");
        assert_eq!(config.quote.slippage, 20.0);
        assert_eq!(config.submission.commitment, ConfirmationLevel::Confirmed);

        let submission = config.submission.submission_config();
        assert_eq!(submission.confirmation_retry_timeout, Duration::from_millis(1000));
        assert!(submission.send_options.skip_preflight);
    }

    #[test]
    fn test_full_submission_section() {
        let file = write_config(
            r#"
[rpc]
url = "http://localhost:8899"

[submission]
confirmation_retries = 2
confirmation_retry_timeout_ms = 10
confirmation_check_interval_ms = 5
skip_confirmation_check = true
commitment = "finalized"
"#,
        );
        let config = Config::from_file(file.path().to_str().unwrap()).unwrap();
        let submission = config.submission.submission_config();

        assert_eq!(submission.confirmation_retries, 2);
        assert_eq!(submission.confirmation_check_interval, Duration::from_millis(5));
        assert!(submission.skip_confirmation_check);
        assert_eq!(submission.commitment, ConfirmationLevel::Finalized);
    }

    #[test]
    fn test_enabled_auxiliary_requires_recipient_and_scale() {
        let mut config = Config::default();
        config.auxiliary_transfer.enabled = true;
        assert!(config.validate().is_err());

        config.auxiliary_transfer.recipient =
            Some(solana_sdk::pubkey::Pubkey::new_unique().to_string());
        assert!(config.validate().is_err());

        config.auxiliary_transfer.scale_factor = 0.001;
        config.validate().unwrap();

        config.auxiliary_transfer.recipient = Some("not-a-key".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides_apply_to_defaults() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            "SWAP_RPC_URL" => Some("http://localhost:8899".to_string()),
            "SWAP_KEYPAIR_PATH" => Some("/tmp/id.json".to_string()),
            _ => None,
        });

        assert_eq!(config.rpc.url, "http://localhost:8899");
        assert_eq!(config.wallet.keypair_path.as_deref(), Some("/tmp/id.json"));
    }

    #[test]
    fn test_empty_rpc_override_fails_validation() {
        let mut config = Config::default();
        config.apply_overrides(|key| (key == "SWAP_RPC_URL").then(String::new));
        assert!(config.validate().is_err());
    }
}
