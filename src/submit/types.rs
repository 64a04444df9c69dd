use std::time::Duration;

use solana_sdk::hash::Hash;

use crate::rpc_manager::{ConfirmationLevel, SendOptions};

/// Default resend and status-poll interval
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(1000);

/// Default number of resends after the first send
pub const DEFAULT_CONFIRMATION_RETRIES: u32 = 30;

/// Default blocks subtracted from a blockhash's last valid height
pub const DEFAULT_BLOCK_HEIGHT_BUFFER: u64 = 150;

/// Send / confirm parameters for one submission
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionConfig {
    pub send_options: SendOptions,
    /// Resends after the first send; total sends are bounded by `retries + 1`
    pub confirmation_retries: u32,
    /// Wait before each resend
    pub confirmation_retry_timeout: Duration,
    /// Wait between status polls
    pub confirmation_check_interval: Duration,
    /// Succeed as soon as the RPC accepts the transaction
    pub skip_confirmation_check: bool,
    /// Target confirmation level
    pub commitment: ConfirmationLevel,
    pub last_valid_block_height_buffer: u64,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            send_options: SendOptions::default(),
            confirmation_retries: DEFAULT_CONFIRMATION_RETRIES,
            confirmation_retry_timeout: DEFAULT_INTERVAL,
            confirmation_check_interval: DEFAULT_INTERVAL,
            skip_confirmation_check: false,
            commitment: ConfirmationLevel::default(),
            last_valid_block_height_buffer: DEFAULT_BLOCK_HEIGHT_BUFFER,
        }
    }
}

/// Reference blockhash and the height past which a submission gives up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockhashWindow {
    blockhash: Hash,
    last_valid_block_height: u64,
    expiry_height: u64,
}

impl BlockhashWindow {
    /// `expiry_height` is `last_valid_block_height - buffer`, floored at zero
    pub fn new(blockhash: Hash, last_valid_block_height: u64, buffer: u64) -> Self {
        Self {
            blockhash,
            last_valid_block_height,
            expiry_height: last_valid_block_height.saturating_sub(buffer),
        }
    }

    pub fn blockhash(&self) -> &Hash {
        &self.blockhash
    }

    pub fn last_valid_block_height(&self) -> u64 {
        self.last_valid_block_height
    }

    pub fn expiry_height(&self) -> u64 {
        self.expiry_height
    }

    /// Whether a ledger at `height` is past the window
    pub fn is_expired_at(&self, height: u64) -> bool {
        height > self.expiry_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_expiry_height() {
        let window = BlockhashWindow::new(Hash::new_unique(), 1_000, 150);
        assert_eq!(window.expiry_height(), 850);
        assert!(!window.is_expired_at(850));
        assert!(window.is_expired_at(851));
    }

    #[test]
    fn test_window_buffer_saturates() {
        let window = BlockhashWindow::new(Hash::default(), 100, 150);
        assert_eq!(window.expiry_height(), 0);
        assert!(!window.is_expired_at(0));
        assert!(window.is_expired_at(1));
    }

    #[test]
    fn test_default_config() {
        let config = SubmissionConfig::default();
        assert_eq!(config.confirmation_retries, 30);
        assert_eq!(config.confirmation_retry_timeout, Duration::from_secs(1));
        assert_eq!(config.commitment, ConfirmationLevel::Confirmed);
        assert!(config.send_options.skip_preflight);
        assert!(!config.skip_confirmation_check);
    }
}
