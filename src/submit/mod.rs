//! Transaction submission
//!
//! [`SubmissionWaiter`] resends a signed transaction and polls its status
//! until it lands, fails on chain, or its [`BlockhashWindow`] closes.

pub mod errors;
mod types;
mod waiter;

pub use errors::SubmissionError;
pub use types::{
    BlockhashWindow, SubmissionConfig, DEFAULT_BLOCK_HEIGHT_BUFFER, DEFAULT_CONFIRMATION_RETRIES,
    DEFAULT_INTERVAL,
};
pub use waiter::{SubmissionOutcome, SubmissionWaiter};
