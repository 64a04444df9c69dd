//! Swap quote provider
//!
//! [`SwapApiClient`] talks to a Solana Tracker compatible swap API: `GET
//! /swap` returns a ready-to-sign transaction plus the quoted rate. The same
//! endpoint doubles as the [`RateProvider`] used to value non-native inputs.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;
use tracing::debug;

use crate::config::QuoteConfig;
use crate::tx_builder::{RawTransactionPayload, NATIVE_MINT};

/// Slippage used for rate-only lookups (percent)
const RATE_SLIPPAGE: f64 = 25.0;

/// Priority fee used for rate-only lookups (SOL)
const RATE_PRIORITY_FEE: f64 = 5e-7;

/// Longest error body kept in [`QuoteError::Api`]
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Swap API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Decode error: {0}")]
    Decode(String),
}

impl QuoteError {
    /// Whether the same request could succeed later
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::Decode(_) => false,
        }
    }
}

impl From<reqwest::Error> for QuoteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Http(err.to_string())
        }
    }
}

/// Parameters of a swap quote
#[derive(Debug, Clone, PartialEq)]
pub struct SwapRequest {
    pub from: Pubkey,
    pub to: Pubkey,
    /// Amount of `from`, in whole tokens
    pub amount: f64,
    /// Slippage tolerance (percent)
    pub slippage: f64,
    pub payer: Pubkey,
    /// Priority fee (SOL)
    pub priority_fee: f64,
    /// Ask for a legacy transaction even on Jupiter routes
    pub force_legacy: bool,
}

impl SwapRequest {
    /// Request for `amount` of `from` into `to`, with slippage and fees from config
    pub fn from_config(
        from: Pubkey,
        to: Pubkey,
        amount: f64,
        payer: Pubkey,
        config: &QuoteConfig,
    ) -> Self {
        Self {
            from,
            to,
            amount,
            slippage: config.slippage,
            payer,
            priority_fee: config.priority_fee,
            force_legacy: config.force_legacy,
        }
    }

    fn query(&self) -> [(&'static str, String); 7] {
        [
            ("from", self.from.to_string()),
            ("to", self.to.to_string()),
            ("fromAmount", self.amount.to_string()),
            ("slippage", self.slippage.to_string()),
            ("payer", self.payer.to_string()),
            ("priorityFee", self.priority_fee.to_string()),
            ("forceLegacy", self.force_legacy.to_string()),
        ]
    }
}

/// Quoted rate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRate {
    pub amount_in: f64,
    pub amount_out: f64,
    #[serde(default)]
    pub min_amount_out: Option<f64>,
    #[serde(default)]
    pub price_impact: Option<f64>,
}

/// `GET /swap` response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapResponse {
    /// Base64 serialized transaction
    pub txn: String,
    #[serde(default)]
    pub is_jupiter: bool,
    #[serde(default)]
    pub force_legacy: bool,
    #[serde(default)]
    pub rate: Option<SwapRate>,
}

impl SwapResponse {
    /// Transaction payload for the assembler
    pub fn payload(&self) -> RawTransactionPayload {
        RawTransactionPayload::from_base64(self.txn.clone(), self.is_jupiter, self.force_legacy)
    }
}

/// Source of swap transactions
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn get_swap_instructions(&self, request: &SwapRequest) -> Result<SwapResponse, QuoteError>;
}

/// Values an amount of some token in the native asset
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Native amount (whole SOL) received for `amount` of `input_mint`
    async fn native_amount_out(
        &self,
        input_mint: &Pubkey,
        amount: f64,
        payer: &Pubkey,
    ) -> Result<f64, QuoteError>;
}

/// HTTP swap API client
#[derive(Debug, Clone)]
pub struct SwapApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl SwapApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, QuoteError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &QuoteConfig) -> Result<Self, QuoteError> {
        Self::new(config.base_url.clone(), Duration::from_secs(config.timeout_secs))
    }

    async fn fetch(&self, request: &SwapRequest) -> Result<SwapResponse, QuoteError> {
        let url = format!("{}/swap", self.base_url);
        debug!(from = %request.from, to = %request.to, amount = request.amount, "Requesting swap quote");

        let response = self.client.get(&url).query(&request.query()).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message: String = body.chars().take(MAX_ERROR_BODY).collect();
            return Err(QuoteError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| QuoteError::Decode(e.to_string()))
    }
}

#[async_trait]
impl QuoteProvider for SwapApiClient {
    async fn get_swap_instructions(&self, request: &SwapRequest) -> Result<SwapResponse, QuoteError> {
        self.fetch(request).await
    }
}

#[async_trait]
impl RateProvider for SwapApiClient {
    async fn native_amount_out(
        &self,
        input_mint: &Pubkey,
        amount: f64,
        payer: &Pubkey,
    ) -> Result<f64, QuoteError> {
        let request = SwapRequest {
            from: *input_mint,
            to: NATIVE_MINT,
            amount,
            slippage: RATE_SLIPPAGE,
            payer: *payer,
            priority_fee: RATE_PRIORITY_FEE,
            force_legacy: true,
        };
        let response = self.fetch(&request).await?;
        response
            .rate
            .map(|rate| rate.amount_out)
            .ok_or_else(|| QuoteError::Decode("response carries no rate".to_string()))
    }
}
