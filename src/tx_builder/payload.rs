//! Provider payload decoding
//!
//! Quote providers hand back the unsigned swap transaction either as base64
//! text (the usual JSON transport) or as bytes that were already decoded by
//! the caller. Both are accepted; which one it was does not matter to the
//! rest of the assembler.

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use solana_sdk::transaction::{Transaction, VersionedTransaction};

use crate::tx_builder::errors::AssembleError;

/// Transaction wire format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    /// Legacy `Transaction` layout
    Legacy,
    /// Versioned (v0) `VersionedTransaction` layout
    Versioned,
}

/// Raw transaction payload as returned by a quote provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTransactionPayload {
    /// Base64 text or already-decoded wire bytes
    pub txn: Vec<u8>,

    /// Provider reports a versioned (Jupiter-routed) transaction
    pub versioned: bool,

    /// Legacy layout was forced when the payload was requested
    pub force_legacy: bool,
}

impl RawTransactionPayload {
    /// Payload from base64 text
    pub fn from_base64(txn: impl Into<String>, versioned: bool, force_legacy: bool) -> Self {
        Self {
            txn: txn.into().into_bytes(),
            versioned,
            force_legacy,
        }
    }

    /// Payload from already-decoded bytes
    pub fn from_bytes(txn: Vec<u8>, versioned: bool, force_legacy: bool) -> Self {
        Self {
            txn,
            versioned,
            force_legacy,
        }
    }

    /// Wire format implied by the provider flags
    pub fn wire_format(&self) -> WireFormat {
        if self.versioned && !self.force_legacy {
            WireFormat::Versioned
        } else {
            WireFormat::Legacy
        }
    }

    /// Decode the payload into a transaction of the expected wire format
    ///
    /// Base64 text is tried first, then the raw bytes. Either one succeeding
    /// is enough; only when both fail is a [`AssembleError::Decode`] returned.
    pub fn decode(&self) -> Result<DecodedTransaction, AssembleError> {
        let format = self.wire_format();

        let text_error = match decode_base64_text(&self.txn) {
            Ok(bytes) => match DecodedTransaction::from_wire(&bytes, format) {
                Ok(tx) => return Ok(tx),
                Err(e) => e,
            },
            Err(e) => e,
        };

        DecodedTransaction::from_wire(&self.txn, format).map_err(|binary_error| {
            AssembleError::decode(format!(
                "{format:?} payload unreadable as base64 text ({text_error}) or binary ({binary_error})"
            ))
        })
    }
}

/// A decoded, not yet signed, provider transaction
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedTransaction {
    /// Legacy transaction
    Legacy(Transaction),
    /// Versioned transaction
    Versioned(VersionedTransaction),
}

impl DecodedTransaction {
    fn from_wire(bytes: &[u8], format: WireFormat) -> Result<Self, String> {
        if bytes.is_empty() {
            return Err("empty payload".to_string());
        }
        match format {
            WireFormat::Legacy => bincode::deserialize::<Transaction>(bytes)
                .map(Self::Legacy)
                .map_err(|e| e.to_string()),
            WireFormat::Versioned => bincode::deserialize::<VersionedTransaction>(bytes)
                .map(Self::Versioned)
                .map_err(|e| e.to_string()),
        }
    }

    /// Wire format of this transaction
    pub fn wire_format(&self) -> WireFormat {
        match self {
            Self::Legacy(_) => WireFormat::Legacy,
            Self::Versioned(_) => WireFormat::Versioned,
        }
    }
}

fn decode_base64_text(raw: &[u8]) -> Result<Vec<u8>, String> {
    let text = std::str::from_utf8(raw).map_err(|e| e.to_string())?;
    BASE64_STANDARD
        .decode(text.trim())
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::{
        hash::Hash,
        message::{v0, Message, VersionedMessage},
        pubkey::Pubkey,
        signature::Keypair,
        signer::Signer,
    };
    #[allow(deprecated)]
    use solana_sdk::system_instruction;

    fn legacy_bytes(payer: &Keypair) -> Vec<u8> {
        let ix = system_instruction::transfer(&payer.pubkey(), &Pubkey::new_unique(), 5);
        let message = Message::new_with_blockhash(&[ix], Some(&payer.pubkey()), &Hash::new_unique());
        bincode::serialize(&Transaction::new_unsigned(message)).unwrap()
    }

    fn versioned_bytes(payer: &Keypair) -> Vec<u8> {
        let ix = system_instruction::transfer(&payer.pubkey(), &Pubkey::new_unique(), 5);
        let message =
            v0::Message::try_compile(&payer.pubkey(), &[ix], &[], Hash::new_unique()).unwrap();
        let tx = VersionedTransaction {
            signatures: vec![Default::default()],
            message: VersionedMessage::V0(message),
        };
        bincode::serialize(&tx).unwrap()
    }

    #[test]
    fn test_wire_format_flags() {
        assert_eq!(
            RawTransactionPayload::from_bytes(vec![], true, false).wire_format(),
            WireFormat::Versioned
        );
        assert_eq!(
            RawTransactionPayload::from_bytes(vec![], true, true).wire_format(),
            WireFormat::Legacy
        );
        assert_eq!(
            RawTransactionPayload::from_bytes(vec![], false, false).wire_format(),
            WireFormat::Legacy
        );
    }

    #[test]
    fn test_decode_base64_legacy() {
        let payer = Keypair::new();
        let text = BASE64_STANDARD.encode(legacy_bytes(&payer));
        let payload = RawTransactionPayload::from_base64(text, false, false);

        let decoded = payload.decode().unwrap();
        assert_eq!(decoded.wire_format(), WireFormat::Legacy);
    }

    #[test]
    fn test_decode_binary_falls_back_without_error() {
        let payer = Keypair::new();
        let payload = RawTransactionPayload::from_bytes(versioned_bytes(&payer), true, false);

        let decoded = payload.decode().unwrap();
        assert!(matches!(decoded, DecodedTransaction::Versioned(_)));
    }

    #[test]
    fn test_decode_tolerates_surrounding_whitespace() {
        let payer = Keypair::new();
        let text = format!("  {}\n", BASE64_STANDARD.encode(versioned_bytes(&payer)));
        let payload = RawTransactionPayload::from_base64(text, true, false);

        assert!(payload.decode().is_ok());
    }

    #[test]
    fn test_decode_garbage_is_decode_error() {
        let payload = RawTransactionPayload::from_base64("not a transaction!!", false, false);
        let err = payload.decode().unwrap_err();
        assert!(matches!(err, AssembleError::Decode(_)));

        let payload = RawTransactionPayload::from_bytes(vec![], true, false);
        assert!(matches!(payload.decode(), Err(AssembleError::Decode(_))));
    }
}
