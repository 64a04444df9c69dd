//! Transaction assembler
//!
//! Turns a quote provider payload into signed wire bytes:
//! - **payload**: base64-or-binary decoding, legacy vs versioned selection
//! - **instructions**: auxiliary transfer sizing and instruction slot rewrite
//! - **assembler**: signing and serialization into a [`SignedTransaction`]
//! - **errors**: [`AssembleError`] taxonomy
//!
//! ## Auxiliary transfer
//!
//! The assembler can overwrite one instruction of the provider transaction
//! (slot 1 by default) with a system transfer from the signer to a configured
//! account. This is a real value transfer charged to the user on top of the
//! swap. It is disabled unless `[auxiliary_transfer]` is explicitly enabled,
//! has no built-in destination, and each application is logged at `info`
//! with recipient and amount.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use solana_sdk::signature::Keypair;
//! use swap_sender::tx_builder::{assemble, RawTransactionPayload};
//!
//! # fn example(txn_base64: String) -> Result<(), swap_sender::tx_builder::AssembleError> {
//! let keypair = Keypair::new();
//! let payload = RawTransactionPayload::from_base64(txn_base64, true, false);
//! let signed = assemble(&payload, &keypair, None)?;
//! println!("ready to send {}", signed.signature());
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub use errors::AssembleError;

mod assembler;
mod instructions;
mod payload;

pub use assembler::{assemble, SignedTransaction};
pub use instructions::{
    apply_auxiliary_transfer, compute_auxiliary_transfer, scaled_lamports, AuxiliaryTransfer,
    NATIVE_MINT,
};
pub use payload::{DecodedTransaction, RawTransactionPayload, WireFormat};
