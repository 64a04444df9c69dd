//! Auxiliary transfer planning and instruction slot rewriting
//!
//! The auxiliary transfer is a plain system transfer from the signer to a
//! configured account, written over one instruction slot of the provider
//! transaction. It moves value out of the user's wallet on top of the swap
//! itself, so it is opt-in: [`compute_auxiliary_transfer`] returns `None`
//! unless `[auxiliary_transfer]` is enabled with an explicit recipient and
//! scale factor, and every application is logged.
//!
//! Sizing:
//! - native input: `round(amount_in × scale_factor × units_per_whole)`
//! - other input: `round(amount_out × scale_factor × units_per_whole)` where
//!   `amount_out` is the provider's native quote for `amount_in`

use std::str::FromStr;

use solana_sdk::{instruction::CompiledInstruction, pubkey, pubkey::Pubkey};
#[allow(deprecated)]
use solana_sdk::{system_instruction, system_program};
use tracing::debug;

use crate::compat::AccountTable;
use crate::config::AuxiliaryTransferConfig;
use crate::quote_provider::RateProvider;
use crate::tx_builder::errors::AssembleError;

/// Wrapped SOL mint, used by swap APIs to denote the native asset
pub const NATIVE_MINT: Pubkey = pubkey!("So11111111111111111111111111111111111111112");

/// A planned auxiliary transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuxiliaryTransfer {
    /// Destination account
    pub recipient: Pubkey,
    /// Amount in lamports
    pub lamports: u64,
    /// Instruction slot that is overwritten
    pub slot: usize,
}

/// Compute the auxiliary transfer for a swap of `amount_in` units of `input_mint`
///
/// Returns `Ok(None)` when the auxiliary transfer is disabled. The rate
/// provider is only consulted for non-native inputs.
///
/// # Errors
///
/// - [`AssembleError::Configuration`] when enabled without a valid recipient
/// - [`AssembleError::Pricing`] when the rate lookup fails
/// - [`AssembleError::AuxiliaryAmount`] when the result is not a lamport count
pub async fn compute_auxiliary_transfer(
    amount_in: f64,
    input_mint: &Pubkey,
    payer: &Pubkey,
    config: &AuxiliaryTransferConfig,
    rates: &dyn RateProvider,
) -> Result<Option<AuxiliaryTransfer>, AssembleError> {
    if !config.enabled {
        return Ok(None);
    }

    let recipient = config
        .recipient
        .as_deref()
        .ok_or_else(|| {
            AssembleError::Configuration("auxiliary_transfer.recipient is required".to_string())
        })
        .and_then(|raw| {
            Pubkey::from_str(raw).map_err(|e| {
                AssembleError::Configuration(format!("auxiliary_transfer.recipient: {e}"))
            })
        })?;

    let native_amount = if *input_mint == NATIVE_MINT {
        amount_in
    } else {
        rates
            .native_amount_out(input_mint, amount_in, payer)
            .await
            .map_err(|e| AssembleError::Pricing(e.to_string()))?
    };

    let lamports = scaled_lamports(native_amount, config.scale_factor, config.units_per_whole)?;
    debug!(
        input_mint = %input_mint,
        amount_in,
        native_amount,
        lamports,
        "Computed auxiliary transfer"
    );

    Ok(Some(AuxiliaryTransfer {
        recipient,
        lamports,
        slot: config.instruction_index,
    }))
}

/// `round(amount × scale_factor × units_per_whole)`, rounding half away from zero
pub fn scaled_lamports(
    amount: f64,
    scale_factor: f64,
    units_per_whole: u64,
) -> Result<u64, AssembleError> {
    let scaled = (amount * scale_factor * units_per_whole as f64).round();
    if !scaled.is_finite() || scaled < 0.0 {
        return Err(AssembleError::invalid_amount(format!(
            "{amount} × {scale_factor} × {units_per_whole} is not a non-negative amount"
        )));
    }
    if scaled >= u64::MAX as f64 {
        return Err(AssembleError::invalid_amount(format!(
            "{scaled} lamports overflows u64"
        )));
    }
    Ok(scaled as u64)
}

/// Overwrite the transfer's slot with `from → recipient` for `lamports`
///
/// The recipient is added as a writable non-signer and the system program as
/// a readonly non-signer when the message does not list them yet.
pub fn apply_auxiliary_transfer(
    table: &mut AccountTable<'_>,
    from: &Pubkey,
    transfer: &AuxiliaryTransfer,
) -> Result<(), AssembleError> {
    let len = table.instruction_count();
    if transfer.slot >= len {
        return Err(AssembleError::InstructionSlot {
            index: transfer.slot,
            len,
        });
    }

    let from_index = table
        .position(from)
        .filter(|&index| table.is_writable_signer(index))
        .ok_or_else(|| AssembleError::SignerNotWritable(from.to_string()))?;

    let to_index = match table.position(&transfer.recipient) {
        Some(index) if table.is_writable(index) => index,
        Some(_) => return Err(AssembleError::ReadonlyRecipient(transfer.recipient.to_string())),
        None => usize::from(table.insert_writable_unsigned(transfer.recipient)?),
    };

    let program_id = system_program::id();
    let program_index = match table.position(&program_id) {
        Some(index) => index,
        None => usize::from(table.push_readonly_unsigned(program_id)?),
    };

    let instruction = system_instruction::transfer(from, &transfer.recipient, transfer.lamports);
    table.replace_instruction(
        transfer.slot,
        CompiledInstruction::new_from_raw_parts(
            index_u8(program_index)?,
            instruction.data,
            vec![index_u8(from_index)?, index_u8(to_index)?],
        ),
    )
}

fn index_u8(index: usize) -> Result<u8, AssembleError> {
    u8::try_from(index)
        .map_err(|_| AssembleError::Layout(format!("account index {index} exceeds u8")))
}
