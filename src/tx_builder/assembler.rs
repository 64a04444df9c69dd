//! Decode → rewrite → sign → serialize

use solana_sdk::{
    hash::Hash,
    message::VersionedMessage,
    signature::Signature,
    signer::Signer,
    transaction::{Transaction, VersionedTransaction},
};
use tracing::{debug, info};

use crate::compat::{self, AccountTable};
use crate::tx_builder::errors::AssembleError;
use crate::tx_builder::instructions::{apply_auxiliary_transfer, AuxiliaryTransfer};
use crate::tx_builder::payload::{DecodedTransaction, RawTransactionPayload, WireFormat};

/// A signed, serialized transaction ready for submission
///
/// Immutable once built. The signature doubles as the transaction id the
/// ledger reports back on `sendTransaction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    bytes: Vec<u8>,
    signature: Signature,
    wire_format: WireFormat,
    recent_blockhash: Hash,
    auxiliary: Option<AuxiliaryTransfer>,
}

impl SignedTransaction {
    /// Serialized wire bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Signer's signature (the transaction id)
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Wire format the transaction was decoded and signed in
    pub fn wire_format(&self) -> WireFormat {
        self.wire_format
    }

    /// Blockhash embedded in the message
    pub fn recent_blockhash(&self) -> &Hash {
        &self.recent_blockhash
    }

    /// Auxiliary transfer written into the transaction, if any
    pub fn auxiliary(&self) -> Option<&AuxiliaryTransfer> {
        self.auxiliary.as_ref()
    }
}

/// Build a [`SignedTransaction`] from a provider payload
///
/// When `auxiliary` is given, its slot is overwritten with the transfer
/// before signing; any signatures the payload already carried are cleared
/// because they no longer cover the rewritten message.
///
/// # Errors
///
/// [`AssembleError::Decode`] when the payload is unreadable, otherwise the
/// rewrite/sign/serialize error that stopped assembly.
pub fn assemble(
    payload: &RawTransactionPayload,
    signer: &dyn Signer,
    auxiliary: Option<&AuxiliaryTransfer>,
) -> Result<SignedTransaction, AssembleError> {
    let payer = signer
        .try_pubkey()
        .map_err(|e| AssembleError::signing(e.to_string()))?;

    let decoded = payload.decode()?;
    let wire_format = decoded.wire_format();
    debug!(?wire_format, signer = %payer, "Decoded provider payload");

    let (bytes, signature, recent_blockhash) = match decoded {
        DecodedTransaction::Legacy(mut tx) => {
            if let Some(transfer) = auxiliary {
                let mut table = AccountTable::from_legacy(&mut tx.message);
                apply_auxiliary_transfer(&mut table, &payer, transfer)?;
                tx.signatures.iter_mut().for_each(|s| *s = Signature::default());
            }
            let signature = sign_legacy(&mut tx, signer)?;
            let blockhash = tx.message.recent_blockhash;
            (serialize(&tx)?, signature, blockhash)
        }
        DecodedTransaction::Versioned(mut tx) => {
            if let Some(transfer) = auxiliary {
                let mut table = match &mut tx.message {
                    VersionedMessage::Legacy(message) => AccountTable::from_legacy(message),
                    VersionedMessage::V0(message) => AccountTable::from_v0(message),
                };
                apply_auxiliary_transfer(&mut table, &payer, transfer)?;
                tx.signatures.iter_mut().for_each(|s| *s = Signature::default());
            }
            let signature = sign_versioned(&mut tx, signer)?;
            let blockhash = *tx.message.recent_blockhash();
            (serialize(&tx)?, signature, blockhash)
        }
    };

    if let Some(transfer) = auxiliary {
        info!(
            signature = %signature,
            recipient = %transfer.recipient,
            lamports = transfer.lamports,
            slot = transfer.slot,
            "Auxiliary transfer included in transaction"
        );
    }

    Ok(SignedTransaction {
        bytes,
        signature,
        wire_format,
        recent_blockhash,
        auxiliary: auxiliary.copied(),
    })
}

fn sign_legacy(tx: &mut Transaction, signer: &dyn Signer) -> Result<Signature, AssembleError> {
    let required = usize::from(tx.message.header.num_required_signatures);
    let position = signer_position(
        &tx.message.account_keys[..required.min(tx.message.account_keys.len())],
        signer,
    )?;
    tx.signatures.resize(required, Signature::default());

    let blockhash = tx.message.recent_blockhash;
    let signers: [&dyn Signer; 1] = [signer];
    tx.try_partial_sign(&signers[..], blockhash)
        .map_err(|e| AssembleError::signing(e.to_string()))?;

    Ok(tx.signatures[position])
}

fn sign_versioned(
    tx: &mut VersionedTransaction,
    signer: &dyn Signer,
) -> Result<Signature, AssembleError> {
    let position = signer_position(compat::get_required_signers(&tx.message), signer)?;
    let required = usize::from(compat::get_message_header(&tx.message).num_required_signatures);
    tx.signatures.resize(required, Signature::default());

    let signature = signer
        .try_sign_message(&tx.message.serialize())
        .map_err(|e| AssembleError::signing(e.to_string()))?;
    tx.signatures[position] = signature;

    Ok(signature)
}

fn signer_position(
    required_signers: &[solana_sdk::pubkey::Pubkey],
    signer: &dyn Signer,
) -> Result<usize, AssembleError> {
    let pubkey = signer
        .try_pubkey()
        .map_err(|e| AssembleError::signing(e.to_string()))?;
    required_signers
        .iter()
        .position(|key| *key == pubkey)
        .ok_or_else(|| AssembleError::signing(format!("{pubkey} is not a required signer")))
}

fn serialize<T: serde::Serialize>(tx: &T) -> Result<Vec<u8>, AssembleError> {
    bincode::serialize(tx).map_err(|e| AssembleError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
    use solana_sdk::{
        hash::Hash,
        instruction::{AccountMeta, Instruction},
        message::{v0, Message},
        pubkey::Pubkey,
        signature::Keypair,
    };
    #[allow(deprecated)]
    use solana_sdk::{system_instruction, system_program};

    fn provider_instructions(payer: &Pubkey) -> Vec<Instruction> {
        let program = Pubkey::new_unique();
        (0u8..3)
            .map(|tag| {
                Instruction::new_with_bytes(
                    program,
                    &[tag],
                    vec![
                        AccountMeta::new(*payer, true),
                        AccountMeta::new(Pubkey::new_unique(), false),
                    ],
                )
            })
            .collect()
    }

    fn legacy_payload(payer: &Keypair) -> RawTransactionPayload {
        let message = Message::new_with_blockhash(
            &provider_instructions(&payer.pubkey()),
            Some(&payer.pubkey()),
            &Hash::new_unique(),
        );
        let tx = Transaction::new_unsigned(message);
        RawTransactionPayload::from_base64(
            BASE64_STANDARD.encode(bincode::serialize(&tx).unwrap()),
            false,
            false,
        )
    }

    fn versioned_payload(payer: &Keypair) -> RawTransactionPayload {
        let message = v0::Message::try_compile(
            &payer.pubkey(),
            &provider_instructions(&payer.pubkey()),
            &[],
            Hash::new_unique(),
        )
        .unwrap();
        let tx = VersionedTransaction {
            signatures: vec![Signature::default()],
            message: VersionedMessage::V0(message),
        };
        RawTransactionPayload::from_bytes(bincode::serialize(&tx).unwrap(), true, false)
    }

    fn assert_slot_one_transfer(message: &VersionedMessage, payer: &Pubkey, transfer: &AuxiliaryTransfer) {
        let keys = compat::get_static_account_keys(message);
        let ix = &message.instructions()[1];
        assert_eq!(keys[ix.program_id_index as usize], system_program::id());
        assert_eq!(keys[ix.accounts[0] as usize], *payer);
        assert_eq!(keys[ix.accounts[1] as usize], transfer.recipient);
        let expected = system_instruction::transfer(payer, &transfer.recipient, transfer.lamports);
        assert_eq!(ix.data, expected.data);
    }

    #[test]
    fn test_assemble_legacy_with_auxiliary() {
        let payer = Keypair::new();
        let transfer = AuxiliaryTransfer { recipient: Pubkey::new_unique(), lamports: 11_000_000, slot: 1 };

        let signed = assemble(&legacy_payload(&payer), &payer, Some(&transfer)).unwrap();
        assert_eq!(signed.wire_format(), WireFormat::Legacy);
        assert_eq!(signed.auxiliary(), Some(&transfer));

        let tx: Transaction = bincode::deserialize(signed.as_bytes()).unwrap();
        tx.verify().unwrap();
        assert_eq!(tx.signatures[0], *signed.signature());
        assert_slot_one_transfer(&VersionedMessage::Legacy(tx.message), &payer.pubkey(), &transfer);
    }

    #[test]
    fn test_assemble_versioned_with_auxiliary() {
        let payer = Keypair::new();
        let transfer = AuxiliaryTransfer { recipient: Pubkey::new_unique(), lamports: 7, slot: 1 };

        let signed = assemble(&versioned_payload(&payer), &payer, Some(&transfer)).unwrap();
        assert_eq!(signed.wire_format(), WireFormat::Versioned);

        let tx: VersionedTransaction = bincode::deserialize(signed.as_bytes()).unwrap();
        assert!(tx.verify_with_results().iter().all(|ok| *ok));
        assert_eq!(tx.signatures[0], *signed.signature());
        assert_slot_one_transfer(&tx.message, &payer.pubkey(), &transfer);
    }

    #[test]
    fn test_assemble_without_auxiliary_keeps_instructions() {
        let payer = Keypair::new();
        let payload = versioned_payload(&payer);
        let original: VersionedTransaction = bincode::deserialize(&payload.txn).unwrap();

        let signed = assemble(&payload, &payer, None).unwrap();
        let tx: VersionedTransaction = bincode::deserialize(signed.as_bytes()).unwrap();

        assert_eq!(tx.message, original.message);
        assert!(signed.auxiliary().is_none());
        assert_eq!(signed.recent_blockhash(), original.message.recent_blockhash());
    }

    #[test]
    fn test_assemble_rejects_foreign_signer() {
        let payer = Keypair::new();
        let other = Keypair::new();

        let err = assemble(&legacy_payload(&payer), &other, None).unwrap_err();
        assert!(matches!(err, AssembleError::Signing(_)));
    }

    #[test]
    fn test_assemble_slot_out_of_range() {
        let payer = Keypair::new();
        let transfer = AuxiliaryTransfer { recipient: Pubkey::new_unique(), lamports: 1, slot: 9 };

        let err = assemble(&legacy_payload(&payer), &payer, Some(&transfer)).unwrap_err();
        assert!(matches!(err, AssembleError::InstructionSlot { index: 9, len: 3 }));
    }

    #[test]
    fn test_assemble_undecodable_payload() {
        let payer = Keypair::new();
        let payload = RawTransactionPayload::from_base64("%%%", true, false);

        let err = assemble(&payload, &payer, None).unwrap_err();
        assert!(matches!(err, AssembleError::Decode(_)));
    }
}
