//! Compatibility layer for Solana message layouts
//!
//! Legacy and V0 messages carry the same header / account key / compiled
//! instruction triple behind different types. The read helpers below give a
//! single view over [`VersionedMessage`]; [`AccountTable`] is the mutable
//! counterpart used when the assembler rewrites an instruction slot in place.
//!
//! ## Account key layout
//!
//! Static account keys are always ordered as
//! 1. writable signers
//! 2. readonly signers
//! 3. writable non-signers
//! 4. readonly non-signers
//!
//! and, for V0 messages, compiled instruction indices continue past the
//! static keys into the addresses loaded from lookup tables. Inserting a
//! static key therefore shifts every index at or after the insertion point,
//! lookup indices included.

use solana_sdk::{
    instruction::CompiledInstruction,
    message::{v0, Message, MessageHeader, VersionedMessage},
    pubkey::Pubkey,
};

use crate::tx_builder::AssembleError;

/// Get the message header from a `VersionedMessage`.
#[inline]
#[must_use]
pub fn get_message_header(message: &VersionedMessage) -> &MessageHeader {
    match message {
        VersionedMessage::Legacy(legacy_msg) => &legacy_msg.header,
        VersionedMessage::V0(v0_msg) => &v0_msg.header,
    }
}

/// Get the static account keys from a `VersionedMessage`.
///
/// For V0 messages this excludes addresses loaded from lookup tables.
#[inline]
#[must_use]
pub fn get_static_account_keys(message: &VersionedMessage) -> &[Pubkey] {
    match message {
        VersionedMessage::Legacy(legacy_msg) => &legacy_msg.account_keys,
        VersionedMessage::V0(v0_msg) => &v0_msg.account_keys,
    }
}

/// Get the required signers from a `VersionedMessage`.
///
/// Required signers are always the first `num_required_signatures` static keys.
#[inline]
#[must_use]
pub fn get_required_signers(message: &VersionedMessage) -> &[Pubkey] {
    let header = get_message_header(message);
    let account_keys = get_static_account_keys(message);
    let num_signers = header.num_required_signatures as usize;

    &account_keys[..num_signers.min(account_keys.len())]
}

/// Mutable view over the account table and instructions of a message
pub struct AccountTable<'msg> {
    header: &'msg mut MessageHeader,
    account_keys: &'msg mut Vec<Pubkey>,
    instructions: &'msg mut Vec<CompiledInstruction>,
    /// Number of addresses loaded from lookup tables (always 0 for legacy)
    loaded_len: usize,
}

impl<'msg> AccountTable<'msg> {
    /// View over a legacy message
    pub fn from_legacy(message: &'msg mut Message) -> Self {
        Self {
            header: &mut message.header,
            account_keys: &mut message.account_keys,
            instructions: &mut message.instructions,
            loaded_len: 0,
        }
    }

    /// View over a V0 message
    pub fn from_v0(message: &'msg mut v0::Message) -> Self {
        let loaded_len = message
            .address_table_lookups
            .iter()
            .map(|lookup| lookup.writable_indexes.len() + lookup.readonly_indexes.len())
            .sum();
        Self {
            header: &mut message.header,
            account_keys: &mut message.account_keys,
            instructions: &mut message.instructions,
            loaded_len,
        }
    }

    /// Number of compiled instructions
    pub fn instruction_count(&self) -> usize {
        self.instructions.len()
    }

    /// Position of a static key
    pub fn position(&self, key: &Pubkey) -> Option<usize> {
        self.account_keys.iter().position(|k| k == key)
    }

    /// Whether the static key at `index` is a writable signer
    pub fn is_writable_signer(&self, index: usize) -> bool {
        let num_signers = self.header.num_required_signatures as usize;
        let writable_signers =
            num_signers.saturating_sub(self.header.num_readonly_signed_accounts as usize);
        index < writable_signers
    }

    /// Whether the static key at `index` is writable
    pub fn is_writable(&self, index: usize) -> bool {
        let num_signers = self.header.num_required_signatures as usize;
        if index < num_signers {
            return self.is_writable_signer(index);
        }
        let writable_end = self
            .account_keys
            .len()
            .saturating_sub(self.header.num_readonly_unsigned_accounts as usize);
        index < writable_end
    }

    /// Insert `key` as the last writable non-signer and return its index
    pub fn insert_writable_unsigned(&mut self, key: Pubkey) -> Result<u8, AssembleError> {
        self.ensure_capacity()?;
        let position = self
            .account_keys
            .len()
            .saturating_sub(self.header.num_readonly_unsigned_accounts as usize);
        self.account_keys.insert(position, key);
        self.shift_indices_from(position);
        to_index(position)
    }

    /// Append `key` as a readonly non-signer and return its index
    pub fn push_readonly_unsigned(&mut self, key: Pubkey) -> Result<u8, AssembleError> {
        self.ensure_capacity()?;
        let position = self.account_keys.len();
        self.account_keys.push(key);
        self.header.num_readonly_unsigned_accounts = self
            .header
            .num_readonly_unsigned_accounts
            .checked_add(1)
            .ok_or_else(|| AssembleError::Layout("too many readonly accounts".to_string()))?;
        self.shift_indices_from(position);
        to_index(position)
    }

    /// Replace the compiled instruction at `slot`
    pub fn replace_instruction(
        &mut self,
        slot: usize,
        instruction: CompiledInstruction,
    ) -> Result<(), AssembleError> {
        let len = self.instructions.len();
        let target = self
            .instructions
            .get_mut(slot)
            .ok_or(AssembleError::InstructionSlot { index: slot, len })?;
        *target = instruction;
        Ok(())
    }

    fn ensure_capacity(&self) -> Result<(), AssembleError> {
        // Compiled indices are u8, covering static and loaded keys together
        if self.account_keys.len() + self.loaded_len >= usize::from(u8::MAX) + 1 {
            return Err(AssembleError::Layout(format!(
                "account table full ({} static, {} loaded)",
                self.account_keys.len(),
                self.loaded_len
            )));
        }
        Ok(())
    }

    fn shift_indices_from(&mut self, position: usize) {
        let bump = |index: &mut u8| {
            if usize::from(*index) >= position {
                *index = index.saturating_add(1);
            }
        };
        for ix in self.instructions.iter_mut() {
            bump(&mut ix.program_id_index);
            ix.accounts.iter_mut().for_each(bump);
        }
    }
}

fn to_index(position: usize) -> Result<u8, AssembleError> {
    u8::try_from(position)
        .map_err(|_| AssembleError::Layout(format!("account index {position} exceeds u8")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::{
        hash::Hash,
        message::{v0::MessageAddressTableLookup, Message, VersionedMessage},
        pubkey::Pubkey,
        signature::Keypair,
        signer::Signer,
    };
    #[allow(deprecated)]
    use solana_sdk::system_instruction;

    fn transfer_message(payer: &Keypair) -> Message {
        let instruction = system_instruction::transfer(&payer.pubkey(), &Pubkey::new_unique(), 1000);
        Message::new(&[instruction], Some(&payer.pubkey()))
    }

    #[test]
    fn test_required_signers_both_layouts() {
        let payer = Keypair::new();
        let legacy = VersionedMessage::Legacy(transfer_message(&payer));
        assert_eq!(get_required_signers(&legacy), &[payer.pubkey()]);

        let instruction = system_instruction::transfer(&payer.pubkey(), &Pubkey::new_unique(), 1);
        let v0_msg =
            v0::Message::try_compile(&payer.pubkey(), &[instruction], &[], Hash::default()).unwrap();
        let versioned = VersionedMessage::V0(v0_msg);
        assert_eq!(get_message_header(&versioned).num_required_signatures, 1);
        assert_eq!(get_static_account_keys(&versioned)[0], payer.pubkey());
    }

    #[test]
    fn test_writability_follows_header() {
        let payer = Keypair::new();
        let mut message = transfer_message(&payer);
        // [payer (w, s), recipient (w), system program (r)]
        let table = AccountTable::from_legacy(&mut message);

        assert!(table.is_writable_signer(0));
        assert!(!table.is_writable_signer(1));
        assert!(table.is_writable(1));
        assert!(!table.is_writable(2));
    }

    #[test]
    fn test_insert_writable_shifts_program_index() {
        let payer = Keypair::new();
        let mut message = transfer_message(&payer);
        let system_index_before = message.instructions[0].program_id_index;

        let new_key = Pubkey::new_unique();
        let inserted = {
            let mut table = AccountTable::from_legacy(&mut message);
            table.insert_writable_unsigned(new_key).unwrap()
        };

        assert_eq!(inserted, 2);
        assert_eq!(message.account_keys[2], new_key);
        assert_eq!(message.instructions[0].program_id_index, system_index_before + 1);
        // Recipient index (1) is before the insertion point and stays put
        assert_eq!(message.instructions[0].accounts, vec![0, 1]);
        assert_eq!(message.header.num_readonly_unsigned_accounts, 1);
    }

    #[test]
    fn test_push_readonly_shifts_lookup_indices() {
        let payer = Keypair::new();
        let instruction = system_instruction::transfer(&payer.pubkey(), &Pubkey::new_unique(), 1);
        let mut v0_msg =
            v0::Message::try_compile(&payer.pubkey(), &[instruction], &[], Hash::default()).unwrap();
        v0_msg.address_table_lookups.push(MessageAddressTableLookup {
            account_key: Pubkey::new_unique(),
            writable_indexes: vec![0],
            readonly_indexes: vec![],
        });
        // Reference the loaded address (index == static len)
        let loaded_index = v0_msg.account_keys.len() as u8;
        v0_msg.instructions[0].accounts.push(loaded_index);

        {
            let mut table = AccountTable::from_v0(&mut v0_msg);
            table.push_readonly_unsigned(Pubkey::new_unique()).unwrap();
        }

        assert_eq!(v0_msg.header.num_readonly_unsigned_accounts, 2);
        assert_eq!(*v0_msg.instructions[0].accounts.last().unwrap(), loaded_index + 1);
    }

    #[test]
    fn test_replace_instruction_out_of_range() {
        let payer = Keypair::new();
        let mut message = transfer_message(&payer);
        let mut table = AccountTable::from_legacy(&mut message);

        let err = table
            .replace_instruction(1, CompiledInstruction::new_from_raw_parts(0, vec![], vec![]))
            .unwrap_err();
        assert!(matches!(err, AssembleError::InstructionSlot { index: 1, len: 1 }));
    }
}
