//! Quote instruction to native instruction mapping
//!
//! The mapping is pure and order-preserving: output length and order equal
//! input length and order, account flags are copied verbatim, and the data
//! payload is carried unchanged.

use crate::quote::{QuoteAccount, QuoteInstruction};
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};

/// Map validated quote instructions into native instructions
pub fn build_instructions(instructions: &[QuoteInstruction]) -> Vec<Instruction> {
    instructions.iter().map(build_instruction).collect()
}

fn build_instruction(ix: &QuoteInstruction) -> Instruction {
    Instruction {
        program_id: Pubkey::new_from_array(ix.program_id),
        accounts: ix.accounts.iter().map(account_meta).collect(),
        data: ix.data.clone(),
    }
}

fn account_meta(account: &QuoteAccount) -> AccountMeta {
    AccountMeta {
        pubkey: Pubkey::new_from_array(account.pubkey),
        is_signer: account.is_signer,
        is_writable: account.is_writable,
    }
}

/// Distinct signer accounts across all instructions, in first-seen order
pub fn signer_keys(instructions: &[Instruction]) -> Vec<Pubkey> {
    let mut signers: Vec<Pubkey> = Vec::new();
    for meta in instructions.iter().flat_map(|ix| ix.accounts.iter()) {
        if meta.is_signer && !signers.contains(&meta.pubkey) {
            signers.push(meta.pubkey);
        }
    }
    signers
}
