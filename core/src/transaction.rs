//! probe transaction template.
//!
//! the instructions never change between iterations, only the blockhash does,
//! so they are built once and re-signed per anchor.

use crate::config::{ConfigError, PayloadConfig};
use solana_compute_budget_interface::ComputeBudgetInstruction;
use solana_sdk::hash::Hash;
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::message::{v0, VersionedMessage};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::transaction::VersionedTransaction;

// system program `Transfer` discriminant
const TRANSFER: u32 = 2;

/// decode a base58 encoded 64 byte keypair.
pub fn keypair_from_base58(encoded: &str) -> Result<Keypair, ConfigError> {
    let bytes = bs58::decode(encoded.trim())
        .into_vec()
        .map_err(|e| ConfigError::Keypair(e.to_string()))?;
    Keypair::from_bytes(&bytes).map_err(|e| ConfigError::Keypair(e.to_string()))
}

/// self-transfer with compute budget, signed per blockhash.
pub struct TransactionTemplate {
    payer: Keypair,
    instructions: Vec<Instruction>,
}

impl TransactionTemplate {
    pub fn new(payer: Keypair, config: &PayloadConfig) -> Self {
        let mut instructions = Vec::with_capacity(3);
        instructions.push(ComputeBudgetInstruction::set_compute_unit_limit(
            config.compute_unit_limit,
        ));
        if let Some(price) = config.priority_fee {
            instructions.push(ComputeBudgetInstruction::set_compute_unit_price(price));
        }

        let mut data = TRANSFER.to_le_bytes().to_vec();
        data.extend_from_slice(&config.lamports.to_le_bytes());
        instructions.push(Instruction::new_with_bytes(
            solana_sdk::system_program::id(),
            &data,
            vec![
                AccountMeta::new(payer.pubkey(), true),
                AccountMeta::new(payer.pubkey(), true),
            ],
        ));

        Self {
            payer,
            instructions,
        }
    }

    #[inline]
    pub fn payer(&self) -> Pubkey {
        self.payer.pubkey()
    }

    #[inline]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// compile a v0 message against `blockhash` and sign it.
    pub fn sign(&self, blockhash: Hash) -> Result<VersionedTransaction, TemplateError> {
        let payer = self.payer.pubkey();
        let message = v0::Message::try_compile(&payer, &self.instructions, &[], blockhash)
            .map_err(|e| TemplateError::Compile(e.to_string()))?;
        VersionedTransaction::try_new(VersionedMessage::V0(message), &[&self.payer])
            .map_err(|e| TemplateError::Sign(e.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("message compile error: {0}")]
    Compile(String),
    #[error("signing error: {0}")]
    Sign(String),
}
