//! Unspent-output resolution by scanning the chain from the tip.

use crate::block::Block;
use crate::chain::{Chain, ChainStore};
use crate::error::{LedgerError, Result};
use crate::transaction::{OutPoint, Transaction, TxInput, TxOutput};
use crate::Hash;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// An output `address` can still spend, with where it lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Utxo {
    pub outpoint: OutPoint,
    pub output: TxOutput,
}

impl<S: ChainStore> Chain<S> {
    /// Outputs locked to `address` that no later transaction spends, in the
    /// order the backward walk meets them.
    ///
    /// Within a transaction the outputs are collected before its inputs mark
    /// anything spent, so a transaction never hides its own outputs. Ancestors
    /// are visited later in the walk, so their spent outputs are already marked.
    pub fn find_unspent_outputs(&self, address: &str) -> Result<Vec<Utxo>> {
        let mut unspent = Vec::new();
        let mut spent: HashMap<Hash, HashSet<u32>> = HashMap::new();

        for block in self.iter()? {
            collect_block(&block?, address, &mut spent, &mut unspent);
        }

        debug!(address, count = unspent.len(), "scanned unspent outputs");
        Ok(unspent)
    }

    /// Fails with `ValueOverflow` when the outputs add up past `u64::MAX`.
    pub fn balance(&self, address: &str) -> Result<u64> {
        self.find_unspent_outputs(address)?
            .iter()
            .try_fold(0u64, |total, utxo| total.checked_add(utxo.output.value))
            .ok_or(LedgerError::ValueOverflow)
    }

    /// First-fit selection of unspent outputs until `amount` is covered.
    ///
    /// Returns the accumulated value and the chosen outpoints. When the whole
    /// balance is short of `amount` the balance is returned with every output.
    /// Inputs that cannot be summed in a `u64` are refused with `ValueOverflow`.
    pub fn find_spendable_outputs(&self, address: &str, amount: u64) -> Result<(u64, Vec<OutPoint>)> {
        let mut accumulated = 0u64;
        let mut chosen = Vec::new();

        for utxo in self.find_unspent_outputs(address)? {
            if accumulated >= amount {
                break;
            }
            accumulated = accumulated
                .checked_add(utxo.output.value)
                .ok_or(LedgerError::ValueOverflow)?;
            chosen.push(utxo.outpoint);
        }

        debug!(address, amount, accumulated, inputs = chosen.len(), "selected inputs");
        Ok((accumulated, chosen))
    }

    /// Transfer of `amount` from `from` to `to`, with change back to `from`.
    /// Nothing is mined; see [`Chain::transfer`].
    pub fn build_transaction(&self, from: &str, to: &str, amount: u64) -> Result<Transaction> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        let (accumulated, chosen) = self.find_spendable_outputs(from, amount)?;
        if accumulated < amount {
            return Err(LedgerError::InsufficientFunds {
                required: amount,
                available: accumulated,
            });
        }

        let inputs = chosen
            .into_iter()
            .map(|outpoint| TxInput::spend(outpoint, from))
            .collect();
        let mut outputs = vec![TxOutput::new(amount, to)];
        if accumulated > amount {
            outputs.push(TxOutput::new(accumulated - amount, from));
        }

        Ok(Transaction::new(inputs, outputs))
    }

    /// Builds the transfer and appends a block holding it.
    pub fn transfer(&self, from: &str, to: &str, amount: u64) -> Result<Block> {
        let tx = self.build_transaction(from, to, amount)?;
        self.mine_block(vec![tx])
    }
}

fn collect_block(
    block: &Block,
    address: &str,
    spent: &mut HashMap<Hash, HashSet<u32>>,
    unspent: &mut Vec<Utxo>,
) {
    // Later transactions in a block may spend earlier ones, so walk them backwards too.
    for tx in block.transactions().iter().rev() {
        let spent_here = spent.get(tx.id());
        for (vout, output) in tx.outputs().iter().enumerate() {
            let vout = vout as u32;
            if spent_here.is_some_and(|set| set.contains(&vout)) {
                continue;
            }
            if output.can_be_unlocked_with(address) {
                unspent.push(Utxo {
                    outpoint: OutPoint {
                        txid: *tx.id(),
                        vout,
                    },
                    output: output.clone(),
                });
            }
        }

        if tx.is_coinbase() {
            continue;
        }
        for input in tx.inputs() {
            if !input.can_unlock_output_with(address) {
                continue;
            }
            if let Some(outpoint) = input.outpoint() {
                spent.entry(outpoint.txid).or_default().insert(outpoint.vout);
            }
        }
    }
}
