//! Value-transfer records in the unspent-output model.
//!
//! Ownership is a plain string comparison between an input's `script_sig` and
//! an output's `script_pubkey`. It is a placeholder for signature checks and
//! offers no security at all.

use crate::digest::{int_to_bytes, put_prefixed, sha256};
use crate::Hash;
use serde::{Deserialize, Serialize};

/// Output index carried by the single input of a coinbase transaction.
pub const COINBASE_VOUT: i64 = -1;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub value: u64,
    pub script_pubkey: String,
}

impl TxOutput {
    pub fn new(value: u64, script_pubkey: impl Into<String>) -> Self {
        Self {
            value,
            script_pubkey: script_pubkey.into(),
        }
    }

    pub fn can_be_unlocked_with(&self, unlocking_data: &str) -> bool {
        self.script_pubkey == unlocking_data
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    /// Transaction being spent; `None` only for a coinbase.
    pub txid: Option<Hash>,
    pub vout: i64,
    pub script_sig: String,
}

impl TxInput {
    pub fn spend(outpoint: OutPoint, script_sig: impl Into<String>) -> Self {
        Self {
            txid: Some(outpoint.txid),
            vout: i64::from(outpoint.vout),
            script_sig: script_sig.into(),
        }
    }

    pub fn can_unlock_output_with(&self, unlocking_data: &str) -> bool {
        self.script_sig == unlocking_data
    }

    /// The output this input spends, if it spends one.
    pub fn outpoint(&self) -> Option<OutPoint> {
        let txid = self.txid?;
        let vout = u32::try_from(self.vout).ok()?;
        Some(OutPoint { txid, vout })
    }
}

/// Reference to one output of one transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutPoint {
    pub txid: Hash,
    pub vout: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    id: Hash,
    outputs: Vec<TxOutput>,
    inputs: Vec<TxInput>,
}

impl Transaction {
    /// Builds a transaction and stamps its identifier over the finished lists.
    pub fn new(inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Self {
        let mut tx = Self {
            id: [0u8; 32],
            outputs,
            inputs,
        };
        tx.id = tx.compute_id();
        tx
    }

    /// Mints `subsidy` to `to`. An empty `note` becomes `"Reward to <to>"`.
    pub fn coinbase(to: &str, note: &str, subsidy: u64) -> Self {
        let note = if note.is_empty() {
            format!("Reward to {to}")
        } else {
            note.to_string()
        };
        let input = TxInput {
            txid: None,
            vout: COINBASE_VOUT,
            script_sig: note,
        };
        Self::new(vec![input], vec![TxOutput::new(subsidy, to)])
    }

    pub fn id(&self) -> &Hash {
        &self.id
    }

    pub fn outputs(&self) -> &[TxOutput] {
        &self.outputs
    }

    pub fn inputs(&self) -> &[TxInput] {
        &self.inputs
    }

    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1
            && self.inputs[0].txid.is_none()
            && self.inputs[0].vout == COINBASE_VOUT
    }

    /// Digest over the outputs then the inputs, each field at a fixed width
    /// or length-prefixed.
    pub fn compute_id(&self) -> Hash {
        let mut buf = Vec::new();
        buf.extend_from_slice(&int_to_bytes(self.outputs.len() as i64));
        for output in &self.outputs {
            buf.extend_from_slice(&output.value.to_be_bytes());
            put_prefixed(&mut buf, output.script_pubkey.as_bytes());
        }
        buf.extend_from_slice(&int_to_bytes(self.inputs.len() as i64));
        for input in &self.inputs {
            put_prefixed(&mut buf, input.txid.as_ref().map_or(&[][..], |h| &h[..]));
            buf.extend_from_slice(&int_to_bytes(input.vout));
            put_prefixed(&mut buf, input.script_sig.as_bytes());
        }
        sha256(&buf)
    }

    /// Identifier matches the content; false for a record tampered with after construction.
    pub fn has_valid_id(&self) -> bool {
        self.id == self.compute_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coinbase_shape() {
        let tx = Transaction::coinbase("alice", "", 10);
        assert!(tx.is_coinbase());
        assert_eq!(tx.inputs().len(), 1);
        assert_eq!(tx.inputs()[0].txid, None);
        assert_eq!(tx.inputs()[0].vout, -1);
        assert_eq!(tx.inputs()[0].script_sig, "Reward to alice");
        assert_eq!(tx.outputs(), &[TxOutput::new(10, "alice")]);
        assert!(tx.has_valid_id());
    }

    #[test]
    fn coinbase_keeps_custom_note() {
        let tx = Transaction::coinbase("alice", "genesis", 10);
        assert_eq!(tx.inputs()[0].script_sig, "genesis");
    }

    #[test]
    fn id_is_set_on_the_returned_transaction() {
        let tx = Transaction::new(vec![], vec![TxOutput::new(3, "bob")]);
        assert_ne!(tx.id(), &[0u8; 32]);
        assert_eq!(tx.id(), &tx.compute_id());
    }

    #[test]
    fn id_depends_on_content() {
        let a = Transaction::coinbase("alice", "x", 10);
        let b = Transaction::coinbase("bob", "x", 10);
        let c = Transaction::coinbase("alice", "x", 11);
        assert_ne!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
        assert_eq!(a.id(), Transaction::coinbase("alice", "x", 10).id());
    }

    #[test]
    fn spending_input_is_not_coinbase() {
        let funding = Transaction::coinbase("alice", "", 10);
        let outpoint = OutPoint {
            txid: *funding.id(),
            vout: 0,
        };
        let tx = Transaction::new(
            vec![TxInput::spend(outpoint, "alice")],
            vec![TxOutput::new(10, "bob")],
        );
        assert!(!tx.is_coinbase());
        assert_eq!(tx.inputs()[0].outpoint(), Some(outpoint));
        assert!(tx.inputs()[0].can_unlock_output_with("alice"));
        assert!(!tx.inputs()[0].can_unlock_output_with("bob"));
    }

    #[test]
    fn coinbase_input_has_no_outpoint() {
        let tx = Transaction::coinbase("alice", "", 10);
        assert_eq!(tx.inputs()[0].outpoint(), None);
    }

    #[test]
    fn unlocking_is_exact_string_match() {
        let out = TxOutput::new(1, "alice");
        assert!(out.can_be_unlocked_with("alice"));
        assert!(!out.can_be_unlocked_with("Alice"));
        assert!(!out.can_be_unlocked_with("alice "));
    }

    #[test]
    fn tampering_breaks_the_id() {
        let mut tx = Transaction::coinbase("alice", "", 10);
        tx.outputs[0].value = 1_000;
        assert!(!tx.has_valid_id());
    }
}
