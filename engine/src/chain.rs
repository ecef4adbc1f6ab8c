//! Chain collaborator interface
//!
//! The engine needs only four things from a chain: find a spendable output
//! for a locking script, a fee rate, broadcast, and fetch a transaction with
//! its outputs exactly as committed (token prefix included). Failures are
//! reported as [`Error::Chain`] and never retried here.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::tx::{txid_hex, Outpoint, Transaction, TxInput, TxOutput};

/// Default relay fee in satoshis per byte
pub const DEFAULT_FEE_RATE: u64 = 1;

/// A spendable output
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Utxo {
    pub outpoint: Outpoint,
    pub output: TxOutput,
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Largest unspent output paying to `locking_script`
    async fn get_utxo(&self, locking_script: &[u8]) -> Result<Option<Utxo>>;

    /// Fee rate in satoshis per byte
    async fn get_fee_rate(&self) -> Result<u64>;

    /// Submit a serialized transaction and return its txid
    async fn broadcast(&self, raw_tx: &[u8]) -> Result<[u8; 32]>;

    async fn get_transaction(&self, txid: &[u8; 32]) -> Result<Transaction>;
}

#[derive(Default)]
struct MemoryState {
    transactions: HashMap<[u8; 32], Transaction>,
    unspent: HashMap<Outpoint, TxOutput>,
    funding_nonce: u32,
}

/// In-memory chain: indexes transactions by txid and unspent outputs by outpoint
///
/// Broadcast checks that every input exists and is unspent and that outputs
/// do not exceed inputs. Scripts are not executed.
pub struct MemoryChain {
    state: Mutex<MemoryState>,
    fee_rate: u64,
}

impl Default for MemoryChain {
    fn default() -> Self {
        Self::new(DEFAULT_FEE_RATE)
    }
}

impl MemoryChain {
    pub fn new(fee_rate: u64) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            fee_rate,
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| Error::Chain("chain state lock poisoned".into()))
    }

    /// Seed an output out of thin air, like a coinbase
    pub fn fund(&self, locking_script: Vec<u8>, value: u64) -> Result<Utxo> {
        let mut state = self.lock()?;
        state.funding_nonce = state.funding_nonce.wrapping_add(1);

        // Unique null-ish input so every funding tx has a distinct txid
        let mut marker = [0u8; 32];
        marker[..4].copy_from_slice(&state.funding_nonce.to_le_bytes());
        let tx = Transaction {
            inputs: vec![TxInput::new(Outpoint::new(marker, u32::MAX))],
            outputs: vec![TxOutput::new(value, locking_script)],
            ..Transaction::default()
        };
        let txid = tx.txid()?;
        let utxo = Utxo {
            outpoint: Outpoint::new(txid, 0),
            output: tx.outputs[0].clone(),
        };
        state.unspent.insert(utxo.outpoint, utxo.output.clone());
        state.transactions.insert(txid, tx);
        debug!(txid = %txid_hex(&txid), value, "funded memory chain output");
        Ok(utxo)
    }

    pub fn is_unspent(&self, outpoint: &Outpoint) -> Result<bool> {
        Ok(self.lock()?.unspent.contains_key(outpoint))
    }
}

#[async_trait]
impl ChainClient for MemoryChain {
    async fn get_utxo(&self, locking_script: &[u8]) -> Result<Option<Utxo>> {
        let state = self.lock()?;
        Ok(state
            .unspent
            .iter()
            .filter(|(_, output)| output.locking_script == locking_script)
            .max_by_key(|(outpoint, output)| (output.value, **outpoint))
            .map(|(outpoint, output)| Utxo {
                outpoint: *outpoint,
                output: output.clone(),
            }))
    }

    async fn get_fee_rate(&self) -> Result<u64> {
        Ok(self.fee_rate)
    }

    async fn broadcast(&self, raw_tx: &[u8]) -> Result<[u8; 32]> {
        let tx = Transaction::deserialize(raw_tx)
            .map_err(|e| Error::Chain(format!("rejected: undecodable transaction ({e})")))?;
        let txid = tx.txid()?;
        let mut state = self.lock()?;

        let mut input_value = 0u64;
        for input in &tx.inputs {
            let spent = state.unspent.get(&input.outpoint).ok_or_else(|| {
                Error::Chain(format!("rejected: missing or spent input {}", input.outpoint))
            })?;
            input_value = input_value
                .checked_add(spent.value)
                .ok_or_else(|| Error::Chain("rejected: input value overflows".into()))?;
        }
        let output_value = tx
            .total_output_value()
            .ok_or_else(|| Error::Chain("rejected: output value overflows".into()))?;
        if output_value > input_value {
            return Err(Error::Chain(format!(
                "rejected: outputs {output_value} exceed inputs {input_value}"
            )));
        }

        for input in &tx.inputs {
            state.unspent.remove(&input.outpoint);
        }
        for (vout, output) in tx.outputs.iter().enumerate() {
            if !output.is_op_return() {
                state
                    .unspent
                    .insert(Outpoint::new(txid, vout as u32), output.clone());
            }
        }
        state.transactions.insert(txid, tx);
        info!(
            txid = %txid_hex(&txid),
            fee = input_value - output_value,
            "broadcast accepted"
        );
        Ok(txid)
    }

    async fn get_transaction(&self, txid: &[u8; 32]) -> Result<Transaction> {
        self.lock()?
            .transactions
            .get(txid)
            .cloned()
            .ok_or_else(|| Error::Chain(format!("unknown transaction {}", txid_hex(txid))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spend_all(utxo: &Utxo, outputs: Vec<TxOutput>) -> Transaction {
        Transaction {
            inputs: vec![TxInput::new(utxo.outpoint)],
            outputs,
            ..Transaction::default()
        }
    }

    #[tokio::test]
    async fn test_fund_and_lookup() {
        let chain = MemoryChain::default();
        let utxo = chain.fund(vec![0x51], 50_000).unwrap();
        let found = chain.get_utxo(&[0x51]).await.unwrap().unwrap();
        assert_eq!(found, utxo);
        assert!(chain.get_utxo(&[0x52]).await.unwrap().is_none());

        let other = chain.fund(vec![0x51], 50_000).unwrap();
        assert_ne!(other.outpoint, utxo.outpoint);
    }

    #[tokio::test]
    async fn test_broadcast_moves_utxos() {
        let chain = MemoryChain::default();
        let utxo = chain.fund(vec![0x51], 10_000).unwrap();
        let tx = spend_all(&utxo, vec![TxOutput::new(9_000, vec![0x52])]);

        let txid = chain.broadcast(&tx.serialize().unwrap()).await.unwrap();
        assert_eq!(txid, tx.txid().unwrap());
        assert!(!chain.is_unspent(&utxo.outpoint).unwrap());
        assert!(chain.is_unspent(&Outpoint::new(txid, 0)).unwrap());
        assert_eq!(chain.get_transaction(&txid).await.unwrap(), tx);
    }

    #[tokio::test]
    async fn test_double_spend_and_overspend_rejected() {
        let chain = MemoryChain::default();
        let utxo = chain.fund(vec![0x51], 10_000).unwrap();

        let greedy = spend_all(&utxo, vec![TxOutput::new(10_001, vec![0x52])]);
        let err = chain.broadcast(&greedy.serialize().unwrap()).await.unwrap_err();
        assert!(!err.is_fatal());

        let ok = spend_all(&utxo, vec![TxOutput::new(10_000, vec![0x52])]);
        chain.broadcast(&ok.serialize().unwrap()).await.unwrap();
        let again = spend_all(&utxo, vec![TxOutput::new(1, vec![0x53])]);
        assert!(chain.broadcast(&again.serialize().unwrap()).await.is_err());
    }

    #[tokio::test]
    async fn test_overflowing_outputs_rejected() {
        let chain = MemoryChain::default();
        let utxo = chain.fund(vec![0x51], 10_000).unwrap();
        let tx = spend_all(
            &utxo,
            vec![
                TxOutput::new(u64::MAX, vec![0x52]),
                TxOutput::new(2, vec![0x52]),
            ],
        );

        let err = chain.broadcast(&tx.serialize().unwrap()).await.unwrap_err();
        assert!(matches!(err, Error::Chain(ref msg) if msg.starts_with("rejected")));
        assert!(chain.is_unspent(&utxo.outpoint).unwrap());
    }

    #[tokio::test]
    async fn test_unknown_transaction() {
        let chain = MemoryChain::new(2);
        assert_eq!(chain.get_fee_rate().await.unwrap(), 2);
        assert!(matches!(
            chain.get_transaction(&[0; 32]).await,
            Err(Error::Chain(_))
        ));
    }
}
