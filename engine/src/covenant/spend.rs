//! Covenant spend state machine
//!
//! `Built -> GuardVerified -> ValueVerified -> Signed -> Broadcast`
//!
//! Each step is only reachable from the one before it. A failed guard or
//! value check moves the spend to `Aborted`, from which nothing proceeds.
//! These checks mirror what the template enforces on-chain, so a bad spend
//! is refused before any signature exists.

use std::fmt;

use k256::Scalar;
use subtle::ConstantTimeEq;
use tracing::{info, warn};

use super::script::{covenant_unlocking_script, extract_guard_hash};
use crate::crypto::{decompress, public_from_scalar, POINT_LEN};
use crate::error::{Error, Result};
use crate::hash::hash160;
use crate::tx::{sign_input, Transaction, TxOutput};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpendStage {
    Built,
    GuardVerified,
    ValueVerified,
    Signed,
    Broadcast,
    Aborted,
}

impl SpendStage {
    pub fn name(&self) -> &'static str {
        match self {
            SpendStage::Built => "Built",
            SpendStage::GuardVerified => "GuardVerified",
            SpendStage::ValueVerified => "ValueVerified",
            SpendStage::Signed => "Signed",
            SpendStage::Broadcast => "Broadcast",
            SpendStage::Aborted => "Aborted",
        }
    }
}

impl fmt::Display for SpendStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One attempt at spending a covenant-locked output
#[derive(Debug)]
pub struct CovenantSpend {
    tx: Transaction,
    input_index: usize,
    spent: TxOutput,
    redeem_script: Vec<u8>,
    amount: u64,
    designated_output: usize,
    pubkey: Option<[u8; POINT_LEN]>,
    stage: SpendStage,
}

impl CovenantSpend {
    /// Unsigned spend of `spent` at `input_index`, asserting `amount` on output 0
    pub fn new(
        tx: Transaction,
        input_index: usize,
        spent: TxOutput,
        redeem_script: Vec<u8>,
        amount: u64,
    ) -> Result<Self> {
        if input_index >= tx.inputs.len() {
            return Err(Error::InputIndexOutOfRange {
                index: input_index,
                count: tx.inputs.len(),
            });
        }
        Ok(Self {
            tx,
            input_index,
            spent,
            redeem_script,
            amount,
            designated_output: 0,
            pubkey: None,
            stage: SpendStage::Built,
        })
    }

    pub fn stage(&self) -> SpendStage {
        self.stage
    }

    pub fn transaction(&self) -> &Transaction {
        &self.tx
    }

    fn advance(&mut self, from: SpendStage, to: SpendStage) -> Result<()> {
        if self.stage != from {
            return Err(Error::IllegalTransition {
                from: self.stage.name(),
                to: to.name(),
            });
        }
        info!(from = %from, to = %to, "covenant spend transition");
        self.stage = to;
        Ok(())
    }

    fn abort(&mut self, err: Error) -> Error {
        warn!(stage = %self.stage, error = %err, "covenant spend aborted");
        self.stage = SpendStage::Aborted;
        err
    }

    /// Check `hash160(pubkey)` against the redeem script's guard hash
    pub fn verify_guard(&mut self, pubkey: &[u8; POINT_LEN]) -> Result<()> {
        if self.stage != SpendStage::Built {
            return Err(Error::IllegalTransition {
                from: self.stage.name(),
                to: SpendStage::GuardVerified.name(),
            });
        }
        let guard_hash = match extract_guard_hash(&self.redeem_script) {
            Ok(hash) => hash,
            Err(err) => return Err(self.abort(err)),
        };
        if let Err(err) = decompress(pubkey) {
            return Err(self.abort(err));
        }
        if !bool::from(hash160(pubkey).ct_eq(&guard_hash)) {
            return Err(self.abort(Error::GuardHashMismatch));
        }
        self.pubkey = Some(*pubkey);
        self.advance(SpendStage::Built, SpendStage::GuardVerified)
    }

    /// Check the designated output holds exactly the asserted amount
    pub fn verify_value(&mut self) -> Result<()> {
        if self.stage != SpendStage::GuardVerified {
            return Err(Error::IllegalTransition {
                from: self.stage.name(),
                to: SpendStage::ValueVerified.name(),
            });
        }
        let count = self.tx.outputs.len();
        let actual = match self.tx.outputs.get(self.designated_output) {
            Some(output) => output.value,
            None => {
                return Err(self.abort(Error::OutputIndexOutOfRange {
                    index: self.designated_output,
                    count,
                }))
            }
        };
        if actual != self.amount {
            return Err(self.abort(Error::OutputValueMismatch {
                asserted: self.amount,
                actual,
            }));
        }
        self.advance(SpendStage::GuardVerified, SpendStage::ValueVerified)
    }

    /// Sign with the guard secret and fill in the unlocking script
    pub fn sign(&mut self, secret: &Scalar) -> Result<()> {
        if self.stage != SpendStage::ValueVerified {
            return Err(Error::IllegalTransition {
                from: self.stage.name(),
                to: SpendStage::Signed.name(),
            });
        }
        let pubkey = self.pubkey.ok_or(Error::GuardHashMismatch)?;
        if public_from_scalar(secret) != pubkey {
            return Err(Error::GuardHashMismatch);
        }

        let sig = sign_input(
            &self.tx,
            self.input_index,
            &self.redeem_script,
            &self.spent,
            secret,
        )?;
        let unlocking = covenant_unlocking_script(&sig, &pubkey, self.amount, &self.redeem_script)?;
        self.tx.inputs[self.input_index].unlocking_script = unlocking;
        self.advance(SpendStage::ValueVerified, SpendStage::Signed)
    }

    /// Record that the signed transaction was accepted by the chain
    pub fn mark_broadcast(&mut self) -> Result<()> {
        self.advance(SpendStage::Signed, SpendStage::Broadcast)
    }

    /// The signed transaction, only once signing has happened
    pub fn signed_transaction(&self) -> Result<&Transaction> {
        match self.stage {
            SpendStage::Signed | SpendStage::Broadcast => Ok(&self.tx),
            other => Err(Error::IllegalTransition {
                from: other.name(),
                to: SpendStage::Broadcast.name(),
            }),
        }
    }
}
