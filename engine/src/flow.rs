//! End-to-end transfer flows over a [`ChainClient`]
//!
//! ## Confidential flow
//!
//! Sender (`lock_confidential`):
//! 1. Spend a wallet output; its outpoint is the RPA derivation context
//! 2. Derive the guard key for the receiver's paycode (mode `Guard`, index 0)
//! 3. Seal amount and memo into an announcement
//! 4. Build the amount envelope from the session's zk seed
//! 5. Lock output 0 under a covenant anchoring the envelope's proof hash,
//!    carrying a mutable NFT whose commitment is the Pedersen commitment
//!
//! Receiver (`unlock_confidential`):
//! 1. Re-derive the guard key from the funding input's outpoint and key
//! 2. Open the announcement, regenerate the envelope
//! 3. Refuse unless commitment, proof and covenant all match on-chain data
//! 4. Pay exactly the amount, with the token, to a fresh one-time address
//!
//! Any error aborts the flow. Transactions are chained, so nothing after a
//! failed step is built.
//!
//! A receiver holding the wrong keys cannot tell a derivation break from a
//! tampered lock: the guard hash is only visible through the covenant. It
//! surfaces as [`Error::CommitmentMismatch`] (confidential) or
//! [`Error::CovenantMismatch`] (vault), both fatal.
//!
//! Fees use `FlowParams::fee_rate`, raised to the chain's relay rate when
//! that is higher.

use tracing::{debug, info, warn};

use crate::announcement::Announcement;
use crate::chain::ChainClient;
use crate::covenant::{
    build_covenant, p2pkh_hash, p2pkh_script, parse_pushes, Covenant, CovenantSpend,
    CovenantTemplate, GuardKey, P2shKind,
};
use crate::crypto::{
    check_payment, derive_lock_intent, derive_received_key, recover_one_time_key, Paycode,
    PaycodeKeys, RpaContext, RpaMode, SecretScalar, POINT_LEN,
};
use crate::envelope::{build_amount_proof_envelope, verify_amount_proof_envelope};
use crate::error::{Error, Result};
use crate::hash::hash160;
use crate::tx::{
    sign_p2pkh_input, txid_hex, Capability, Outpoint, TokenData, Transaction, TxInput, TxOutput,
};

/// Per-input allowance for the signature and key added at signing time
const SIGNATURE_ALLOWANCE: u64 = 100;

/// Unlock transaction size excluding the redeem script
const UNLOCK_BASE_SIZE: u64 = 320;

/// Explicit flow configuration
#[derive(Clone, Debug)]
pub struct FlowParams {
    /// Satoshis per byte; the chain's relay rate is a floor
    pub fee_rate: u64,
    /// Smallest change output worth creating
    pub dust_limit: u64,
    pub p2sh_kind: P2shKind,
    pub template: CovenantTemplate,
}

impl Default for FlowParams {
    fn default() -> Self {
        Self {
            fee_rate: 1,
            dust_limit: 1_000,
            p2sh_kind: P2shKind::default(),
            template: CovenantTemplate::reference(),
        }
    }
}

impl FlowParams {
    /// Fee set aside in the covenant output for the later unlock
    pub fn unlock_fee_reserve(&self, redeem_len: usize) -> Result<u64> {
        fee_for(UNLOCK_BASE_SIZE + redeem_len as u64, self.fee_rate)
    }

    /// These params with `fee_rate` raised to the chain's relay rate
    async fn with_chain_fee_rate<C: ChainClient + ?Sized>(&self, chain: &C) -> Result<Self> {
        let relay = chain.get_fee_rate().await?;
        if relay > self.fee_rate {
            debug!(configured = self.fee_rate, relay, "raising fee rate to relay rate");
        }
        Ok(Self {
            fee_rate: self.fee_rate.max(relay),
            ..self.clone()
        })
    }
}

fn fee_for(size: u64, fee_rate: u64) -> Result<u64> {
    size.checked_mul(fee_rate).ok_or_else(|| {
        Error::ValueOutOfRange(format!("fee for {size} bytes at {fee_rate} sat/byte overflows"))
    })
}

#[derive(Clone, Debug)]
pub struct LockReceipt {
    pub txid: [u8; 32],
    pub covenant_outpoint: Outpoint,
    pub covenant: Covenant,
    pub category: [u8; 32],
    /// Pedersen commitment carried in the NFT (confidential flow only)
    pub commitment: Option<[u8; POINT_LEN]>,
    pub envelope: Option<Vec<u8>>,
    pub change: Option<Outpoint>,
}

#[derive(Clone, Debug)]
pub struct UnlockReceipt {
    pub txid: [u8; 32],
    pub amount: u64,
    pub memo: Vec<u8>,
    pub payout: Outpoint,
    pub payout_hash: [u8; 20],
    pub proof_hash: Option<[u8; 32]>,
}

#[derive(Clone, Debug)]
pub struct StealthReceipt {
    pub txid: [u8; 32],
    pub payment: Outpoint,
    pub child_hash: [u8; 20],
    pub change: Option<Outpoint>,
}

/// A one-time output the caller can now spend
#[derive(Debug)]
pub struct RecoveredOutput {
    pub outpoint: Outpoint,
    pub value: u64,
    pub token: Option<TokenData>,
    pub pubkey: [u8; POINT_LEN],
    pub secret: SecretScalar,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LockKind {
    Confidential,
    Vault,
}

// ============================================================================
// Helpers
// ============================================================================

/// Pay-to-key-hash script of a plain wallet key
pub fn wallet_script(secret: &SecretScalar) -> Vec<u8> {
    p2pkh_script(&hash160(&secret.public_key()))
}

/// Public key pushed by a signed input (second push for both P2PKH and covenant spends)
fn input_pubkey(input: &TxInput) -> Result<[u8; POINT_LEN]> {
    let items = parse_pushes(&input.unlocking_script)?;
    let pubkey = items
        .get(1)
        .ok_or(Error::MalformedScript("unlocking script carries no public key"))?;
    pubkey
        .as_slice()
        .try_into()
        .map_err(|_| Error::length("input public key", POINT_LEN, pubkey.len()))
}

/// Append a change output when it clears the dust limit; returns its index
fn add_change(
    tx: &mut Transaction,
    input_value: u64,
    change_script: Vec<u8>,
    params: &FlowParams,
) -> Result<Option<u32>> {
    let mut sized = tx.clone();
    sized.outputs.push(TxOutput::new(0, change_script.clone()));
    let size = sized.serialize()?.len() as u64 + SIGNATURE_ALLOWANCE * tx.inputs.len() as u64;
    let fee = fee_for(size, params.fee_rate)?;

    let need = tx
        .total_output_value()
        .and_then(|total| total.checked_add(fee))
        .ok_or_else(|| Error::ValueOutOfRange("outputs plus fee overflow".into()))?;
    if input_value < need {
        return Err(Error::InsufficientFunds {
            have: input_value,
            need,
        });
    }
    let change = input_value - need;
    if change < params.dust_limit {
        return Ok(None);
    }
    tx.outputs.push(TxOutput::new(change, change_script));
    Ok(Some(tx.outputs.len() as u32 - 1))
}

fn check_amount(amount: u64, params: &FlowParams) -> Result<()> {
    if amount < params.dust_limit {
        return Err(Error::ValueOutOfRange(format!(
            "amount {amount} is below the dust limit {}",
            params.dust_limit
        )));
    }
    Ok(())
}

// ============================================================================
// Covenant Flows
// ============================================================================

/// Sender: lock `amount` for `receiver` behind a proof-anchored covenant
pub async fn lock_confidential<C: ChainClient + ?Sized>(
    chain: &C,
    sender: &SecretScalar,
    receiver: &Paycode,
    amount: u64,
    memo: &[u8],
    params: &FlowParams,
) -> Result<LockReceipt> {
    lock_covenant(chain, sender, receiver, amount, memo, params, LockKind::Confidential).await
}

/// Sender: lock `amount` for `receiver` behind a guard-only covenant
pub async fn lock_vault<C: ChainClient + ?Sized>(
    chain: &C,
    sender: &SecretScalar,
    receiver: &Paycode,
    amount: u64,
    memo: &[u8],
    params: &FlowParams,
) -> Result<LockReceipt> {
    lock_covenant(chain, sender, receiver, amount, memo, params, LockKind::Vault).await
}

async fn lock_covenant<C: ChainClient + ?Sized>(
    chain: &C,
    sender: &SecretScalar,
    receiver: &Paycode,
    amount: u64,
    memo: &[u8],
    params: &FlowParams,
    kind: LockKind,
) -> Result<LockReceipt> {
    check_amount(amount, params)?;
    let params = &params.with_chain_fee_rate(chain).await?;
    let sender_scalar = sender.to_scalar();
    let sender_pubkey = sender.public_key();
    let wallet = wallet_script(sender);

    let funding = chain
        .get_utxo(&wallet)
        .await?
        .ok_or(Error::InsufficientFunds {
            have: 0,
            need: amount,
        })?;
    let category = TokenData::genesis_category(&funding.outpoint)?;

    let intent = derive_lock_intent(
        &sender_scalar,
        receiver,
        &funding.outpoint,
        0,
        RpaMode::Guard,
    )?;
    let announcement = Announcement::seal(&intent.session, amount, memo)?;

    let (envelope, token) = match kind {
        LockKind::Confidential => {
            let envelope = build_amount_proof_envelope(
                amount,
                &intent.session.zk_seed,
                &sender_pubkey,
                Some(&category),
                0,
                &announcement.to_bytes(),
            );
            let token =
                TokenData::nft(category, Capability::Mutable, envelope.commitment.to_vec());
            (Some(envelope), token)
        }
        LockKind::Vault => (None, TokenData::nft(category, Capability::None, Vec::new())),
    };

    let covenant = build_covenant(
        GuardKey::Hash(intent.child_hash),
        envelope.as_ref().map(|e| &e.proof_hash),
        &params.template,
        params.p2sh_kind,
    )?;
    let covenant_value = amount
        .checked_add(params.unlock_fee_reserve(covenant.redeem_script.len())?)
        .ok_or_else(|| Error::ValueOutOfRange(format!("amount {amount} overflows")))?;

    let mut tx = Transaction {
        inputs: vec![TxInput::new(funding.outpoint)],
        outputs: vec![
            TxOutput::new(covenant_value, covenant.locking_script.clone()).with_token(token),
            TxOutput::new(0, announcement.to_script()),
        ],
        ..Transaction::default()
    };
    let change = add_change(&mut tx, funding.output.value, wallet, params)?;
    sign_p2pkh_input(&mut tx, 0, &funding.output, &sender_scalar)?;

    let txid = chain.broadcast(&tx.serialize()?).await?;
    info!(
        txid = %txid_hex(&txid),
        kind = ?kind,
        guard_hash = %hex::encode(intent.child_hash),
        "covenant locked"
    );

    Ok(LockReceipt {
        txid,
        covenant_outpoint: Outpoint::new(txid, 0),
        covenant,
        category,
        commitment: envelope.as_ref().map(|e| e.commitment),
        envelope: envelope.map(|e| e.envelope),
        change: change.map(|vout| Outpoint::new(txid, vout)),
    })
}

/// Receiver: verify and unlock a confidential covenant, paying `pay_to`
pub async fn unlock_confidential<C: ChainClient + ?Sized>(
    chain: &C,
    keys: &PaycodeKeys,
    funding_txid: &[u8; 32],
    pay_to: &Paycode,
    params: &FlowParams,
) -> Result<UnlockReceipt> {
    unlock_covenant(chain, keys, funding_txid, pay_to, params, LockKind::Confidential).await
}

/// Receiver: unlock a guard-only covenant, paying `pay_to`
pub async fn unlock_vault<C: ChainClient + ?Sized>(
    chain: &C,
    keys: &PaycodeKeys,
    funding_txid: &[u8; 32],
    pay_to: &Paycode,
    params: &FlowParams,
) -> Result<UnlockReceipt> {
    unlock_covenant(chain, keys, funding_txid, pay_to, params, LockKind::Vault).await
}

async fn unlock_covenant<C: ChainClient + ?Sized>(
    chain: &C,
    keys: &PaycodeKeys,
    funding_txid: &[u8; 32],
    pay_to: &Paycode,
    params: &FlowParams,
    kind: LockKind,
) -> Result<UnlockReceipt> {
    let funding = chain.get_transaction(funding_txid).await?;
    let input = funding
        .inputs
        .first()
        .ok_or(Error::MalformedScript("funding transaction has no inputs"))?;
    let sender_pubkey = input_pubkey(input)?;
    let context = RpaContext {
        outpoint: input.outpoint,
        index: 0,
        mode: RpaMode::Guard,
        sender_pubkey,
    };
    let guard = derive_received_key(keys, &context)?;

    let locked = funding.output(0)?.clone();
    let token = locked
        .token
        .clone()
        .ok_or(Error::MalformedToken("covenant output carries no token"))?;
    let announcement = Announcement::find(&funding.outputs)?;
    let (amount, memo) = announcement.open(&guard.session);

    let proof_hash = match kind {
        LockKind::Confidential => {
            let on_chain: [u8; POINT_LEN] = token
                .commitment()
                .and_then(|c| c.try_into().ok())
                .ok_or(Error::MalformedToken("NFT commitment is not a 33-byte point"))?;
            let envelope = build_amount_proof_envelope(
                amount,
                &guard.session.zk_seed,
                &sender_pubkey,
                Some(&token.category),
                0,
                &announcement.to_bytes(),
            );
            if envelope.commitment != on_chain {
                warn!(
                    expected = %hex::encode(on_chain),
                    regenerated = %hex::encode(envelope.commitment),
                    "commitment mismatch"
                );
                return Err(Error::CommitmentMismatch);
            }
            if !verify_amount_proof_envelope(&envelope.envelope, Some(&on_chain)) {
                return Err(Error::ProofInvalid);
            }
            Some(envelope.proof_hash)
        }
        LockKind::Vault => None,
    };

    let covenant = build_covenant(
        GuardKey::Hash(guard.child_hash),
        proof_hash.as_ref(),
        &params.template,
        params.p2sh_kind,
    )?;
    if covenant.locking_script != locked.locking_script {
        warn!(
            funding = %txid_hex(funding_txid),
            "rebuilt covenant does not match the funded output"
        );
        return Err(match kind {
            LockKind::Confidential => Error::ProofHashMismatch,
            LockKind::Vault => Error::CovenantMismatch,
        });
    }
    if locked.value <= amount {
        return Err(Error::InsufficientFunds {
            have: locked.value,
            need: amount.saturating_add(1),
        });
    }

    let covenant_outpoint = Outpoint::new(*funding_txid, 0);
    let guard_secret = guard.child_secret.to_scalar();
    let payout = derive_lock_intent(
        &guard_secret,
        pay_to,
        &covenant_outpoint,
        0,
        RpaMode::Payment,
    )?;

    let tx = Transaction {
        inputs: vec![TxInput::new(covenant_outpoint)],
        outputs: vec![TxOutput::new(amount, p2pkh_script(&payout.child_hash)).with_token(token)],
        ..Transaction::default()
    };
    let mut spend = CovenantSpend::new(tx, 0, locked, covenant.redeem_script, amount)?;
    spend.verify_guard(&guard.child_pubkey)?;
    spend.verify_value()?;
    spend.sign(&guard_secret)?;

    let txid = chain.broadcast(&spend.signed_transaction()?.serialize()?).await?;
    spend.mark_broadcast()?;
    info!(txid = %txid_hex(&txid), amount, "covenant unlocked");

    Ok(UnlockReceipt {
        txid,
        amount,
        memo,
        payout: Outpoint::new(txid, 0),
        payout_hash: payout.child_hash,
        proof_hash,
    })
}

// ============================================================================
// Stealth Payments
// ============================================================================

/// Sender: pay `amount` to a one-time address of `receiver`
pub async fn pay_stealth<C: ChainClient + ?Sized>(
    chain: &C,
    sender: &SecretScalar,
    receiver: &Paycode,
    amount: u64,
    params: &FlowParams,
) -> Result<StealthReceipt> {
    check_amount(amount, params)?;
    let params = &params.with_chain_fee_rate(chain).await?;
    let sender_scalar = sender.to_scalar();
    let wallet = wallet_script(sender);
    let funding = chain
        .get_utxo(&wallet)
        .await?
        .ok_or(Error::InsufficientFunds {
            have: 0,
            need: amount,
        })?;

    // The payment sits at vout 0, so it uses derivation index 0
    let intent = derive_lock_intent(
        &sender_scalar,
        receiver,
        &funding.outpoint,
        0,
        RpaMode::Payment,
    )?;
    let mut tx = Transaction {
        inputs: vec![TxInput::new(funding.outpoint)],
        outputs: vec![TxOutput::new(amount, p2pkh_script(&intent.child_hash))],
        ..Transaction::default()
    };
    let change = add_change(&mut tx, funding.output.value, wallet, params)?;
    sign_p2pkh_input(&mut tx, 0, &funding.output, &sender_scalar)?;

    let txid = chain.broadcast(&tx.serialize()?).await?;
    info!(txid = %txid_hex(&txid), amount, "stealth payment sent");

    Ok(StealthReceipt {
        txid,
        payment: Outpoint::new(txid, 0),
        child_hash: intent.child_hash,
        change: change.map(|vout| Outpoint::new(txid, vout)),
    })
}

/// Receiver: recover the key for output `vout` of `txid`
///
/// The output must be pay-to-key-hash; a hash that does not match the
/// derived key is a [`Error::DerivationMismatch`].
pub async fn recover_payment<C: ChainClient + ?Sized>(
    chain: &C,
    keys: &PaycodeKeys,
    txid: &[u8; 32],
    vout: u32,
) -> Result<RecoveredOutput> {
    let tx = chain.get_transaction(txid).await?;
    let input = tx
        .inputs
        .first()
        .ok_or(Error::MalformedScript("transaction has no inputs"))?;
    let output = tx.output(vout)?;
    let expected = p2pkh_hash(&output.locking_script)
        .ok_or(Error::MalformedScript("output is not pay-to-key-hash"))?;

    let context = RpaContext {
        outpoint: input.outpoint,
        index: vout,
        mode: RpaMode::Payment,
        sender_pubkey: input_pubkey(input)?,
    };
    let received = recover_one_time_key(keys, &context, &expected)?;
    Ok(RecoveredOutput {
        outpoint: Outpoint::new(*txid, vout),
        value: output.value,
        token: output.token.clone(),
        pubkey: received.child_pubkey,
        secret: received.child_secret,
    })
}

/// Receiver: scan every output of `txid` and recover the ones addressed to `keys`
pub async fn recover_stealth<C: ChainClient + ?Sized>(
    chain: &C,
    keys: &PaycodeKeys,
    txid: &[u8; 32],
) -> Result<Vec<RecoveredOutput>> {
    let tx = chain.get_transaction(txid).await?;
    let Some(input) = tx.inputs.first() else {
        return Ok(Vec::new());
    };
    let Ok(sender_pubkey) = input_pubkey(input) else {
        return Ok(Vec::new());
    };

    let paycode = keys.paycode();
    let mut found = Vec::new();
    for (vout, output) in tx.outputs.iter().enumerate() {
        let Some(hash) = p2pkh_hash(&output.locking_script) else {
            continue;
        };
        let context = RpaContext {
            outpoint: input.outpoint,
            index: vout as u32,
            mode: RpaMode::Payment,
            sender_pubkey,
        };
        if !check_payment(&keys.scan_secret(), paycode.spend_pubkey(), &context, &hash) {
            continue;
        }
        let received = recover_one_time_key(keys, &context, &hash)?;
        found.push(RecoveredOutput {
            outpoint: Outpoint::new(*txid, vout as u32),
            value: output.value,
            token: output.token.clone(),
            pubkey: received.child_pubkey,
            secret: received.child_secret,
        });
    }
    info!(txid = %txid_hex(txid), found = found.len(), "stealth scan finished");
    Ok(found)
}
