//! Run a complete sender/receiver exchange against an in-memory chain

use anyhow::{Context, Result};
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use stealthcash::flow::{
    lock_confidential, lock_vault, pay_stealth, recover_payment, recover_stealth,
    unlock_confidential, unlock_vault, wallet_script, FlowParams,
};
use stealthcash::tx::txid_hex;
use stealthcash::{MemoryChain, PaycodeKeys, SecretScalar};
use tracing::info;

/// Headroom funded on top of the amount for fees and the unlock reserve
const FEE_HEADROOM: u64 = 100_000;

const DEMO_MEMO: &[u8] = b"stealthcash demo";

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DemoMode {
    /// Proof-anchored covenant carrying a Pedersen commitment
    Confidential,
    /// Plain payment to a one-time address
    Stealth,
    /// Guard-only covenant without a proof anchor
    Vault,
}

/// What happened on the chain, in display form
#[derive(Debug, Serialize)]
pub struct DemoReport {
    pub mode: DemoMode,
    pub amount: u64,
    pub receiver_paycode: String,
    /// Txids in broadcast order
    pub transactions: Vec<String>,
    pub covenant_locking_script: Option<String>,
    pub proof_hash: Option<String>,
    pub envelope_len: Option<usize>,
    pub recovered_value: u64,
    pub recovered_pubkey: String,
    pub memo: Option<String>,
}

pub async fn execute(mode: DemoMode, amount: u64, params: &FlowParams) -> Result<DemoReport> {
    let chain = MemoryChain::new(params.fee_rate);
    let sender_wallet = SecretScalar::random();
    let sender_keys = PaycodeKeys::generate();
    let receiver = PaycodeKeys::generate();

    let funding = amount
        .checked_add(FEE_HEADROOM)
        .context("Amount too large")?;
    chain.fund(wallet_script(&sender_wallet), funding)?;
    info!(?mode, amount, "demo wallet funded");

    let receiver_paycode = receiver.paycode().to_string();
    match mode {
        DemoMode::Stealth => {
            let sent = pay_stealth(&chain, &sender_wallet, &receiver.paycode(), amount, params)
                .await
                .context("Stealth payment failed")?;
            let found = recover_stealth(&chain, &receiver, &sent.txid).await?;
            let output = found
                .into_iter()
                .next()
                .context("Receiver did not find the payment")?;
            Ok(DemoReport {
                mode,
                amount,
                receiver_paycode,
                transactions: vec![txid_hex(&sent.txid)],
                covenant_locking_script: None,
                proof_hash: None,
                envelope_len: None,
                recovered_value: output.value,
                recovered_pubkey: hex::encode(output.pubkey),
                memo: None,
            })
        }
        DemoMode::Confidential | DemoMode::Vault => {
            let lock = match mode {
                DemoMode::Confidential => {
                    lock_confidential(
                        &chain,
                        &sender_wallet,
                        &receiver.paycode(),
                        amount,
                        DEMO_MEMO,
                        params,
                    )
                    .await
                }
                _ => {
                    lock_vault(
                        &chain,
                        &sender_wallet,
                        &receiver.paycode(),
                        amount,
                        DEMO_MEMO,
                        params,
                    )
                    .await
                }
            }
            .context("Lock failed")?;

            // Receiver unlocks and pays back to the sender's paycode
            let unlock = match mode {
                DemoMode::Confidential => {
                    unlock_confidential(
                        &chain,
                        &receiver,
                        &lock.txid,
                        &sender_keys.paycode(),
                        params,
                    )
                    .await
                }
                _ => {
                    unlock_vault(
                        &chain,
                        &receiver,
                        &lock.txid,
                        &sender_keys.paycode(),
                        params,
                    )
                    .await
                }
            }
            .context("Unlock refused")?;

            let payout = recover_payment(&chain, &sender_keys, &unlock.txid, 0)
                .await
                .context("Sender could not recover the payout")?;
            Ok(DemoReport {
                mode,
                amount,
                receiver_paycode,
                transactions: vec![txid_hex(&lock.txid), txid_hex(&unlock.txid)],
                covenant_locking_script: Some(hex::encode(&lock.covenant.locking_script)),
                proof_hash: lock.covenant.proof_hash.map(hex::encode),
                envelope_len: lock.envelope.as_ref().map(Vec::len),
                recovered_value: payout.value,
                recovered_pubkey: hex::encode(payout.pubkey),
                memo: Some(String::from_utf8_lossy(&unlock.memo).into_owned()),
            })
        }
    }
}

pub async fn run(mode: DemoMode, amount: u64, params: &FlowParams, json: bool) -> Result<()> {
    let report = execute(mode, amount, params).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    println!("{}", format!("=== {:?} demo ===", report.mode).cyan().bold());
    println!();
    println!("{}: {}", "Receiver".yellow(), report.receiver_paycode);
    println!("{}: {} sat", "Amount".yellow(), report.amount);
    if let Some(script) = &report.covenant_locking_script {
        println!("{}: {}", "Covenant".yellow(), script);
    }
    if let Some(hash) = &report.proof_hash {
        println!("{}: {}", "Proof hash".yellow(), hash);
    }
    if let Some(len) = report.envelope_len {
        println!("{}: {} bytes", "Envelope".yellow(), len);
    }
    println!();
    for (i, txid) in report.transactions.iter().enumerate() {
        println!("  tx {}: {}", i + 1, txid);
    }
    println!();
    if let Some(memo) = &report.memo {
        println!("{}: {}", "Memo".yellow(), memo);
    }
    println!(
        "{} {} sat to {}",
        "Recovered".green().bold(),
        report.recovered_value,
        report.recovered_pubkey
    );
    Ok(())
}
