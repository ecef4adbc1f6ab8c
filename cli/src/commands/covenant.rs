//! Inspect a covenant redeem script

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;
use stealthcash::covenant::{parse_covenant_header, P2shKind};

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct CovenantReport {
    pub proof_hash: Option<String>,
    pub guard_hash: String,
    pub template_len: usize,
    pub p2sh20: String,
    pub p2sh32: String,
}

pub fn inspect(redeem_script: &[u8]) -> Result<CovenantReport> {
    let header = parse_covenant_header(redeem_script)?;
    Ok(CovenantReport {
        proof_hash: header.proof_hash.map(hex::encode),
        guard_hash: hex::encode(header.guard_hash),
        template_len: redeem_script.len() - header.template_offset,
        p2sh20: hex::encode(P2shKind::P2sh20.locking_script(redeem_script)),
        p2sh32: hex::encode(P2shKind::P2sh32.locking_script(redeem_script)),
    })
}

pub fn run(redeem_hex: &str) -> Result<()> {
    let bytes = super::decode_hex("redeem script", redeem_hex)?;
    let report = inspect(&bytes)?;

    println!();
    println!("{}", "Covenant Redeem Script".yellow().bold());
    println!();
    match &report.proof_hash {
        Some(hash) => println!("  Proof hash: {}", hash),
        None => println!("  Proof hash: {}", "(none, vault covenant)".dimmed()),
    }
    println!("  Guard hash: {}", report.guard_hash);
    println!("  Template:   {} bytes", report.template_len);
    println!();
    println!("{}:", "Locking scripts".cyan());
    println!("  p2sh20: {}", report.p2sh20);
    println!("  p2sh32: {}", report.p2sh32);
    Ok(())
}
