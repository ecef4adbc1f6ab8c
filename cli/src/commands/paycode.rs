//! Show a paycode from secrets, a recovery phrase, or decode one

use anyhow::{bail, Context, Result};
use colored::Colorize;
use stealthcash::{Paycode, PaycodeKeys};
use zeroize::Zeroize;

use super::decode_hex_array;

/// Where the paycode comes from
pub enum PaycodeSource {
    Mnemonic {
        phrase: String,
        passphrase: String,
    },
    Secrets {
        scan_hex: String,
        spend_hex: String,
    },
    Encoded(String),
}

pub fn resolve(source: &PaycodeSource) -> Result<Paycode> {
    match source {
        PaycodeSource::Mnemonic { phrase, passphrase } => {
            Ok(PaycodeKeys::from_mnemonic(phrase, passphrase)?.paycode())
        }
        PaycodeSource::Secrets {
            scan_hex,
            spend_hex,
        } => {
            let mut scan: [u8; 32] = decode_hex_array("scan secret", scan_hex)?;
            let mut spend: [u8; 32] = decode_hex_array("spend secret", spend_hex)?;
            let keys = PaycodeKeys::from_secrets(&scan, &spend);
            scan.zeroize();
            spend.zeroize();
            Ok(keys.context("Secrets do not form a valid key pair")?.paycode())
        }
        PaycodeSource::Encoded(text) => text.parse().context("Invalid paycode"),
    }
}

/// Build the source from mutually exclusive CLI arguments
pub fn source_from_args(
    mnemonic: Option<String>,
    passphrase: Option<String>,
    scan_secret: Option<String>,
    spend_secret: Option<String>,
    decode: Option<String>,
) -> Result<PaycodeSource> {
    match (mnemonic, scan_secret, spend_secret, decode) {
        (Some(phrase), None, None, None) => Ok(PaycodeSource::Mnemonic {
            phrase,
            passphrase: passphrase.unwrap_or_default(),
        }),
        (None, Some(scan_hex), Some(spend_hex), None) => Ok(PaycodeSource::Secrets {
            scan_hex,
            spend_hex,
        }),
        (None, None, None, Some(text)) => Ok(PaycodeSource::Encoded(text)),
        _ => bail!(
            "Give exactly one of --mnemonic, --scan-secret with --spend-secret, or --decode"
        ),
    }
}

pub fn run(source: PaycodeSource) -> Result<()> {
    let paycode = resolve(&source)?;

    println!();
    println!("{}", "Your StealthCash Paycode".yellow().bold());
    println!();
    println!("{}", paycode);
    println!();
    println!("{}:", "Components".dimmed());
    println!("  Scan pubkey:  {}", hex::encode(paycode.scan_pubkey()));
    println!("  Spend pubkey: {}", hex::encode(paycode.spend_pubkey()));
    println!();
    println!(
        "{}",
        "Share the paycode above to receive private payments.".dimmed()
    );
    Ok(())
}
