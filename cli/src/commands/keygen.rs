//! Key generation with optional recovery phrase
//!
//! Keys are printed, never stored. Re-create them later with `paycode`.

use anyhow::{Context, Result};
use colored::Colorize;
use stealthcash::PaycodeKeys;
use zeroize::Zeroize;

/// Options for key generation
pub struct KeygenOptions {
    /// Derive keys from a fresh recovery phrase
    pub with_mnemonic: bool,
    /// Import from an existing recovery phrase
    pub import_mnemonic: Option<String>,
    /// Passphrase for the mnemonic
    pub passphrase: Option<String>,
}

/// Keys plus the phrase they came from, if any
pub fn generate(options: &KeygenOptions) -> Result<(PaycodeKeys, Option<String>)> {
    let passphrase = options.passphrase.as_deref().unwrap_or("");
    if let Some(phrase) = &options.import_mnemonic {
        let mnemonic =
            bip39::Mnemonic::parse_normalized(phrase).context("Invalid recovery phrase")?;
        tracing::debug!(words = mnemonic.word_count(), "importing recovery phrase");
        let keys = PaycodeKeys::from_mnemonic(&mnemonic.to_string(), passphrase)?;
        return Ok((keys, None));
    }
    if options.with_mnemonic {
        let (keys, phrase) = PaycodeKeys::generate_with_mnemonic()?;
        // A passphrase changes the seed, so re-derive from the fresh phrase
        let keys = match options.passphrase {
            Some(_) => PaycodeKeys::from_mnemonic(&phrase, passphrase)?,
            None => keys,
        };
        return Ok((keys, Some(phrase)));
    }
    Ok((PaycodeKeys::generate(), None))
}

pub fn run(options: KeygenOptions) -> Result<()> {
    println!("{}", "=== StealthCash Key Generation ===".cyan().bold());
    println!();

    if options.import_mnemonic.is_some() {
        println!("{}", "Importing keys from recovery phrase...".cyan());
    } else if options.with_mnemonic {
        println!("{}", "Generating keys with recovery phrase...".cyan());
    } else {
        println!("{}", "Generating random keys (no recovery phrase)...".cyan());
    }
    println!();

    let (keys, mnemonic) = generate(&options)?;

    if let Some(phrase) = &mnemonic {
        println!("{}", "=== RECOVERY PHRASE - WRITE THIS DOWN! ===".red().bold());
        println!();
        let words: Vec<&str> = phrase.split_whitespace().collect();
        for (i, chunk) in words.chunks(4).enumerate() {
            let line: String = chunk
                .iter()
                .enumerate()
                .map(|(j, word)| format!("{:2}. {:<12}", i * 4 + j + 1, word))
                .collect::<Vec<_>>()
                .join(" ");
            println!("  {}", line.yellow());
        }
        println!();
        println!("{}", "Anyone with this phrase can spend what is sent to you.".red());
        println!();
    }

    let paycode = keys.paycode();
    println!("{}:", "Scan Public Key".yellow());
    println!("  {}", hex::encode(paycode.scan_pubkey()));
    println!();
    println!("{}:", "Spend Public Key".yellow());
    println!("  {}", hex::encode(paycode.spend_pubkey()));
    println!();
    println!("{}:", "Paycode (share this to receive payments)".yellow());
    println!("  {}", paycode);
    println!();

    if mnemonic.is_none() && options.import_mnemonic.is_none() {
        let (mut scan, mut spend) = keys.export_secrets();
        println!("{}", "Secrets (no recovery phrase, keep these offline):".red().bold());
        println!("  scan:  {}", hex::encode(scan));
        println!("  spend: {}", hex::encode(spend));
        scan.zeroize();
        spend.zeroize();
        println!();
    }

    println!(
        "{}",
        "Keys are not stored. Re-derive them with 'stealthcash paycode'.".dimmed()
    );
    Ok(())
}
