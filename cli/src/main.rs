//! StealthCash CLI - paycodes, covenant demos and envelope inspection

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;


#[cfg(test)]
mod test_vectors;

#[cfg(test)]
mod fuzz_tests;


use commands::{covenant, demo, envelope, keygen, paycode};
use config::{config_path, CliConfig};

#[derive(Parser)]
#[command(name = "stealthcash")]
#[command(author = "StealthCash Team")]
#[command(version = "0.1.0")]
#[command(about = "Confidential token transfers with one-time paycode keys")]
#[command(long_about = r#"
StealthCash locks tokenized value under covenants that only a designated
receiver can unlock. Amounts are hidden behind Pedersen commitments with a
64-bit range proof, and every output pays a fresh one-time key.

Quick Start:
  1. stealthcash keygen                   Generate your paycode keys
  2. stealthcash demo --mode confidential Run a full lock/unlock loop
  3. stealthcash envelope verify <hex>    Verify an amount envelope
  4. stealthcash covenant inspect <hex>   Inspect a redeem script
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug-level logging for the engine and the CLI
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate paycode keys (scan + spend)
    Keygen {
        /// Generate without a recovery phrase
        #[arg(long)]
        no_mnemonic: bool,

        /// Import from an existing recovery phrase
        #[arg(long)]
        import_mnemonic: Option<String>,

        /// Passphrase for the recovery phrase
        #[arg(long)]
        passphrase: Option<String>,
    },

    /// Show a paycode from a recovery phrase or secrets, or decode one
    Paycode {
        #[arg(long)]
        mnemonic: Option<String>,

        #[arg(long, requires = "mnemonic")]
        passphrase: Option<String>,

        /// Scan secret (hex)
        #[arg(long, requires = "spend_secret")]
        scan_secret: Option<String>,

        /// Spend secret (hex)
        #[arg(long, requires = "scan_secret")]
        spend_secret: Option<String>,

        /// Paycode to decode
        #[arg(long)]
        decode: Option<String>,
    },

    /// Run a full sender/receiver loop against an in-memory chain
    Demo {
        #[arg(short, long, value_enum, default_value = "confidential")]
        mode: demo::DemoMode,

        /// Amount in satoshis
        #[arg(short, long, default_value = "100000")]
        amount: u64,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Amount envelope tools
    Envelope {
        #[command(subcommand)]
        action: EnvelopeAction,
    },

    /// Covenant redeem script tools
    Covenant {
        #[command(subcommand)]
        action: CovenantAction,
    },

    /// Show or initialize the configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum EnvelopeAction {
    /// Parse and verify an envelope
    Verify {
        /// Envelope bytes (hex)
        envelope: String,

        /// Expected aggregate commitment (hex)
        #[arg(long)]
        commitment: Option<String>,

        /// Proof hash anchored by the covenant (hex)
        #[arg(long)]
        proof_hash: Option<String>,
    },
}

#[derive(Subcommand)]
enum CovenantAction {
    /// Extract proof hash and guard hash
    Inspect {
        /// Redeem script (hex)
        redeem_script: String,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "stealthcash=debug,stealthcash_cli=debug"
    } else {
        "stealthcash=warn,stealthcash_cli=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Keygen {
            no_mnemonic,
            import_mnemonic,
            passphrase,
        } => {
            keygen::run(keygen::KeygenOptions {
                with_mnemonic: !no_mnemonic,
                import_mnemonic,
                passphrase,
            })?;
        }
        Commands::Paycode {
            mnemonic,
            passphrase,
            scan_secret,
            spend_secret,
            decode,
        } => {
            let source =
                paycode::source_from_args(mnemonic, passphrase, scan_secret, spend_secret, decode)?;
            paycode::run(source)?;
        }
        Commands::Demo { mode, amount, json } => {
            let path = config_path(cli.config.as_deref())?;
            let params = CliConfig::load(&path)?.to_flow_params()?;
            demo::run(mode, amount, &params, json).await?;
        }
        Commands::Envelope {
            action:
                EnvelopeAction::Verify {
                    envelope: envelope_hex,
                    commitment,
                    proof_hash,
                },
        } => {
            envelope::run(&envelope_hex, commitment.as_deref(), proof_hash.as_deref())?;
        }
        Commands::Covenant {
            action: CovenantAction::Inspect { redeem_script },
        } => {
            covenant::run(&redeem_script)?;
        }
        Commands::Config { action } => {
            let path = config_path(cli.config.as_deref())?;
            match action {
                ConfigAction::Show => commands::config::show(&path)?,
                ConfigAction::Init { force } => commands::config::init(&path, force)?,
            }
        }
    }

    Ok(())
}
