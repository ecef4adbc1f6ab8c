//! Configuration for the StealthCash CLI
//!
//! Stored as JSON at `~/.stealthcash/config.json`. Missing files and missing
//! fields fall back to defaults, so an empty `{}` is a valid config.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use stealthcash::covenant::{CovenantTemplate, P2shKind};
use stealthcash::FlowParams;

/// Default directory for CLI state
const CONFIG_DIR: &str = ".stealthcash";
const CONFIG_FILE: &str = "config.json";

/// Highest accepted fee rate in satoshis per byte
pub const MAX_FEE_RATE: u64 = 10_000;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Chipnet,
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Network::Mainnet => "mainnet",
            Network::Chipnet => "chipnet",
        })
    }
}

/// Persisted CLI settings
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct CliConfig {
    pub network: Network,
    /// Satoshis per byte
    pub fee_rate: u64,
    /// Smallest change output worth creating
    pub dust_limit: u64,
    /// Hex file holding the covenant template tail
    pub template_path: Option<PathBuf>,
    /// `p2sh20` or `p2sh32`
    pub p2sh_kind: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            network: Network::default(),
            fee_rate: 1,
            dust_limit: 1_000,
            template_path: None,
            p2sh_kind: P2shKind::default().to_string(),
        }
    }
}

/// Get the CLI state directory
pub fn config_dir() -> Result<PathBuf> {
    Ok(dirs::home_dir()
        .context("Could not find home directory")?
        .join(CONFIG_DIR))
}

/// Config path: the `--config` override, else the default location
pub fn config_path(override_path: Option<&Path>) -> Result<PathBuf> {
    match override_path {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(config_dir()?.join(CONFIG_FILE)),
    }
}

impl CliConfig {
    /// Load from `path`, or defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: CliConfig = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).context("Failed to create config directory")?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_FEE_RATE).contains(&self.fee_rate) {
            bail!(
                "fee_rate must be between 1 and {MAX_FEE_RATE} sat/byte, got {}",
                self.fee_rate
            );
        }
        self.p2sh_kind()?;
        Ok(())
    }

    pub fn p2sh_kind(&self) -> Result<P2shKind> {
        self.p2sh_kind
            .parse()
            .with_context(|| format!("Invalid p2sh_kind {:?}", self.p2sh_kind))
    }

    /// Covenant template from `template_path`, or the bundled reference
    pub fn template(&self) -> Result<CovenantTemplate> {
        let Some(path) = &self.template_path else {
            return Ok(CovenantTemplate::reference());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read template file {}", path.display()))?;
        CovenantTemplate::from_hex(&text)
            .with_context(|| format!("Invalid template in {}", path.display()))
    }

    pub fn to_flow_params(&self) -> Result<FlowParams> {
        self.validate()?;
        Ok(FlowParams {
            fee_rate: self.fee_rate,
            dust_limit: self.dust_limit,
            p2sh_kind: self.p2sh_kind()?,
            template: self.template()?,
        })
    }
}
