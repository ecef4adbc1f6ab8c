//! Show or initialize the CLI configuration

use std::path::Path;

use anyhow::{bail, Result};
use colored::Colorize;

use crate::config::CliConfig;

pub fn show(path: &Path) -> Result<()> {
    let config = CliConfig::load(path)?;
    let source = if path.exists() { "file" } else { "defaults" };

    println!();
    println!("{}", "StealthCash Configuration".yellow().bold());
    println!();
    println!("{}:", "Config File".cyan());
    println!("  {} ({})", path.display(), source);
    println!();
    println!("  Network:    {}", config.network);
    println!("  Fee rate:   {} sat/byte", config.fee_rate);
    println!("  Dust limit: {} sat", config.dust_limit);
    println!("  P2SH kind:  {}", config.p2sh_kind);
    match &config.template_path {
        Some(template) => println!("  Template:   {}", template.display()),
        None => println!("  Template:   {}", "(bundled reference)".dimmed()),
    }

    // Fails on an unreadable template file
    let params = config.to_flow_params()?;
    println!("  Tail size:  {} bytes", params.template.as_bytes().len());
    Ok(())
}

pub fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "Config already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }
    CliConfig::default().save(path)?;
    println!("{} {}", "Wrote default config to".green(), path.display());
    Ok(())
}
