//! Default config file creation.

use std::path::Path;

use crate::config::{self, Config};

/// Write the default configuration
pub fn cmd_init_config(path: Option<&Path>, force: bool) -> anyhow::Result<()> {
    let target = match path {
        Some(p) => p.to_path_buf(),
        None => config::config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?,
    };

    if target.exists() && !force {
        anyhow::bail!(
            "{:?} already exists; use --force to overwrite it",
            target
        );
    }

    let written = config::save(&Config::default(), Some(&target))?;
    println!("✓ Wrote default config to {:?}", written);
    Ok(())
}
