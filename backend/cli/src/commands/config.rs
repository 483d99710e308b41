//! `dprscope config`: show the effective (redacted) config or write a default file.

use std::path::Path;

use anyhow::{bail, Result};
use clap::Subcommand;

use dprscope_config::{load_and_prepare, redact_config, write_config, DprScopeConfig};

use crate::terminal_output::note_success;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective config with secrets masked
    Show,
    /// Print the config file location
    Path,
    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

pub async fn run(action: &ConfigAction, path: &Path) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_and_prepare(path).await?;
            print!("{}", serde_yaml::to_string(&redact_config(&config))?);
        }
        ConfigAction::Path => println!("{}", path.display()),
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            write_config(&DprScopeConfig::default(), path).await?;
            note_success(&format!("Wrote default config to {}", path.display()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        run(&ConfigAction::Init { force: false }, &path).await.unwrap();
        assert!(path.exists());
        assert!(run(&ConfigAction::Init { force: false }, &path).await.is_err());
        run(&ConfigAction::Init { force: true }, &path).await.unwrap();
    }
}
