//! `dprscope review <file>`: run one review in-process and print the record.

use std::path::Path;

use anyhow::{bail, Result};

use dprscope_config::DprScopeConfig;

use crate::app;
use crate::terminal_output::{note_error, note_info, note_success, risk_badge, supports_color};

pub async fn run(config: &DprScopeConfig, file: &Path) -> Result<()> {
    if !file.is_file() {
        bail!("{} is not a file", file.display());
    }
    let filename = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());

    let pipeline = app::build_pipeline(config)?;
    note_info(&format!("Reviewing {filename}"));

    match pipeline.process(&filename, file).await {
        Ok(record) => {
            note_success(&format!(
                "{} | risk {} | score {}",
                record.decision.map(|d| d.to_string()).unwrap_or_default(),
                risk_badge(record.risk_level, supports_color()),
                record.overall_score.unwrap_or_default(),
            ));
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }
        Err(failure) => {
            if let Some(id) = failure.record_id {
                note_error(&format!("Review {id} failed"));
            }
            Err(failure.into())
        }
    }
}
