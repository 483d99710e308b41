//! `dprscope list`: dashboard listing on the terminal.

use anyhow::Result;

use dprscope_config::DprScopeConfig;
use dprscope_core::{RecordQuery, RiskLevel};

use crate::app;
use crate::terminal_output::{note_info, records_table, supports_color};

pub async fn run(config: &DprScopeConfig, risk_level: Option<&str>, limit: usize) -> Result<()> {
    let query = RecordQuery {
        risk_level: risk_level.map(str::parse::<RiskLevel>).transpose()?,
        status: None,
        limit,
    };
    let store = app::open_store(&config.storage)?;
    let records = store.list(&query).await?;
    if records.is_empty() {
        note_info("No reviews stored yet");
        return Ok(());
    }
    print!("{}", records_table(&records, supports_color()));
    Ok(())
}
