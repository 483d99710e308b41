//! `dprscope status`: check the health endpoint of a local server.

use anyhow::Result;
use serde_json::Value;

use crate::terminal_output::{note_error, note_success};

pub async fn run(port: u16) -> Result<()> {
    let url = format!("http://localhost:{port}/api/health");
    match reqwest::get(&url).await {
        Ok(resp) if resp.status().is_success() => {
            let body: Value = resp.json().await?;
            note_success(&format!(
                "DPRScope {} is running on port {port}",
                body["version"].as_str().unwrap_or("?")
            ));
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Ok(resp) => {
            note_error(&format!("Health check on port {port} returned {}", resp.status()));
        }
        Err(_) => {
            note_error(&format!("DPRScope is not running on port {port}"));
        }
    }
    Ok(())
}
