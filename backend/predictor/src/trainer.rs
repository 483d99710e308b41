//! Triggers retraining of the risk model by spawning a configured command.

use std::path::PathBuf;
use std::process::Stdio;

use serde::Serialize;
use tokio::process::Command;
use tracing::{info, warn};

use dprscope_core::{DprError, DprResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrainOutcome {
    pub status: String,
    pub message: String,
}

impl TrainOutcome {
    fn skipped(message: &str) -> Self {
        Self {
            status: "skipped".into(),
            message: message.into(),
        }
    }
}

/// Runs `command` with the dataset path appended as the final argument.
#[derive(Debug, Clone, Default)]
pub struct Trainer {
    command: Option<Vec<String>>,
}

impl Trainer {
    pub fn new(command: Option<Vec<String>>) -> Self {
        Self {
            command: command.filter(|c| !c.is_empty()),
        }
    }

    pub async fn train(&self, dataset_path: Option<PathBuf>) -> DprResult<TrainOutcome> {
        let Some(dataset) = dataset_path else {
            return Ok(TrainOutcome::skipped("No dataset path provided (demo mode)"));
        };
        let Some((program, args)) = self.command.as_deref().and_then(|c| c.split_first()) else {
            return Ok(TrainOutcome::skipped("No training command configured"));
        };

        info!(program = %program, dataset = %dataset.display(), "Starting model training");
        let output = Command::new(program)
            .args(args)
            .arg(&dataset)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| DprError::upstream("trainer", format!("failed to spawn {program}: {e}")))?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            info!(target: "trainer", "{line}");
        }
        for line in String::from_utf8_lossy(&output.stderr).lines() {
            warn!(target: "trainer", "{line}");
        }

        if output.status.success() {
            info!("Model training completed");
            Ok(TrainOutcome {
                status: "ok".into(),
                message: "Training completed".into(),
            })
        } else {
            warn!(code = ?output.status.code(), "Model training failed");
            Err(DprError::upstream("trainer", "Training failed (non-zero exit code)"))
        }
    }
}
