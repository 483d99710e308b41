//! Staging of uploaded files on disk.

use std::path::{Path, PathBuf};

use tracing::warn;
use uuid::Uuid;

use dprscope_core::{DprError, DprResult};

/// The client-supplied name reduced to its final path component.
pub fn display_name(raw: Option<&str>) -> String {
    raw.and_then(|name| Path::new(name).file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "upload".to_string())
}

/// Write `bytes` under `dir` with a fresh UUID name keeping the original extension.
pub async fn stage(dir: &Path, original_name: &str, bytes: &[u8]) -> DprResult<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| DprError::Internal(format!("cannot create upload dir {}: {e}", dir.display())))?;

    let mut name = Uuid::new_v4().to_string();
    if let Some(ext) = Path::new(original_name).extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    let path = dir.join(name);
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| DprError::Internal(format!("cannot stage upload {}: {e}", path.display())))?;
    Ok(path)
}

/// Remove a staged upload once its review has finished.
pub async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!(staged = %path.display(), error = %e, "failed to remove staged upload");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_strips_directories() {
        assert_eq!(display_name(Some("../../etc/report.pdf")), "report.pdf");
        assert_eq!(display_name(Some("")), "upload");
        assert_eq!(display_name(None), "upload");
    }

    #[tokio::test]
    async fn test_stage_keeps_extension() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested/uploads");
        let path = stage(&target, "Bridge DPR.pdf", b"%PDF").await.unwrap();

        assert_eq!(path.extension().unwrap(), "pdf");
        assert!(path.starts_with(&target));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"%PDF");
    }

    #[tokio::test]
    async fn test_discard_removes_staged_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = stage(dir.path(), "report.pdf", b"%PDF").await.unwrap();

        discard(&path).await;
        assert!(!path.exists());
        // Already gone: only logged.
        discard(&path).await;
    }
}
