//! Atomic file writes

use std::path::Path;

use tracing::debug;
use uuid::Uuid;

/// Write `content` to `path`, creating parent directories.
///
/// Content goes to a hidden sibling first and is renamed over the target, so
/// readers never observe a half-written file.
pub async fn write_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = path.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()));

    debug!("◆ staging {:?} via {:?}", path, temp);
    tokio::fs::write(&temp, content).await?;

    if let Err(e) = tokio::fs::rename(&temp, path).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_creates_parents() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("a").join("b").join("c.txt");

        write_atomic(&target, "hello").await.unwrap();
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_write_replaces_and_leaves_no_temp() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("main.py");

        write_atomic(&target, "v1").await.unwrap();
        write_atomic(&target, "v2").await.unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "v2");
        let entries: Vec<_> = std::fs::read_dir(temp_dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_write_onto_directory_fails_cleanly() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("dir");
        std::fs::create_dir_all(target.join("inner")).unwrap();

        assert!(write_atomic(&target, "x").await.is_err());
        let entries: Vec<_> = std::fs::read_dir(temp_dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
