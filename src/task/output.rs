//! Atomic output writes.
//!
//! Every output goes to a hidden sibling first and is renamed into place,
//! so readers (the dev server, a browser mid-reload) only ever see the old
//! file or the complete new one.

use std::path::{Path, PathBuf};

use super::TaskError;

/// Write `bytes` to `path` atomically, creating parent directories.
///
/// Returns the number of bytes written.
pub async fn write_atomic(task: &'static str, path: &Path, bytes: &[u8]) -> Result<u64, TaskError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(TaskError::io(task, parent))?;
    }

    let temp = temp_sibling(path);
    if let Err(e) = tokio::fs::write(&temp, bytes).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(TaskError::io(task, &temp)(e));
    }
    if let Err(e) = tokio::fs::rename(&temp, path).await {
        let _ = tokio::fs::remove_file(&temp).await;
        return Err(TaskError::io(task, path)(e));
    }

    Ok(bytes.len() as u64)
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.kiln-tmp"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_creates_parents_and_leaves_no_temp() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("dist/css/main.min.css");

        let size = write_atomic("styles", &out, b"a{color:red}").await.unwrap();
        assert_eq!(size, 12);
        assert_eq!(fs::read_to_string(&out).unwrap(), "a{color:red}");

        let entries: Vec<_> = fs::read_dir(out.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec!["main.min.css"]);
    }

    #[tokio::test]
    async fn test_write_replaces_existing() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("index.html");
        fs::write(&out, "old").unwrap();

        write_atomic("pug", &out, b"new").await.unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), "new");
    }

    #[tokio::test]
    async fn test_write_into_file_parent_fails() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("dist");
        fs::write(&blocker, "not a directory").unwrap();

        let err = write_atomic("pug", &blocker.join("index.html"), b"x")
            .await
            .unwrap_err();
        assert!(matches!(err, TaskError::Io { task: "pug", .. }));
    }

    #[test]
    fn test_temp_sibling() {
        assert_eq!(
            temp_sibling(Path::new("/site/dist/js/main.min.js")),
            PathBuf::from("/site/dist/js/.main.min.js.kiln-tmp")
        );
    }
}
