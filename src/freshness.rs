//! Mtime-based freshness checks for incremental tasks.

use std::path::Path;
use std::time::SystemTime;

/// Get the modification time of a file
///
/// Returns `None` if the file doesn't exist or mtime cannot be read
pub fn get_mtime(path: &Path) -> Option<SystemTime> {
    path.metadata().and_then(|m| m.modified()).ok()
}

/// Check if file A is newer than file B
///
/// Returns `true` if A exists and is newer than B
/// Returns `false` if either file doesn't exist or times can't be compared
pub fn is_newer_than(a: &Path, b: &Path) -> bool {
    let (Some(a_time), Some(b_time)) = (get_mtime(a), get_mtime(b)) else {
        return false;
    };
    a_time > b_time
}

/// Whether `output` must be regenerated from `source`.
///
/// A missing output is always stale; an existing output is fresh unless
/// the source is strictly newer.
pub fn is_stale(source: &Path, output: &Path) -> bool {
    !output.exists() || is_newer_than(source, output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn set_mtime(path: &Path, time: SystemTime) {
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(time).unwrap();
    }

    #[test]
    fn test_missing_output_is_stale() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("a.png");
        fs::write(&src, b"x").unwrap();
        assert!(is_stale(&src, &temp.path().join("out.png")));
    }

    #[test]
    fn test_output_not_older_is_fresh() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("a.png");
        let out = temp.path().join("b.png");
        fs::write(&src, b"x").unwrap();
        fs::write(&out, b"y").unwrap();

        let t = SystemTime::now();
        set_mtime(&src, t);
        set_mtime(&out, t);
        assert!(!is_stale(&src, &out));

        set_mtime(&src, t + Duration::from_secs(5));
        assert!(is_stale(&src, &out));
    }

    #[test]
    fn test_is_newer_than_missing() {
        let temp = TempDir::new().unwrap();
        assert!(!is_newer_than(
            &temp.path().join("nope"),
            &temp.path().join("nada")
        ));
    }
}
