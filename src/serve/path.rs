//! URL to filesystem path resolution.

use std::path::{Path, PathBuf};

/// Resolve URL to filesystem path, handling index.html for directories
pub fn resolve_path(url: &str, serve_root: &Path) -> Option<PathBuf> {
    let clean = normalize_url(url);

    // Reject paths with suspicious patterns early
    if clean.split('/').any(|segment| segment == "..") {
        return None;
    }

    let local = serve_root.join(&clean);

    // Canonicalize to resolve symlinks and verify path is under serve_root
    let canonical = local.canonicalize().ok()?;
    let root_canonical = serve_root.canonicalize().ok()?;

    if !canonical.starts_with(&root_canonical) {
        return None;
    }

    if canonical.is_file() {
        return Some(canonical);
    }

    if canonical.is_dir() {
        let index = canonical.join("index.html");
        if index.is_file() {
            return Some(index);
        }
    }

    None
}

/// Normalize URL: decode, strip query string, trim slashes
fn normalize_url(url: &str) -> String {
    use percent_encoding::percent_decode_str;

    let path = url.split(['?', '#']).next().unwrap_or(url);
    let decoded = percent_decode_str(path)
        .decode_utf8()
        .map(std::borrow::Cow::into_owned)
        .unwrap_or_default();

    decoded.replace('\\', "/").trim_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn site() -> TempDir {
        let temp = TempDir::new().unwrap();
        let dist = temp.path().join("dist");
        fs::create_dir_all(dist.join("img")).unwrap();
        fs::write(dist.join("index.html"), "home").unwrap();
        fs::write(dist.join("about me.html"), "about").unwrap();
        fs::write(dist.join("img/logo.png"), "png").unwrap();
        fs::write(temp.path().join("secret.txt"), "secret").unwrap();
        temp
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("/css/main.min.css?t=123"), "css/main.min.css");
        assert_eq!(normalize_url("/about%20me.html"), "about me.html");
        assert_eq!(normalize_url("/"), "");
    }

    #[test]
    fn test_resolve_files_and_index() {
        let temp = site();
        let dist = temp.path().join("dist");

        let index = resolve_path("/", &dist).unwrap();
        assert!(index.ends_with("index.html"));

        let about = resolve_path("/about%20me.html", &dist).unwrap();
        assert!(about.ends_with("about me.html"));

        assert!(resolve_path("/img/logo.png", &dist).is_some());
        assert!(resolve_path("/img/", &dist).is_none());
        assert!(resolve_path("/nope.html", &dist).is_none());
    }

    #[test]
    fn test_rejects_traversal() {
        let temp = site();
        let dist = temp.path().join("dist");

        assert!(resolve_path("/../secret.txt", &dist).is_none());
        assert!(resolve_path("/%2e%2e/secret.txt", &dist).is_none());
        assert!(resolve_path("/img/..%5C..%5Csecret.txt", &dist).is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_rejects_symlink_escape() {
        let temp = site();
        let dist = temp.path().join("dist");
        std::os::unix::fs::symlink(temp.path().join("secret.txt"), dist.join("leak.txt")).unwrap();

        assert!(resolve_path("/leak.txt", &dist).is_none());
    }
}
