//! Fixed project layout: the four path sets and their source globs.
//!
//! ```text
//! src/*.pug                      → dist/
//! src/styles/**/*.{sass,css}     → dist/css/main.min.css (+ .map)
//! src/scripts/**/*.js            → dist/js/main.min.js (+ .map)
//! src/img/**                     → dist/img/
//! ```

use std::path::{Component, Path, PathBuf};

use rustc_hash::FxHashSet;
use thiserror::Error;
use wax::{CandidatePath, Glob, Pattern};

/// Output root, relative to the project root.
pub const OUTPUT_DIR: &str = "dist";

/// Bundle file name written by the styles task.
pub const STYLES_BUNDLE: &str = "main.min.css";

/// Bundle file name written by the scripts task.
pub const SCRIPTS_BUNDLE: &str = "main.min.js";

/// A named group of source globs and the directory they build into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathSet {
    pub name: &'static str,
    /// Globs relative to the project root, enumerated in this order.
    pub sources: &'static [&'static str],
    /// Destination directory relative to the project root.
    pub dest: &'static str,
}

pub const MARKUP: PathSet = PathSet {
    name: "markup",
    sources: &["src/*.pug"],
    dest: "dist",
};

pub const STYLES: PathSet = PathSet {
    name: "styles",
    sources: &["src/styles/**/*.sass", "src/styles/**/*.css"],
    dest: "dist/css",
};

pub const SCRIPTS: PathSet = PathSet {
    name: "scripts",
    sources: &["src/scripts/**/*.js"],
    dest: "dist/js",
};

pub const IMAGES: PathSet = PathSet {
    name: "images",
    sources: &["src/img/**"],
    dest: "dist/img",
};

/// Invalid glob or failed directory walk.
#[derive(Debug, Error)]
#[error("glob `{pattern}`: {message}")]
pub struct GlobError {
    pub pattern: &'static str,
    pub message: String,
}

/// A file matched by one of a path set's globs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute path.
    pub path: PathBuf,
    /// Path relative to the literal prefix of the glob that matched it
    /// (`src/img/icons/a.png` → `icons/a.png`).
    pub relative: PathBuf,
}

impl PathSet {
    /// Absolute destination directory.
    pub fn dest_dir(&self, root: &Path) -> PathBuf {
        root.join(self.dest)
    }

    /// Enumerate matched regular files.
    ///
    /// Globs are walked in declaration order; matches of one glob are sorted
    /// lexicographically and a file matched by an earlier glob is not repeated.
    /// Dot-files are skipped.
    pub fn enumerate(&self, root: &Path) -> Result<Vec<SourceFile>, GlobError> {
        let mut seen = FxHashSet::default();
        let mut files = Vec::new();

        for &pattern in self.sources {
            let glob = Glob::new(pattern).map_err(|e| GlobError {
                pattern,
                message: e.to_string(),
            })?;
            let (prefix, glob) = glob.partition();
            let base = root.join(prefix);
            if !base.is_dir() {
                continue;
            }

            let mut matched = Vec::new();
            for entry in glob.walk(&base) {
                let entry = entry.map_err(|e| GlobError {
                    pattern,
                    message: e.to_string(),
                })?;
                let path = entry.path();
                if !path.is_file() {
                    continue;
                }
                let relative = path.strip_prefix(&base).unwrap_or(path).to_path_buf();
                if is_hidden(&relative) {
                    continue;
                }
                matched.push(SourceFile {
                    path: path.to_path_buf(),
                    relative,
                });
            }
            matched.sort_by(|a, b| a.path.cmp(&b.path));

            for file in matched {
                if seen.insert(file.path.clone()) {
                    files.push(file);
                }
            }
        }

        Ok(files)
    }

    /// Check whether an absolute path falls under any of the source globs.
    pub fn matches(&self, root: &Path, path: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(root) else {
            return false;
        };
        self.sources.iter().any(|pattern| {
            Glob::new(pattern)
                .map(|glob| glob.is_match(CandidatePath::from(relative)))
                .unwrap_or(false)
        })
    }
}

/// Dot-files and anything inside a dot-directory.
fn is_hidden(relative: &Path) -> bool {
    relative.components().any(|c| match c {
        Component::Normal(name) => name.to_str().is_some_and(|n| n.starts_with('.')),
        _ => false,
    })
}
