//! Source map assembly for bundled outputs.
//!
//! Each collaborator emits a precise single-source map for its file. A
//! [`Bundle`] joins the outputs with `\n`, rewrites every map's source to a
//! URL relative to the bundle, and merges the maps at their line offsets
//! with oxc's concatenating builder.

use std::path::{Component, Path};

use oxc_sourcemap::{ConcatSourceMapBuilder, SourceMap};
use serde_json::{Value, json};

/// A bundle under construction.
#[derive(Debug, Default)]
pub struct Bundle {
    code: String,
    /// Per-file maps (JSON) and the bundle line each one starts at.
    sections: Vec<(u32, String)>,
    line: u32,
}

impl Bundle {
    /// Append one file's output. Its map, if any, is rebased onto `source_url`.
    pub fn push(&mut self, code: &str, map: Option<&str>, source_url: &str) {
        let code = code.trim_end_matches('\n');
        if self.line > 0 {
            self.code.push('\n');
        }
        self.code.push_str(code);

        if let Some(map) = map {
            let map = rebase_sources(map, source_url).unwrap_or_else(|| map.to_string());
            self.sections.push((self.line, map));
        }
        self.line += code.matches('\n').count() as u32 + 1;
    }

    /// Finish with a trailing mapping comment; returns `(code, map)`.
    pub fn finish(mut self, file: &str, map_file: &str, css: bool) -> (String, String) {
        self.code.push('\n');
        self.code.push_str(&mapping_comment(map_file, css));
        let map = concat(file, &self.sections);
        (self.code, map)
    }
}

/// Merge per-file maps into one, shifting each by its starting line.
///
/// Maps that fail to parse are left out.
pub fn concat(file: &str, sections: &[(u32, String)]) -> String {
    let maps: Vec<(SourceMap, u32)> = sections
        .iter()
        .filter_map(|(line, map)| match SourceMap::from_json_string(map) {
            Ok(map) => Some((map, *line)),
            Err(e) => {
                crate::debug!("sourcemap"; "skipping unreadable map at line {}: {:?}", line, e);
                None
            }
        })
        .collect();

    let mut builder = ConcatSourceMapBuilder::default();
    for (map, line) in &maps {
        builder.add_sourcemap(map, *line);
    }
    let merged = builder.into_sourcemap().to_json_string();
    set_field(&merged, "file", json!(file)).unwrap_or(merged)
}

/// Replace the `sources` of a single-source map with `url`.
pub fn rebase_sources(map: &str, url: &str) -> Option<String> {
    set_field(map, "sources", json!([url]))
}

fn set_field(map: &str, key: &str, value: Value) -> Option<String> {
    let mut map: Value = serde_json::from_str(map).ok()?;
    map.as_object_mut()?.insert(key.to_string(), value);
    Some(map.to_string())
}

/// URL of `source` as seen from a map written into `dest_dir`.
///
/// Both paths are absolute and under `root`:
/// `dist/js` + `src/scripts/a.js` → `../../src/scripts/a.js`.
pub fn source_url(root: &Path, dest_dir: &Path, source: &Path) -> String {
    let depth = dest_dir
        .strip_prefix(root)
        .map(|p| {
            p.components()
                .filter(|c| matches!(c, Component::Normal(_)))
                .count()
        })
        .unwrap_or(0);
    let rel = source.strip_prefix(root).unwrap_or(source);
    let rel: Vec<_> = rel
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    let mut url = "../".repeat(depth);
    url.push_str(&rel.join("/"));
    url
}

/// Trailing comment that points a bundle at its map.
pub fn mapping_comment(map_file: &str, css: bool) -> String {
    if css {
        format!("/*# sourceMappingURL={map_file} */")
    } else {
        format!("//# sourceMappingURL={map_file}")
    }
}
