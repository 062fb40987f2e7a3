//! Stylesheet compiler: Sass preprocessing, vendor prefixing, minification.
//!
//! ```text
//! .sass/.scss ──[sass command]──┐
//!                               ├──> lightningcss (prefix + minify) ──> css
//! .css ─────────────────────────┘
//! ```
//!
//! lightningcss records a mapping per rule; the map points at the CSS it
//! was given, so for Sass sources it describes the preprocessor output.

use std::path::Path;

use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use parcel_sourcemap::SourceMap;

use super::{CommandTransform, Output, Transform, TransformError};

pub struct StyleCompiler {
    preprocessor: Box<dyn Transform>,
    browsers: Browsers,
}

impl StyleCompiler {
    pub fn new(preprocessor: CommandTransform, browsers: Browsers) -> Self {
        Self::with_preprocessor(Box::new(preprocessor), browsers)
    }

    pub fn with_preprocessor(preprocessor: Box<dyn Transform>, browsers: Browsers) -> Self {
        Self {
            preprocessor,
            browsers,
        }
    }

    fn needs_preprocessing(path: &Path) -> bool {
        matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("sass" | "scss")
        )
    }
}

impl Transform for StyleCompiler {
    fn transform(&self, source: &[u8], path: &Path) -> Result<Output, TransformError> {
        let css = if Self::needs_preprocessing(path) {
            self.preprocessor.transform(source, path)?.bytes
        } else {
            source.to_vec()
        };
        let css = String::from_utf8(css)
            .map_err(|_| TransformError::new("stylesheet is not valid UTF-8"))?;

        postprocess_css(&css, path, self.browsers)
    }
}

/// Prefix and minify plain CSS for the given browser targets, with a source
/// map keyed on `path`.
pub fn postprocess_css(css: &str, path: &Path, browsers: Browsers) -> Result<Output, TransformError> {
    let filename = path.display().to_string();
    let mut map = SourceMap::new("/");
    map.add_source(&filename);
    map.set_source_content(0, css)
        .map_err(|e| TransformError::new(format!("{e:?}")))?;

    let options = ParserOptions {
        filename,
        ..ParserOptions::default()
    };
    let mut stylesheet =
        StyleSheet::parse(css, options).map_err(|e| TransformError::new(e.to_string()))?;

    stylesheet
        .minify(MinifyOptions {
            targets: Targets::from(browsers),
            ..MinifyOptions::default()
        })
        .map_err(|e| TransformError::new(e.to_string()))?;

    let result = stylesheet
        .to_css(PrinterOptions {
            minify: true,
            source_map: Some(&mut map),
            targets: Targets::from(browsers),
            ..PrinterOptions::default()
        })
        .map_err(|e| TransformError::new(e.to_string()))?;

    let output = Output::new(result.code);
    Ok(match map.to_json(None) {
        Ok(json) => output.with_source_map(json),
        Err(e) => {
            crate::debug!("styles"; "no source map for {}: {:?}", path.display(), e);
            output
        }
    })
}
