//! Script compiler: oxc parse, downlevel to ES5, compress, mangle, minified
//! codegen.
//!
//! Scripts are parsed as classic (non-module) sources since the bundle is
//! a plain concatenation loaded by a `<script>` tag; top-level names are
//! therefore left unmangled.

use std::path::Path;

use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::semantic::SemanticBuilder;
use oxc::span::SourceType;
use oxc::transformer::{TransformOptions, Transformer};

use super::{Output, Transform, TransformError};

pub struct ScriptCompiler;

impl Transform for ScriptCompiler {
    fn transform(&self, source: &[u8], path: &Path) -> Result<Output, TransformError> {
        let source = std::str::from_utf8(source)
            .map_err(|_| TransformError::new("script is not valid UTF-8"))?;
        minify_js(source, path)
    }
}

/// Syntax level the bundle is lowered to.
const TARGET: &str = "es5";

/// Downlevel and minify JavaScript source code, emitting a source map keyed
/// on `path`.
pub fn minify_js(source: &str, path: &Path) -> Result<Output, TransformError> {
    let allocator = Allocator::default();
    let source_type = SourceType::cjs();

    let ret = Parser::new(&allocator, source, source_type).parse();
    if let Some(error) = ret.errors.first() {
        return Err(TransformError::new(error.to_string()));
    }

    let mut program = ret.program;
    let scoping = SemanticBuilder::new()
        .build(&program)
        .semantic
        .into_scoping();
    let options = TransformOptions::from_target(TARGET)
        .map_err(|e| TransformError::new(format!("invalid target {TARGET}: {e:?}")))?;
    let ret = Transformer::new(&allocator, path, &options).build_with_scoping(scoping, &mut program);
    if let Some(error) = ret.errors.first() {
        return Err(TransformError::new(error.to_string()));
    }

    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::smallest()),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);

    let ret = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            source_map_path: Some(path.to_path_buf()),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program);

    let output = Output::new(ret.code);
    Ok(match ret.map {
        Some(map) => output.with_source_map(map.to_json_string()),
        None => output,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(source: &str) -> Result<Output, TransformError> {
        ScriptCompiler.transform(source.as_bytes(), Path::new("src/scripts/main.js"))
    }

    #[test]
    fn test_minifies_and_keeps_top_level_names() {
        let out = compile(
            "// greeting helper\nfunction greet(name) {\n  const message = 'hi ' + name;\n  return message;\n}\n",
        )
        .unwrap();
        let code = String::from_utf8(out.bytes).unwrap();

        assert!(code.contains("greet"));
        assert!(!code.contains("greeting helper"));
        assert!(code.len() < 60);
    }

    #[test]
    fn test_arrow_functions_are_downleveled() {
        let out = compile("var double = (x) => x * 2;\nconsole.log(double(21));\n").unwrap();
        let code = String::from_utf8(out.bytes).unwrap();

        assert!(code.contains("function"));
        assert!(!code.contains("=>"));
    }

    #[test]
    fn test_emits_source_map() {
        let out = compile("var answer = 40 + 2;\nconsole.log(answer);\n").unwrap();
        let map: serde_json::Value = serde_json::from_str(&out.source_map.unwrap()).unwrap();
        assert_eq!(map["version"], 3);
    }

    #[test]
    fn test_syntax_error_is_rejected() {
        assert!(compile("function (").is_err());
    }
}
