//! Transform collaborators.
//!
//! Every content task hands each matched file to a [`Transform`]:
//! an opaque `bytes × source path → bytes` function. Tasks never look
//! inside; they only decide what to enumerate, where to write and how to
//! bundle.
//!
//! | Collaborator | Default implementation                                 |
//! |--------------|--------------------------------------------------------|
//! | markup       | [`CommandTransform`] (`pug` reading stdin)             |
//! | styles       | [`StyleCompiler`] (Sass command + lightningcss)        |
//! | scripts      | [`ScriptCompiler`] (oxc ES5 lowering + minifier)       |
//! | images       | [`ImageOptimizer`] (`image` crate, lossless PNG)       |

mod command;
mod raster;
mod script;
pub mod sourcemap;
mod style;

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

pub use command::{Cmd, CommandTransform};
pub use raster::ImageOptimizer;
pub use script::ScriptCompiler;
pub use style::StyleCompiler;

use crate::config::PipelineConfig;

/// A collaborator rejected a file.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransformError {
    pub message: String,
}

impl TransformError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Result of transforming one file.
#[derive(Debug, Clone, Default)]
pub struct Output {
    pub bytes: Vec<u8>,
    /// Source map (JSON) for the emitted bytes, when the collaborator makes one.
    pub source_map: Option<String>,
}

impl Output {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            source_map: None,
        }
    }

    pub fn with_source_map(mut self, map: String) -> Self {
        self.source_map = Some(map);
        self
    }
}

/// An opaque, pure transformation over a single source file.
///
/// Implementations may block (external processes, compression); tasks
/// call them from blocking worker threads.
pub trait Transform: Send + Sync {
    fn transform(&self, source: &[u8], path: &Path) -> Result<Output, TransformError>;
}

/// The four collaborators, injected into every task.
#[derive(Clone)]
pub struct Collaborators {
    pub markup: Arc<dyn Transform>,
    pub styles: Arc<dyn Transform>,
    pub scripts: Arc<dyn Transform>,
    pub images: Arc<dyn Transform>,
}

impl Collaborators {
    /// Default collaborators configured from `kiln.toml`.
    pub fn from_config(config: &PipelineConfig) -> Self {
        let root = config.root.clone();
        Self {
            markup: Arc::new(CommandTransform::new(
                "pug",
                config.markup.command.clone(),
                root.clone(),
            )),
            styles: Arc::new(StyleCompiler::new(
                CommandTransform::new("sass", config.styles.command.clone(), root),
                config.styles.targets.to_browsers(),
            )),
            scripts: Arc::new(ScriptCompiler),
            images: Arc::new(ImageOptimizer),
        }
    }
}
