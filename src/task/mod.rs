//! Build tasks.
//!
//! A task is named, stateless and idempotent: running it twice over the
//! same sources produces the same outputs. Tasks receive everything they
//! need through a [`TaskContext`], including the transform collaborators
//! and the reload notifier.
//!
//! | Task      | Sources                          | Output                        | Reload      |
//! |-----------|----------------------------------|-------------------------------|-------------|
//! | `clean`   | -                                | empties `dist/` (keeps `img`) | -           |
//! | `pug`     | `src/*.pug`                      | `dist/<stem>.html`            | full        |
//! | `styles`  | `src/styles/**/*.{sass,css}`     | `dist/css/main.min.css`       | css inject  |
//! | `scripts` | `src/scripts/**/*.js`            | `dist/js/main.min.js`         | full        |
//! | `img`     | `src/img/**`                     | `dist/img/**` (newer only)    | full        |
//!
//! Tasks compose into a build graph with [`Step`].

mod clean;
mod images;
mod markup;
mod output;
mod runner;
mod scripts;
mod styles;

pub use clean::CleanTask;
pub use images::ImagesTask;
pub use markup::MarkupTask;
pub use runner::{Step, run_task};
pub use scripts::ScriptsTask;
pub use styles::StylesTask;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::BoxFuture;
use thiserror::Error;

use crate::config::PipelineConfig;
use crate::layout::GlobError;
use crate::logger::format_size;
use crate::reload::ReloadNotifier;
use crate::transform::{Collaborators, Output, Transform};
use crate::utils::path::slash_path;

/// A named unit of build work.
pub trait Task: Send + Sync {
    fn name(&self) -> &'static str;

    fn run<'a>(&'a self, ctx: &'a TaskContext) -> BoxFuture<'a, Result<TaskReport, TaskError>>;
}

/// Everything a task may touch.
#[derive(Clone)]
pub struct TaskContext {
    pub config: Arc<PipelineConfig>,
    pub collaborators: Collaborators,
    pub notifier: Arc<dyn ReloadNotifier>,
}

impl TaskContext {
    pub fn new(
        config: Arc<PipelineConfig>,
        collaborators: Collaborators,
        notifier: Arc<dyn ReloadNotifier>,
    ) -> Self {
        Self {
            config,
            collaborators,
            notifier,
        }
    }

    /// Project root.
    pub fn root(&self) -> &Path {
        &self.config.root
    }
}

/// Outcome of one successful task invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskReport {
    pub task: &'static str,
    /// Files written, with their sizes in bytes.
    pub written: Vec<(PathBuf, u64)>,
    /// Files left alone because their output was up to date.
    pub skipped: usize,
    /// A compile error suppressed this cycle's output.
    pub suppressed: bool,
}

impl TaskReport {
    pub fn new(task: &'static str) -> Self {
        Self {
            task,
            ..Self::default()
        }
    }

    pub fn total_bytes(&self) -> u64 {
        self.written.iter().map(|(_, size)| size).sum()
    }

    /// Print the byte-size report, paths relative to the output root.
    pub fn log(&self, root: &Path) {
        let dist = root.join(crate::layout::OUTPUT_DIR);
        for (path, size) in &self.written {
            let rel = path.strip_prefix(&dist).unwrap_or(path);
            crate::log!(self.task; "{} {}", slash_path(rel), format_size(*size));
        }
        if self.skipped > 0 {
            crate::debug!(self.task; "{} up to date", self.skipped);
        }
    }

    /// One-line summary for the watch status line.
    pub fn summary(&self) -> String {
        match (self.suppressed, self.written.len()) {
            (true, _) => format!("{}: output kept from last successful build", self.task),
            (false, 0) => format!("{}: up to date", self.task),
            (false, n) => format!(
                "{}: {} file{} ({})",
                self.task,
                n,
                if n == 1 { "" } else { "s" },
                format_size(self.total_bytes())
            ),
        }
    }
}

/// Why a task (or group of tasks) failed.
#[derive(Debug, Error)]
pub enum TaskError {
    /// A collaborator rejected a file.
    #[error("[{task}] {}: {message}", path.display())]
    Transform {
        task: &'static str,
        path: PathBuf,
        message: String,
    },

    #[error("[{task}] {}: {source}", path.display())]
    Io {
        task: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Glob(#[from] GlobError),

    /// The dev server, reload channel or file watcher could not start.
    #[error("[watch] {0:#}")]
    Watch(anyhow::Error),

    /// Every failure of a parallel group, one leaf per line.
    #[error("{}", parallel_summary(.0))]
    Parallel(Vec<TaskError>),
}

impl TaskError {
    /// Adapter for `map_err` on filesystem calls.
    pub fn io(task: &'static str, path: &Path) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.to_path_buf();
        move |source| Self::Io { task, path, source }
    }

    /// Leaf failures, with parallel groups flattened.
    pub fn leaves(&self) -> Vec<&TaskError> {
        match self {
            Self::Parallel(errors) => errors.iter().flat_map(Self::leaves).collect(),
            other => vec![other],
        }
    }
}

fn parallel_summary(errors: &[TaskError]) -> String {
    let leaves: Vec<_> = errors.iter().flat_map(TaskError::leaves).collect();
    let n = leaves.len();
    let mut summary = format!("{} task{} failed", n, if n == 1 { "" } else { "s" });
    for leaf in leaves {
        summary.push_str("\n  ");
        summary.push_str(&leaf.to_string());
    }
    summary
}

/// A source file and the collaborator's output for it.
pub(crate) struct Transformed {
    pub path: PathBuf,
    pub output: Output,
}

/// Read `path` and run it through `collaborator` on a blocking thread.
pub(crate) async fn transform_file(
    task: &'static str,
    collaborator: Arc<dyn Transform>,
    path: PathBuf,
) -> Result<Transformed, TaskError> {
    let source = tokio::fs::read(&path).await.map_err(TaskError::io(task, &path))?;

    let worker_path = path.clone();
    let result =
        tokio::task::spawn_blocking(move || collaborator.transform(&source, &worker_path)).await;

    let output = match result {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return Err(TaskError::Transform {
                task,
                path,
                message: e.message,
            });
        }
        Err(e) => {
            return Err(TaskError::Transform {
                task,
                path,
                message: format!("worker failed: {e}"),
            });
        }
    };

    Ok(Transformed { path, output })
}

/// Transform every file concurrently; results keep the input order.
pub(crate) async fn transform_all(
    task: &'static str,
    collaborator: &Arc<dyn Transform>,
    paths: Vec<PathBuf>,
) -> Vec<Result<Transformed, TaskError>> {
    let jobs = paths
        .into_iter()
        .map(|path| transform_file(task, Arc::clone(collaborator), path));
    futures::future::join_all(jobs).await
}
