//! `clean`: empty the output root, keeping the configured entries.

use futures::future::BoxFuture;

use super::{Task, TaskContext, TaskError, TaskReport};
use crate::layout::OUTPUT_DIR;

pub struct CleanTask;

impl Task for CleanTask {
    fn name(&self) -> &'static str {
        "clean"
    }

    fn run<'a>(&'a self, ctx: &'a TaskContext) -> BoxFuture<'a, Result<TaskReport, TaskError>> {
        Box::pin(clean(ctx))
    }
}

/// Remove every direct child of `dist/` whose name is not in `clean.keep`.
///
/// Symbolic links are removed as links, never followed. A missing output
/// root is not an error.
async fn clean(ctx: &TaskContext) -> Result<TaskReport, TaskError> {
    const TASK: &str = "clean";
    let mut report = TaskReport::new(TASK);
    let dist = ctx.root().join(OUTPUT_DIR);

    let mut entries = match tokio::fs::read_dir(&dist).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            crate::debug!(TASK; "{} does not exist", dist.display());
            return Ok(report);
        }
        Err(e) => return Err(TaskError::io(TASK, &dist)(e)),
    };

    let keep = &ctx.config.clean.keep;
    let mut removed = 0usize;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(TaskError::io(TASK, &dist))?
    {
        let path = entry.path();
        if keep.iter().any(|name| entry.file_name() == name.as_str()) {
            report.skipped += 1;
            continue;
        }

        let metadata = tokio::fs::symlink_metadata(&path)
            .await
            .map_err(TaskError::io(TASK, &path))?;
        let result = if metadata.is_dir() {
            tokio::fs::remove_dir_all(&path).await
        } else {
            tokio::fs::remove_file(&path).await
        };
        result.map_err(TaskError::io(TASK, &path))?;

        crate::debug!(TASK; "removed {}", path.display());
        removed += 1;
    }

    let noun = if removed == 1 { "entry" } else { "entries" };
    crate::log!(TASK; "removed {} {} from {}/", removed, noun, OUTPUT_DIR);
    Ok(report)
}
