//! `img`: optimize images whose output is missing or older than the source.

use futures::future::BoxFuture;

use super::output::write_atomic;
use super::{Task, TaskContext, TaskError, TaskReport, transform_file};
use crate::freshness::is_stale;
use crate::layout::IMAGES;
use crate::reload::ReloadKind;

pub struct ImagesTask;

impl Task for ImagesTask {
    fn name(&self) -> &'static str {
        "img"
    }

    fn run<'a>(&'a self, ctx: &'a TaskContext) -> BoxFuture<'a, Result<TaskReport, TaskError>> {
        Box::pin(build_images(ctx))
    }
}

async fn build_images(ctx: &TaskContext) -> Result<TaskReport, TaskError> {
    const TASK: &str = "img";
    let root = ctx.root();
    let dest = IMAGES.dest_dir(root);
    let mut report = TaskReport::new(TASK);

    let mut pending = Vec::new();
    for file in IMAGES.enumerate(root)? {
        let out = dest.join(&file.relative);
        if is_stale(&file.path, &out) {
            pending.push((file.path, out));
        } else {
            report.skipped += 1;
        }
    }

    let jobs = pending.into_iter().map(|(source, out)| {
        let collaborator = ctx.collaborators.images.clone();
        async move {
            let done = transform_file(TASK, collaborator, source).await?;
            let size = write_atomic(TASK, &out, &done.output.bytes).await?;
            Ok::<_, TaskError>((out, size))
        }
    });

    let mut first_error = None;
    for result in futures::future::join_all(jobs).await {
        match result {
            Ok(written) => report.written.push(written),
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }
    if let Some(e) = first_error {
        return Err(e);
    }

    report.log(root);
    if !report.written.is_empty() {
        ctx.notifier.notify(ReloadKind::full(TASK));
    }
    Ok(report)
}
