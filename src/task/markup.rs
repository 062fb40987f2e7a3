//! `pug`: compile each top-level template into `dist/<stem>.html`.

use std::path::Path;

use futures::future::BoxFuture;

use super::output::write_atomic;
use super::{Task, TaskContext, TaskError, TaskReport, transform_all};
use crate::layout::MARKUP;
use crate::reload::ReloadKind;

pub struct MarkupTask;

impl Task for MarkupTask {
    fn name(&self) -> &'static str {
        "pug"
    }

    fn run<'a>(&'a self, ctx: &'a TaskContext) -> BoxFuture<'a, Result<TaskReport, TaskError>> {
        Box::pin(build_markup(ctx))
    }
}

async fn build_markup(ctx: &TaskContext) -> Result<TaskReport, TaskError> {
    const TASK: &str = "pug";
    let root = ctx.root();
    let dest = MARKUP.dest_dir(root);
    let files = MARKUP.enumerate(root)?;

    let paths = files.into_iter().map(|f| f.path).collect();
    let results = transform_all(TASK, &ctx.collaborators.markup, paths).await;

    // Good pages are still written; the first rejected one fails the task
    let mut report = TaskReport::new(TASK);
    let mut first_error = None;
    for result in results {
        match result {
            Ok(done) => {
                let out = dest.join(html_name(&done.path));
                let size = write_atomic(TASK, &out, &done.output.bytes).await?;
                report.written.push((out, size));
            }
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }
    if let Some(e) = first_error {
        return Err(e);
    }

    report.log(root);
    ctx.notifier.notify(ReloadKind::full(TASK));
    Ok(report)
}

/// `src/about.pug` → `about.html`
fn html_name(source: &Path) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{stem}.html")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_name() {
        assert_eq!(html_name(Path::new("/site/src/index.pug")), "index.html");
        assert_eq!(html_name(Path::new("/site/src/about.me.pug")), "about.me.html");
    }
}
