//! `styles`: compile, prefix and minify every stylesheet into one bundle.
//!
//! Sass partials (`_name.sass`) are only reachable through imports and are
//! not compiled on their own. A compile error keeps the previous bundle in
//! place: the error goes to the watch status line and the task still
//! succeeds, with `suppressed` set.

use std::path::Path;

use futures::future::BoxFuture;

use super::output::write_atomic;
use super::{Task, TaskContext, TaskError, TaskReport, transform_all};
use crate::layout::{STYLES, STYLES_BUNDLE};
use crate::reload::ReloadKind;
use crate::transform::sourcemap::{self, Bundle};

pub struct StylesTask;

impl Task for StylesTask {
    fn name(&self) -> &'static str {
        "styles"
    }

    fn run<'a>(&'a self, ctx: &'a TaskContext) -> BoxFuture<'a, Result<TaskReport, TaskError>> {
        Box::pin(build_styles(ctx))
    }
}

fn is_partial(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('_'))
}

async fn build_styles(ctx: &TaskContext) -> Result<TaskReport, TaskError> {
    const TASK: &str = "styles";
    let root = ctx.root();
    let dest = STYLES.dest_dir(root);
    let mut report = TaskReport::new(TASK);

    let paths: Vec<_> = STYLES
        .enumerate(root)?
        .into_iter()
        .map(|f| f.path)
        .filter(|p| !is_partial(p))
        .collect();
    if paths.is_empty() {
        crate::debug!(TASK; "no stylesheets");
        return Ok(report);
    }

    let mut compiled = Vec::with_capacity(paths.len());
    for result in transform_all(TASK, &ctx.collaborators.styles, paths).await {
        match result {
            Ok(done) => compiled.push(done),
            Err(e) => {
                crate::logger::status_error("styles failed", &e.to_string());
                report.suppressed = true;
                return Ok(report);
            }
        }
    }

    let mut bundle = Bundle::default();
    for done in &compiled {
        bundle.push(
            &String::from_utf8_lossy(&done.output.bytes),
            done.output.source_map.as_deref(),
            &sourcemap::source_url(root, &dest, &done.path),
        );
    }

    let map_name = format!("{STYLES_BUNDLE}.map");
    let (css, map) = bundle.finish(STYLES_BUNDLE, &map_name, true);

    let bundle_path = dest.join(STYLES_BUNDLE);
    let size = write_atomic(TASK, &bundle_path, css.as_bytes()).await?;
    report.written.push((bundle_path, size));

    let map_path = dest.join(&map_name);
    let size = write_atomic(TASK, &map_path, map.as_bytes()).await?;
    report.written.push((map_path, size));

    report.log(root);
    ctx.notifier
        .notify(ReloadKind::css(format!("css/{STYLES_BUNDLE}")));
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_partial() {
        assert!(is_partial(Path::new("/site/src/styles/_vars.sass")));
        assert!(!is_partial(Path::new("/site/src/styles/main.sass")));
    }
}
