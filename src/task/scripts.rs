//! `scripts`: compile every script and join them, in enumeration order,
//! into one bundle with a merged source map.

use futures::future::BoxFuture;

use super::output::write_atomic;
use super::{Task, TaskContext, TaskError, TaskReport, transform_all};
use crate::layout::{SCRIPTS, SCRIPTS_BUNDLE};
use crate::reload::ReloadKind;
use crate::transform::sourcemap::{self, Bundle};

pub struct ScriptsTask;

impl Task for ScriptsTask {
    fn name(&self) -> &'static str {
        "scripts"
    }

    fn run<'a>(&'a self, ctx: &'a TaskContext) -> BoxFuture<'a, Result<TaskReport, TaskError>> {
        Box::pin(build_scripts(ctx))
    }
}

async fn build_scripts(ctx: &TaskContext) -> Result<TaskReport, TaskError> {
    const TASK: &str = "scripts";
    let root = ctx.root();
    let dest = SCRIPTS.dest_dir(root);
    let mut report = TaskReport::new(TASK);

    let paths: Vec<_> = SCRIPTS.enumerate(root)?.into_iter().map(|f| f.path).collect();
    if paths.is_empty() {
        crate::debug!(TASK; "no scripts");
        return Ok(report);
    }

    let compiled = transform_all(TASK, &ctx.collaborators.scripts, paths)
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;

    let mut bundle = Bundle::default();
    for done in &compiled {
        bundle.push(
            &String::from_utf8_lossy(&done.output.bytes),
            done.output.source_map.as_deref(),
            &sourcemap::source_url(root, &dest, &done.path),
        );
    }

    let map_name = format!("{SCRIPTS_BUNDLE}.map");
    let (js, map) = bundle.finish(SCRIPTS_BUNDLE, &map_name, false);

    let bundle_path = dest.join(SCRIPTS_BUNDLE);
    let size = write_atomic(TASK, &bundle_path, js.as_bytes()).await?;
    report.written.push((bundle_path, size));

    let map_path = dest.join(&map_name);
    let size = write_atomic(TASK, &map_path, map.as_bytes()).await?;
    report.written.push((map_path, size));

    report.log(root);
    ctx.notifier.notify(ReloadKind::full(TASK));
    Ok(report)
}
