//! `watch`: serve `dist/` with live reload and re-run tasks on change.
//!
//! ```text
//! src/*.pug                 ──> pug      ──> full reload (even on failure)
//! src/styles/**/*.{sass,css} ─> styles   ──> css inject
//! src/scripts/**/*.js       ──> scripts  ──> full reload
//! src/img/**                ──> img      ──> full reload
//! ```
//!
//! Re-runs report to the watch status line. A failing re-run is shown and
//! forgotten; the next change to the same sources simply tries again.
//! Template changes always end in a full reload, so a page that failed to
//! compile is still refreshed in the browser.

use std::sync::Arc;

use anyhow::Context;
use futures::future::BoxFuture;

use crate::layout::{IMAGES, MARKUP, OUTPUT_DIR, PathSet, SCRIPTS, STYLES};
use crate::logger::{status_detach, status_error, status_success};
use crate::reload::{ReloadChannel, ReloadKind, ReloadNotifier};
use crate::serve::DevServer;
use crate::task::{
    ImagesTask, MarkupTask, ScriptsTask, StylesTask, Task, TaskContext, TaskError, TaskReport,
    run_task,
};
use crate::utils::path::slash_path;
use crate::watch::{ChangeSet, FileWatcher, OnChange};

/// Resolves when the watch phase should end.
pub type StopSignal = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Dev server, reload channel and one subscription per path set.
pub struct WatchTask {
    stop: StopSignal,
}

impl WatchTask {
    /// Watch until the process receives Ctrl+C.
    pub fn until_shutdown() -> Self {
        Self::until(Arc::new(|| Box::pin(crate::core::wait_for_shutdown())))
    }

    pub fn until(stop: StopSignal) -> Self {
        Self { stop }
    }
}

impl Task for WatchTask {
    fn name(&self) -> &'static str {
        "watch"
    }

    fn run<'a>(&'a self, ctx: &'a TaskContext) -> BoxFuture<'a, Result<TaskReport, TaskError>> {
        Box::pin(self.serve_and_watch(ctx))
    }
}

impl WatchTask {
    async fn serve_and_watch(&self, ctx: &TaskContext) -> Result<TaskReport, TaskError> {
        let config = &ctx.config;
        let root = ctx.root();

        let watcher = FileWatcher::new(root, config.watch.debounce())
            .context("Failed to start file watcher")
            .map_err(TaskError::Watch)?;
        let channel = Arc::new(
            ReloadChannel::start(config.serve.interface, config.serve.reload_port)
                .map_err(TaskError::Watch)?,
        );
        let dist = config.root_join(OUTPUT_DIR);
        let server =
            DevServer::bind(&config.serve, &dist, channel.port()).map_err(TaskError::Watch)?;
        let server_handle = server.handle();
        let http = std::thread::Builder::new()
            .name("kiln-http".into())
            .spawn(move || server.run())
            .context("Failed to spawn HTTP thread")
            .map_err(TaskError::Watch)?;

        let notifier: Arc<dyn ReloadNotifier> = channel.clone();
        let live = TaskContext {
            notifier,
            ..ctx.clone()
        };

        // (path set, task, reload even when the task fails)
        let routes: [(PathSet, Arc<dyn Task>, bool); 4] = [
            (MARKUP, Arc::new(MarkupTask), true),
            (STYLES, Arc::new(StylesTask), false),
            (SCRIPTS, Arc::new(ScriptsTask), false),
            (IMAGES, Arc::new(ImagesTask), false),
        ];
        let subscriptions: Vec<_> = routes
            .into_iter()
            .map(|(set, task, always_reload)| {
                watcher.watch(set, rerun(task, live.clone(), always_reload))
            })
            .collect();
        crate::log!("watch"; "watching for changes, press Ctrl+C to stop");

        (self.stop)().await;

        for subscription in subscriptions {
            subscription.cancel();
        }
        channel.shutdown();
        server_handle.unblock();
        if let Ok(Ok(Err(e))) = tokio::task::spawn_blocking(move || http.join()).await {
            crate::log!("serve"; "{:#}", e);
        }

        crate::debug!("watch"; "stopped");
        Ok(TaskReport::new("watch"))
    }
}

fn rerun(task: Arc<dyn Task>, ctx: TaskContext, always_reload: bool) -> OnChange {
    Arc::new(move |changes: ChangeSet| {
        let task = Arc::clone(&task);
        let ctx = ctx.clone();
        Box::pin(async move {
            if always_reload {
                rebuild_then_reload(task.as_ref(), &ctx, &changes).await;
            } else {
                rebuild(task.as_ref(), &ctx, &changes).await;
            }
        })
    })
}

/// Re-run `task`, then send a full reload whatever the outcome.
///
/// A successful run already notified from inside the task; only a failed
/// one needs the extra reload.
pub(crate) async fn rebuild_then_reload(
    task: &dyn Task,
    ctx: &TaskContext,
    changes: &ChangeSet,
) -> bool {
    let written = rebuild(task, ctx, changes).await;
    if !written {
        ctx.notifier.notify(ReloadKind::full(task.name()));
    }
    written
}

/// Re-run `task` for one burst. Returns whether fresh output was written.
pub(crate) async fn rebuild(task: &dyn Task, ctx: &TaskContext, changes: &ChangeSet) -> bool {
    if crate::logger::is_verbose() {
        let paths: Vec<_> = changes
            .paths()
            .iter()
            .map(|p| slash_path(&ctx.config.root_relative(p)))
            .collect();
        crate::debug!(task.name(); "rebuilding for {}", paths.join(", "));
    }

    match run_task(task, ctx).await {
        // the task already put its error on the status line
        Ok(report) if report.suppressed => false,
        Ok(report) => {
            status_detach();
            status_success(&report.summary());
            true
        }
        Err(e) => {
            status_error(&format!("{} failed", task.name()), &e.to_string());
            false
        }
    }
}
