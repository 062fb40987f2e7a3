//! Build pipeline orchestration.
//!
//! ```text
//! Idle ──> Cleaning ──> Building ──────────────────────> Watching
//!          [clean]      [pug | styles | scripts | img]   [watch]
//! ```
//!
//! `build` walks all three stages; `watch` enters the watch stage
//! directly; single-task commands run one task and stop.

mod watch;

pub use watch::{StopSignal, WatchTask};

use std::sync::Arc;

use crate::config::PipelineConfig;
use crate::core::{Phase, PhaseTracker};
use crate::reload::{NoopNotifier, ReloadNotifier};
use crate::task::{
    CleanTask, ImagesTask, MarkupTask, ScriptsTask, Step, StylesTask, Task, TaskContext,
    TaskError, TaskReport,
};
use crate::transform::Collaborators;

/// The four content tasks, run concurrently.
pub fn content_step() -> Step {
    Step::Parallel(vec![
        Step::task(MarkupTask),
        Step::task(StylesTask),
        Step::task(ScriptsTask),
        Step::task(ImagesTask),
    ])
}

/// Task named on the command line.
pub fn task_by_name(name: &str) -> Option<Arc<dyn Task>> {
    let task: Arc<dyn Task> = match name {
        "clean" => Arc::new(CleanTask),
        "pug" => Arc::new(MarkupTask),
        "styles" => Arc::new(StylesTask),
        "scripts" => Arc::new(ScriptsTask),
        "img" => Arc::new(ImagesTask),
        _ => return None,
    };
    Some(task)
}

/// One pipeline run over a project.
pub struct Pipeline {
    ctx: TaskContext,
    phases: PhaseTracker,
}

impl Pipeline {
    pub fn new(ctx: TaskContext) -> Self {
        Self {
            ctx,
            phases: PhaseTracker::default(),
        }
    }

    /// Pipeline with the default collaborators and no reload clients.
    pub fn from_config(config: PipelineConfig) -> Self {
        let collaborators = Collaborators::from_config(&config);
        let notifier: Arc<dyn ReloadNotifier> = Arc::new(NoopNotifier);
        Self::new(TaskContext::new(Arc::new(config), collaborators, notifier))
    }

    pub fn phase(&self) -> Phase {
        self.phases.current()
    }

    /// Run a single task outside of any stage.
    pub async fn run_task(&self, task: &dyn Task) -> Result<TaskReport, TaskError> {
        crate::task::run_task(task, &self.ctx).await
    }

    /// Clean, build every content task, then hand over to `watch`.
    ///
    /// Stops at the first failing stage; the stage it reached stays
    /// visible through [`phase`](Self::phase).
    pub async fn build(&self, watch: Step) -> Result<Vec<TaskReport>, TaskError> {
        let stages = [
            (Phase::Cleaning, Step::task(CleanTask)),
            (Phase::Building, content_step()),
            (Phase::Watching, watch),
        ];

        let mut reports = Vec::new();
        for (phase, step) in stages {
            self.enter(phase);
            reports.extend(step.run(&self.ctx).await?);
        }
        Ok(reports)
    }

    /// Serve and watch without building first.
    pub async fn watch(&self, watch: Step) -> Result<Vec<TaskReport>, TaskError> {
        self.enter(Phase::Watching);
        watch.run(&self.ctx).await
    }

    fn enter(&self, phase: Phase) {
        if self.phases.advance(phase) {
            crate::log!("build"; "{}", phase);
        }
    }
}
