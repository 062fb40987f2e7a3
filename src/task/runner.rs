//! Build graph execution.
//!
//! ```text
//! Sequence[ clean, Parallel[ pug, styles, scripts, img ], watch ]
//! ```
//!
//! A sequence stops at its first failure. A parallel group starts every
//! child at once, waits for all of them and never cancels a sibling; it
//! fails if any child failed, carrying every failure.

use std::sync::Arc;

use futures::future::BoxFuture;

use super::{Task, TaskContext, TaskError, TaskReport};

/// Node of a build graph.
#[derive(Clone)]
pub enum Step {
    Task(Arc<dyn Task>),
    Sequence(Vec<Step>),
    Parallel(Vec<Step>),
}

impl Step {
    pub fn task(task: impl Task + 'static) -> Self {
        Self::Task(Arc::new(task))
    }

    /// Run to completion, returning the reports of every task that ran.
    pub fn run<'a>(
        &'a self,
        ctx: &'a TaskContext,
    ) -> BoxFuture<'a, Result<Vec<TaskReport>, TaskError>> {
        Box::pin(async move {
            match self {
                Self::Task(task) => run_task(task.as_ref(), ctx).await.map(|r| vec![r]),
                Self::Sequence(steps) => {
                    let mut reports = Vec::new();
                    for step in steps {
                        reports.extend(step.run(ctx).await?);
                    }
                    Ok(reports)
                }
                Self::Parallel(steps) => {
                    let results =
                        futures::future::join_all(steps.iter().map(|step| step.run(ctx))).await;

                    let mut reports = Vec::new();
                    let mut errors = Vec::new();
                    for result in results {
                        match result {
                            Ok(r) => reports.extend(r),
                            Err(e) => errors.push(e),
                        }
                    }
                    if errors.is_empty() {
                        Ok(reports)
                    } else {
                        Err(TaskError::Parallel(errors))
                    }
                }
            }
        })
    }
}

/// Run a single task with start/finish logging.
pub async fn run_task(task: &dyn Task, ctx: &TaskContext) -> Result<TaskReport, TaskError> {
    crate::debug!(task.name(); "starting");
    let started = std::time::Instant::now();
    let result = task.run(ctx).await;
    match &result {
        Ok(_) => crate::debug!(task.name(); "finished in {:?}", started.elapsed()),
        Err(e) => crate::debug!(task.name(); "failed after {:?}: {}", started.elapsed(), e),
    }
    result
}
