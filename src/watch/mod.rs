//! File watching.
//!
//! One recursive `notify` watcher observes the source tree. Each
//! [`FileWatcher::watch`] call registers a subscription for one path set:
//! the forwarding thread routes every event only to the subscriptions
//! whose globs match it, and each subscription debounces on its own.
//!
//! ```text
//! notify ──> forwarding thread ──┬─> [markup]  Debouncer ──> on_change
//!                                ├─> [styles]  Debouncer ──> on_change
//!                                └─> ...
//! ```
//!
//! A subscription awaits its callback before dispatching the next burst,
//! so re-runs of one task never overlap.

mod debouncer;
mod types;

pub use types::{ChangeKind, ChangeSet};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::future::BoxFuture;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::layout::PathSet;
use crate::utils::path::normalize_path;
use debouncer::Debouncer;

/// Callback invoked once per debounced burst.
pub type OnChange = Arc<dyn Fn(ChangeSet) -> BoxFuture<'static, ()> + Send + Sync>;

/// A registered subscription's routing entry.
struct Route {
    id: u64,
    set: PathSet,
    tx: mpsc::UnboundedSender<notify::Event>,
}

type Registry = Arc<Mutex<Vec<Route>>>;

/// Observes the project's source tree and fans events out to subscriptions.
pub struct FileWatcher {
    /// Canonical root that injected events are matched against.
    #[cfg(test)]
    root: PathBuf,
    debounce: Duration,
    registry: Registry,
    next_id: AtomicU64,
    /// Watcher handle (must be kept alive)
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Start watching `root/src` (or `root` when there is no `src/`).
    ///
    /// Events are routed from the moment this returns; bursts that arrive
    /// before a subscription registers are not replayed.
    pub fn new(root: &Path, debounce: Duration) -> notify::Result<Self> {
        let root = normalize_path(root);
        let registry: Registry = Arc::new(Mutex::new(Vec::new()));

        // notify doesn't support async; bridge through a sync channel
        let (notify_tx, notify_rx) = std::sync::mpsc::channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = notify_tx.send(res);
        })?;

        let src = root.join("src");
        let target = if src.is_dir() { src } else { root.clone() };
        watcher.watch(&target, RecursiveMode::Recursive)?;
        crate::debug!("watch"; "watching {}", target.display());

        let forward_root = root.clone();
        let forward_registry = Arc::clone(&registry);
        std::thread::spawn(move || {
            while let Ok(result) = notify_rx.recv() {
                match result {
                    Ok(event) => dispatch(&forward_registry, &forward_root, &event),
                    Err(e) => crate::log!("watch"; "notify error: {}", e),
                }
            }
        });

        Ok(Self {
            #[cfg(test)]
            root,
            debounce,
            registry,
            next_id: AtomicU64::new(0),
            _watcher: watcher,
        })
    }

    /// Register `on_change` for changes under `set`'s globs.
    ///
    /// Must be called from within a tokio runtime.
    pub fn watch(&self, set: PathSet, on_change: OnChange) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.registry.lock().push(Route { id, set, tx });

        let handle = tokio::spawn(run_subscription(rx, Debouncer::new(self.debounce), on_change));
        crate::debug!("watch"; "subscribed {} ({})", set.name, set.sources.join(", "));

        Subscription {
            id,
            registry: Arc::clone(&self.registry),
            handle,
        }
    }

    /// Number of live subscriptions.
    #[cfg(test)]
    pub(crate) fn subscription_count(&self) -> usize {
        self.registry.lock().len()
    }

    /// Route an event as if the watcher had reported it.
    #[cfg(test)]
    pub(crate) fn inject(&self, event: &notify::Event) {
        dispatch(&self.registry, &self.root, event);
    }
}

/// Handle to a registered observer.
///
/// Dropping it leaves the observer running; only [`cancel`](Self::cancel)
/// tears it down.
pub struct Subscription {
    id: u64,
    registry: Registry,
    handle: JoinHandle<()>,
}

impl Subscription {
    /// Unregister and stop the observer. No callback starts afterwards.
    pub fn cancel(self) {
        self.registry.lock().retain(|route| route.id != self.id);
        self.handle.abort();
    }

    #[cfg(test)]
    pub(crate) fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

/// Send each subscription the part of `event` under its globs.
fn dispatch(registry: &Mutex<Vec<Route>>, root: &Path, event: &notify::Event) {
    let routes = registry.lock();
    for route in routes.iter() {
        let paths: Vec<PathBuf> = event
            .paths
            .iter()
            .filter(|path| route.set.matches(root, path))
            .cloned()
            .collect();
        if paths.is_empty() {
            continue;
        }

        let mut routed = event.clone();
        routed.paths = paths;
        // A closed receiver means the subscription is being cancelled
        let _ = route.tx.send(routed);
    }
}

async fn run_subscription(
    mut rx: mpsc::UnboundedReceiver<notify::Event>,
    mut debouncer: Debouncer,
    on_change: OnChange,
) {
    loop {
        tokio::select! {
            biased;
            event = rx.recv() => match event {
                Some(event) => debouncer.add_event(&event),
                None => break,
            },
            () = tokio::time::sleep(debouncer.sleep_duration()) => {
                if let Some(changes) = debouncer.take_if_ready() {
                    for (path, kind) in &changes.0 {
                        crate::debug!("watch"; "{}: {}", kind.label(), path.display());
                    }
                    on_change(changes).await;
                }
            }
        }
    }
}
