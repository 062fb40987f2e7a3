//! Pure debouncer: only handles timing and event deduplication.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

use super::types::{ChangeKind, ChangeSet};

/// Check if path is a temp/backup file (editor artifacts)
pub fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

pub struct Debouncer {
    /// Path → ChangeKind (dedup is free via HashMap key uniqueness)
    changes: FxHashMap<PathBuf, ChangeKind>,
    last_event: Option<Instant>,
    window: Duration,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            changes: FxHashMap::default(),
            last_event: None,
            window,
        }
    }

    /// Add a notify event, applying dedup rules:
    /// - Remove + Create/Modify → Create/Modify (file was restored)
    /// - Modify + Remove → Remove (file was deleted)
    /// - Create + Remove → nothing (file never mattered)
    /// - otherwise the first event wins
    pub fn add_event(&mut self, event: &notify::Event) {
        use notify::EventKind;

        let kind = match event.kind {
            EventKind::Create(_) => ChangeKind::Created,
            EventKind::Remove(_) => ChangeKind::Removed,
            EventKind::Modify(modify) => {
                // Ignore metadata-only changes (mtime/atime/chmod noise)
                if matches!(modify, notify::event::ModifyKind::Metadata(_)) {
                    return;
                }
                ChangeKind::Modified
            }
            _ => return,
        };

        for path in &event.paths {
            if is_temp_file(path) {
                continue;
            }
            self.add(path.clone(), kind);
        }
    }

    fn add(&mut self, path: PathBuf, kind: ChangeKind) {
        self.last_event = Some(Instant::now());

        let Some(&existing) = self.changes.get(&path) else {
            crate::debug!("watch"; "event {}: {}", kind.label(), path.display());
            self.changes.insert(path, kind);
            return;
        };

        match (existing, kind) {
            (ChangeKind::Removed, ChangeKind::Created | ChangeKind::Modified) => {
                crate::debug!("watch"; "restore removed->{}: {}", kind.label(), path.display());
                self.changes.insert(path, kind);
            }
            (ChangeKind::Modified, ChangeKind::Removed) => {
                crate::debug!("watch"; "upgrade modified->removed: {}", path.display());
                self.changes.insert(path, ChangeKind::Removed);
            }
            (ChangeKind::Created, ChangeKind::Removed) => {
                crate::debug!("watch"; "discard created+removed: {}", path.display());
                self.changes.remove(&path);
            }
            _ => {}
        }
    }

    /// Take the burst once the quiet window has elapsed.
    pub fn take_if_ready(&mut self) -> Option<ChangeSet> {
        let last_event = self.last_event?;
        if last_event.elapsed() < self.window {
            return None;
        }

        self.last_event = None;
        let mut changes = std::mem::take(&mut self.changes);
        correct_by_existence(&mut changes);
        if changes.is_empty() {
            return None;
        }

        let mut changes: Vec<_> = changes.into_iter().collect();
        changes.sort_by(|a, b| a.0.cmp(&b.0));
        Some(ChangeSet(changes))
    }

    /// Precise sleep duration until next possible ready time.
    pub fn sleep_duration(&self) -> Duration {
        let Some(last_event) = self.last_event else {
            return Duration::from_secs(86400);
        };

        self.window
            .saturating_sub(last_event.elapsed())
            .max(Duration::from_millis(1))
    }
}

/// Reconcile event kinds with actual filesystem state.
///
/// Watchers may report stale kinds, e.g. `Removed` for a file an editor
/// just replaced through an atomic rename.
fn correct_by_existence(changes: &mut FxHashMap<PathBuf, ChangeKind>) {
    changes.retain(|path, kind| {
        let exists = path.exists();
        match *kind {
            ChangeKind::Created if !exists => false,
            ChangeKind::Modified if !exists => {
                *kind = ChangeKind::Removed;
                true
            }
            ChangeKind::Removed if exists => {
                *kind = ChangeKind::Modified;
                true
            }
            _ => true,
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, MetadataKind, ModifyKind, RemoveKind};
    use notify::{Event, EventKind};
    use std::fs;
    use tempfile::TempDir;

    fn event(kind: EventKind, path: &Path) -> Event {
        Event::new(kind).add_path(path.to_path_buf())
    }

    fn create(path: &Path) -> Event {
        event(EventKind::Create(CreateKind::File), path)
    }

    fn modify(path: &Path) -> Event {
        event(EventKind::Modify(ModifyKind::Data(DataChange::Content)), path)
    }

    fn remove(path: &Path) -> Event {
        event(EventKind::Remove(RemoveKind::File), path)
    }

    fn ready(debouncer: &mut Debouncer) -> Option<ChangeSet> {
        debouncer.take_if_ready()
    }

    #[test]
    fn test_is_temp_file() {
        assert!(is_temp_file(Path::new("/site/src/styles/.main.sass.swp")));
        assert!(is_temp_file(Path::new("/site/src/index.pug~")));
        assert!(is_temp_file(Path::new("/site/src/scripts/a.js.tmp")));
        assert!(!is_temp_file(Path::new("/site/src/scripts/a.js")));
    }

    #[test]
    fn test_waits_for_quiet_window() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.js");
        fs::write(&file, "x").unwrap();

        let mut debouncer = Debouncer::new(Duration::from_millis(50));
        debouncer.add_event(&modify(&file));
        assert!(ready(&mut debouncer).is_none());
        assert!(debouncer.sleep_duration() <= Duration::from_millis(50));

        std::thread::sleep(Duration::from_millis(60));
        let changes = ready(&mut debouncer).unwrap();
        assert_eq!(changes.0, vec![(file, ChangeKind::Modified)]);
        assert!(ready(&mut debouncer).is_none());
    }

    #[test]
    fn test_burst_dedup_rules() {
        let temp = TempDir::new().unwrap();
        let kept = temp.path().join("kept.js");
        let gone = temp.path().join("gone.js");
        let flash = temp.path().join("flash.js");
        fs::write(&kept, "x").unwrap();

        let mut debouncer = Debouncer::new(Duration::ZERO);
        // removed then created collapses to created
        debouncer.add_event(&remove(&kept));
        debouncer.add_event(&create(&kept));
        // modified then removed becomes removed
        debouncer.add_event(&modify(&gone));
        debouncer.add_event(&remove(&gone));
        // created then removed is dropped
        debouncer.add_event(&create(&flash));
        debouncer.add_event(&remove(&flash));

        let changes = ready(&mut debouncer).unwrap();
        assert_eq!(
            changes.0,
            vec![(gone, ChangeKind::Removed), (kept, ChangeKind::Created)]
        );
    }

    #[test]
    fn test_ignores_metadata_and_temp_files() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.js");
        fs::write(&file, "x").unwrap();

        let mut debouncer = Debouncer::new(Duration::ZERO);
        debouncer.add_event(&event(
            EventKind::Modify(ModifyKind::Metadata(MetadataKind::WriteTime)),
            &file,
        ));
        debouncer.add_event(&modify(&temp.path().join(".a.js.swp")));
        assert!(ready(&mut debouncer).is_none());
    }

    #[test]
    fn test_removed_but_present_is_modified() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("main.sass");
        fs::write(&file, "a\n  color: red").unwrap();

        let mut debouncer = Debouncer::new(Duration::ZERO);
        debouncer.add_event(&remove(&file));
        assert_eq!(
            ready(&mut debouncer).unwrap().0,
            vec![(file, ChangeKind::Modified)]
        );
    }
}
