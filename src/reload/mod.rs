//! Live reload.
//!
//! Tasks report finished writes through a [`ReloadNotifier`]. In watch
//! mode the notifier is a [`ReloadChannel`]: a WebSocket listener that
//! pushes JSON messages to every connected browser.
//!
//! ```text
//! task ──notify(kind)──> ReloadChannel ──{"type":"reload"}──> browsers
//!                                      └─{"type":"css"}─────>
//! ```
//!
//! Batch commands use [`NoopNotifier`]; tests record notifications.

mod channel;
mod message;

pub use channel::ReloadChannel;
pub use message::HotReloadMessage;

/// What connected browsers should do after a task wrote its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadKind {
    /// Reload the whole page.
    FullReload { reason: String },
    /// Re-fetch the stylesheet at `target` without reloading.
    InjectCss { target: String },
}

impl ReloadKind {
    pub fn full(reason: impl Into<String>) -> Self {
        Self::FullReload {
            reason: reason.into(),
        }
    }

    pub fn css(target: impl Into<String>) -> Self {
        Self::InjectCss {
            target: target.into(),
        }
    }
}

impl From<ReloadKind> for HotReloadMessage {
    fn from(kind: ReloadKind) -> Self {
        match kind {
            ReloadKind::FullReload { reason } => Self::reload_with_reason(reason),
            ReloadKind::InjectCss { target } => Self::css(target),
        }
    }
}

/// Sink for reload notifications, injected into every task.
///
/// Notifying with no connected clients is a no-op: nothing is queued and
/// nothing fails.
pub trait ReloadNotifier: Send + Sync {
    fn notify(&self, kind: ReloadKind);
}

/// Notifier for one-shot commands that never serve.
pub struct NoopNotifier;

impl ReloadNotifier for NoopNotifier {
    fn notify(&self, _kind: ReloadKind) {}
}

#[cfg(test)]
pub use recording::RecordingNotifier;

#[cfg(test)]
mod recording {
    use super::{ReloadKind, ReloadNotifier};
    use parking_lot::Mutex;

    /// Keeps every notification for later assertions.
    #[derive(Default)]
    pub struct RecordingNotifier {
        events: Mutex<Vec<ReloadKind>>,
    }

    impl RecordingNotifier {
        pub fn events(&self) -> Vec<ReloadKind> {
            self.events.lock().clone()
        }

        pub fn clear(&self) {
            self.events.lock().clear();
        }
    }

    impl ReloadNotifier for RecordingNotifier {
        fn notify(&self, kind: ReloadKind) {
            self.events.lock().push(kind);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_to_message() {
        let json = HotReloadMessage::from(ReloadKind::full("markup")).to_json();
        assert_eq!(json, r#"{"type":"reload","reason":"markup"}"#);

        let json = HotReloadMessage::from(ReloadKind::css("css/main.min.css")).to_json();
        assert_eq!(json, r#"{"type":"css","target":"css/main.min.css"}"#);
    }

    #[test]
    fn test_recording_notifier() {
        let notifier = RecordingNotifier::default();
        notifier.notify(ReloadKind::css("a.css"));
        NoopNotifier.notify(ReloadKind::full("ignored"));
        assert_eq!(notifier.events(), vec![ReloadKind::css("a.css")]);
        notifier.clear();
        assert!(notifier.events().is_empty());
    }
}
