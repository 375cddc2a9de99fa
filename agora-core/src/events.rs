//! Session lifecycle notifications.
//!
//! The client never navigates on its own. It emits [`SessionEvent`]s on a
//! broadcast channel and the surrounding application decides how to present
//! them.

use std::fmt;

use tokio::sync::broadcast;

/// Capacity of the session event channel.
pub(crate) const EVENT_CAPACITY: usize = 16;

/// How the application should move to a new location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Ordinary in-app navigation that replaces the current entry.
    InApp(String),

    /// Full reload at the target, discarding all in-memory state.
    Hard(String),
}

impl Navigation {
    pub fn path(&self) -> &str {
        match self {
            Self::InApp(path) | Self::Hard(path) => path,
        }
    }

    pub fn is_hard(&self) -> bool {
        matches!(self, Self::Hard(_))
    }
}

impl fmt::Display for Navigation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InApp(path) => write!(f, "navigate {}", path),
            Self::Hard(path) => write!(f, "reload {}", path),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A sign-in stored a new session.
    SignedIn { subject_id: String, display_name: String },

    /// The access credential was replaced by a refresh.
    TokenRefreshed,

    /// The user signed out.
    SignedOut,

    /// The refresh cycle failed; the session is gone and the user has to
    /// authenticate again.
    AuthenticationLost { reason: String, navigation: Navigation },
}

/// Sender side shared by the client and the adapters.
#[derive(Debug, Clone)]
pub(crate) struct EventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBus {
    pub(crate) fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Publish to current subscribers; having none is not an error.
    pub(crate) fn emit(&self, event: SessionEvent) {
        let delivered = self.sender.send(event).unwrap_or(0);
        tracing::trace!("Session event delivered to {} subscribers", delivered);
    }
}
