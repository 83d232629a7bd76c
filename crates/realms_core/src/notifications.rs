//! Player-facing notification feed.
//!
//! A bounded ring: once full, the oldest entry is dropped. Hosts drain it
//! each frame. This is not a log; see `tracing` for diagnostics.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Category of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Achievement completed.
    Achievement,
    /// Something new became available.
    Unlock,
    /// A failure the player should see.
    Error,
    /// General information.
    Info,
    /// Save, load, import, or export.
    Save,
}

impl NotificationKind {
    /// Display prefix for this kind.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Achievement => "[A] ",
            Self::Unlock => "[U] ",
            Self::Error => "[!] ",
            Self::Info => "[i] ",
            Self::Save => "[S] ",
        }
    }
}

/// One notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Monotonic id, unique within a session.
    pub id: u64,
    /// Message text without prefix.
    pub text: String,
    /// Category.
    pub kind: NotificationKind,
    /// Clock time the notification was raised.
    pub timestamp: f64,
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.prefix(), self.text)
    }
}

/// Bounded notification ring.
#[derive(Debug, Clone)]
pub struct Notifications {
    entries: VecDeque<Notification>,
    capacity: usize,
    next_id: u64,
}

impl Notifications {
    /// An empty ring holding at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            next_id: 1,
        }
    }

    /// Append a notification, evicting the oldest when full. Returns its id.
    pub fn push(&mut self, kind: NotificationKind, text: impl Into<String>, timestamp: f64) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(Notification {
            id,
            text: text.into(),
            kind,
            timestamp,
        });
        id
    }

    /// Remove and return every pending notification, oldest first.
    pub fn drain(&mut self) -> Vec<Notification> {
        self.entries.drain(..).collect()
    }

    /// Pending notifications, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.entries.iter()
    }

    /// Number of pending notifications.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
