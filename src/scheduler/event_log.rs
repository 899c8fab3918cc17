//! Bounded per-target log of confirmed transitions.

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use std::collections::VecDeque;

/// Default number of entries kept per target.
pub const DEFAULT_LOG_CAPACITY: usize = 40;

/// Direction of a confirmed transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Online,
    Offline,
}

impl Direction {
    /// Short tag used in the timeline text.
    pub fn tag(&self) -> &'static str {
        match self {
            Direction::Online => "on",
            Direction::Offline => "off",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub direction: Direction,
    pub at: DateTime<Utc>,
}

/// Most-recent-first transition log; the oldest entry is dropped once
/// `capacity` is exceeded.
#[derive(Debug, Clone)]
pub struct EventLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY)
    }
}

impl EventLog {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// Timeline text: one `on;YYYY-MM-DD HH:MM:SS` / `off;...` line per
    /// entry, newest first, in the given local offset.
    pub fn render(&self, offset: FixedOffset) -> String {
        self.entries
            .iter()
            .map(|e| {
                format!(
                    "{};{}\n",
                    e.direction.tag(),
                    e.at.with_timezone(&offset).format("%Y-%m-%d %H:%M:%S")
                )
            })
            .collect()
    }
}
