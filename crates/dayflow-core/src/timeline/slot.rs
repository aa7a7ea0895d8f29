//! Computed timeline slots.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A computed, non-persisted slice of the day.
///
/// Slots are regenerated from scratch on every recompute; nothing carries
/// identity across recomputes beyond what the fields themselves encode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimelineSlot {
    /// A contiguous scheduled span belonging to one task.
    ///
    /// `fragment_index` 0 means "first/only fragment of this task";
    /// 1 and above mean "continuation".
    TaskFragment {
        task_id: String,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        fragment_index: u32,
    },
    Event {
        event_id: String,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    },
    FreeTime {
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    },
}

impl TimelineSlot {
    pub fn start_time(&self) -> DateTime<Utc> {
        match self {
            Self::TaskFragment { start_time, .. }
            | Self::Event { start_time, .. }
            | Self::FreeTime { start_time, .. } => *start_time,
        }
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        match self {
            Self::TaskFragment { end_time, .. }
            | Self::Event { end_time, .. }
            | Self::FreeTime { end_time, .. } => *end_time,
        }
    }

    pub fn duration(&self) -> Duration {
        self.end_time() - self.start_time()
    }

    pub fn is_free_time(&self) -> bool {
        matches!(self, Self::FreeTime { .. })
    }
}
