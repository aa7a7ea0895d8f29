use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::ActiveItem;

/// Every observable transition of the execution timer produces a TimerEvent.
/// The CLI prints them; a GUI layer would poll them. Purely informational --
/// no transition depends on one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TimerEvent {
    TaskStarted {
        task_id: String,
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    EventStarted {
        event_id: String,
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    /// The current item's planned duration fully elapsed; time now counts up.
    WentOvertime {
        item_id: String,
        at: DateTime<Utc>,
    },
    TaskCompleted {
        task_id: String,
        at: DateTime<Utc>,
    },
    EventCompleted {
        event_id: String,
        at: DateTime<Utc>,
    },
    /// An event was completed by auto-finish chaining when a later event's
    /// start time arrived.
    EventAutoCompleted {
        event_id: String,
        actual_end_time: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    /// The machine re-targeted the first pending task (None when it went
    /// idle).
    Retargeted {
        task_id: Option<String>,
        at: DateTime<Utc>,
    },
    TimeAdjusted {
        delta_secs: i64,
        remaining_ms: u64,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        active: ActiveItem,
        is_running: bool,
        is_overtime: bool,
        remaining_ms: u64,
        overtime_ms: u64,
        total_planned_ms: u64,
        at: DateTime<Utc>,
    },
}
