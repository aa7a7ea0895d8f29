//! Day plan entities: fluid tasks, pinned events, and the root aggregate.
//!
//! Entities are passive records with validation/clamping at the edges.
//! All scheduling decisions live in the `timeline` module and all mutation
//! of execution bookkeeping is funneled through the `timer` module.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Task durations are clamped to [1 second, 24 hours].
pub const TASK_DURATION_MIN_SECS: i64 = 1;
/// Upper bound shared by tasks and events.
pub const DURATION_MAX_SECS: i64 = 86_400;
/// Event durations are clamped to [1 minute, 24 hours].
pub const EVENT_DURATION_MIN_SECS: i64 = 60;

/// Default "too small to start" threshold in minutes.
pub const DEFAULT_MINIMUM_FRAGMENT_MINUTES: i64 = 5;

/// A frozen, actually-elapsed span of a task.
///
/// Appended when a live fragment is closed out (event interruption or task
/// completion); never reordered or deleted except by task removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentRecord {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl FragmentRecord {
    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }
}

/// A unit of fluid work: a planned duration, no fixed clock time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier, stable for the task's lifetime.
    pub id: String,
    pub title: String,
    /// Planned duration in seconds, clamped to [1, 86400].
    /// Immutable input to scheduling; only explicit user edits change it.
    pub planned_duration_secs: i64,
    /// Cosmetic tag, opaque to the core.
    #[serde(default)]
    pub color_tag: Option<String>,
    /// Cosmetic icon, opaque to the core.
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub actual_start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub actual_end_time: Option<DateTime<Utc>>,
    /// Frozen spans of this task across interruptions, in close-out order.
    #[serde(default)]
    pub completed_fragments: Vec<FragmentRecord>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Create a new task with a clamped planned duration.
    pub fn new(title: impl Into<String>, planned_duration_secs: i64) -> Self {
        let now = Utc::now();
        Task {
            id: format!("task-{}-{}", now.timestamp(), uuid::Uuid::new_v4()),
            title: title.into(),
            planned_duration_secs: clamp_task_duration(planned_duration_secs),
            color_tag: None,
            icon: None,
            is_completed: false,
            actual_start_time: None,
            actual_end_time: None,
            completed_fragments: Vec::new(),
            created_at: now,
        }
    }

    pub fn planned_duration(&self) -> Duration {
        Duration::seconds(self.planned_duration_secs)
    }

    /// Replace the planned duration, re-applying the clamp.
    pub fn set_planned_duration_secs(&mut self, secs: i64) {
        self.planned_duration_secs = clamp_task_duration(secs);
    }

    /// Total time already frozen into `completed_fragments`.
    pub fn frozen_duration(&self) -> Duration {
        self.completed_fragments
            .iter()
            .fold(Duration::zero(), |acc, f| acc + f.duration())
    }

    /// Append a closed-out live span. Zero/negative spans are ignored.
    pub fn push_fragment(&mut self, start_time: DateTime<Utc>, end_time: DateTime<Utc>) {
        if end_time > start_time {
            self.completed_fragments.push(FragmentRecord {
                start_time,
                end_time,
            });
        }
    }
}

/// A unit of pinned work: anchored to a fixed start time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    /// Pinned start. Never mutated by scheduling or execution logic.
    pub start_time: DateTime<Utc>,
    /// Planned duration in seconds, clamped to [60, 86400].
    pub planned_duration_secs: i64,
    #[serde(default)]
    pub is_completed: bool,
    /// Set by explicit user completion or by auto-finish chaining.
    #[serde(default)]
    pub actual_end_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Create a new event with a clamped planned duration.
    pub fn new(
        title: impl Into<String>,
        start_time: DateTime<Utc>,
        planned_duration_secs: i64,
    ) -> Self {
        let now = Utc::now();
        Event {
            id: format!("event-{}-{}", now.timestamp(), uuid::Uuid::new_v4()),
            title: title.into(),
            start_time,
            planned_duration_secs: clamp_event_duration(planned_duration_secs),
            is_completed: false,
            actual_end_time: None,
            created_at: now,
        }
    }

    pub fn planned_duration(&self) -> Duration {
        Duration::seconds(self.planned_duration_secs)
    }

    pub fn planned_end_time(&self) -> DateTime<Utc> {
        self.start_time + self.planned_duration()
    }

    pub fn effective_end_time(&self) -> DateTime<Utc> {
        self.actual_end_time.unwrap_or_else(|| self.planned_end_time())
    }

    pub fn set_planned_duration_secs(&mut self, secs: i64) {
        self.planned_duration_secs = clamp_event_duration(secs);
    }
}

fn clamp_task_duration(secs: i64) -> i64 {
    secs.clamp(TASK_DURATION_MIN_SECS, DURATION_MAX_SECS)
}

fn clamp_event_duration(secs: i64) -> i64 {
    secs.clamp(EVENT_DURATION_MIN_SECS, DURATION_MAX_SECS)
}

/// The root aggregate for one calendar day.
///
/// `tasks` is in user-controlled priority order. `events` is kept in
/// insertion order; every read that matters goes through
/// [`pending_events`](DayPlan::pending_events), which sorts by start time
/// and filters out completed events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayPlan {
    pub date: NaiveDate,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub events: Vec<Event>,
    /// Guardrail threshold: gaps shorter than this become free time.
    #[serde(default = "default_minimum_fragment_minutes")]
    pub minimum_fragment_minutes: i64,
}

fn default_minimum_fragment_minutes() -> i64 {
    DEFAULT_MINIMUM_FRAGMENT_MINUTES
}

impl DayPlan {
    /// Create an empty plan for the given day.
    pub fn new(date: NaiveDate) -> Self {
        DayPlan {
            date,
            tasks: Vec::new(),
            events: Vec::new(),
            minimum_fragment_minutes: DEFAULT_MINIMUM_FRAGMENT_MINUTES,
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Non-completed tasks in priority order.
    pub fn pending_tasks(&self) -> Vec<&Task> {
        self.tasks.iter().filter(|t| !t.is_completed).collect()
    }

    /// Non-completed events sorted ascending by start time.
    pub fn pending_events(&self) -> Vec<&Event> {
        let mut events: Vec<&Event> =
            self.events.iter().filter(|e| !e.is_completed).collect();
        events.sort_by_key(|e| e.start_time);
        events
    }

    /// The task the execution machine should be timing.
    pub fn first_pending_task(&self) -> Option<&Task> {
        self.tasks.iter().find(|t| !t.is_completed)
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn task_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    pub fn event(&self, id: &str) -> Option<&Event> {
        self.events.iter().find(|e| e.id == id)
    }

    pub fn event_mut(&mut self, id: &str) -> Option<&mut Event> {
        self.events.iter_mut().find(|e| e.id == id)
    }

    pub fn guardrail_threshold(&self) -> Duration {
        Duration::seconds(self.minimum_fragment_minutes * 60)
    }

    // ── Mutations ────────────────────────────────────────────────────

    pub fn add_task(&mut self, task: Task) {
        self.tasks.push(task);
    }

    pub fn add_event(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Remove a task by id. Returns false when no such task exists.
    pub fn remove_task(&mut self, id: &str) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        self.tasks.len() != before
    }

    /// Remove an event by id. Returns false when no such event exists.
    pub fn remove_event(&mut self, id: &str) -> bool {
        let before = self.events.len();
        self.events.retain(|e| e.id != id);
        self.events.len() != before
    }

    /// Move a task to a new position in the priority order.
    pub fn reorder_task(&mut self, id: &str, new_index: usize) -> Result<(), ValidationError> {
        let from = self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| ValidationError::InvalidValue {
                field: "task_id".into(),
                message: format!("no task with id '{id}'"),
            })?;
        if new_index >= self.tasks.len() {
            return Err(ValidationError::OutOfBounds {
                collection: "tasks".into(),
                index: new_index,
                len: self.tasks.len(),
            });
        }
        let task = self.tasks.remove(from);
        self.tasks.insert(new_index, task);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, h, m, 0).unwrap()
    }

    #[test]
    fn task_duration_is_clamped() {
        assert_eq!(Task::new("t", 0).planned_duration_secs, 1);
        assert_eq!(Task::new("t", -5).planned_duration_secs, 1);
        assert_eq!(Task::new("t", 100_000).planned_duration_secs, 86_400);
        assert_eq!(Task::new("t", 3600).planned_duration_secs, 3600);
    }

    #[test]
    fn event_duration_is_clamped() {
        assert_eq!(Event::new("e", at(9, 0), 10).planned_duration_secs, 60);
        assert_eq!(
            Event::new("e", at(9, 0), 200_000).planned_duration_secs,
            86_400
        );
    }

    #[test]
    fn effective_end_prefers_actual() {
        let mut event = Event::new("e", at(9, 0), 1800);
        assert_eq!(event.effective_end_time(), at(9, 30));
        event.actual_end_time = Some(at(9, 20));
        assert_eq!(event.effective_end_time(), at(9, 20));
    }

    #[test]
    fn pending_events_sorted_and_filtered() {
        let mut plan = DayPlan::new(at(0, 0).date_naive());
        let mut done = Event::new("done", at(8, 0), 600);
        done.is_completed = true;
        plan.add_event(Event::new("late", at(14, 0), 600));
        plan.add_event(done);
        plan.add_event(Event::new("early", at(9, 0), 600));

        let pending = plan.pending_events();
        let titles: Vec<&str> = pending.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["early", "late"]);
    }

    #[test]
    fn first_pending_skips_completed() {
        let mut plan = DayPlan::new(at(0, 0).date_naive());
        let mut t1 = Task::new("a", 600);
        t1.is_completed = true;
        plan.add_task(t1);
        plan.add_task(Task::new("b", 600));
        assert_eq!(plan.first_pending_task().unwrap().title, "b");
    }

    #[test]
    fn reorder_moves_task() {
        let mut plan = DayPlan::new(at(0, 0).date_naive());
        plan.add_task(Task::new("a", 60));
        plan.add_task(Task::new("b", 60));
        let b_id = plan.tasks[1].id.clone();
        plan.reorder_task(&b_id, 0).unwrap();
        assert_eq!(plan.tasks[0].title, "b");
        assert!(plan.reorder_task(&b_id, 5).is_err());
    }

    #[test]
    fn frozen_duration_sums_fragments() {
        let mut task = Task::new("t", 3600);
        task.push_fragment(at(10, 0), at(10, 15));
        task.push_fragment(at(11, 0), at(11, 5));
        // zero-width spans are dropped
        task.push_fragment(at(12, 0), at(12, 0));
        assert_eq!(task.frozen_duration(), Duration::minutes(20));
        assert_eq!(task.completed_fragments.len(), 2);
    }
}
