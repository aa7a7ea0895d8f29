//! Execution timer implementation.
//!
//! The timer is a wall-clock-based state machine. It does not use internal
//! threads -- the caller invokes `tick()` periodically and passes `now`
//! explicitly, which keeps every transition deterministic under test.
//! Elapsed time is derived from `now - last_tick_at`, so tick cadence only
//! affects latency, never accounting; the same flush path replays time that
//! passed while the process was suspended.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> TimingTask -> TimingEvent -> TimingTask -> ... -> Idle
//! ```
//!
//! Only one item (one task or one event) is ever active; the transition
//! table enforces it.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::events::TimerEvent;
use crate::plan::{DayPlan, Task};

/// Tolerance for "an event's start time has arrived", in milliseconds.
pub const START_TOLERANCE_MS: i64 = 500;

/// What the machine is timing right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActiveItem {
    Idle,
    Task { task_id: String },
    Event { event_id: String },
}

impl ActiveItem {
    pub fn is_idle(&self) -> bool {
        matches!(self, ActiveItem::Idle)
    }

    pub fn task_id(&self) -> Option<&str> {
        match self {
            ActiveItem::Task { task_id } => Some(task_id),
            _ => None,
        }
    }

    pub fn event_id(&self) -> Option<&str> {
        match self {
            ActiveItem::Event { event_id } => Some(event_id),
            _ => None,
        }
    }

    /// The id of whichever item is active, if any.
    pub fn item_id(&self) -> Option<&str> {
        match self {
            ActiveItem::Idle => None,
            ActiveItem::Task { task_id } => Some(task_id),
            ActiveItem::Event { event_id } => Some(event_id),
        }
    }
}

impl Default for ActiveItem {
    fn default() -> Self {
        ActiveItem::Idle
    }
}

/// Countdown progress snapshotted when the machine retargets away from a
/// task, restored when that task becomes first-pending again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SavedProgress {
    pub remaining_ms: u64,
    pub overtime_ms: u64,
    pub total_planned_ms: u64,
    pub is_overtime: bool,
}

/// The execution/interruption state machine.
///
/// Serializes in full (including the wall-clock anchor and the
/// saved-progress map); a deserialized timer is brought up to date with
/// [`reconcile`](ExecutionTimer::reconcile).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionTimer {
    active: ActiveItem,
    /// Remaining countdown in milliseconds; pinned at 0 while in overtime.
    remaining_ms: u64,
    /// Time elapsed past the planned duration, in milliseconds.
    overtime_ms: u64,
    is_overtime: bool,
    total_planned_ms: u64,
    /// Ticking vs. paused.
    is_running: bool,
    /// Wall-clock anchor of the last flush. Doubles as the suspend
    /// timestamp for resume reconciliation.
    #[serde(default)]
    last_tick_at: Option<DateTime<Utc>>,
    /// When the current item's timing session began.
    #[serde(default)]
    started_at: Option<DateTime<Utc>>,
    /// Per-task saved progress, keyed by task id.
    #[serde(default)]
    saved: HashMap<String, SavedProgress>,
}

impl ExecutionTimer {
    pub fn new() -> Self {
        ExecutionTimer {
            active: ActiveItem::Idle,
            remaining_ms: 0,
            overtime_ms: 0,
            is_overtime: false,
            total_planned_ms: 0,
            is_running: false,
            last_tick_at: None,
            started_at: None,
            saved: HashMap::new(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn active(&self) -> &ActiveItem {
        &self.active
    }

    pub fn remaining_ms(&self) -> u64 {
        self.remaining_ms
    }

    pub fn remaining(&self) -> Duration {
        ms_to_duration(self.remaining_ms)
    }

    pub fn overtime_ms(&self) -> u64 {
        self.overtime_ms
    }

    pub fn is_overtime(&self) -> bool {
        self.is_overtime
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn total_planned_ms(&self) -> u64 {
        self.total_planned_ms
    }

    /// Total time attributed to the current item so far, frozen fragments
    /// included.
    pub fn elapsed_total(&self) -> Duration {
        let planned = ms_to_duration(self.total_planned_ms);
        if self.is_overtime {
            planned + ms_to_duration(self.overtime_ms)
        } else {
            planned - ms_to_duration(self.remaining_ms)
        }
    }

    pub fn saved_progress(&self, task_id: &str) -> Option<SavedProgress> {
        self.saved.get(task_id).copied()
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self, now: DateTime<Utc>) -> TimerEvent {
        TimerEvent::StateSnapshot {
            active: self.active.clone(),
            is_running: self.is_running,
            is_overtime: self.is_overtime,
            remaining_ms: self.remaining_ms,
            overtime_ms: self.overtime_ms,
            total_planned_ms: self.total_planned_ms,
            at: now,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin (or continue) ticking the active item, targeting the first
    /// pending task when idle. Returns None when there is nothing to time.
    pub fn start(&mut self, plan: &DayPlan, now: DateTime<Utc>) -> Option<TimerEvent> {
        if self.active.is_idle() {
            self.resync_first_pending(plan, now);
        }
        if self.active.is_idle() {
            return None;
        }
        self.is_running = true;
        self.last_tick_at = Some(now);
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
        match &self.active {
            ActiveItem::Task { task_id } => Some(TimerEvent::TaskStarted {
                task_id: task_id.clone(),
                remaining_ms: self.remaining_ms,
                at: now,
            }),
            ActiveItem::Event { event_id } => Some(TimerEvent::EventStarted {
                event_id: event_id.clone(),
                remaining_ms: self.remaining_ms,
                at: now,
            }),
            ActiveItem::Idle => None,
        }
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> Option<TimerEvent> {
        if !self.is_running || self.active.is_idle() {
            return None;
        }
        self.flush(now);
        self.is_running = false;
        self.last_tick_at = None;
        Some(TimerEvent::TimerPaused {
            remaining_ms: self.remaining_ms,
            at: now,
        })
    }

    pub fn resume(&mut self, now: DateTime<Utc>) -> Option<TimerEvent> {
        if self.is_running || self.active.is_idle() {
            return None;
        }
        self.is_running = true;
        self.last_tick_at = Some(now);
        Some(TimerEvent::TimerResumed {
            remaining_ms: self.remaining_ms,
            at: now,
        })
    }

    /// Call periodically while running. Advances the countdown and runs the
    /// event-interruption check.
    pub fn tick(&mut self, plan: &mut DayPlan, now: DateTime<Utc>) -> Vec<TimerEvent> {
        let mut out = Vec::new();
        if !self.is_running || self.active.is_idle() {
            return out;
        }
        if self.flush(now) {
            out.push(TimerEvent::WentOvertime {
                item_id: self.active.item_id().unwrap_or_default().to_string(),
                at: now,
            });
        }
        out.extend(self.check_interruption(plan, now));
        out
    }

    /// One idempotent resync: whenever the plan's order or completion set
    /// changes, re-derive which task should be timed. A displaced task's
    /// progress is snapshotted; the new target restores its own saved
    /// progress or starts from its full planned duration. A timed event is
    /// never resynced away.
    pub fn resync_first_pending(
        &mut self,
        plan: &DayPlan,
        now: DateTime<Utc>,
    ) -> Option<TimerEvent> {
        if let ActiveItem::Event { event_id } = &self.active {
            if plan.event(event_id).is_some_and(|e| !e.is_completed) {
                return None;
            }
            // Stale event reference: fall through and retarget.
        }

        // Bring the accounting current before any snapshot.
        self.flush(now);

        let first_id = plan.first_pending_task().map(|t| t.id.clone());
        if let ActiveItem::Task { task_id } = &self.active {
            if Some(task_id) == first_id.as_ref() {
                return None;
            }
            if plan.task(task_id).is_some_and(|t| !t.is_completed) {
                self.saved.insert(task_id.clone(), self.progress());
            }
        }

        match first_id {
            Some(task_id) => {
                let planned_ms = plan
                    .task(&task_id)
                    .map(|t| duration_to_ms(t.planned_duration()))
                    .unwrap_or(0);
                let progress = self.saved.get(&task_id).copied().unwrap_or(SavedProgress {
                    remaining_ms: planned_ms,
                    overtime_ms: 0,
                    total_planned_ms: planned_ms,
                    is_overtime: false,
                });
                self.active = ActiveItem::Task {
                    task_id: task_id.clone(),
                };
                self.remaining_ms = progress.remaining_ms;
                self.overtime_ms = progress.overtime_ms;
                self.total_planned_ms = progress.total_planned_ms;
                self.is_overtime = progress.is_overtime;
                self.started_at = Some(now);
                self.last_tick_at = self.is_running.then_some(now);
                Some(TimerEvent::Retargeted {
                    task_id: Some(task_id),
                    at: now,
                })
            }
            None => {
                if self.active.is_idle() {
                    return None;
                }
                self.go_idle();
                Some(TimerEvent::Retargeted { task_id: None, at: now })
            }
        }
    }

    /// Complete a task: close its live fragment, stamp actual times, mark
    /// completed, and retarget. Completing a task that is not the one being
    /// timed (e.g. during an event interruption) is legal. A stale id is
    /// discarded silently with a resync.
    pub fn complete_task(
        &mut self,
        plan: &mut DayPlan,
        task_id: &str,
        now: DateTime<Utc>,
    ) -> Vec<TimerEvent> {
        let mut out = Vec::new();
        if plan.task(task_id).is_none() {
            out.extend(self.resync_first_pending(plan, now));
            return out;
        }

        let is_active = self.active.task_id() == Some(task_id);
        if is_active {
            self.flush(now);
        }
        let elapsed = if is_active {
            self.elapsed_total()
        } else {
            Duration::zero()
        };
        let started_at = if is_active { self.started_at } else { None };
        if let Some(task) = plan.task_mut(task_id) {
            if is_active {
                let live = (elapsed - task.frozen_duration()).max(Duration::zero());
                if live > Duration::zero() {
                    task.push_fragment(now - live, now);
                }
            }
            backfill_actual_start(task, started_at, now, elapsed);
            task.actual_end_time = Some(now);
            task.is_completed = true;
        }
        self.saved.remove(task_id);
        out.push(TimerEvent::TaskCompleted {
            task_id: task_id.to_string(),
            at: now,
        });
        out.extend(self.resync_first_pending(plan, now));
        out
    }

    /// Complete an event. If it was the one being timed, the machine
    /// transitions back to whichever task is first-pending (re-derived, not
    /// assumed), restoring that task's saved remaining time.
    pub fn complete_event(
        &mut self,
        plan: &mut DayPlan,
        event_id: &str,
        now: DateTime<Utc>,
    ) -> Vec<TimerEvent> {
        let mut out = Vec::new();
        let Some(event) = plan.event_mut(event_id) else {
            out.extend(self.resync_first_pending(plan, now));
            return out;
        };
        let was_completed = event.is_completed;
        event.is_completed = true;
        if event.actual_end_time.is_none() {
            event.actual_end_time = Some(now);
        }
        if !was_completed {
            out.push(TimerEvent::EventCompleted {
                event_id: event_id.to_string(),
                at: now,
            });
        }
        out.extend(self.resync_first_pending(plan, now));
        out
    }

    /// Manual time adjustment. Remaining and planned totals move together;
    /// a positive adjustment while in overtime folds the overtime into the
    /// planned total and restarts the countdown at the adjustment amount.
    pub fn adjust(&mut self, delta_secs: i64, now: DateTime<Utc>) -> Option<TimerEvent> {
        if self.active.is_idle() {
            return None;
        }
        self.flush(now);
        let delta_ms = delta_secs.saturating_mul(1000);
        if self.is_overtime {
            if delta_ms <= 0 {
                return None;
            }
            self.total_planned_ms += self.overtime_ms + delta_ms as u64;
            self.overtime_ms = 0;
            self.is_overtime = false;
            self.remaining_ms = delta_ms as u64;
        } else {
            self.remaining_ms = (self.remaining_ms as i64 + delta_ms).max(0) as u64;
            self.total_planned_ms = (self.total_planned_ms as i64 + delta_ms).max(0) as u64;
        }
        Some(TimerEvent::TimeAdjusted {
            delta_secs,
            remaining_ms: self.remaining_ms,
            at: now,
        })
    }

    /// Suspend/resume reconciliation, run once after deserializing.
    ///
    /// Replays the wall-clock time that passed while suspended, discards a
    /// stale active reference, and completes (rather than resumes) an event
    /// whose planned end has already passed.
    pub fn reconcile(&mut self, plan: &mut DayPlan, now: DateTime<Utc>) -> Vec<TimerEvent> {
        let mut out = Vec::new();

        let stale = match &self.active {
            ActiveItem::Idle => false,
            ActiveItem::Task { task_id } => {
                !plan.task(task_id).is_some_and(|t| !t.is_completed)
            }
            ActiveItem::Event { event_id } => {
                !plan.event(event_id).is_some_and(|e| !e.is_completed)
            }
        };
        if stale {
            self.go_idle();
            out.extend(self.resync_first_pending(plan, now));
            return out;
        }

        if self.is_running && self.flush(now) {
            out.push(TimerEvent::WentOvertime {
                item_id: self.active.item_id().unwrap_or_default().to_string(),
                at: now,
            });
        }

        if let ActiveItem::Event { event_id } = &self.active {
            let event_id = event_id.clone();
            let past_end = plan
                .event(&event_id)
                .is_some_and(|e| e.planned_end_time() <= now);
            if past_end {
                out.extend(self.complete_event(plan, &event_id, now));
            }
        }

        out
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Apply wall-clock time elapsed since the last flush. Returns true
    /// when the countdown crossed into overtime.
    fn flush(&mut self, now: DateTime<Utc>) -> bool {
        let Some(last) = self.last_tick_at else {
            return false;
        };
        let elapsed_ms = (now - last).num_milliseconds().max(0) as u64;
        self.last_tick_at = Some(now);
        self.apply_elapsed(elapsed_ms)
    }

    fn apply_elapsed(&mut self, elapsed_ms: u64) -> bool {
        if elapsed_ms == 0 {
            return false;
        }
        if self.is_overtime {
            self.overtime_ms += elapsed_ms;
            false
        } else if elapsed_ms >= self.remaining_ms {
            self.overtime_ms = elapsed_ms - self.remaining_ms;
            self.remaining_ms = 0;
            self.is_overtime = true;
            true
        } else {
            self.remaining_ms -= elapsed_ms;
            false
        }
    }

    /// Event-interruption check. The latest due pending event becomes the
    /// timed item; every due event before it is completed by auto-finish
    /// chaining, each with `actual_end_time` set to the start of the event
    /// immediately following it.
    fn check_interruption(&mut self, plan: &mut DayPlan, now: DateTime<Utc>) -> Vec<TimerEvent> {
        let mut out = Vec::new();
        let horizon = now + Duration::milliseconds(START_TOLERANCE_MS);
        let due: Vec<String> = plan
            .pending_events()
            .iter()
            .filter(|e| e.start_time <= horizon)
            .map(|e| e.id.clone())
            .collect();

        match self.active.clone() {
            ActiveItem::Idle => {}
            ActiveItem::Task { task_id } => {
                let Some(trigger_id) = due.last().cloned() else {
                    return out;
                };
                out.extend(chain_complete(plan, &due, now));
                self.freeze_task(plan, &task_id, now);
                out.push(self.enter_event(plan, trigger_id, now));
            }
            ActiveItem::Event { event_id } => {
                // Only a subsequent event ends the current one.
                match due.last() {
                    Some(trigger_id) if *trigger_id != event_id => {
                        let trigger_id = trigger_id.clone();
                        out.extend(chain_complete(plan, &due, now));
                        out.push(self.enter_event(plan, trigger_id, now));
                    }
                    _ => {}
                }
            }
        }
        out
    }

    /// Close out the interrupted task: backfill its actual start, freeze the
    /// live span into a fragment record, and snapshot its progress.
    fn freeze_task(&mut self, plan: &mut DayPlan, task_id: &str, now: DateTime<Utc>) {
        let elapsed = self.elapsed_total();
        let started_at = self.started_at;
        if let Some(task) = plan.task_mut(task_id) {
            backfill_actual_start(task, started_at, now, elapsed);
            let live = (elapsed - task.frozen_duration()).max(Duration::zero());
            if live > Duration::zero() {
                task.push_fragment(now - live, now);
            }
        }
        self.saved.insert(task_id.to_string(), self.progress());
    }

    fn enter_event(
        &mut self,
        plan: &DayPlan,
        event_id: String,
        now: DateTime<Utc>,
    ) -> TimerEvent {
        let planned_ms = plan
            .event(&event_id)
            .map(|e| duration_to_ms(e.planned_duration()))
            .unwrap_or(0);
        self.active = ActiveItem::Event {
            event_id: event_id.clone(),
        };
        self.total_planned_ms = planned_ms;
        self.remaining_ms = planned_ms;
        self.overtime_ms = 0;
        self.is_overtime = false;
        self.is_running = true;
        self.started_at = Some(now);
        self.last_tick_at = Some(now);
        TimerEvent::EventStarted {
            event_id,
            remaining_ms: planned_ms,
            at: now,
        }
    }

    fn progress(&self) -> SavedProgress {
        SavedProgress {
            remaining_ms: self.remaining_ms,
            overtime_ms: self.overtime_ms,
            total_planned_ms: self.total_planned_ms,
            is_overtime: self.is_overtime,
        }
    }

    fn go_idle(&mut self) {
        self.active = ActiveItem::Idle;
        self.remaining_ms = 0;
        self.overtime_ms = 0;
        self.is_overtime = false;
        self.total_planned_ms = 0;
        self.is_running = false;
        self.last_tick_at = None;
        self.started_at = None;
    }
}

impl Default for ExecutionTimer {
    fn default() -> Self {
        Self::new()
    }
}

/// Complete every due event except the last, each with `actual_end_time`
/// set to the start of the event that follows it. `due` is ascending by
/// start time; cascades through arbitrarily many back-to-back events.
fn chain_complete(plan: &mut DayPlan, due: &[String], now: DateTime<Utc>) -> Vec<TimerEvent> {
    let mut out = Vec::new();
    for pair in due.windows(2) {
        let next_start = plan.event(&pair[1]).map(|e| e.start_time);
        let Some(end) = next_start else { continue };
        if let Some(event) = plan.event_mut(&pair[0]) {
            if !event.is_completed {
                event.is_completed = true;
                event.actual_end_time = Some(end);
                out.push(TimerEvent::EventAutoCompleted {
                    event_id: event.id.clone(),
                    actual_end_time: end,
                    at: now,
                });
            }
        }
    }
    out
}

fn backfill_actual_start(
    task: &mut Task,
    started_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    elapsed: Duration,
) {
    if task.actual_start_time.is_none() {
        let from_fragment = task.completed_fragments.first().map(|f| f.start_time);
        task.actual_start_time = from_fragment.or(started_at).or(Some(now - elapsed));
    }
}

fn duration_to_ms(d: Duration) -> u64 {
    d.num_milliseconds().max(0) as u64
}

fn ms_to_duration(ms: u64) -> Duration {
    Duration::milliseconds(ms as i64)
}
