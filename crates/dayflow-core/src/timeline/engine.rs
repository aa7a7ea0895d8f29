//! The scheduling engine.
//!
//! Lays fluid tasks into the gaps between pinned events, fragmenting a task
//! across events and applying the "too small to start" guardrail. Pure and
//! total: identical inputs yield identical output, malformed durations are
//! prevented upstream by entity clamping, and a plan with zero events
//! degenerates to simple sequential layout.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};

use crate::plan::{DayPlan, Event, Task};

use super::TimelineSlot;

/// Lay out the plan's pending work starting at `cursor_time`.
///
/// Tasks are consumed in priority order; events take priority over task work
/// at equal instants. Output is in emission order -- callers needing a global
/// sort by start time must sort themselves (the compositor does).
pub fn compute_timeline(plan: &DayPlan, cursor_time: DateTime<Utc>) -> Vec<TimelineSlot> {
    layout(
        &plan.pending_tasks(),
        plan.pending_events(),
        plan.guardrail_threshold(),
        cursor_time,
    )
}

/// Core layout loop, shared with the compositor (which feeds it a reduced
/// task/event set).
///
/// `events` must be sorted ascending by start time.
pub(crate) fn layout(
    tasks: &[&Task],
    events: Vec<&Event>,
    threshold: Duration,
    cursor_time: DateTime<Utc>,
) -> Vec<TimelineSlot> {
    let mut pool: VecDeque<&Event> = events.into();
    let mut slots = Vec::new();
    let mut cursor = cursor_time;

    for task in tasks {
        let mut remaining = task.planned_duration();
        let mut fragment_index: u32 = 0;

        while remaining > Duration::zero() {
            // An event starting at or before the cursor always lands before
            // any task work at that instant. Zero and negative gaps fold
            // into this rule.
            drain_due_events(&mut pool, &mut cursor, &mut slots);

            match pool.front() {
                None => {
                    slots.push(fragment(task, cursor, cursor + remaining, fragment_index));
                    cursor += remaining;
                    remaining = Duration::zero();
                }
                Some(event) => {
                    let gap = event.start_time - cursor;
                    if remaining <= gap {
                        // Fits entirely before the next event.
                        slots.push(fragment(task, cursor, cursor + remaining, fragment_index));
                        cursor += remaining;
                        remaining = Duration::zero();
                    } else if gap >= threshold {
                        // Inclusive boundary: a gap of exactly the threshold
                        // still earns a fragment.
                        slots.push(fragment(task, cursor, event.start_time, fragment_index));
                        fragment_index += 1;
                        remaining -= gap;
                        cursor = event.start_time;
                    } else {
                        // Too small to start: free time instead of a sliver.
                        slots.push(TimelineSlot::FreeTime {
                            start_time: cursor,
                            end_time: event.start_time,
                        });
                        cursor = event.start_time;
                    }
                }
            }
        }
    }

    // Events beyond the last task, each preceded by free time when a gap
    // exists.
    while let Some(event) = pool.pop_front() {
        if event.start_time > cursor {
            slots.push(TimelineSlot::FreeTime {
                start_time: cursor,
                end_time: event.start_time,
            });
        }
        let end = event.planned_end_time();
        slots.push(TimelineSlot::Event {
            event_id: event.id.clone(),
            start_time: event.start_time,
            end_time: end,
        });
        cursor = cursor.max(end);
    }

    slots
}

/// Emit every pooled event whose start has been reached, advancing the
/// cursor past each.
fn drain_due_events(
    pool: &mut VecDeque<&Event>,
    cursor: &mut DateTime<Utc>,
    slots: &mut Vec<TimelineSlot>,
) {
    while let Some(event) = pool.front() {
        if event.start_time > *cursor {
            break;
        }
        let end = event.planned_end_time();
        slots.push(TimelineSlot::Event {
            event_id: event.id.clone(),
            start_time: event.start_time,
            end_time: end,
        });
        pool.pop_front();
        *cursor = (*cursor).max(end);
    }
}

fn fragment(
    task: &Task,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    fragment_index: u32,
) -> TimelineSlot {
    TimelineSlot::TaskFragment {
        task_id: task.id.clone(),
        start_time,
        end_time,
        fragment_index,
    }
}
