//! The live-timeline compositor.
//!
//! Extends the scheduling engine into a display-ready timeline spanning
//! history and future:
//! - completed work renders at its *actual* recorded spans,
//! - the currently timed item renders as a live span split around upcoming
//!   events,
//! - everything else is laid out by the engine starting after the live span.
//!
//! Recomputed periodically and on every plan mutation; never persisted.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};

use crate::plan::DayPlan;
use crate::timer::{ActiveItem, ExecutionTimer};

use super::engine::layout;
use super::TimelineSlot;

/// Compose the full day timeline as of `now`.
///
/// Output is sorted ascending by start time; ties keep insertion order
/// (history, then live, then pending), so identical inputs always yield an
/// identical slot sequence.
pub fn compute_full_timeline(
    plan: &DayPlan,
    timer: &ExecutionTimer,
    now: DateTime<Utc>,
) -> Vec<TimelineSlot> {
    let mut slots = Vec::new();

    // 1. History: actual recorded spans.
    for task in &plan.tasks {
        for (index, fragment) in task.completed_fragments.iter().enumerate() {
            slots.push(TimelineSlot::TaskFragment {
                task_id: task.id.clone(),
                start_time: fragment.start_time,
                end_time: fragment.end_time,
                fragment_index: index as u32,
            });
        }
        // Legacy single-span tasks recorded before fragment bookkeeping.
        if task.is_completed && task.completed_fragments.is_empty() {
            if let (Some(start), Some(end)) = (task.actual_start_time, task.actual_end_time) {
                if end > start {
                    slots.push(TimelineSlot::TaskFragment {
                        task_id: task.id.clone(),
                        start_time: start,
                        end_time: end,
                        fragment_index: 0,
                    });
                }
            }
        }
    }
    for event in plan.events.iter().filter(|e| e.is_completed) {
        let end = event.effective_end_time();
        if end > event.start_time {
            slots.push(TimelineSlot::Event {
                event_id: event.id.clone(),
                start_time: event.start_time,
                end_time: end,
            });
        }
    }

    // 2 + 3. Live span of the currently timed item.
    let mut consumed: HashSet<&str> = HashSet::new();
    let mut active_task_id: Option<&str> = None;
    let mut active_event_id: Option<&str> = None;
    let mut pending_cursor = now;

    match timer.active() {
        ActiveItem::Idle => {}
        ActiveItem::Task { task_id } => {
            if let Some(task) = plan.task(task_id).filter(|t| !t.is_completed) {
                active_task_id = Some(task_id.as_str());
                // Frozen spans are already rendered above; subtract them so
                // they are never double-counted.
                let current_elapsed =
                    (timer.elapsed_total() - task.frozen_duration()).max(Duration::zero());
                let live_start = now - current_elapsed;
                let live_end = if timer.is_overtime() {
                    now
                } else {
                    now + timer.remaining()
                };
                pending_cursor = live_end;

                // Split the live span around upcoming events, consuming it
                // left-to-right: "if this task kept running uninterrupted,
                // where would the next meeting cut into it".
                let mut seg_start = live_start;
                let mut rem = live_end - live_start;
                let mut index = task.completed_fragments.len() as u32;
                for event in plan.pending_events() {
                    if rem <= Duration::zero() {
                        break;
                    }
                    if event.start_time <= live_start || event.start_time < seg_start {
                        continue;
                    }
                    if event.start_time >= seg_start + rem {
                        break;
                    }
                    let chunk = event.start_time - seg_start;
                    if chunk > Duration::zero() {
                        slots.push(TimelineSlot::TaskFragment {
                            task_id: task.id.clone(),
                            start_time: seg_start,
                            end_time: event.start_time,
                            fragment_index: index,
                        });
                        index += 1;
                        rem -= chunk;
                    }
                    slots.push(TimelineSlot::Event {
                        event_id: event.id.clone(),
                        start_time: event.start_time,
                        end_time: event.planned_end_time(),
                    });
                    consumed.insert(event.id.as_str());
                    seg_start = event.planned_end_time();
                }
                if rem > Duration::zero() {
                    slots.push(TimelineSlot::TaskFragment {
                        task_id: task.id.clone(),
                        start_time: seg_start,
                        end_time: seg_start + rem,
                        fragment_index: index,
                    });
                }
            }
        }
        ActiveItem::Event { event_id } => {
            if let Some(event) = plan.event(event_id).filter(|e| !e.is_completed) {
                active_event_id = Some(event_id.as_str());
                let live_end = if timer.is_overtime() {
                    now
                } else {
                    now + timer.remaining()
                };
                pending_cursor = live_end;
                if live_end > event.start_time {
                    slots.push(TimelineSlot::Event {
                        event_id: event.id.clone(),
                        start_time: event.start_time,
                        end_time: live_end,
                    });
                }
            }
        }
    }

    // 4. Pending layout for everything else, after the live span.
    let pending_tasks: Vec<_> = plan
        .pending_tasks()
        .into_iter()
        .filter(|t| Some(t.id.as_str()) != active_task_id)
        .collect();
    let pending_events: Vec<_> = plan
        .pending_events()
        .into_iter()
        .filter(|e| {
            Some(e.id.as_str()) != active_event_id && !consumed.contains(e.id.as_str())
        })
        .collect();
    slots.extend(layout(
        &pending_tasks,
        pending_events,
        plan.guardrail_threshold(),
        pending_cursor,
    ));

    // 5. Global order by start time; stable sort keeps ties deterministic.
    slots.sort_by_key(TimelineSlot::start_time);
    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{DayPlan, Event, Task};
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 3, h, m, 0).unwrap()
    }

    fn plan_with(tasks: Vec<Task>, events: Vec<Event>) -> DayPlan {
        let mut plan = DayPlan::new(at(0, 0).date_naive());
        plan.tasks = tasks;
        plan.events = events;
        plan
    }

    fn fragments_of<'a>(slots: &'a [TimelineSlot], id: &str) -> Vec<&'a TimelineSlot> {
        slots
            .iter()
            .filter(|s| matches!(s, TimelineSlot::TaskFragment { task_id, .. } if task_id == id))
            .collect()
    }

    #[test]
    fn idle_timeline_is_engine_output_from_now() {
        let plan = plan_with(vec![Task::new("a", 1800)], vec![]);
        let timer = ExecutionTimer::new();
        let slots = compute_full_timeline(&plan, &timer, at(10, 0));
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].start_time(), at(10, 0));
        assert_eq!(slots[0].end_time(), at(10, 30));
    }

    #[test]
    fn completed_work_renders_at_actual_spans() {
        let mut done = Task::new("done", 1800);
        done.is_completed = true;
        done.push_fragment(at(8, 0), at(8, 20));
        done.push_fragment(at(9, 0), at(9, 10));
        let mut legacy = Task::new("legacy", 600);
        legacy.is_completed = true;
        legacy.actual_start_time = Some(at(7, 0));
        legacy.actual_end_time = Some(at(7, 10));
        let mut past_event = Event::new("past", at(9, 30), 1800);
        past_event.is_completed = true;
        past_event.actual_end_time = Some(at(9, 50));

        let done_id = done.id.clone();
        let plan = plan_with(vec![done, legacy], vec![past_event]);
        let timer = ExecutionTimer::new();
        let slots = compute_full_timeline(&plan, &timer, at(10, 0));

        assert_eq!(slots.len(), 4);
        // Sorted by start: legacy 7:00, done 8:00, done 9:00, event 9:30.
        assert_eq!(slots[0].start_time(), at(7, 0));
        let done_frags = fragments_of(&slots, &done_id);
        assert_eq!(done_frags.len(), 2);
        assert!(
            matches!(done_frags[1], TimelineSlot::TaskFragment { fragment_index: 1, .. })
        );
        assert!(matches!(&slots[3], TimelineSlot::Event { end_time, .. } if *end_time == at(9, 50)));
    }

    #[test]
    fn live_task_span_splits_around_upcoming_event() {
        let task = Task::new("a", 3600);
        let task_id = task.id.clone();
        let event = Event::new("standup", at(10, 30), 900);
        let mut plan = plan_with(vec![task], vec![event]);

        let mut timer = ExecutionTimer::new();
        timer.start(&plan, at(10, 0));
        timer.tick(&mut plan, at(10, 10));

        let slots = compute_full_timeline(&plan, &timer, at(10, 10));
        // Live span 10:00 .. 11:00 is cut by the 10:30 event into
        // 10:00-10:30, event, 10:45-11:15.
        let frags = fragments_of(&slots, &task_id);
        assert_eq!(frags.len(), 2);
        assert_eq!(frags[0].start_time(), at(10, 0));
        assert_eq!(frags[0].end_time(), at(10, 30));
        assert_eq!(frags[1].start_time(), at(10, 45));
        assert_eq!(frags[1].end_time(), at(11, 15));
        assert!(slots
            .iter()
            .any(|s| matches!(s, TimelineSlot::Event { start_time, .. } if *start_time == at(10, 30))));
    }

    #[test]
    fn live_fragment_index_continues_after_frozen_records() {
        let task = Task::new("a", 3600);
        let task_id = task.id.clone();
        let event = Event::new("standup", at(9, 10), 900);
        let event_id = event.id.clone();
        let mut plan = plan_with(vec![task], vec![event]);

        // Work 10 minutes, get interrupted, finish the event early, work 5
        // more minutes.
        let mut timer = ExecutionTimer::new();
        timer.start(&plan, at(9, 0));
        timer.tick(&mut plan, at(9, 10));
        timer.complete_event(&mut plan, &event_id, at(9, 15));
        timer.tick(&mut plan, at(9, 20));

        let slots = compute_full_timeline(&plan, &timer, at(9, 20));
        let frags = fragments_of(&slots, &task_id);
        assert_eq!(frags.len(), 2);
        // Frozen record keeps index 0; the live fragment continues at 1.
        assert!(matches!(frags[0], TimelineSlot::TaskFragment { fragment_index: 0, .. }));
        assert_eq!(frags[0].start_time(), at(9, 0));
        assert_eq!(frags[0].end_time(), at(9, 10));
        assert!(matches!(frags[1], TimelineSlot::TaskFragment { fragment_index: 1, .. }));
        // Live fragment began when the event completed; 45 minutes remain.
        assert_eq!(frags[1].start_time(), at(9, 15));
        assert_eq!(frags[1].end_time(), at(10, 5));
    }

    #[test]
    fn overtime_live_span_ends_at_now() {
        let task = Task::new("a", 600);
        let task_id = task.id.clone();
        let mut plan = plan_with(vec![task], vec![]);
        let mut timer = ExecutionTimer::new();
        timer.start(&plan, at(10, 0));
        timer.tick(&mut plan, at(10, 15));
        assert!(timer.is_overtime());

        let slots = compute_full_timeline(&plan, &timer, at(10, 15));
        let frags = fragments_of(&slots, &task_id);
        assert_eq!(frags.len(), 1);
        assert_eq!(frags[0].start_time(), at(10, 0));
        assert_eq!(frags[0].end_time(), at(10, 15));
    }

    #[test]
    fn pending_tasks_start_after_live_span() {
        let a = Task::new("a", 1800);
        let b = Task::new("b", 600);
        let b_id = b.id.clone();
        let mut plan = plan_with(vec![a, b], vec![]);
        let mut timer = ExecutionTimer::new();
        timer.start(&plan, at(10, 0));
        timer.tick(&mut plan, at(10, 10));

        let slots = compute_full_timeline(&plan, &timer, at(10, 10));
        let b_frags = fragments_of(&slots, &b_id);
        assert_eq!(b_frags.len(), 1);
        // a's live span ends at 10:30; b follows.
        assert_eq!(b_frags[0].start_time(), at(10, 30));
        assert_eq!(b_frags[0].end_time(), at(10, 40));
    }

    #[test]
    fn consumed_event_not_replayed_for_pending_tasks() {
        let a = Task::new("a", 3600);
        let b = Task::new("b", 600);
        let event = Event::new("standup", at(10, 30), 900);
        let event_id = event.id.clone();
        let mut plan = plan_with(vec![a, b], vec![event]);
        let mut timer = ExecutionTimer::new();
        timer.start(&plan, at(10, 0));
        timer.tick(&mut plan, at(10, 10));

        let slots = compute_full_timeline(&plan, &timer, at(10, 10));
        let event_slots: Vec<_> = slots
            .iter()
            .filter(|s| matches!(s, TimelineSlot::Event { event_id: id, .. } if *id == event_id))
            .collect();
        assert_eq!(event_slots.len(), 1);
    }

    #[test]
    fn live_event_span_tracks_overtime() {
        let task = Task::new("a", 3600);
        let event = Event::new("standup", at(10, 30), 900);
        let event_id = event.id.clone();
        let mut plan = plan_with(vec![task], vec![event]);
        let mut timer = ExecutionTimer::new();
        timer.start(&plan, at(10, 0));
        timer.tick(&mut plan, at(10, 30));
        // 30 minutes past the planned end.
        timer.tick(&mut plan, at(11, 15));

        let slots = compute_full_timeline(&plan, &timer, at(11, 15));
        let live = slots
            .iter()
            .find(|s| matches!(s, TimelineSlot::Event { event_id: id, .. } if *id == event_id))
            .unwrap();
        assert_eq!(live.start_time(), at(10, 30));
        assert_eq!(live.end_time(), at(11, 15));
    }

    #[test]
    fn recompute_is_deterministic() {
        let mut plan = plan_with(
            vec![Task::new("a", 3600), Task::new("b", 900)],
            vec![Event::new("e", at(10, 30), 900)],
        );
        let mut timer = ExecutionTimer::new();
        timer.start(&plan, at(10, 0));
        timer.tick(&mut plan, at(10, 10));

        let first = compute_full_timeline(&plan, &timer, at(10, 10));
        let second = compute_full_timeline(&plan, &timer, at(10, 10));
        assert_eq!(first, second);
    }
}
