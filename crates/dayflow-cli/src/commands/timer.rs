use chrono::Utc;
use clap::Subcommand;
use dayflow_core::ActiveItem;

use crate::common::{print_events, print_json, App};

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start (or continue) timing the first pending task
    Start,
    /// Pause the countdown
    Pause,
    /// Resume a paused countdown
    Resume,
    /// Tick once and print the current state as JSON
    Status,
    /// Add or remove time from the running item, in seconds
    Adjust {
        /// Signed adjustment in seconds
        secs: i64,
    },
    /// Complete whatever is being timed right now
    Complete,
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = App::load()?;
    print_events(&app.notices)?;
    let now = Utc::now();

    match action {
        TimerAction::Start => {
            if let Some(event) = app.timer.start(&app.plan, now) {
                print_json(&event)?;
            } else {
                println!("{{\"type\": \"nothing_to_time\"}}");
            }
        }
        TimerAction::Pause => {
            if let Some(event) = app.timer.pause(now) {
                print_json(&event)?;
            }
        }
        TimerAction::Resume => {
            if let Some(event) = app.timer.resume(now) {
                print_json(&event)?;
            }
        }
        TimerAction::Status => {
            let events = app.timer.tick(&mut app.plan, now);
            print_json(&app.timer.snapshot(now))?;
            print_events(&events)?;
        }
        TimerAction::Adjust { secs } => {
            if let Some(event) = app.timer.adjust(secs, now) {
                print_json(&event)?;
            }
        }
        TimerAction::Complete => match app.timer.active().clone() {
            ActiveItem::Idle => {
                println!("{{\"type\": \"nothing_to_complete\"}}");
            }
            ActiveItem::Task { task_id } => {
                let events = app.timer.complete_task(&mut app.plan, &task_id, now);
                print_events(&events)?;
            }
            ActiveItem::Event { event_id } => {
                let events = app.timer.complete_event(&mut app.plan, &event_id, now);
                print_events(&events)?;
            }
        },
    }

    app.save()?;
    Ok(())
}
