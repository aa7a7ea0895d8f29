use chrono::Utc;
use clap::Subcommand;
use dayflow_core::Event;

use crate::common::{parse_today_time, print_events, print_json, App};

#[derive(Subcommand)]
pub enum EventAction {
    /// Add a pinned event
    Add {
        /// Event title
        title: String,
        /// Start time today, HH:MM local
        #[arg(long)]
        at: String,
        /// Planned duration in minutes
        #[arg(long, default_value = "30")]
        minutes: i64,
    },
    /// List all events as JSON
    List,
    /// Mark an event completed
    Done {
        /// Event id
        id: String,
    },
    /// Remove an event
    Remove {
        /// Event id
        id: String,
    },
}

pub fn run(action: EventAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = App::load()?;
    print_events(&app.notices)?;
    let now = Utc::now();

    match action {
        EventAction::Add { title, at, minutes } => {
            let start_time = parse_today_time(&at)?;
            let event = Event::new(title, start_time, minutes * 60);
            let snapshot = event.clone();
            app.plan.add_event(event);
            print_json(&snapshot)?;
        }
        EventAction::List => {
            print_json(&app.plan.events)?;
        }
        EventAction::Done { id } => {
            let events = app.timer.complete_event(&mut app.plan, &id, now);
            if app.plan.event(&id).is_none() {
                return Err(format!("no event with id '{id}'").into());
            }
            print_events(&events)?;
        }
        EventAction::Remove { id } => {
            if !app.plan.remove_event(&id) {
                return Err(format!("no event with id '{id}'").into());
            }
            let events: Vec<_> = app
                .timer
                .resync_first_pending(&app.plan, now)
                .into_iter()
                .collect();
            print_events(&events)?;
        }
    }

    app.save()?;
    Ok(())
}
