use chrono::Utc;
use clap::Subcommand;
use dayflow_core::{compute_full_timeline, compute_timeline};

use crate::common::{print_events, print_json, App};

#[derive(Subcommand)]
pub enum TimelineAction {
    /// Forward-looking layout of pending work from now
    Show,
    /// Full timeline: history, the live fragment, and pending work
    Full,
}

pub fn run(action: TimelineAction) -> Result<(), Box<dyn std::error::Error>> {
    let app = App::load()?;
    print_events(&app.notices)?;
    let now = Utc::now();

    match action {
        TimelineAction::Show => {
            let slots = compute_timeline(&app.plan, now);
            print_json(&slots)?;
        }
        TimelineAction::Full => {
            let slots = compute_full_timeline(&app.plan, &app.timer, now);
            print_json(&slots)?;
        }
    }

    // Reconciliation during load may have mutated plan or timer.
    app.save()?;
    Ok(())
}
