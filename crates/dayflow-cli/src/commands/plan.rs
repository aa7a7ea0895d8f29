use chrono::Local;
use clap::Subcommand;
use dayflow_core::{DayPlan, ExecutionTimer, PlanStore};

use crate::common::{print_json, App};

#[derive(Subcommand)]
pub enum PlanAction {
    /// Print today's plan as JSON
    Show,
    /// Print yesterday's archived plan, if any
    Yesterday,
    /// Discard today's plan and start empty
    Clear,
}

pub fn run(action: PlanAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = App::load()?;

    match action {
        PlanAction::Show => {
            print_json(&app.plan)?;
            app.save()?;
        }
        PlanAction::Yesterday => {
            let store = PlanStore::new(&app.db);
            match store.load_yesterday()? {
                Some(plan) => print_json(&plan)?,
                None => println!("{{\"type\": \"no_yesterday_plan\"}}"),
            }
        }
        PlanAction::Clear => {
            let mut fresh = DayPlan::new(Local::now().date_naive());
            fresh.minimum_fragment_minutes = app.config.minimum_fragment_minutes;
            app.plan = fresh;
            app.timer = ExecutionTimer::new();
            app.save()?;
            print_json(&app.plan)?;
        }
    }

    Ok(())
}
