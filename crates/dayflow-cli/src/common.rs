//! Shared load/save plumbing for CLI commands.
//!
//! Every invocation loads the plan (rolling it over when the stored date is
//! stale) and the timer snapshot, reconciles suspended time, runs the
//! command, and persists both back.

use chrono::{DateTime, Local, Utc};
use dayflow_core::{Config, Database, DayPlan, ExecutionTimer, PlanStore, TimerEvent};

pub struct App {
    pub db: Database,
    pub config: Config,
    pub plan: DayPlan,
    pub timer: ExecutionTimer,
    /// Events produced by resume reconciliation, for the command to print.
    pub notices: Vec<TimerEvent>,
}

impl App {
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let db = Database::open()?;
        let config = Config::load()?;
        let store = PlanStore::new(&db);
        let mut plan = store.load_plan(Local::now().date_naive())?;
        // The config owns the guardrail threshold; the plan field exists so
        // the projections stay pure over a single value.
        plan.minimum_fragment_minutes = config.minimum_fragment_minutes;
        let mut timer = store.load_timer()?;
        let notices = timer.reconcile(&mut plan, Utc::now());
        Ok(Self {
            db,
            config,
            plan,
            timer,
            notices,
        })
    }

    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let store = PlanStore::new(&self.db);
        store.save_plan(&self.plan)?;
        store.save_timer(&self.timer)?;
        Ok(())
    }
}

/// Print timer events as pretty JSON, one document per event.
pub fn print_events(events: &[TimerEvent]) -> Result<(), Box<dyn std::error::Error>> {
    for event in events {
        println!("{}", serde_json::to_string_pretty(event)?);
    }
    Ok(())
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Parse an `HH:MM` wall-clock time as a UTC timestamp on today's date.
pub fn parse_today_time(hhmm: &str) -> Result<DateTime<Utc>, Box<dyn std::error::Error>> {
    let time = chrono::NaiveTime::parse_from_str(hhmm, "%H:%M")
        .map_err(|_| format!("invalid time '{hhmm}', expected HH:MM"))?;
    let local = Local::now()
        .date_naive()
        .and_time(time)
        .and_local_timezone(Local)
        .single()
        .ok_or_else(|| format!("ambiguous local time '{hhmm}'"))?;
    Ok(local.with_timezone(&Utc))
}
