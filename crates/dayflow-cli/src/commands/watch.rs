//! The live loop: a high-frequency execution tick and a lower-frequency
//! timeline refresh, both cancelled together when the process stops.
//!
//! State is persisted after every tick so the saved wall-clock anchor stays
//! fresh; on the next launch, resume reconciliation replays whatever time
//! passed in between.

use std::time::Duration;

use chrono::Utc;
use dayflow_core::compute_full_timeline;

use crate::common::{print_events, print_json, App};

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(watch_loop())
}

async fn watch_loop() -> Result<(), Box<dyn std::error::Error>> {
    let mut app = App::load()?;
    print_events(&app.notices)?;

    let mut tick = tokio::time::interval(Duration::from_millis(app.config.tick_interval_ms.max(100)));
    let mut refresh =
        tokio::time::interval(Duration::from_secs(app.config.timeline_refresh_secs.max(1)));

    loop {
        tokio::select! {
            _ = tick.tick() => {
                let now = Utc::now();
                let events = app.timer.tick(&mut app.plan, now);
                print_events(&events)?;
                app.save()?;
            }
            _ = refresh.tick() => {
                let now = Utc::now();
                let slots = compute_full_timeline(&app.plan, &app.timer, now);
                print_json(&slots)?;
            }
            _ = tokio::signal::ctrl_c() => {
                app.save()?;
                break;
            }
        }
    }

    Ok(())
}
