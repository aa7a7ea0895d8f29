//! Persistence of the day plan and the execution-timer snapshot.
//!
//! At most two plans exist: today's (read/write) and yesterday's (read-only,
//! kept for reference). Rollover is lazy: when the stored plan's date is no
//! longer today, it is archived as yesterday -- overwriting any prior
//! yesterday -- and a fresh empty plan is returned. Anything older is
//! discarded. Stale or unparseable stored values fall back to defaults;
//! they are never a hard error.

use chrono::NaiveDate;

use crate::error::StorageError;
use crate::plan::DayPlan;
use crate::timer::ExecutionTimer;

use super::Database;

const PLAN_KEY: &str = "day_plan";
const PLAN_YESTERDAY_KEY: &str = "day_plan_yesterday";
const TIMER_KEY: &str = "exec_timer";

/// Load/save of the serialized `DayPlan` and `ExecutionTimer`.
pub struct PlanStore<'a> {
    db: &'a Database,
}

impl<'a> PlanStore<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Load today's plan, rolling the stored plan over to "yesterday" when
    /// its date is no longer `today`.
    pub fn load_plan(&self, today: NaiveDate) -> Result<DayPlan, StorageError> {
        let Some(json) = self.db.kv_get(PLAN_KEY)? else {
            return Ok(DayPlan::new(today));
        };
        let Ok(plan) = serde_json::from_str::<DayPlan>(&json) else {
            return Ok(DayPlan::new(today));
        };
        if plan.date == today {
            return Ok(plan);
        }
        // Archive and start fresh. The timer snapshot refers to the archived
        // plan's items; drop it so resume cannot target stale ids.
        self.db.kv_set(PLAN_YESTERDAY_KEY, &json)?;
        self.db.kv_delete(TIMER_KEY)?;
        let fresh = DayPlan::new(today);
        self.save_plan(&fresh)?;
        Ok(fresh)
    }

    pub fn save_plan(&self, plan: &DayPlan) -> Result<(), StorageError> {
        let json = serde_json::to_string(plan).map_err(|e| StorageError::EncodeFailed {
            key: PLAN_KEY.into(),
            message: e.to_string(),
        })?;
        self.db.kv_set(PLAN_KEY, &json)
    }

    /// Yesterday's archived plan, if one exists.
    pub fn load_yesterday(&self) -> Result<Option<DayPlan>, StorageError> {
        let Some(json) = self.db.kv_get(PLAN_YESTERDAY_KEY)? else {
            return Ok(None);
        };
        Ok(serde_json::from_str(&json).ok())
    }

    /// Load the execution-timer snapshot, falling back to an idle timer.
    pub fn load_timer(&self) -> Result<ExecutionTimer, StorageError> {
        let Some(json) = self.db.kv_get(TIMER_KEY)? else {
            return Ok(ExecutionTimer::new());
        };
        Ok(serde_json::from_str(&json).unwrap_or_else(|_| ExecutionTimer::new()))
    }

    pub fn save_timer(&self, timer: &ExecutionTimer) -> Result<(), StorageError> {
        let json = serde_json::to_string(timer).map_err(|e| StorageError::EncodeFailed {
            key: TIMER_KEY.into(),
            message: e.to_string(),
        })?;
        self.db.kv_set(TIMER_KEY, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::Task;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn absent_plan_falls_back_to_fresh() {
        let db = Database::open_memory().unwrap();
        let store = PlanStore::new(&db);
        let plan = store.load_plan(day(2024, 6, 3)).unwrap();
        assert_eq!(plan.date, day(2024, 6, 3));
        assert!(plan.tasks.is_empty());
    }

    #[test]
    fn unparseable_plan_falls_back_to_fresh() {
        let db = Database::open_memory().unwrap();
        db.kv_set("day_plan", "not json").unwrap();
        let store = PlanStore::new(&db);
        let plan = store.load_plan(day(2024, 6, 3)).unwrap();
        assert!(plan.tasks.is_empty());
    }

    #[test]
    fn same_day_plan_loads_unchanged() {
        let db = Database::open_memory().unwrap();
        let store = PlanStore::new(&db);
        let mut plan = DayPlan::new(day(2024, 6, 3));
        plan.add_task(Task::new("write report", 3600));
        store.save_plan(&plan).unwrap();

        let loaded = store.load_plan(day(2024, 6, 3)).unwrap();
        assert_eq!(loaded, plan);
    }

    #[test]
    fn stale_plan_archives_as_yesterday() {
        let db = Database::open_memory().unwrap();
        let store = PlanStore::new(&db);
        let mut old = DayPlan::new(day(2024, 6, 2));
        old.add_task(Task::new("old work", 600));
        store.save_plan(&old).unwrap();

        let fresh = store.load_plan(day(2024, 6, 3)).unwrap();
        assert_eq!(fresh.date, day(2024, 6, 3));
        assert!(fresh.tasks.is_empty());

        let yesterday = store.load_yesterday().unwrap().unwrap();
        assert_eq!(yesterday, old);
    }

    #[test]
    fn rollover_overwrites_prior_yesterday_and_drops_timer() {
        let db = Database::open_memory().unwrap();
        let store = PlanStore::new(&db);

        let oldest = DayPlan::new(day(2024, 6, 1));
        store.save_plan(&oldest).unwrap();
        store.load_plan(day(2024, 6, 2)).unwrap();

        let mut old = DayPlan::new(day(2024, 6, 2));
        old.add_task(Task::new("old work", 600));
        store.save_plan(&old).unwrap();
        store.save_timer(&ExecutionTimer::new()).unwrap();

        store.load_plan(day(2024, 6, 3)).unwrap();
        // June 1 is gone; June 2 is yesterday; the timer snapshot is reset.
        let yesterday = store.load_yesterday().unwrap().unwrap();
        assert_eq!(yesterday.date, day(2024, 6, 2));
        assert!(db.kv_get("exec_timer").unwrap().is_none());
    }

    #[test]
    fn absent_timer_falls_back_to_idle() {
        let db = Database::open_memory().unwrap();
        let store = PlanStore::new(&db);
        let timer = store.load_timer().unwrap();
        assert!(timer.active().is_idle());
    }
}
