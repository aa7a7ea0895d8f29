//! # Dayflow Core Library
//!
//! This library provides the core business logic for Dayflow, a single-user
//! day planner that mixes fluid tasks (a planned duration, no fixed clock
//! time) with pinned events (a fixed start time). All operations are
//! available via a standalone CLI binary; any GUI is a thin layer over the
//! same core library.
//!
//! ## Architecture
//!
//! - **Scheduling engine**: a pure function laying tasks into the gaps
//!   between events, fragmenting across them and applying the
//!   "too small to start" guardrail
//! - **Timeline compositor**: extends the engine with completed work at its
//!   actual times and the currently running fragment split around upcoming
//!   events
//! - **Execution timer**: a wall-clock-based state machine that requires
//!   the caller to periodically invoke `tick()`; auto-pauses a task when an
//!   event starts and chains back-to-back events closed
//! - **Storage**: SQLite key-value persistence and TOML-based configuration
//!
//! ## Key Components
//!
//! - [`DayPlan`]: root aggregate of one day's tasks and events
//! - [`compute_timeline`] / [`compute_full_timeline`]: timeline projections
//! - [`ExecutionTimer`]: execution/interruption state machine
//! - [`Database`] / [`PlanStore`]: persistence
//! - [`Config`]: application configuration

pub mod error;
pub mod events;
pub mod plan;
pub mod storage;
pub mod timeline;
pub mod timer;

pub use error::{ConfigError, CoreError, StorageError, ValidationError};
pub use events::TimerEvent;
pub use plan::{DayPlan, Event, FragmentRecord, Task};
pub use storage::{Config, Database, PlanStore};
pub use timeline::{compute_full_timeline, compute_timeline, TimelineSlot};
pub use timer::{ActiveItem, ExecutionTimer, SavedProgress};
