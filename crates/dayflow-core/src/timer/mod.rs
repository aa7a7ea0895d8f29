//! Execution/interruption state machine.
//!
//! Owns "what is being timed right now", driven by a caller-supplied tick.

mod engine;

pub use engine::{ActiveItem, ExecutionTimer, SavedProgress, START_TOLERANCE_MS};
