//! Background Tasks Module
//!
//! Contains background tasks that maintain a ring cache periodically.
//!
//! # Tasks
//! - Sweep: Evicts expired entries and enforces shard capacity at configured intervals

mod sweep;

pub use sweep::spawn_sweep_task;
