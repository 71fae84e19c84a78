//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Expiration sweep: evicts expired cache entries every tick

mod sweeper;

pub use sweeper::{spawn_sweeper, sweep_once};
