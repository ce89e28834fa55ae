//! Periodic jobs.

mod expiry;
mod scheduler;

pub use expiry::*;
pub use scheduler::*;
