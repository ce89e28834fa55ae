//! Data models for the fleet notification service.
//!
//! Serialized field names are camelCase to match the web frontend.

mod document;
mod group;
mod job;
mod notification;

pub use document::*;
pub use group::*;
pub use job::*;
pub use notification::*;
