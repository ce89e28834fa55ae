//! Notification engine: reminder policy, subscriber resolution and delivery.

mod dispatcher;
mod mailer;
pub mod policy;
mod resolver;

pub use dispatcher::*;
pub use mailer::*;
pub use resolver::*;
