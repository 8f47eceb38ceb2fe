//! Event accumulator — buffering, escaping, truncation, and the
//! timer-driven auto-flush that closes idle events.

mod actor;
mod buffer;
pub mod clock;
pub mod config;

pub use actor::Event;
pub use clock::{Clock, SystemClock};
pub use config::{ConfigError, EventConfig};
