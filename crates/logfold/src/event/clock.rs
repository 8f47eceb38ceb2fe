//! Injectable time source for timestamp fields.

use chrono::{DateTime, Utc};

/// Source of "now" for the optional timestamp field, so tests can
/// supply a deterministic clock.
pub trait Clock: Send + 'static {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
