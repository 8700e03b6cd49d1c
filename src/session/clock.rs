/// Source of the current time for expiry checks.
pub trait Clock: Send + Sync + 'static {
    /// Current time in Unix seconds.
    fn now(&self) -> i64;
}

/// Wall clock in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        time::OffsetDateTime::now_utc().unix_timestamp()
    }
}
