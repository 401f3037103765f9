use chrono::{DateTime, Local, NaiveDate, Utc};

/// Source of "now" for the engine. Injected so tests can simulate day
/// rollovers deterministically instead of sleeping across midnight.
pub trait Clock: Send + Sync {
    /// Current local calendar date. Day boundaries follow the server's
    /// timezone, matching how the mobile client displays streaks.
    fn today(&self) -> NaiveDate;

    /// Current instant, used for created_at/updated_at stamps.
    fn now(&self) -> DateTime<Utc>;
}

/// The real wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
