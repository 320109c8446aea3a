use chrono::{DateTime, Local, NaiveDateTime, Utc};

/// Time source for status derivation. Trip times are local wall-clock times.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    /// Timestamp for audit fields (created/edited/cancelled at)
    fn timestamp(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Clock pinned to one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: NaiveDateTime,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self { now }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.now
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.now.and_utc()
    }
}
