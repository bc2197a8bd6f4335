use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Source of the facility-local wall clock. All scheduling math runs on
/// naive local datetimes; the offset only matters when reading the system
/// time.
pub trait Clock: Send + Sync {
    fn now(&self) -> PrimitiveDateTime;
}

#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    offset: UtcOffset,
}

impl SystemClock {
    pub fn new(offset: UtcOffset) -> Self {
        Self { offset }
    }

    /// Builds a clock from a signed minute offset, falling back to UTC when
    /// the offset is out of range.
    pub fn from_offset_minutes(minutes: i16) -> Self {
        let offset =
            UtcOffset::from_whole_seconds(i32::from(minutes) * 60).unwrap_or(UtcOffset::UTC);
        Self { offset }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> PrimitiveDateTime {
        let now = OffsetDateTime::now_utc().to_offset(self.offset);
        PrimitiveDateTime::new(now.date(), now.time())
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FixedClock {
    now: PrimitiveDateTime,
}

impl FixedClock {
    pub fn new(now: PrimitiveDateTime) -> Self {
        Self { now }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> PrimitiveDateTime {
        self.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn fixed_clock_returns_configured_time() {
        let clock = FixedClock::new(datetime!(2026-03-02 09:30));
        assert_eq!(clock.now(), datetime!(2026-03-02 09:30));
        assert_eq!(clock.now(), clock.now());
    }
}
