use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::aggregation::AggregateError;

/// Half-open read window `[start, end)` for one calendar day.
///
/// The end is fixed when the window is built; every metric read of one
/// aggregation shares it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    date: NaiveDate,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DayWindow {
    pub fn new(
        date: NaiveDate,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Self, AggregateError> {
        if end < start {
            return Err(AggregateError::InvalidWindow { start, end });
        }
        Ok(Self { date, start, end })
    }

    /// Local midnight (in `offset`) up to `now`.
    pub fn today(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        let date = now.with_timezone(&offset).date_naive();
        Self {
            date,
            start: local_midnight(date, offset),
            end: now,
        }
    }

    /// The whole local day `date`, midnight to the next midnight.
    pub fn full_day(date: NaiveDate, offset: FixedOffset) -> Self {
        let start = local_midnight(date, offset);
        Self {
            date,
            start,
            end: start + Duration::days(1),
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }
}

fn local_midnight(date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    Utc.from_utc_datetime(&(midnight - Duration::seconds(i64::from(offset.local_minus_utc()))))
}
