use super::Granule;
use crate::prelude::{CoreError, CoreResult, GRANULES_PER_DAY};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

/// Seconds the instrument's scan windows lag behind midnight.
pub const INSTRUMENT_LAG_SECONDS: u32 = 38;
/// Length of one scan window.
pub const GRANULE_PERIOD_SECONDS: u32 = 360;

/// Maps wall-clock time (UTC) onto scan-window indices.
///
/// Window `n` of day `D` covers `[(n-1)·360 - 38, n·360 - 38)` seconds after
/// midnight, so window 1 starts at 23:59:22 of the previous day.
pub struct GranuleClock;

impl GranuleClock {
    /// Returns the window index covering `time_of_day` and whether that
    /// window belongs to the following calendar day.
    ///
    /// A time exactly on a window boundary belongs to the window it opens
    /// when it starts a range and to the window it closes when it ends one.
    pub fn time_to_index(time_of_day: NaiveTime, is_range_start: bool) -> (u32, bool) {
        let seconds = time_of_day.num_seconds_from_midnight() + INSTRUMENT_LAG_SECONDS;
        let quotient = seconds / GRANULE_PERIOD_SECONDS;
        let remainder = seconds % GRANULE_PERIOD_SECONDS;

        let mut index = quotient;
        if (is_range_start && remainder == 0) || remainder > 0 {
            index += 1;
        }

        if index > GRANULES_PER_DAY {
            (index - GRANULES_PER_DAY, true)
        } else {
            (index, false)
        }
    }

    /// The granule covering a single range boundary.
    pub fn granule_at(moment: NaiveDateTime, is_range_start: bool) -> CoreResult<Granule> {
        let (index, crosses_midnight) = Self::time_to_index(moment.time(), is_range_start);
        let date = if crosses_midnight {
            next_day(moment.date())?
        } else {
            moment.date()
        };
        Granule::on_date(date, index)
    }

    /// First and last granules covering the interval `[start, end]`.
    ///
    /// An end earlier than the start (a night window applied to a single
    /// day) is not rejected: the end granule then has the smaller index and
    /// callers read the pair as a band wrapping past index 240.
    pub fn granule_range_for_interval(
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> CoreResult<(Granule, Granule)> {
        Ok((Self::granule_at(start, true)?, Self::granule_at(end, false)?))
    }

    /// Every granule from `start` to `end`, both inclusive.
    pub fn enumerate(start: Granule, end: Granule) -> CoreResult<Vec<Granule>> {
        let mut granules = Vec::new();
        let mut current = start;
        while current <= end {
            granules.push(current);
            current = current.add(1)?;
        }
        Ok(granules)
    }
}

fn next_day(date: NaiveDate) -> CoreResult<NaiveDate> {
    date.checked_add_signed(Duration::days(1))
        .ok_or_else(|| CoreError::Validation(format!("no calendar day after {date}")))
}
