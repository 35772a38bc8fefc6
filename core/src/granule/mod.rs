//! Scan-window identifiers and the periodic clock that maps time onto them.

pub mod clock;

pub use clock::GranuleClock;

use crate::prelude::{CoreError, CoreResult, GRANULES_PER_DAY};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// One ~6-minute scan window: `(year, day of year, index 1..=240)`.
#[derive(Debug, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(try_from = "GranuleParts", into = "GranuleParts")]
pub struct Granule {
    date: NaiveDate,
    index: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct GranuleParts {
    year: i32,
    day: u32,
    index: u32,
}

impl TryFrom<GranuleParts> for Granule {
    type Error = CoreError;

    fn try_from(parts: GranuleParts) -> CoreResult<Self> {
        Granule::new(parts.year, parts.day, parts.index)
    }
}

impl From<Granule> for GranuleParts {
    fn from(granule: Granule) -> Self {
        Self {
            year: granule.year(),
            day: granule.day(),
            index: granule.index,
        }
    }
}

impl Granule {
    pub fn new(year: i32, day: u32, index: u32) -> CoreResult<Self> {
        let date = NaiveDate::from_yo_opt(year, day).ok_or_else(|| {
            CoreError::Validation(format!("day {day} does not exist in year {year}"))
        })?;
        Self::on_date(date, index)
    }

    pub fn on_date(date: NaiveDate, index: u32) -> CoreResult<Self> {
        if !(1..=GRANULES_PER_DAY).contains(&index) {
            return Err(CoreError::Validation(format!(
                "granule index must be between 1 and {GRANULES_PER_DAY} [{index} passed]"
            )));
        }
        Ok(Self { date, index })
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn day(&self) -> u32 {
        self.date.ordinal()
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// `year·10⁶ + day·10³ + index`, the total order over granules.
    pub fn encoded(&self) -> i64 {
        self.year() as i64 * 1_000_000 + self.day() as i64 * 1_000 + self.index as i64
    }

    /// `year·1000 + day`, comparable against position-table rows.
    pub fn date_value(&self) -> i64 {
        self.year() as i64 * 1_000 + self.day() as i64
    }

    pub fn period(&self) -> Period {
        Period {
            year: self.year(),
            month: self.date.month(),
        }
    }

    /// Moves `count` scan windows forward (or backward when negative).
    ///
    /// A remainder of zero lands on index 240 of the previous day.
    pub fn add(&self, count: i64) -> CoreResult<Granule> {
        let per_day = GRANULES_PER_DAY as i64;
        let total = self.index as i64 + count;
        let mut days = total.div_euclid(per_day);
        let mut index = total.rem_euclid(per_day);
        if index == 0 {
            days -= 1;
            index = per_day;
        }
        let date = self
            .date
            .checked_add_signed(Duration::days(days))
            .ok_or_else(|| {
                CoreError::Validation(format!("{self} + {count} leaves the calendar range"))
            })?;
        Granule::on_date(date, index as u32)
    }
}

impl PartialEq for Granule {
    fn eq(&self, other: &Self) -> bool {
        self.encoded() == other.encoded()
    }
}

impl Eq for Granule {}

impl PartialOrd for Granule {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Granule {
    fn cmp(&self, other: &Self) -> Ordering {
        self.encoded().cmp(&other.encoded())
    }
}

impl fmt::Display for Granule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Granule<{}, {:03}, {:03}>",
            self.year(),
            self.day(),
            self.index
        )
    }
}

/// Coarse time-period label: one calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{}", self.month, self.year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_parts() {
        assert!(Granule::new(2016, 1, 0).is_err());
        assert!(Granule::new(2016, 1, 241).is_err());
        assert!(Granule::new(2015, 366, 1).is_err());
        assert!(Granule::new(2016, 366, 1).is_ok());
    }

    #[test]
    fn ordering_follows_year_day_index() {
        let a = Granule::new(2015, 365, 240).unwrap();
        let b = Granule::new(2016, 1, 1).unwrap();
        let c = Granule::new(2016, 1, 2).unwrap();
        let d = Granule::new(2016, 2, 1).unwrap();
        assert!(a < b && b < c && c < d);
        assert_eq!(b, Granule::new(2016, 1, 1).unwrap());
        assert_eq!(b.encoded(), 2_016_001_001);
    }

    #[test]
    fn adding_a_full_day_keeps_the_index() {
        let g = Granule::new(2016, 100, 5).unwrap();
        let next = g.add(240).unwrap();
        assert_eq!((next.year(), next.day(), next.index()), (2016, 101, 5));

        let last = Granule::new(2016, 100, 240).unwrap();
        let next = last.add(240).unwrap();
        assert_eq!((next.year(), next.day(), next.index()), (2016, 101, 240));
    }

    #[test]
    fn zero_remainder_maps_to_last_index_of_previous_day() {
        let g = Granule::new(2016, 10, 200).unwrap();
        let moved = g.add(40).unwrap();
        assert_eq!((moved.day(), moved.index()), (10, 240));
        let moved = g.add(41).unwrap();
        assert_eq!((moved.day(), moved.index()), (11, 1));
    }

    #[test]
    fn rollover_respects_leap_years() {
        let leap = Granule::new(2016, 366, 240).unwrap().add(1).unwrap();
        assert_eq!((leap.year(), leap.day(), leap.index()), (2017, 1, 1));

        let plain = Granule::new(2015, 365, 239).unwrap().add(2).unwrap();
        assert_eq!((plain.year(), plain.day(), plain.index()), (2016, 1, 1));
    }

    #[test]
    fn negative_steps_move_backwards() {
        let g = Granule::new(2016, 1, 1).unwrap().add(-1).unwrap();
        assert_eq!((g.year(), g.day(), g.index()), (2015, 365, 240));
    }

    #[test]
    fn period_and_display() {
        let g = Granule::new(2016, 60, 7).unwrap();
        assert_eq!(g.period().to_string(), "02-2016");
        assert_eq!(g.to_string(), "Granule<2016, 060, 007>");
        assert_eq!(g.date_value(), 2_016_060);
    }
}
