use chrono::{Datelike, Duration, NaiveDate};

/// A contiguous, inclusive run of days processed and written together.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateBatch {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateBatch {
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Splits `[start, end]` into batches.
///
/// `num_batches == 0` gives one batch per calendar month. Otherwise each
/// batch spans `days / num_batches` days and the first batch absorbs the
/// remainder.
pub fn plan_batches(start: NaiveDate, end: NaiveDate, num_batches: u32) -> Vec<DateBatch> {
    if end < start {
        return Vec::new();
    }
    if num_batches == 0 {
        return monthly_batches(start, end);
    }

    let total_days = (end - start).num_days() + 1;
    let per_batch = (total_days / num_batches as i64).max(1);
    let mut batches = Vec::new();
    let mut accounted = 0;
    while accounted < total_days {
        let mut span = (total_days - accounted) % per_batch;
        if span == 0 {
            span = per_batch;
        }
        let batch_start = start + Duration::days(accounted);
        batches.push(DateBatch {
            start: batch_start,
            end: batch_start + Duration::days(span - 1),
        });
        accounted += span;
    }
    batches
}

fn monthly_batches(start: NaiveDate, end: NaiveDate) -> Vec<DateBatch> {
    let mut batches = Vec::new();
    let mut batch_start = start;
    while batch_start <= end {
        let month_end = last_day_of_month(batch_start);
        let batch_end = month_end.min(end);
        batches.push(DateBatch {
            start: batch_start,
            end: batch_end,
        });
        match batch_end.succ_opt() {
            Some(next) => batch_start = next,
            None => break,
        }
    }
    batches
}

fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.pred_opt())
        .unwrap_or(date)
}
