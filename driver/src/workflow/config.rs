use crate::generator::mirror::GeneratorConfig;
use anyhow::{ensure, Context};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use soundercore::fetch::RetryPolicy;
use soundercore::geo::GeoWindow;
use soundercore::processing::FilterCriteria;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Directories {
    /// Local scene cache.
    pub data: PathBuf,
    pub output: PathBuf,
    pub positions: PathBuf,
    pub mirror: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Daily time-of-day window, applied to every day of the date range.
///
/// An end earlier than the start selects the night between them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    #[serde(with = "clock_time")]
    pub start: NaiveTime,
    #[serde(with = "clock_time")]
    pub end: NaiveTime,
}

impl Default for TimeRange {
    fn default() -> Self {
        Self {
            start: NaiveTime::default(),
            // 23:59:59 would fall in the first window of the next day.
            end: NaiveTime::from_hms_opt(23, 59, 0).unwrap_or_default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolSizes {
    pub network: usize,
    pub filtering: usize,
}

impl Default for PoolSizes {
    fn default() -> Self {
        Self {
            network: 5,
            filtering: 10,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkflowConfig {
    pub directories: Directories,
    pub date_range: DateRange,
    #[serde(default)]
    pub time_range: TimeRange,
    pub region: GeoWindow,
    #[serde(default)]
    pub minimum_gca: f64,
    #[serde(default)]
    pub filters: FilterCriteria,
    #[serde(default)]
    pub pools: PoolSizes,
    #[serde(default)]
    pub retry: RetryPolicy,
    /// 0 splits the run by calendar month.
    #[serde(default)]
    pub num_batches: u32,
    #[serde(default)]
    pub min_scene_bytes: u64,
    #[serde(default)]
    pub generator: GeneratorConfig,
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.date_range.start <= self.date_range.end,
            "date range ends ({}) before it starts ({})",
            self.date_range.end,
            self.date_range.start
        );
        self.validate_region()?;
        self.criteria()
            .validate()
            .context("validating filter criteria")?;
        Ok(())
    }

    /// A zero longitude bound leaves the hemisphere ambiguous.
    fn validate_region(&self) -> anyhow::Result<()> {
        let region = &self.region;
        if region.min_lon != 0.0 && region.max_lon != 0.0 {
            return Ok(());
        }
        let nudge = |offset: f64| (region.min_lon + offset, region.max_lon + offset);
        let span = |(min_lon, max_lon): (f64, f64), include_prime_meridian: bool| {
            GeoWindow::new(
                region.min_lat,
                region.max_lat,
                min_lon,
                max_lon,
                include_prime_meridian,
            )
            .map(|w| format!("{:.3}", w.angular_span()))
            .unwrap_or_else(|_| "invalid".to_string())
        };
        let (west, east) = (nudge(0.001), nudge(-0.001));
        anyhow::bail!(
            "hemisphere selection is ambiguous: minimum or maximum longitude cannot be 0. \
             Use 0.001 or -0.001 instead and double check include_prime_meridian:\n\
             \x20 0.001 and include_prime_meridian = false: {} degree slice\n\
             \x20-0.001 and include_prime_meridian = false: {} degree slice\n\
             \x20 0.001 and include_prime_meridian = true:  {} degree slice\n\
             \x20-0.001 and include_prime_meridian = true:  {} degree slice",
            span(west, false),
            span(east, false),
            span(west, true),
            span(east, true)
        )
    }

    /// Filters with the configured region as their spatial window.
    pub fn criteria(&self) -> FilterCriteria {
        FilterCriteria {
            window: self.region,
            ..self.filters.clone()
        }
    }

    pub fn interval(&self, start: NaiveDate, end: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
        (
            start.and_time(self.time_range.start),
            end.and_time(self.time_range.end),
        )
    }
}

pub fn parse_clock_time(text: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(text, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
        .map_err(|_| format!("invalid time of day {text:?}, expected HH:MM or HH:MM:SS"))
}

mod clock_time {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M:%S").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::parse_clock_time(&text).map_err(serde::de::Error::custom)
    }
}
