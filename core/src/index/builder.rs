use super::positions::PositionCache;
use crate::fetch::RetryPolicy;
use crate::interface::{PositionRecord, SceneMetadata};
use crate::pool::WorkerPool;
use crate::prelude::{CoreError, CoreResult};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;

/// Remote listing the position cache is rebuilt from.
pub trait ListingSource: Send + Sync {
    fn list_days(&self, year: i32) -> CoreResult<Vec<u32>>;
    fn list_scenes(&self, year: i32, day: u32) -> CoreResult<Vec<String>>;
    fn describe(&self, year: i32, day: u32, scene_ref: &str) -> CoreResult<SceneMetadata>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct YearBuild {
    pub year: i32,
    pub path: PathBuf,
    pub records: usize,
    pub incomplete: Vec<String>,
}

/// Rebuilds per-year position tables in three barrier-separated phases:
/// list days, list scenes per day, describe every scene.
pub struct PositionCacheBuilder {
    cache: PositionCache,
    source: Arc<dyn ListingSource>,
    policy: RetryPolicy,
}

struct DayListing {
    year: i32,
    day: u32,
    scenes: Vec<String>,
}

struct DayDescription {
    year: i32,
    day: u32,
    records: Vec<PositionRecord>,
    incomplete: Option<String>,
}

fn day_unit(year: i32, day: u32) -> String {
    format!("{year}-{day:03}")
}

impl PositionCacheBuilder {
    pub fn new(cache: PositionCache, source: Arc<dyn ListingSource>, policy: RetryPolicy) -> Self {
        Self {
            cache,
            source,
            policy,
        }
    }

    pub fn build_years(&self, years: Vec<i32>, pool: &WorkerPool) -> CoreResult<Vec<YearBuild>> {
        let source = self.source.clone();
        let policy = self.policy;
        let listed_days = pool.run_all(years.clone(), move |year| {
            let days = policy.run(&year.to_string(), |_| source.list_days(year));
            (year, days)
        })?;

        let mut builds: Vec<YearBuild> = years
            .iter()
            .map(|&year| YearBuild {
                year,
                path: self.cache.csv_path(year),
                records: 0,
                incomplete: Vec::new(),
            })
            .collect();

        let mut day_jobs = Vec::new();
        for (year, days) in listed_days {
            match self.settle(year.to_string(), days)? {
                Some(days) => day_jobs.extend(days.into_iter().map(|day| (year, day))),
                None => record_incomplete(&mut builds, year, year.to_string()),
            }
        }

        let source = self.source.clone();
        let listed_scenes = pool.run_all(day_jobs, move |(year, day)| {
            let scenes = policy.run(&day_unit(year, day), |_| source.list_scenes(year, day));
            (year, day, scenes)
        })?;

        let mut listings = Vec::new();
        for (year, day, scenes) in listed_scenes {
            match self.settle(day_unit(year, day), scenes)? {
                Some(scenes) => listings.push(DayListing { year, day, scenes }),
                None => record_incomplete(&mut builds, year, day_unit(year, day)),
            }
        }

        let source = self.source.clone();
        let described = pool.run_all(listings, move |listing| {
            describe_day(source.as_ref(), &policy, listing)
        })?;

        let mut tables: Vec<(i32, Vec<PositionRecord>)> =
            years.iter().map(|&year| (year, Vec::new())).collect();
        for day in described {
            let day = day?;
            if let Some(reason) = &day.incomplete {
                let unit = day_unit(day.year, day.day);
                self.cache.mark_incomplete(&unit, reason)?;
                record_incomplete(&mut builds, day.year, unit);
            }
            if let Some((_, records)) = tables.iter_mut().find(|(year, _)| *year == day.year) {
                records.extend(day.records);
            }
        }

        for ((year, mut records), build) in tables.into_iter().zip(builds.iter_mut()) {
            records.sort_by(|a, b| {
                (a.day, a.granule, &a.scene_ref).cmp(&(b.day, b.granule, &b.scene_ref))
            });
            build.path = self.cache.write_year(year, &records)?;
            build.records = records.len();
            info!(
                "wrote {} positions for {year}, {} units incomplete",
                build.records,
                build.incomplete.len()
            );
        }
        Ok(builds)
    }

    /// Passes values through; turns an exhausted retry into a marker.
    fn settle<T>(&self, unit: String, result: CoreResult<T>) -> CoreResult<Option<T>> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(CoreError::Incomplete { last_error, .. }) => {
                warn!("{unit}: listing incomplete ({last_error})");
                self.cache.mark_incomplete(&unit, &last_error)?;
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

fn record_incomplete(builds: &mut [YearBuild], year: i32, unit: String) {
    if let Some(build) = builds.iter_mut().find(|build| build.year == year) {
        build.incomplete.push(unit);
    }
}

/// Describes every scene of a day, retrying only the scenes still missing.
fn describe_day(
    source: &dyn ListingSource,
    policy: &RetryPolicy,
    listing: DayListing,
) -> CoreResult<DayDescription> {
    let DayListing { year, day, scenes } = listing;
    let mut records = Vec::with_capacity(scenes.len());
    let mut pending = scenes;

    let outcome = policy.run(&day_unit(year, day), |_| {
        let mut failed = Vec::new();
        let mut last_error = None;
        for scene_ref in pending.drain(..) {
            match source.describe(year, day, &scene_ref) {
                Ok(meta) => records.push(PositionRecord {
                    year,
                    day,
                    granule: meta.granule,
                    lat: meta.lat,
                    lon: meta.lon,
                    gca: meta.gca,
                    scene_ref,
                }),
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    last_error = Some(err.to_string());
                    failed.push(scene_ref);
                }
            }
        }
        pending = failed;
        match last_error {
            None => Ok(()),
            Some(err) => Err(CoreError::Network(format!(
                "{} scenes undescribed, last error: {err}",
                pending.len()
            ))),
        }
    });

    let incomplete = match outcome {
        Ok(()) => None,
        Err(CoreError::Incomplete { last_error, .. }) => Some(last_error),
        Err(err) => return Err(err),
    };
    Ok(DayDescription {
        year,
        day,
        records,
        incomplete,
    })
}
