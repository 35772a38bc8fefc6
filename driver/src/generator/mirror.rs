use crate::workflow::config::WorkflowConfig;
use crate::workflow::mirror::{scene_name, LocalMirror, MirrorMeta};
use anyhow::Context;
use chrono::{Datelike, Duration, NaiveDate};
use ndarray::{Array1, Array2};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use soundercore::geo::{central_angle, normalize_longitude};
use soundercore::granule::Granule;
use soundercore::interface::PositionRecord;
use soundercore::index::PositionCache;
use soundercore::prelude::{CHANNELS, FOOTPRINTS, FOOTPRINT_COLUMNS};
use soundercore::processing::{JsonSceneCodec, ScanTable};
use std::f64::consts::PI;
use std::fs;

/// Scan windows in one orbit of the synthetic track.
const GRANULES_PER_ORBIT: f64 = 16.5;

/// Configuration for generating a synthetic mirror.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub scenes_per_day: u32,
    pub missing_ratio: f64,
    pub radiance_scale: f32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            scenes_per_day: 4,
            missing_ratio: 0.01,
            radiance_scale: 120.0,
        }
    }
}

/// What a synthesis run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisSummary {
    pub scenes: usize,
    pub years: Vec<i32>,
}

/// Centroid of the synthetic sun-synchronous track at `granule`.
fn track_position(granule: &Granule) -> (f64, f64) {
    let orbit_phase = 2.0 * PI * granule.index() as f64 / GRANULES_PER_ORBIT;
    let lat = 80.0 * orbit_phase.sin();
    let hours = granule.index() as f64 * 0.1;
    let lon = normalize_longitude(180.0 - hours * 15.0 + 2.0 * granule.day() as f64);
    (lat, lon)
}

/// Approximate sub-solar point at the start of `granule`.
fn subsolar_point(granule: &Granule) -> (f64, f64) {
    let season = 2.0 * PI * (granule.day() as f64 - 81.0) / 365.0;
    let hours = (granule.index() as f64 - 1.0) * 0.1;
    (23.44 * season.sin(), normalize_longitude(-15.0 * (hours - 12.0)))
}

fn synthetic_table(rng: &mut StdRng, config: &GeneratorConfig, lat0: f64, lon0: f64) -> ScanTable {
    let latitude = Array1::from_shape_fn(FOOTPRINTS, |f| {
        let row = (f / FOOTPRINT_COLUMNS) as f64;
        (lat0 + (row - 22.0) * 0.3).clamp(-90.0, 90.0)
    });
    let longitude = Array1::from_shape_fn(FOOTPRINTS, |f| {
        let column = (f % FOOTPRINT_COLUMNS) as f64;
        normalize_longitude(lon0 + (column - 14.5) * 0.5)
    });
    let scan_angle =
        Array1::from_shape_fn(FOOTPRINTS, |f| ((f % FOOTPRINT_COLUMNS) as f64 - 14.5) * 3.3);
    let solar_zenith = Array1::from_shape_fn(FOOTPRINTS, |_| rng.gen_range(0.0..180.0));
    let land_fraction = Array1::from_shape_fn(FOOTPRINTS, |_| rng.gen_range(0.0..1.0));
    let cloud_cover = Array1::from_shape_fn(FOOTPRINTS, |_| rng.gen_range(0.0..1.0));
    let all_spots = Array1::from_shape_fn(FOOTPRINTS, |_| rng.gen_range(0.0..1.0));
    let dust_flag = Array1::from_shape_fn(FOOTPRINTS, |_| rng.gen_range(-1..=1));
    let noise_amplitude = Array1::from_shape_fn(FOOTPRINTS, |_| rng.gen_range(0.3..0.4));
    let timestamp = Array1::from_shape_fn(FOOTPRINTS, |f| 7.0e8 + f as f64 * 0.27);
    let radiances = Array2::from_shape_fn((FOOTPRINTS, CHANNELS), |(_, channel)| {
        if rng.gen_bool(config.missing_ratio) {
            f32::NAN
        } else {
            let shape = 1.0 + (channel as f32 / CHANNELS as f32 * 6.0).sin() * 0.5;
            (config.radiance_scale * shape * rng.gen_range(0.9..1.1)).round()
        }
    });
    let quality = Array2::from_shape_fn((FOOTPRINTS, CHANNELS), |_| rng.gen_range(0..=2));

    ScanTable {
        radiances,
        quality,
        latitude,
        longitude,
        scan_angle,
        solar_zenith,
        land_fraction,
        cloud_cover,
        all_spots,
        dust_flag,
        noise_amplitude,
        timestamp,
    }
}

fn day_granules(date: NaiveDate, scenes_per_day: u32) -> anyhow::Result<Vec<Granule>> {
    let count = scenes_per_day.clamp(1, 240);
    let step = 240 / count;
    (0..count)
        .map(|n| Granule::on_date(date, 1 + n * step).context("building synthetic granule"))
        .collect()
}

/// Writes scenes, sidecars and position tables covering the configured date
/// range. The same seed always produces the same mirror.
pub fn synthesize(config: &WorkflowConfig, seed: u64) -> anyhow::Result<SynthesisSummary> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mirror = LocalMirror::new(&config.directories.mirror);
    let positions = PositionCache::new(&config.directories.positions);
    let mut tables: Vec<(i32, Vec<PositionRecord>)> = Vec::new();
    let mut scenes = 0;

    let mut date = config.date_range.start;
    while date <= config.date_range.end {
        for granule in day_granules(date, config.generator.scenes_per_day)? {
            let (lat, lon) = track_position(&granule);
            let (sun_lat, sun_lon) = subsolar_point(&granule);
            let gca = central_angle(lat, lon, sun_lat, sun_lon);

            let path = mirror.scene_path(&granule);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating mirror directory {}", parent.display()))?;
            }
            let table = synthetic_table(&mut rng, &config.generator, lat, lon);
            JsonSceneCodec
                .write(&path, &table)
                .with_context(|| format!("writing synthetic scene {}", path.display()))?;
            let meta_path = LocalMirror::meta_path(&path);
            fs::write(&meta_path, serde_json::to_vec(&MirrorMeta { lat, lon, gca })?)
                .with_context(|| format!("writing {}", meta_path.display()))?;

            let record = PositionRecord {
                year: granule.year(),
                day: granule.day(),
                granule: granule.index(),
                lat,
                lon,
                gca,
                scene_ref: scene_name(&granule),
            };
            match tables.iter_mut().find(|(year, _)| *year == granule.year()) {
                Some((_, records)) => records.push(record),
                None => tables.push((granule.year(), vec![record])),
            }
            scenes += 1;
        }
        date = date
            .checked_add_signed(Duration::days(1))
            .context("date range runs past the calendar")?;
    }

    for (year, records) in &tables {
        positions
            .write_year(*year, records)
            .with_context(|| format!("writing synthetic positions for {year}"))?;
    }
    log::info!("synthesized {scenes} scenes into {}", config.directories.mirror.display());
    Ok(SynthesisSummary {
        scenes,
        years: tables.iter().map(|(year, _)| *year).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn granules_are_spread_over_the_day() {
        let date = NaiveDate::from_ymd_opt(2016, 1, 1).unwrap();
        let indices: Vec<u32> = day_granules(date, 4)
            .unwrap()
            .iter()
            .map(Granule::index)
            .collect();
        assert_eq!(indices, vec![1, 61, 121, 181]);
        assert_eq!(day_granules(date, 0).unwrap().len(), 1);
    }

    #[test]
    fn track_stays_on_the_globe() {
        for index in 1..=240 {
            let granule = Granule::new(2016, 100, index).unwrap();
            let (lat, lon) = track_position(&granule);
            assert!((-80.0..=80.0).contains(&lat));
            assert!((-180.0..=180.0).contains(&lon));
            let (sun_lat, _) = subsolar_point(&granule);
            assert!(sun_lat.abs() <= 23.44);
        }
    }

    #[test]
    fn synthetic_tables_are_seeded() {
        let config = GeneratorConfig::default();
        let a = synthetic_table(&mut StdRng::seed_from_u64(3), &config, 10.0, 20.0);
        let b = synthetic_table(&mut StdRng::seed_from_u64(3), &config, 10.0, 20.0);
        assert_eq!(a.cloud_cover, b.cloud_cover);
        assert_eq!(a.quality, b.quality);
    }
}
