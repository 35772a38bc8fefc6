use super::criteria::{DustFlags, FilterCriteria, ScanAngleLimit, Threshold};
use super::scene::ScanTable;
use crate::geo::GeoWindow;
use crate::prelude::FootprintStage;
use ndarray::Array1;
use serde::Serialize;
use std::fmt;

/// Open band of noise amplitudes that mark a clean retrieval.
pub const NOISE_AMPLITUDE_BAND: (f64, f64) = (0.3333, 0.3334);

/// Filter stages in the order they are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Stage {
    Spatial,
    LandFraction,
    CloudCover,
    AllSpots,
    NoiseAmplitude,
    ScanAngle,
    Dust,
    SolarZenith,
    Quality,
}

impl Stage {
    pub const ALL: [Stage; 9] = [
        Stage::Spatial,
        Stage::LandFraction,
        Stage::CloudCover,
        Stage::AllSpots,
        Stage::NoiseAmplitude,
        Stage::ScanAngle,
        Stage::Dust,
        Stage::SolarZenith,
        Stage::Quality,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Stage::Spatial => "Outside area",
            Stage::LandFraction => "Land",
            Stage::CloudCover => "Cloud",
            Stage::AllSpots => "All spots",
            Stage::NoiseAmplitude => "Noise amplitude",
            Stage::ScanAngle => "Scan angle",
            Stage::Dust => "Dust",
            Stage::SolarZenith => "Solar zenith",
            Stage::Quality => "Quality",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub struct SpatialStage {
    window: GeoWindow,
}

impl FootprintStage for SpatialStage {
    fn stage(&self) -> Stage {
        Stage::Spatial
    }

    fn admits(&self, scene: &ScanTable, footprint: usize) -> bool {
        self.window
            .contains(scene.latitude[footprint], scene.longitude[footprint])
    }
}

/// Inclusive max/min bound on one per-footprint field.
pub struct ThresholdStage {
    stage: Stage,
    threshold: Threshold,
    field: fn(&ScanTable) -> &Array1<f64>,
}

impl FootprintStage for ThresholdStage {
    fn stage(&self) -> Stage {
        self.stage
    }

    fn admits(&self, scene: &ScanTable, footprint: usize) -> bool {
        self.threshold.admits((self.field)(scene)[footprint])
    }
}

pub struct NoiseAmplitudeStage;

impl FootprintStage for NoiseAmplitudeStage {
    fn stage(&self) -> Stage {
        Stage::NoiseAmplitude
    }

    fn admits(&self, scene: &ScanTable, footprint: usize) -> bool {
        let amplitude = scene.noise_amplitude[footprint];
        amplitude > NOISE_AMPLITUDE_BAND.0 && amplitude < NOISE_AMPLITUDE_BAND.1
    }
}

pub struct ScanAngleStage(ScanAngleLimit);

impl FootprintStage for ScanAngleStage {
    fn stage(&self) -> Stage {
        Stage::ScanAngle
    }

    fn admits(&self, scene: &ScanTable, footprint: usize) -> bool {
        self.0.admits(scene.scan_angle[footprint])
    }
}

pub struct DustStage(DustFlags);

impl FootprintStage for DustStage {
    fn stage(&self) -> Stage {
        Stage::Dust
    }

    fn admits(&self, scene: &ScanTable, footprint: usize) -> bool {
        self.0.admits(scene.dust_flag[footprint])
    }
}

fn land_fraction(scene: &ScanTable) -> &Array1<f64> {
    &scene.land_fraction
}

fn cloud_cover(scene: &ScanTable) -> &Array1<f64> {
    &scene.cloud_cover
}

fn all_spots(scene: &ScanTable) -> &Array1<f64> {
    &scene.all_spots
}

fn solar_zenith(scene: &ScanTable) -> &Array1<f64> {
    &scene.solar_zenith
}

/// The footprint-level chain for `criteria`, spatial pre-filter first.
///
/// Quality is checked per channel after bucketing and is not part of it.
pub fn footprint_stages(criteria: &FilterCriteria) -> Vec<Box<dyn FootprintStage>> {
    let mut stages: Vec<Box<dyn FootprintStage>> = vec![
        Box::new(SpatialStage {
            window: criteria.window,
        }),
        Box::new(ThresholdStage {
            stage: Stage::LandFraction,
            threshold: criteria.land_fraction,
            field: land_fraction,
        }),
        Box::new(ThresholdStage {
            stage: Stage::CloudCover,
            threshold: criteria.cloud_cover,
            field: cloud_cover,
        }),
        Box::new(ThresholdStage {
            stage: Stage::AllSpots,
            threshold: criteria.all_spots,
            field: all_spots,
        }),
    ];
    if criteria.noise_amplitude {
        stages.push(Box::new(NoiseAmplitudeStage));
    }
    stages.push(Box::new(ScanAngleStage(criteria.scan_angle)));
    stages.push(Box::new(DustStage(criteria.dust)));
    stages.push(Box::new(ThresholdStage {
        stage: Stage::SolarZenith,
        threshold: criteria.solar_zenith,
        field: solar_zenith,
    }));
    stages
}
