use super::stages::Stage;
use serde::Serialize;
use std::ops::AddAssign;

/// Channel-value cells removed by each filter stage.
///
/// `scanned` counts every non-missing cell of the scene; `total` is what is
/// left once the spatial pre-filter has run, and every later stage only
/// records cells it newly excludes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AttritionCounts {
    pub scanned: u64,
    pub spatial: u64,
    pub land_fraction: u64,
    pub cloud_cover: u64,
    pub all_spots: u64,
    pub noise_amplitude: u64,
    pub scan_angle: u64,
    pub dust: u64,
    pub solar_zenith: u64,
    pub quality: u64,
}

impl AttritionCounts {
    pub fn record(&mut self, stage: Stage, cells: u64) {
        *self.slot(stage) += cells;
    }

    pub fn excluded(&self, stage: Stage) -> u64 {
        match stage {
            Stage::Spatial => self.spatial,
            Stage::LandFraction => self.land_fraction,
            Stage::CloudCover => self.cloud_cover,
            Stage::AllSpots => self.all_spots,
            Stage::NoiseAmplitude => self.noise_amplitude,
            Stage::ScanAngle => self.scan_angle,
            Stage::Dust => self.dust,
            Stage::SolarZenith => self.solar_zenith,
            Stage::Quality => self.quality,
        }
    }

    fn slot(&mut self, stage: Stage) -> &mut u64 {
        match stage {
            Stage::Spatial => &mut self.spatial,
            Stage::LandFraction => &mut self.land_fraction,
            Stage::CloudCover => &mut self.cloud_cover,
            Stage::AllSpots => &mut self.all_spots,
            Stage::NoiseAmplitude => &mut self.noise_amplitude,
            Stage::ScanAngle => &mut self.scan_angle,
            Stage::Dust => &mut self.dust,
            Stage::SolarZenith => &mut self.solar_zenith,
            Stage::Quality => &mut self.quality,
        }
    }

    /// Cells inside the requested window.
    pub fn total(&self) -> u64 {
        self.scanned - self.spatial
    }

    /// Cells removed after the spatial pre-filter.
    pub fn filtered(&self) -> u64 {
        Stage::ALL
            .iter()
            .filter(|stage| **stage != Stage::Spatial)
            .map(|stage| self.excluded(*stage))
            .sum()
    }

    pub fn surviving(&self) -> u64 {
        self.total() - self.filtered()
    }
}

impl AddAssign<&AttritionCounts> for AttritionCounts {
    fn add_assign(&mut self, other: &AttritionCounts) {
        self.scanned += other.scanned;
        for stage in Stage::ALL {
            self.record(stage, other.excluded(stage));
        }
    }
}
