use crate::granule::Granule;
use crate::prelude::CoreResult;
use serde::{Deserialize, Serialize};

/// One row of the per-year position cache: where and when a scene was taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub year: i32,
    pub day: u32,
    pub granule: u32,
    pub lat: f64,
    pub lon: f64,
    #[serde(rename = "GCA")]
    pub gca: f64,
    #[serde(alias = "hdf_filename")]
    pub scene_ref: String,
}

impl PositionRecord {
    pub fn granule(&self) -> CoreResult<Granule> {
        Granule::new(self.year, self.day, self.granule)
    }

    pub fn date_value(&self) -> i64 {
        self.year as i64 * 1_000 + self.day as i64
    }
}

/// Centroid and illumination metadata a listing exposes for each scene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SceneMetadata {
    pub granule: u32,
    pub lat: f64,
    pub lon: f64,
    pub gca: f64,
}
