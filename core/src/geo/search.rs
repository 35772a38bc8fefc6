use super::window::{clamp_latitude, GeoWindow};
use crate::prelude::CoreResult;

/// Extra latitude tolerated on both sides of the requested band.
pub const SEARCH_LATITUDE_MARGIN: f64 = 10.0;
/// At and beyond this absolute latitude every longitude is searched.
pub const FULL_LONGITUDE_LATITUDE: f64 = 80.0;

/// Longitude widening applied inside one absolute-latitude band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchTier {
    pub min_abs_lat: f64,
    pub max_abs_lat: f64,
    pub expansion: f64,
}

impl SearchTier {
    fn applies_to(&self, latitude: f64) -> bool {
        let abs_lat = latitude.abs();
        abs_lat >= self.min_abs_lat && abs_lat < self.max_abs_lat
    }
}

/// Meridians converge towards the poles, so scene centroids drift further in
/// longitude from the footprints they cover.
pub const SEARCH_TIERS: [SearchTier; 4] = [
    SearchTier {
        min_abs_lat: 0.0,
        max_abs_lat: 60.0,
        expansion: 0.0,
    },
    SearchTier {
        min_abs_lat: 0.0,
        max_abs_lat: 60.0,
        expansion: 10.0,
    },
    SearchTier {
        min_abs_lat: 60.0,
        max_abs_lat: 70.0,
        expansion: 25.0,
    },
    SearchTier {
        min_abs_lat: 70.0,
        max_abs_lat: 80.0,
        expansion: 45.0,
    },
];

/// Coarse pre-selection area built around a requested window.
///
/// Used to pick scenes by their centroid before any scene file is read, so it
/// errs on the side of including too much.
#[derive(Debug, Clone)]
pub struct SearchArea {
    min_lat: f64,
    max_lat: f64,
    tiers: Vec<(SearchTier, GeoWindow)>,
}

impl SearchArea {
    pub fn new(window: &GeoWindow) -> CoreResult<Self> {
        let tiers = SEARCH_TIERS
            .iter()
            .map(|tier| Ok((*tier, window.expand(tier.expansion)?.window)))
            .collect::<CoreResult<Vec<_>>>()?;

        Ok(Self {
            min_lat: clamp_latitude(window.min_lat - SEARCH_LATITUDE_MARGIN),
            max_lat: clamp_latitude(window.max_lat + SEARCH_LATITUDE_MARGIN),
            tiers,
        })
    }

    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        if !(latitude >= self.min_lat && latitude < self.max_lat) {
            return false;
        }
        if latitude.abs() >= FULL_LONGITUDE_LATITUDE {
            return true;
        }
        self.tiers
            .iter()
            .any(|(tier, expanded)| tier.applies_to(latitude) && expanded.contains_longitude(longitude))
    }
}

/// One-shot form of [`SearchArea::contains`].
pub fn search_membership(window: &GeoWindow, latitude: f64, longitude: f64) -> CoreResult<bool> {
    Ok(SearchArea::new(window)?.contains(latitude, longitude))
}
