use crate::geo::normalize_longitude;
use crate::processing::scene::ScanTable;
use crate::prelude::{CHANNELS, FOOTPRINTS, FOOTPRINT_COLUMNS};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Deterministic full-size scenes for unit tests.
///
/// Radiances are whole numbers so sums stay exact in any order.
pub(crate) struct SceneBuilder {
    rng: StdRng,
    center: (f64, f64),
    missing_ratio: f64,
}

impl SceneBuilder {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            center: (5.0, 10.0),
            missing_ratio: 0.02,
        }
    }

    pub fn centered_at(mut self, lat: f64, lon: f64) -> Self {
        self.center = (lat, lon);
        self
    }

    pub fn build(mut self) -> ScanTable {
        let (lat0, lon0) = self.center;
        let latitude = Array1::from_shape_fn(FOOTPRINTS, |f| {
            let row = (f / FOOTPRINT_COLUMNS) as f64;
            (lat0 + (row - 22.0) * 0.3).clamp(-90.0, 90.0)
        });
        let longitude = Array1::from_shape_fn(FOOTPRINTS, |f| {
            let column = (f % FOOTPRINT_COLUMNS) as f64;
            normalize_longitude(lon0 + (column - 14.5) * 0.5)
        });
        let scan_angle = Array1::from_shape_fn(FOOTPRINTS, |f| {
            ((f % FOOTPRINT_COLUMNS) as f64 - 14.5) * 3.3
        });

        let rng = &mut self.rng;
        let solar_zenith = Array1::from_shape_fn(FOOTPRINTS, |_| rng.gen_range(0.0..180.0));
        let land_fraction = Array1::from_shape_fn(FOOTPRINTS, |_| rng.gen_range(0.0..1.0));
        let cloud_cover = Array1::from_shape_fn(FOOTPRINTS, |_| rng.gen_range(0.0..1.0));
        let all_spots = Array1::from_shape_fn(FOOTPRINTS, |_| rng.gen_range(0.0..1.0));
        let dust_flag = Array1::from_shape_fn(FOOTPRINTS, |_| rng.gen_range(-1..=1));
        let noise_amplitude = Array1::from_shape_fn(FOOTPRINTS, |_| {
            if rng.gen_bool(0.5) {
                0.33335
            } else {
                rng.gen_range(0.2..0.5)
            }
        });
        let timestamp = Array1::from_shape_fn(FOOTPRINTS, |f| 7.0e8 + f as f64 * 0.2);

        let missing_ratio = self.missing_ratio;
        let radiances = Array2::from_shape_fn((FOOTPRINTS, CHANNELS), |_| {
            if rng.gen_bool(missing_ratio) {
                f32::NAN
            } else {
                rng.gen_range(0..100) as f32
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
}
