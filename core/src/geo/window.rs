use crate::prelude::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};

/// Tolerance for the expansion span invariants.
const SPAN_EPSILON: f64 = 1e-9;

/// Maps longitude arithmetic results back into `[-180, 180]`.
///
/// Exact ±180 is preserved so that `150 + 30` stays on the antimeridian.
pub fn normalize_longitude(longitude: f64) -> f64 {
    if longitude < -180.0 {
        longitude.rem_euclid(180.0)
    } else if longitude > 180.0 {
        -180.0 + longitude.rem_euclid(180.0)
    } else {
        longitude
    }
}

pub fn clamp_latitude(latitude: f64) -> f64 {
    latitude.clamp(-90.0, 90.0)
}

/// A latitude band and longitude slice of the globe.
///
/// The longitude slice is `[min_lon, max_lon)` when that naive slice agrees
/// with `include_prime_meridian`, and its complement
/// (`lon < min_lon || lon >= max_lon`) otherwise. Flipping
/// `include_prime_meridian` therefore always selects the complementary slice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WindowBounds")]
pub struct GeoWindow {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
    pub include_prime_meridian: bool,
}

/// Raw, unvalidated window bounds as they appear in configuration.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct WindowBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
    pub include_prime_meridian: bool,
}

impl TryFrom<WindowBounds> for GeoWindow {
    type Error = CoreError;

    fn try_from(bounds: WindowBounds) -> CoreResult<Self> {
        GeoWindow::new(
            bounds.min_lat,
            bounds.max_lat,
            bounds.min_lon,
            bounds.max_lon,
            bounds.include_prime_meridian,
        )
    }
}

/// Result of widening a window's longitude slice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Expansion {
    pub window: GeoWindow,
    pub span: f64,
}

impl Expansion {
    pub fn now_includes_prime_meridian(&self) -> bool {
        self.window.include_prime_meridian
    }
}

impl GeoWindow {
    /// Validates the bounds. A window given with `min_lon > max_lon` is read
    /// as crossing the antimeridian and stored as the complement of the
    /// swapped slice.
    pub fn new(
        min_lat: f64,
        max_lat: f64,
        min_lon: f64,
        max_lon: f64,
        include_prime_meridian: bool,
    ) -> CoreResult<Self> {
        let finite = [min_lat, max_lat, min_lon, max_lon]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(CoreError::Validation("window bounds must be finite".into()));
        }
        if !(-90.0..=90.0).contains(&min_lat) || !(-90.0..=90.0).contains(&max_lat) {
            return Err(CoreError::Validation(format!(
                "latitude bounds [{min_lat}, {max_lat}] outside [-90, 90]"
            )));
        }
        if min_lat > max_lat {
            return Err(CoreError::Validation(format!(
                "min latitude {min_lat} exceeds max latitude {max_lat}"
            )));
        }
        if !(-180.0..=180.0).contains(&min_lon) || !(-180.0..=180.0).contains(&max_lon) {
            return Err(CoreError::Validation(format!(
                "longitude bounds [{min_lon}, {max_lon}] outside [-180, 180]"
            )));
        }

        if min_lon > max_lon {
            let (min_lon, max_lon) = (max_lon, min_lon);
            let include_prime_meridian = !naively_contains_zero(min_lon, max_lon);
            return Ok(Self {
                min_lat,
                max_lat,
                min_lon,
                max_lon,
                include_prime_meridian,
            });
        }

        Ok(Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
            include_prime_meridian,
        })
    }

    pub fn whole_globe() -> Self {
        Self {
            min_lat: -90.0,
            max_lat: 90.0,
            min_lon: -180.0,
            max_lon: 180.0,
            include_prime_meridian: true,
        }
    }

    /// Same latitude band, different longitude slice.
    fn with_longitudes(&self, min_lon: f64, max_lon: f64, include_prime_meridian: bool) -> Self {
        Self {
            min_lon,
            max_lon,
            include_prime_meridian,
            ..*self
        }
    }

    /// Whether the slice is the complement of `[min_lon, max_lon)`.
    pub fn is_complement(&self) -> bool {
        naively_contains_zero(self.min_lon, self.max_lon) != self.include_prime_meridian
    }

    pub fn includes_antimeridian(&self) -> bool {
        self.min_lon.abs() == 180.0 || self.max_lon.abs() == 180.0 || self.is_complement()
    }

    /// Longitude extent of the slice in degrees, in `[0, 360]`.
    pub fn angular_span(&self) -> f64 {
        let direct = self.max_lon - self.min_lon;
        if self.is_complement() {
            360.0 - direct
        } else {
            direct
        }
    }

    pub fn contains_latitude(&self, latitude: f64) -> bool {
        latitude >= self.min_lat && latitude < self.max_lat
    }

    pub fn contains_longitude(&self, longitude: f64) -> bool {
        if self.angular_span() >= 360.0 {
            return (-180.0..=180.0).contains(&longitude);
        }
        if self.is_complement() {
            longitude < self.min_lon || longitude >= self.max_lon
        } else {
            longitude >= self.min_lon && longitude < self.max_lon
        }
    }

    pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
        self.contains_latitude(latitude) && self.contains_longitude(longitude)
    }

    /// Widens the longitude slice by `degrees` on both sides.
    ///
    /// The slice is treated as an eastward arc from `start` to `end`; both
    /// ends move outwards and the window flags are rebuilt from the new ends.
    pub fn expand(&self, degrees: f64) -> CoreResult<Expansion> {
        if !degrees.is_finite() || degrees < 0.0 {
            return Err(CoreError::Validation(format!(
                "expansion must be a non-negative number of degrees [{degrees} passed]"
            )));
        }

        let original_span = self.angular_span();
        let expected_span = original_span + 2.0 * degrees;
        if expected_span >= 360.0 {
            let globe = self.with_longitudes(-180.0, 180.0, true);
            return Ok(Expansion {
                window: globe,
                span: 360.0,
            });
        }

        let (start, end) = if self.is_complement() {
            (self.max_lon, self.min_lon)
        } else {
            (self.min_lon, self.max_lon)
        };
        let start = normalize_longitude(start - degrees);
        let end = normalize_longitude(end + degrees);

        let window = if start <= end {
            self.with_longitudes(start, end, naively_contains_zero(start, end))
        } else {
            self.with_longitudes(end, start, !naively_contains_zero(end, start))
        };

        let span = window.angular_span();
        if span + SPAN_EPSILON < original_span {
            return Err(CoreError::Validation(format!(
                "expanding {self:?} by {degrees} shrank the span from {original_span} to {span}"
            )));
        }
        if (span - expected_span.min(360.0)).abs() > SPAN_EPSILON {
            return Err(CoreError::Validation(format!(
                "expanding {self:?} by {degrees} produced span {span}, expected {expected_span}"
            )));
        }

        Ok(Expansion { window, span })
    }
}

fn naively_contains_zero(min_lon: f64, max_lon: f64) -> bool {
    min_lon <= 0.0 && 0.0 <= max_lon
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lon_window(min_lon: f64, max_lon: f64, pm: bool) -> GeoWindow {
        GeoWindow::new(-90.0, 90.0, min_lon, max_lon, pm).unwrap()
    }

    #[test]
    fn normalizes_longitude_arithmetic() {
        let cases = [
            (10.0, -10.0, 0.0),
            (0.0, -10.0, -10.0),
            (150.0, 30.0, 180.0),
            (150.0, 40.0, -170.0),
            (-30.0, 40.0, 10.0),
            (-150.0, -30.0, -180.0),
            (-150.0, -40.0, 170.0),
        ];
        for (a, b, expected) in cases {
            assert_eq!(normalize_longitude(a + b), expected, "{a} + {b}");
        }
    }

    #[test]
    fn detects_antimeridian_crossing() {
        let cases = [
            (0.0, 180.0, true, true),
            (-170.0, 170.0, false, true),
            (-179.0, 179.0, true, false),
            (-10.0, 10.0, true, false),
            (-170.0, -10.0, true, true),
            (-180.0, -10.0, true, true),
            (-180.0, -10.0, false, true),
        ];
        for (min, max, pm, expected) in cases {
            assert_eq!(
                lon_window(min, max, pm).includes_antimeridian(),
                expected,
                "({min}, {max}, {pm})"
            );
        }
    }

    #[test]
    fn measures_angular_span() {
        let cases = [
            (0.0, 10.0, true, 10.0),
            (-10.0, 10.0, true, 20.0),
            (-180.0, 180.0, true, 360.0),
            (-180.0, 180.0, false, 0.0),
            (-180.0, -10.0, true, 190.0),
            (-180.0, -10.0, false, 170.0),
            (-180.0, -0.001, true, 180.001),
            (-180.0, -0.001, false, 179.999),
        ];
        for (min, max, pm, expected) in cases {
            let span = lon_window(min, max, pm).angular_span();
            assert!((span - expected).abs() < 1e-9, "({min}, {max}, {pm}) -> {span}");
        }
    }

    #[test]
    fn expands_reference_windows() {
        let cases = [
            ((0.0, 10.0, true), 10.0, (-10.0, 20.0, true, 30.0)),
            ((20.0, 40.0, false), 10.0, (10.0, 50.0, false, 40.0)),
            ((20.0, 60.0, false), 30.0, (-10.0, 90.0, true, 100.0)),
            ((-50.0, -10.0, false), 10.0, (-60.0, 0.0, true, 60.0)),
            ((-180.0, -170.0, false), 20.0, (-150.0, 160.0, false, 50.0)),
        ];
        for ((min, max, pm), degrees, expected) in cases {
            let expansion = lon_window(min, max, pm).expand(degrees).unwrap();
            let got = (
                expansion.window.min_lon,
                expansion.window.max_lon,
                expansion.now_includes_prime_meridian(),
                expansion.span,
            );
            assert_eq!(got, expected, "({min}, {max}, {pm}) + {degrees}");
        }
    }

    #[test]
    fn expansion_saturates_to_whole_globe() {
        let expansion = lon_window(-170.0, 170.0, true).expand(10.0).unwrap();
        assert_eq!(expansion.span, 360.0);
        assert_eq!(expansion.window.min_lon, -180.0);
        assert_eq!(expansion.window.max_lon, 180.0);
        assert!(expansion.now_includes_prime_meridian());
        assert!(expansion.window.contains_longitude(180.0));
        assert!(expansion.window.contains_longitude(-180.0));
    }

    #[test]
    fn expansion_never_shrinks_across_a_sweep() {
        let bounds = [-180.0, -135.0, -90.0, -45.0, -10.0, 0.0, 10.0, 45.0, 90.0, 135.0, 180.0];
        for &min in &bounds {
            for &max in &bounds {
                if min > max {
                    continue;
                }
                for pm in [true, false] {
                    let window = lon_window(min, max, pm);
                    for degrees in [0.0, 1.0, 10.0, 25.0, 45.0, 90.0] {
                        let expansion = window.expand(degrees).unwrap();
                        assert!(expansion.span + 1e-9 >= window.angular_span());
                        let expected = (window.angular_span() + 2.0 * degrees).min(360.0);
                        assert!((expansion.span - expected).abs() < 1e-9);
                    }
                }
            }
        }
    }

    #[test]
    fn zero_expansion_preserves_membership() {
        let windows = [
            lon_window(-50.0, 40.0, true),
            lon_window(20.0, 60.0, false),
            lon_window(-170.0, 170.0, false),
            lon_window(-170.0, -10.0, true),
        ];
        for window in windows {
            let same = window.expand(0.0).unwrap().window;
            let mut lon = -180.0;
            while lon <= 180.0 {
                for lat in [-85.0, -30.0, 0.0, 45.0, 89.0] {
                    assert_eq!(window.contains(lat, lon), same.contains(lat, lon));
                }
                lon += 2.5;
            }
        }
    }

    #[test]
    fn reversed_longitudes_select_the_antimeridian_band() {
        let window = GeoWindow::new(-10.0, 10.0, 170.0, -170.0, true).unwrap();
        assert!(window.includes_antimeridian());
        assert!(window.contains(0.0, 175.0));
        assert!(window.contains(0.0, 170.0));
        assert!(window.contains(0.0, -175.0));
        assert!(!window.contains(0.0, -170.0));
        assert!(!window.contains(0.0, 0.0));
        assert!((window.angular_span() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn membership_is_half_open() {
        let window = GeoWindow::new(-10.0, 10.0, -20.0, 20.0, true).unwrap();
        assert!(window.contains(-10.0, -20.0));
        assert!(!window.contains(10.0, 0.0));
        assert!(!window.contains(0.0, 20.0));

        let complement = GeoWindow::new(-10.0, 10.0, -20.0, 20.0, false).unwrap();
        assert!(complement.contains(0.0, 20.0));
        assert!(!complement.contains(0.0, -20.0));
        assert!(complement.contains(0.0, -20.5));
    }

    #[test]
    fn rejects_invalid_bounds() {
        assert!(GeoWindow::new(10.0, -10.0, 0.0, 1.0, true).is_err());
        assert!(GeoWindow::new(-91.0, 0.0, 0.0, 1.0, true).is_err());
        assert!(GeoWindow::new(0.0, 1.0, 0.0, 181.0, true).is_err());
        assert!(lon_window(0.0, 10.0, true).expand(-1.0).is_err());
    }

    #[test]
    fn deserializes_through_validation() {
        let window: GeoWindow = serde_json::from_str(
            r#"{"min_lat": -5, "max_lat": 5, "min_lon": 170, "max_lon": -170, "include_prime_meridian": true}"#,
        )
        .unwrap();
        assert_eq!((window.min_lon, window.max_lon), (-170.0, 170.0));
        assert!(!window.include_prime_meridian);

        let invalid: Result<GeoWindow, _> = serde_json::from_str(
            r#"{"min_lat": 50, "max_lat": 5, "min_lon": 0, "max_lon": 1, "include_prime_meridian": true}"#,
        );
        assert!(invalid.is_err());
    }
}
