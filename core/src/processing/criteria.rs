use crate::geo::GeoWindow;
use crate::prelude::{CoreError, CoreResult, CHANNELS};
use serde::{Deserialize, Serialize};

/// Inclusive bound on a per-footprint quantity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub value: f64,
    #[serde(default = "default_true")]
    pub is_max: bool,
}

impl Threshold {
    pub fn maximum(value: f64) -> Self {
        Self {
            value,
            is_max: true,
        }
    }

    pub fn minimum(value: f64) -> Self {
        Self {
            value,
            is_max: false,
        }
    }

    pub fn admits(&self, value: f64) -> bool {
        if self.is_max {
            value <= self.value
        } else {
            value >= self.value
        }
    }
}

/// Scan-angle acceptance: strictly inside `(-limit, limit)`, or at/outside it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanAngleLimit {
    pub limit: f64,
    #[serde(default = "default_true")]
    pub inside: bool,
}

impl ScanAngleLimit {
    pub fn admits(&self, angle: f64) -> bool {
        if self.inside {
            angle > -self.limit && angle < self.limit
        } else {
            angle <= -self.limit || angle >= self.limit
        }
    }
}

/// Enabled subset of the dust flag values `{-1, 0, 1}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DustFlags {
    pub no_dust: bool,
    pub single_fov: bool,
    pub detected: bool,
}

impl DustFlags {
    pub fn admits(&self, flag: i8) -> bool {
        match flag {
            -1 => self.no_dust,
            0 => self.single_fov,
            1 => self.detected,
            _ => false,
        }
    }
}

impl Default for DustFlags {
    fn default() -> Self {
        Self {
            no_dust: true,
            single_fov: true,
            detected: true,
        }
    }
}

/// Enabled subset of the channel QC codes `{0, 1, 2}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityFlags {
    pub best: bool,
    pub enough: bool,
    pub worst: bool,
}

impl QualityFlags {
    pub fn admits(&self, code: i16) -> bool {
        match code {
            0 => self.best,
            1 => self.enough,
            2 => self.worst,
            _ => false,
        }
    }
}

impl Default for QualityFlags {
    fn default() -> Self {
        Self {
            best: true,
            enough: true,
            worst: true,
        }
    }
}

/// Every threshold and flag applied to a scene, from the spatial pre-filter
/// down to the per-channel quality check.
///
/// The defaults let everything through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    pub window: GeoWindow,
    pub land_fraction: Threshold,
    pub cloud_cover: Threshold,
    pub all_spots: Threshold,
    pub noise_amplitude: bool,
    pub scan_angle: ScanAngleLimit,
    pub dust: DustFlags,
    pub solar_zenith: Threshold,
    pub quality: QualityFlags,
    /// Zero-based channel to inspect instead of producing full curves.
    pub inspect_channel: Option<usize>,
    pub delete_unreadable: bool,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            window: GeoWindow::whole_globe(),
            land_fraction: Threshold::maximum(1.0),
            cloud_cover: Threshold::maximum(1.0),
            all_spots: Threshold::maximum(1.0),
            noise_amplitude: false,
            scan_angle: ScanAngleLimit {
                limit: 90.0,
                inside: true,
            },
            dust: DustFlags::default(),
            solar_zenith: Threshold::maximum(180.0),
            quality: QualityFlags::default(),
            inspect_channel: None,
            delete_unreadable: false,
        }
    }
}

impl FilterCriteria {
    pub fn validate(&self) -> CoreResult<()> {
        match self.inspect_channel {
            Some(channel) if channel >= CHANNELS => Err(CoreError::Validation(format!(
                "inspected channel must be below {CHANNELS} [{channel} passed]"
            ))),
            _ => Ok(()),
        }
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_are_inclusive() {
        assert!(Threshold::maximum(0.5).admits(0.5));
        assert!(!Threshold::maximum(0.5).admits(0.51));
        assert!(Threshold::minimum(0.5).admits(0.5));
        assert!(!Threshold::minimum(0.5).admits(0.49));
        assert!(!Threshold::maximum(0.5).admits(f64::NAN));
    }

    #[test]
    fn scan_angle_inside_is_open_outside_is_closed() {
        let inside = ScanAngleLimit {
            limit: 10.0,
            inside: true,
        };
        assert!(inside.admits(9.9) && inside.admits(-9.9));
        assert!(!inside.admits(10.0) && !inside.admits(-10.0));

        let outside = ScanAngleLimit {
            limit: 10.0,
            inside: false,
        };
        assert!(outside.admits(10.0) && outside.admits(-10.0) && outside.admits(40.0));
        assert!(!outside.admits(0.0) && !outside.admits(-9.9));
    }

    #[test]
    fn flag_sets_reject_unknown_codes() {
        let dust = DustFlags {
            no_dust: true,
            single_fov: false,
            detected: true,
        };
        assert!(dust.admits(-1) && dust.admits(1));
        assert!(!dust.admits(0) && !dust.admits(7));

        let quality = QualityFlags {
            worst: false,
            ..Default::default()
        };
        assert!(quality.admits(0) && quality.admits(1));
        assert!(!quality.admits(2) && !quality.admits(-1));
    }

    #[test]
    fn missing_sections_default_to_permissive() {
        let criteria: FilterCriteria =
            serde_json::from_str(r#"{"land_fraction": {"value": 0.1}, "inspect_channel": 1520}"#)
                .unwrap();
        assert_eq!(criteria.land_fraction, Threshold::maximum(0.1));
        assert_eq!(criteria.cloud_cover, Threshold::maximum(1.0));
        assert_eq!(criteria.inspect_channel, Some(1520));
        assert!(criteria.quality.worst);
        assert!(criteria.validate().is_ok());
    }

    #[test]
    fn rejects_channels_past_the_spectrum() {
        let criteria = FilterCriteria {
            inspect_channel: Some(CHANNELS),
            ..Default::default()
        };
        assert!(matches!(criteria.validate(), Err(CoreError::Validation(_))));
    }
}
