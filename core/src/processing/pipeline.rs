use super::attrition::AttritionCounts;
use super::bucket::{LatitudeBucket, PerBucket, BUCKET_COUNT};
use super::criteria::FilterCriteria;
use super::scene::{SceneReader, ScanTable};
use super::stages::{footprint_stages, Stage};
use crate::granule::Granule;
use crate::interface::inspection::{instrument_time, InspectionRecord};
use crate::prelude::{CoreResult, FootprintStage, CHANNELS, FOOTPRINTS};
use log::{debug, warn};
use ndarray::Array2;
use std::fs;
use std::path::PathBuf;

/// Where a scene is in the filter chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenePhase {
    Loaded,
    PreFiltered,
    Thresholded,
    Bucketed,
    QualityFiltered,
    Reduced,
    Unreadable,
}

/// A scene waiting to be filtered.
#[derive(Debug, Clone)]
pub struct SceneTask {
    pub scene_ref: String,
    pub granule: Granule,
    pub path: PathBuf,
}

/// Per-bucket radiance sums and counts over every channel.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketSums {
    pub sums: Array2<f64>,
    pub counts: Array2<u64>,
}

impl BucketSums {
    pub fn zeros() -> Self {
        Self {
            sums: Array2::zeros((BUCKET_COUNT, CHANNELS)),
            counts: Array2::zeros((BUCKET_COUNT, CHANNELS)),
        }
    }

    pub fn add(&mut self, other: &BucketSums) {
        self.sums += &other.sums;
        self.counts += &other.counts;
    }

    pub fn total_count(&self) -> u64 {
        self.counts.sum()
    }
}

/// Surviving values of the inspected channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InspectionData {
    pub values: PerBucket<Vec<f32>>,
    pub records: Vec<InspectionRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reduction {
    Curves(BucketSums),
    Inspection(InspectionData),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneSummary {
    pub scene_ref: String,
    pub granule: Granule,
    pub mean_cloud_cover: f64,
    pub attrition: AttritionCounts,
    pub reduction: Reduction,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SceneOutcome {
    Reduced(SceneSummary),
    Unreadable {
        scene_ref: String,
        reason: String,
        deleted: bool,
    },
}

/// Runs one scene through the footprint stages, latitude bucketing and the
/// per-channel quality check.
pub struct ScanFilterPipeline {
    criteria: FilterCriteria,
    stages: Vec<Box<dyn FootprintStage>>,
}

impl ScanFilterPipeline {
    pub fn new(criteria: FilterCriteria) -> CoreResult<Self> {
        criteria.validate()?;
        let stages = footprint_stages(&criteria);
        Ok(Self { criteria, stages })
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    /// Reads and filters one scene. Read failures never escape: the scene is
    /// reported unreadable and, when configured, its file is removed.
    pub fn process(&self, reader: &dyn SceneReader, task: &SceneTask) -> SceneOutcome {
        match reader.read_scene(&task.path) {
            Ok(table) => SceneOutcome::Reduced(self.filter(&task.scene_ref, task.granule, &table)),
            Err(err) => {
                warn!("{}: {:?}, skipping ({err})", task.scene_ref, ScenePhase::Unreadable);
                let deleted = self.criteria.delete_unreadable && remove_scene(task);
                SceneOutcome::Unreadable {
                    scene_ref: task.scene_ref.clone(),
                    reason: err.to_string(),
                    deleted,
                }
            }
        }
    }

    pub fn filter(&self, scene_ref: &str, granule: Granule, table: &ScanTable) -> SceneSummary {
        trace_phase(scene_ref, ScenePhase::Loaded);
        let valid: Vec<u64> = table
            .radiances
            .rows()
            .into_iter()
            .map(|row| row.iter().filter(|v| !v.is_nan()).count() as u64)
            .collect();
        let mut attrition = AttritionCounts {
            scanned: valid.iter().sum(),
            ..Default::default()
        };

        let mut eligible = vec![true; FOOTPRINTS];
        for stage in &self.stages {
            let mut excluded = 0;
            for footprint in 0..FOOTPRINTS {
                if eligible[footprint] && !stage.admits(table, footprint) {
                    eligible[footprint] = false;
                    excluded += valid[footprint];
                }
            }
            attrition.record(stage.stage(), excluded);
            if stage.stage() == Stage::Spatial {
                trace_phase(scene_ref, ScenePhase::PreFiltered);
            }
        }
        trace_phase(scene_ref, ScenePhase::Thresholded);

        let mut members: PerBucket<Vec<usize>> = Default::default();
        for footprint in (0..FOOTPRINTS).filter(|f| eligible[*f]) {
            if let Some(bucket) = LatitudeBucket::of(table.latitude[footprint]) {
                members[bucket.id()].push(footprint);
            }
        }
        trace_phase(scene_ref, ScenePhase::Bucketed);

        let reduction = match self.criteria.inspect_channel {
            Some(channel) => Reduction::Inspection(self.inspect(table, &members, channel, &mut attrition)),
            None => Reduction::Curves(self.reduce(table, &members, &mut attrition)),
        };
        trace_phase(scene_ref, ScenePhase::QualityFiltered);

        let summary = SceneSummary {
            scene_ref: scene_ref.to_string(),
            granule,
            mean_cloud_cover: table.mean_cloud_cover(),
            attrition,
            reduction,
        };
        trace_phase(scene_ref, ScenePhase::Reduced);
        summary
    }

    fn reduce(
        &self,
        table: &ScanTable,
        members: &PerBucket<Vec<usize>>,
        attrition: &mut AttritionCounts,
    ) -> BucketSums {
        let mut totals = BucketSums::zeros();
        let mut rejected = 0;
        for (bucket, footprints) in members.iter().enumerate() {
            let mut sums = totals.sums.row_mut(bucket);
            let mut counts = totals.counts.row_mut(bucket);
            for &footprint in footprints {
                let radiances = table.radiances.row(footprint);
                let quality = table.quality.row(footprint);
                for channel in 0..CHANNELS {
                    let value = radiances[channel];
                    if value.is_nan() {
                        continue;
                    }
                    if self.criteria.quality.admits(quality[channel]) {
                        sums[channel] += value as f64;
                        counts[channel] += 1;
                    } else {
                        rejected += 1;
                    }
                }
            }
        }
        attrition.record(Stage::Quality, rejected);
        totals
    }

    fn inspect(
        &self,
        table: &ScanTable,
        members: &PerBucket<Vec<usize>>,
        inspected: usize,
        attrition: &mut AttritionCounts,
    ) -> InspectionData {
        let mut data = InspectionData::default();
        let mut rejected = 0;
        for (bucket, footprints) in members.iter().enumerate() {
            for &footprint in footprints {
                let radiances = table.radiances.row(footprint);
                let quality = table.quality.row(footprint);
                for channel in 0..CHANNELS {
                    let value = radiances[channel];
                    if value.is_nan() {
                        continue;
                    }
                    if !self.criteria.quality.admits(quality[channel]) {
                        rejected += 1;
                    } else if channel == inspected {
                        data.values[bucket].push(value);
                        data.records.push(InspectionRecord {
                            timestamp: instrument_time(table.timestamp[footprint]),
                            lat: table.latitude[footprint],
                            lon: table.longitude[footprint],
                            value,
                        });
                    }
                }
            }
        }
        attrition.record(Stage::Quality, rejected);
        data
    }
}

fn trace_phase(scene_ref: &str, phase: ScenePhase) {
    debug!("{scene_ref}: {phase:?}");
}

fn remove_scene(task: &SceneTask) -> bool {
    match fs::remove_file(&task.path) {
        Ok(()) => {
            debug!("removed unreadable scene {}", task.path.display());
            true
        }
        Err(err) => {
            warn!("could not remove {}: {err}", task.path.display());
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::SceneBuilder;
    use crate::geo::GeoWindow;
    use crate::processing::criteria::{DustFlags, QualityFlags, ScanAngleLimit, Threshold};
    use crate::processing::scene::JsonSceneCodec;

    fn granule() -> Granule {
        Granule::new(2016, 15, 120).unwrap()
    }

    fn summarize(criteria: FilterCriteria, table: &ScanTable) -> SceneSummary {
        ScanFilterPipeline::new(criteria)
            .unwrap()
            .filter("scene", granule(), table)
    }

    fn sums(summary: &SceneSummary) -> &BucketSums {
        match &summary.reduction {
            Reduction::Curves(sums) => sums,
            Reduction::Inspection(_) => panic!("expected curves"),
        }
    }

    #[test]
    fn permissive_criteria_keep_every_cell() {
        let table = SceneBuilder::new(11).build();
        let summary = summarize(FilterCriteria::default(), &table);
        let attrition = summary.attrition;
        assert_eq!(attrition.filtered(), 0);
        assert_eq!(attrition.total(), attrition.scanned);
        assert_eq!(sums(&summary).total_count(), attrition.surviving());
    }

    #[test]
    fn counts_match_survivors_under_every_stage() {
        let table = SceneBuilder::new(12).build();
        let criteria = FilterCriteria {
            window: GeoWindow::new(-5.0, 15.0, 0.0, 12.0, true).unwrap(),
            land_fraction: Threshold::maximum(0.8),
            cloud_cover: Threshold::maximum(0.6),
            all_spots: Threshold::minimum(0.1),
            noise_amplitude: true,
            scan_angle: ScanAngleLimit {
                limit: 30.0,
                inside: true,
            },
            dust: DustFlags {
                detected: false,
                ..Default::default()
            },
            solar_zenith: Threshold::minimum(20.0),
            quality: QualityFlags {
                worst: false,
                ..Default::default()
            },
            ..Default::default()
        };
        let summary = summarize(criteria, &table);
        let attrition = summary.attrition;
        for stage in Stage::ALL {
            assert!(attrition.excluded(stage) > 0, "{stage} removed nothing");
        }
        assert_eq!(sums(&summary).total_count(), attrition.surviving());
    }

    #[test]
    fn tightening_a_threshold_never_adds_survivors() {
        let table = SceneBuilder::new(13).build();
        let base = FilterCriteria::default();
        let mut previous = summarize(base.clone(), &table).attrition.surviving();
        for limit in [0.9, 0.7, 0.5, 0.3, 0.1, 0.0] {
            let criteria = FilterCriteria {
                cloud_cover: Threshold::maximum(limit),
                ..base.clone()
            };
            let surviving = summarize(criteria, &table).attrition.surviving();
            assert!(surviving <= previous, "cloud <= {limit}");
            previous = surviving;
        }

        let tightened = [
            FilterCriteria {
                land_fraction: Threshold::maximum(0.5),
                ..base.clone()
            },
            FilterCriteria {
                solar_zenith: Threshold::minimum(90.0),
                ..base.clone()
            },
            FilterCriteria {
                scan_angle: ScanAngleLimit {
                    limit: 20.0,
                    inside: true,
                },
                ..base.clone()
            },
            FilterCriteria {
                noise_amplitude: true,
                ..base.clone()
            },
            FilterCriteria {
                dust: DustFlags {
                    single_fov: false,
                    ..Default::default()
                },
                ..base.clone()
            },
            FilterCriteria {
                quality: QualityFlags {
                    enough: false,
                    ..Default::default()
                },
                ..base.clone()
            },
        ];
        let all = summarize(base.clone(), &table).attrition.surviving();
        for criteria in tightened {
            assert!(summarize(criteria, &table).attrition.surviving() < all);
        }
    }

    #[test]
    fn scenes_outside_the_window_are_fully_prefiltered() {
        let table = SceneBuilder::new(14).centered_at(-40.0, 120.0).build();
        let criteria = FilterCriteria {
            window: GeoWindow::new(0.0, 20.0, 0.0, 20.0, true).unwrap(),
            ..Default::default()
        };
        let summary = summarize(criteria, &table);
        assert_eq!(summary.attrition.total(), 0);
        assert_eq!(summary.attrition.spatial, summary.attrition.scanned);
        assert_eq!(sums(&summary).total_count(), 0);
    }

    #[test]
    fn sums_land_in_the_footprint_latitude_bucket() {
        let mut table = SceneBuilder::new(15).build();
        table.radiances.fill(2.0);
        table.quality.fill(0);
        let summary = summarize(FilterCriteria::default(), &table);
        let sums = sums(&summary);

        let mut expected = [0u64; BUCKET_COUNT];
        for lat in table.latitude.iter() {
            if let Some(bucket) = LatitudeBucket::of(*lat) {
                expected[bucket.id()] += 1;
            }
        }
        for bucket in LatitudeBucket::all() {
            let id = bucket.id();
            assert_eq!(sums.counts[[id, 100]], expected[id], "{bucket}");
            assert_eq!(sums.sums[[id, 100]], 2.0 * expected[id] as f64);
        }
    }

    #[test]
    fn inspection_keeps_only_the_selected_channel() {
        let table = SceneBuilder::new(16).build();
        let criteria = FilterCriteria {
            inspect_channel: Some(1520),
            quality: QualityFlags {
                worst: false,
                ..Default::default()
            },
            ..Default::default()
        };
        let summary = summarize(criteria, &table);
        let Reduction::Inspection(data) = &summary.reduction else {
            panic!("expected inspection data");
        };
        let expected = (0..FOOTPRINTS)
            .filter(|&f| !table.radiances[[f, 1520]].is_nan() && table.quality[[f, 1520]] != 2)
            .count();
        assert_eq!(data.records.len(), expected);
        assert_eq!(data.values.iter().map(Vec::len).sum::<usize>(), expected);
        assert!(data.records.iter().all(|r| r.timestamp.is_some()));
    }

    #[test]
    fn unreadable_scenes_are_deleted_when_requested() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("AIRS.2016.01.15.120.json");
        fs::write(&path, b"not a scene").unwrap();
        let task = SceneTask {
            scene_ref: "AIRS.2016.01.15.120.json".into(),
            granule: granule(),
            path: path.clone(),
        };

        let keep = ScanFilterPipeline::new(FilterCriteria::default()).unwrap();
        let outcome = keep.process(&JsonSceneCodec, &task);
        assert!(matches!(outcome, SceneOutcome::Unreadable { deleted: false, .. }));
        assert!(path.exists());

        let purge = ScanFilterPipeline::new(FilterCriteria {
            delete_unreadable: true,
            ..Default::default()
        })
        .unwrap();
        let outcome = purge.process(&JsonSceneCodec, &task);
        assert!(matches!(outcome, SceneOutcome::Unreadable { deleted: true, .. }));
        assert!(!path.exists());
    }
}
