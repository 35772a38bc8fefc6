use super::attrition::AttritionCounts;
use super::bucket::PerBucket;
use super::pipeline::{BucketSums, Reduction, SceneOutcome, SceneSummary};
use crate::granule::Period;
use crate::interface::InspectionRecord;
use crate::prelude::CHANNELS;
use log::debug;
use std::cmp::Ordering;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationMode {
    Curves,
    Inspection,
}

/// Mean radiance per latitude bucket for one `(period, channel)` group.
#[derive(Debug, Clone, PartialEq)]
pub struct CurveRow {
    pub period: Period,
    pub channel: usize,
    pub means: PerBucket<Option<f64>>,
}

/// Undivided sums and counts behind a [`CurveRow`].
#[derive(Debug, Clone, PartialEq)]
pub struct CountRow {
    pub period: Period,
    pub channel: usize,
    pub sums: PerBucket<f64>,
    pub counts: PerBucket<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CloudFreeScene {
    pub scene_ref: String,
    pub mean_cloud_cover: f64,
}

impl CloudFreeScene {
    fn precedes(&self, other: &CloudFreeScene) -> bool {
        match self.mean_cloud_cover.total_cmp(&other.mean_cloud_cover) {
            Ordering::Less => true,
            Ordering::Greater => false,
            Ordering::Equal => self.scene_ref < other.scene_ref,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InspectionTable {
    pub values: PerBucket<Vec<f32>>,
    pub records: Vec<InspectionRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateReport {
    pub curves: Vec<CurveRow>,
    pub counts: Vec<CountRow>,
    pub inspection: Option<InspectionTable>,
    pub attrition: AttritionCounts,
    pub most_cloud_free: Option<CloudFreeScene>,
    pub unreadable: Vec<String>,
    pub scenes_reduced: usize,
}

/// Folds per-scene summaries into per-period latitude curves.
///
/// Folding is order-independent for the curve sums, and two aggregators over
/// disjoint scene sets can be merged.
#[derive(Debug, Clone)]
pub struct LatitudeBinnedAggregator {
    mode: AggregationMode,
    groups: BTreeMap<Period, BucketSums>,
    inspection: InspectionTable,
    attrition: AttritionCounts,
    most_cloud_free: Option<CloudFreeScene>,
    unreadable: Vec<String>,
    scenes_reduced: usize,
}

impl LatitudeBinnedAggregator {
    pub fn new(mode: AggregationMode) -> Self {
        Self {
            mode,
            groups: BTreeMap::new(),
            inspection: InspectionTable::default(),
            attrition: AttritionCounts::default(),
            most_cloud_free: None,
            unreadable: Vec::new(),
            scenes_reduced: 0,
        }
    }

    pub fn push(&mut self, outcome: SceneOutcome) {
        match outcome {
            SceneOutcome::Reduced(summary) => self.push_summary(summary),
            SceneOutcome::Unreadable { scene_ref, .. } => self.unreadable.push(scene_ref),
        }
    }

    fn push_summary(&mut self, summary: SceneSummary) {
        self.scenes_reduced += 1;
        self.attrition += &summary.attrition;
        self.offer_cloud_free(CloudFreeScene {
            scene_ref: summary.scene_ref,
            mean_cloud_cover: summary.mean_cloud_cover,
        });
        match summary.reduction {
            Reduction::Curves(sums) => match self.groups.get_mut(&summary.granule.period()) {
                Some(group) => group.add(&sums),
                None => {
                    self.groups.insert(summary.granule.period(), sums);
                }
            },
            Reduction::Inspection(data) => {
                for (values, more) in self.inspection.values.iter_mut().zip(data.values) {
                    values.extend(more);
                }
                self.inspection.records.extend(data.records);
            }
        }
    }

    fn offer_cloud_free(&mut self, candidate: CloudFreeScene) {
        if candidate.mean_cloud_cover.is_nan() {
            return;
        }
        let replace = match &self.most_cloud_free {
            Some(current) => candidate.precedes(current),
            None => true,
        };
        if replace {
            self.most_cloud_free = Some(candidate);
        }
    }

    /// Absorbs `other`; its inspection values follow this aggregator's.
    pub fn merge(&mut self, other: LatitudeBinnedAggregator) {
        for (period, sums) in other.groups {
            match self.groups.get_mut(&period) {
                Some(group) => group.add(&sums),
                None => {
                    self.groups.insert(period, sums);
                }
            }
        }
        for (values, more) in self.inspection.values.iter_mut().zip(other.inspection.values) {
            values.extend(more);
        }
        self.inspection.records.extend(other.inspection.records);
        self.attrition += &other.attrition;
        if let Some(candidate) = other.most_cloud_free {
            self.offer_cloud_free(candidate);
        }
        self.unreadable.extend(other.unreadable);
        self.scenes_reduced += other.scenes_reduced;
    }

    pub fn finish(self) -> AggregateReport {
        let (curves, counts, inspection) = match self.mode {
            AggregationMode::Inspection => (Vec::new(), Vec::new(), Some(self.inspection)),
            AggregationMode::Curves => {
                let (curves, counts) = tabulate(&self.groups);
                (curves, counts, None)
            }
        };
        debug!(
            "aggregated {} scenes into {} periods",
            self.scenes_reduced,
            self.groups.len()
        );
        AggregateReport {
            curves,
            counts,
            inspection,
            attrition: self.attrition,
            most_cloud_free: self.most_cloud_free,
            unreadable: self.unreadable,
            scenes_reduced: self.scenes_reduced,
        }
    }
}

fn tabulate(groups: &BTreeMap<Period, BucketSums>) -> (Vec<CurveRow>, Vec<CountRow>) {
    let mut curves = Vec::with_capacity(groups.len() * CHANNELS);
    let mut counts = Vec::with_capacity(groups.len() * CHANNELS);
    for (period, group) in groups {
        for channel in 0..CHANNELS {
            let sums: PerBucket<f64> = std::array::from_fn(|b| group.sums[[b, channel]]);
            let totals: PerBucket<u64> = std::array::from_fn(|b| group.counts[[b, channel]]);
            let means = std::array::from_fn(|b| {
                (totals[b] > 0).then(|| sums[b] / totals[b] as f64)
            });
            curves.push(CurveRow {
                period: *period,
                channel,
                means,
            });
            counts.push(CountRow {
                period: *period,
                channel,
                sums,
                counts: totals,
            });
        }
    }
    (curves, counts)
}

/// One-pass aggregation over an ordered batch of outcomes.
pub fn aggregate(mode: AggregationMode, outcomes: Vec<SceneOutcome>) -> AggregateReport {
    let mut aggregator = LatitudeBinnedAggregator::new(mode);
    for outcome in outcomes {
        aggregator.push(outcome);
    }
    aggregator.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::SceneBuilder;
    use crate::granule::Granule;
    use crate::processing::bucket::BUCKET_COUNT;
    use crate::processing::criteria::{FilterCriteria, Threshold};
    use crate::processing::pipeline::ScanFilterPipeline;

    fn outcomes(criteria: FilterCriteria) -> Vec<SceneOutcome> {
        let pipeline = ScanFilterPipeline::new(criteria).unwrap();
        let scenes = [
            (2016, 20, 10, 21),
            (2016, 25, 200, 22),
            (2016, 45, 3, 23),
            (2016, 50, 99, 24),
        ];
        let mut outcomes: Vec<SceneOutcome> = scenes
            .iter()
            .map(|&(year, day, index, seed)| {
                let table = SceneBuilder::new(seed).centered_at(seed as f64 - 30.0, 5.0).build();
                let granule = Granule::new(year, day, index).unwrap();
                SceneOutcome::Reduced(pipeline.filter(&format!("scene-{seed}"), granule, &table))
            })
            .collect();
        outcomes.insert(
            2,
            SceneOutcome::Unreadable {
                scene_ref: "broken".into(),
                reason: "truncated".into(),
                deleted: false,
            },
        );
        outcomes
    }

    #[test]
    fn split_and_merge_equals_one_pass() {
        let criteria = FilterCriteria {
            cloud_cover: Threshold::maximum(0.7),
            ..Default::default()
        };
        let all = outcomes(criteria);
        let one_pass = aggregate(AggregationMode::Curves, all.clone());

        let (head, tail) = all.split_at(2);
        let mut left = LatitudeBinnedAggregator::new(AggregationMode::Curves);
        head.iter().cloned().for_each(|o| left.push(o));
        let mut right = LatitudeBinnedAggregator::new(AggregationMode::Curves);
        tail.iter().cloned().for_each(|o| right.push(o));
        left.merge(right);
        let merged = left.finish();

        assert_eq!(merged.counts, one_pass.counts);
        assert_eq!(merged.curves, one_pass.curves);
        assert_eq!(merged.attrition, one_pass.attrition);
        assert_eq!(merged.most_cloud_free, one_pass.most_cloud_free);
        assert_eq!(merged.scenes_reduced, 4);
        assert_eq!(merged.unreadable, vec!["broken".to_string()]);
    }

    #[test]
    fn groups_by_calendar_month() {
        let report = aggregate(AggregationMode::Curves, outcomes(FilterCriteria::default()));
        let periods: Vec<String> = report
            .curves
            .iter()
            .step_by(CHANNELS)
            .map(|row| row.period.to_string())
            .collect();
        assert_eq!(periods, vec!["01-2016", "02-2016"]);
        assert_eq!(report.counts.len(), 2 * CHANNELS);
    }

    #[test]
    fn empty_buckets_have_no_mean() {
        let report = aggregate(AggregationMode::Curves, outcomes(FilterCriteria::default()));
        for (curve, count) in report.curves.iter().zip(&report.counts) {
            for b in 0..BUCKET_COUNT {
                match curve.means[b] {
                    Some(mean) => assert_eq!(mean, count.sums[b] / count.counts[b] as f64),
                    None => assert_eq!(count.counts[b], 0),
                }
            }
        }
        let southern = &report.counts[0];
        assert_eq!(southern.counts[0], 0, "no scene reaches -90to-80");
    }

    #[test]
    fn most_cloud_free_breaks_ties_by_name() {
        let mut aggregator = LatitudeBinnedAggregator::new(AggregationMode::Curves);
        for name in ["b", "a", "c"] {
            aggregator.offer_cloud_free(CloudFreeScene {
                scene_ref: name.into(),
                mean_cloud_cover: 0.25,
            });
        }
        aggregator.offer_cloud_free(CloudFreeScene {
            scene_ref: "nan".into(),
            mean_cloud_cover: f64::NAN,
        });
        let best = aggregator.finish().most_cloud_free.unwrap();
        assert_eq!(best.scene_ref, "a");
    }

    #[test]
    fn inspection_mode_concatenates_in_input_order() {
        let criteria = FilterCriteria {
            inspect_channel: Some(42),
            ..Default::default()
        };
        let all = outcomes(criteria);
        let expected: Vec<InspectionRecord> = all
            .iter()
            .filter_map(|o| match o {
                SceneOutcome::Reduced(s) => match &s.reduction {
                    Reduction::Inspection(data) => Some(data.records.clone()),
                    Reduction::Curves(_) => None,
                },
                SceneOutcome::Unreadable { .. } => None,
            })
            .flatten()
            .collect();

        let report = aggregate(AggregationMode::Inspection, all);
        assert!(report.curves.is_empty() && report.counts.is_empty());
        let table = report.inspection.unwrap();
        assert_eq!(table.records, expected);
        assert_eq!(
            table.values.iter().map(Vec::len).sum::<usize>(),
            expected.len()
        );
    }
}
