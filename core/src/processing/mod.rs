//! Per-scene footprint filtering and the latitude-binned reduction of its
//! survivors.

pub mod aggregate;
pub mod attrition;
pub mod bucket;
pub mod criteria;
pub mod pipeline;
pub mod scene;
pub mod stages;

pub use aggregate::{
    aggregate, AggregateReport, AggregationMode, CloudFreeScene, CountRow, CurveRow,
    InspectionTable, LatitudeBinnedAggregator,
};
pub use attrition::AttritionCounts;
pub use bucket::{LatitudeBucket, PerBucket, BUCKET_COUNT};
pub use criteria::{DustFlags, FilterCriteria, QualityFlags, ScanAngleLimit, Threshold};
pub use pipeline::{
    BucketSums, InspectionData, Reduction, SceneOutcome, ScenePhase, SceneSummary, SceneTask,
    ScanFilterPipeline,
};
pub use scene::{JsonSceneCodec, ScanTable, SceneReader};
pub use stages::Stage;
