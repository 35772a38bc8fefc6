pub mod log;
pub mod metrics;

pub use self::log::{attrition_lines, log_attrition, log_most_cloud_free};
pub use metrics::{FetchCounts, FetchMetrics};
