//! Idempotent scene fetching with bounded retries.

pub mod cache;
pub mod retry;

pub use cache::{fetch_scenes, FetchReport, FetchStatus, SceneCache, SceneSource};
pub use retry::RetryPolicy;
