use super::retry::RetryPolicy;
use crate::pool::WorkerPool;
use crate::prelude::{CoreError, CoreResult};
use crate::telemetry::FetchMetrics;
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const PARTIAL_SUFFIX: &str = "partial";
const INCOMPLETE_SUFFIX: &str = "incomplete";

/// Delivers a scene's bytes to a local path.
pub trait SceneSource: Send + Sync {
    fn fetch(&self, scene_ref: &str, destination: &Path) -> CoreResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Cached,
    Fetched,
    Incomplete,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchReport {
    pub fetched: usize,
    pub cached: usize,
    pub incomplete: Vec<String>,
}

/// Append-only directory of fetched scenes.
///
/// Files only appear under their final name once complete, so a scene that
/// is present and at least `min_bytes` long is never fetched again.
#[derive(Debug, Clone)]
pub struct SceneCache {
    directory: PathBuf,
    min_bytes: u64,
}

impl SceneCache {
    pub fn open(directory: impl Into<PathBuf>, min_bytes: u64) -> CoreResult<Self> {
        let directory = directory.into();
        fs::create_dir_all(&directory).map_err(|err| CoreError::io(&directory, err))?;
        Ok(Self {
            directory,
            min_bytes,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn path_for(&self, scene_ref: &str) -> PathBuf {
        self.directory.join(scene_ref)
    }

    pub fn marker_path(&self, unit: &str) -> PathBuf {
        self.directory.join(format!("{unit}.{INCOMPLETE_SUFFIX}"))
    }

    pub fn is_present(&self, scene_ref: &str) -> bool {
        fs::metadata(self.path_for(scene_ref))
            .map(|meta| meta.is_file() && meta.len() >= self.min_bytes)
            .unwrap_or(false)
    }

    /// Removes scene files shorter than the minimum size, which are left over
    /// from failed downloads.
    pub fn purge_undersized(&self) -> CoreResult<usize> {
        let entries = fs::read_dir(&self.directory).map_err(|err| CoreError::io(&self.directory, err))?;
        let mut removed = 0;
        for entry in entries {
            let path = entry.map_err(|err| CoreError::io(&self.directory, err))?.path();
            let is_marker = path.extension().map_or(false, |ext| ext == INCOMPLETE_SUFFIX);
            if is_marker || !path.is_file() {
                continue;
            }
            let len = fs::metadata(&path).map_err(|err| CoreError::io(&path, err))?.len();
            if len < self.min_bytes {
                fs::remove_file(&path).map_err(|err| CoreError::io(&path, err))?;
                debug!("purged undersized {}", path.display());
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub fn mark_incomplete(&self, unit: &str, reason: &str) -> CoreResult<()> {
        let path = self.marker_path(unit);
        fs::write(&path, reason).map_err(|err| CoreError::io(&path, err))
    }

    fn clear_marker(&self, unit: &str) {
        let _ = fs::remove_file(self.marker_path(unit));
    }

    /// Fetches one scene unless it is already cached. Running out of
    /// attempts leaves a marker and is not an error.
    pub fn fetch_one(
        &self,
        source: &dyn SceneSource,
        scene_ref: &str,
        policy: &RetryPolicy,
    ) -> CoreResult<FetchStatus> {
        if self.is_present(scene_ref) {
            return Ok(FetchStatus::Cached);
        }
        let destination = self.path_for(scene_ref);
        let partial = self
            .directory
            .join(format!("{scene_ref}.{PARTIAL_SUFFIX}"));

        let result = policy.run(scene_ref, |_| {
            source.fetch(scene_ref, &partial)?;
            let len = fs::metadata(&partial)
                .map_err(|err| CoreError::Network(format!("no data written: {err}")))?
                .len();
            if len < self.min_bytes {
                let _ = fs::remove_file(&partial);
                return Err(CoreError::Network(format!(
                    "received {len} bytes, expected at least {}",
                    self.min_bytes
                )));
            }
            fs::rename(&partial, &destination).map_err(|err| CoreError::io(&destination, err))
        });

        match result {
            Ok(()) => {
                self.clear_marker(scene_ref);
                Ok(FetchStatus::Fetched)
            }
            Err(CoreError::Incomplete { last_error, .. }) => {
                let _ = fs::remove_file(&partial);
                self.mark_incomplete(scene_ref, &last_error)?;
                Ok(FetchStatus::Incomplete)
            }
            Err(err) => Err(err),
        }
    }
}

/// Fetches every scene on the network pool and waits for all of them.
pub fn fetch_scenes(
    cache: &SceneCache,
    source: Arc<dyn SceneSource>,
    scene_refs: Vec<String>,
    policy: RetryPolicy,
    pool: &WorkerPool,
) -> CoreResult<FetchReport> {
    let purged = cache.purge_undersized()?;
    if purged > 0 {
        warn!("removed {purged} undersized scene files before fetching");
    }

    let metrics = Arc::new(FetchMetrics::new());
    let shared_cache = Arc::new(cache.clone());
    let recorder = metrics.clone();
    let outcomes = pool.run_all(scene_refs, move |scene_ref| {
        let status = shared_cache.fetch_one(source.as_ref(), &scene_ref, &policy);
        match &status {
            Ok(FetchStatus::Fetched) => recorder.record_fetched(),
            Ok(FetchStatus::Cached) => recorder.record_cached(),
            Ok(FetchStatus::Incomplete) => recorder.record_incomplete(),
            Err(_) => {}
        }
        (scene_ref, status)
    })?;

    let mut report = FetchReport::default();
    for (scene_ref, status) in outcomes {
        if status? == FetchStatus::Incomplete {
            report.incomplete.push(scene_ref);
        }
    }
    let counts = metrics.snapshot();
    report.fetched = counts.fetched;
    report.cached = counts.cached;
    info!(
        "fetched {} scenes, {} already cached, {} incomplete",
        counts.fetched, counts.cached, counts.incomplete
    );
    Ok(report)
}
