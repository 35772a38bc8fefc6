use crate::workflow::batches::{plan_batches, DateBatch};
use crate::workflow::config::WorkflowConfig;
use crate::workflow::mirror::LocalMirror;
use crate::workflow::output::{combine_batches, write_report, BatchFiles, CombinedFiles};
use anyhow::Context;
use log::info;
use soundercore::fetch::{fetch_scenes, SceneCache};
use soundercore::granule::GranuleClock;
use soundercore::index::{resolve, Candidate, CandidateQuery, PositionCache, PositionCacheBuilder, YearBuild};
use soundercore::pool::WorkerPool;
use soundercore::processing::{
    aggregate, AggregationMode, AttritionCounts, CloudFreeScene, JsonSceneCodec,
    ScanFilterPipeline, SceneTask,
};
use soundercore::telemetry::{log_attrition, log_most_cloud_free};
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub batch: DateBatch,
    pub candidates: Vec<Candidate>,
    pub incomplete: Vec<String>,
    pub unreadable: Vec<String>,
    pub scenes_reduced: usize,
    pub files: BatchFiles,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowResult {
    pub batches: Vec<BatchSummary>,
    pub attrition: AttritionCounts,
    pub most_cloud_free: Option<CloudFreeScene>,
    pub combined: Option<CombinedFiles>,
}

#[derive(Clone)]
pub struct Runner {
    config: WorkflowConfig,
}

impl Runner {
    pub fn new(config: WorkflowConfig) -> Self {
        Self { config }
    }

    /// Select, fetch, filter and aggregate every batch of the configured
    /// date range. A dry run stops after selection.
    pub fn execute(&self, dry_run: bool) -> anyhow::Result<WorkflowResult> {
        let config = &self.config;
        let criteria = config.criteria();
        let mode = match criteria.inspect_channel {
            Some(_) => AggregationMode::Inspection,
            None => AggregationMode::Curves,
        };
        let pipeline = Arc::new(ScanFilterPipeline::new(criteria).context("building filter pipeline")?);
        let network = WorkerPool::new("network", config.pools.network).context("starting network pool")?;
        let filtering =
            WorkerPool::new("filtering", config.pools.filtering).context("starting filtering pool")?;
        let positions = PositionCache::new(&config.directories.positions);
        let mirror = Arc::new(LocalMirror::new(&config.directories.mirror));
        let cache = SceneCache::open(&config.directories.data, config.min_scene_bytes)
            .context("opening scene cache")?;

        let batches = plan_batches(config.date_range.start, config.date_range.end, config.num_batches);
        let mut result = WorkflowResult {
            batches: Vec::with_capacity(batches.len()),
            attrition: AttritionCounts::default(),
            most_cloud_free: None,
            combined: None,
        };

        for (number, batch) in batches.into_iter().enumerate() {
            info!("Processing batch {}: {} through {}", number + 1, batch.start, batch.end);
            let (start, end) = config.interval(batch.start, batch.end);
            let (first, last) = GranuleClock::granule_range_for_interval(start, end)
                .with_context(|| format!("mapping {start} to {end} onto granules"))?;
            let query = CandidateQuery {
                start: first,
                end: last,
                window: config.region,
                min_gca: config.minimum_gca,
            };
            let candidates = resolve(&positions, &query)
                .with_context(|| format!("selecting scenes for {} to {}", batch.start, batch.end))?;

            let mut summary = BatchSummary {
                batch,
                candidates,
                incomplete: Vec::new(),
                unreadable: Vec::new(),
                scenes_reduced: 0,
                files: BatchFiles::default(),
            };
            if dry_run {
                for candidate in &summary.candidates {
                    info!("{} {}", candidate.granule, candidate.scene_ref);
                }
                result.batches.push(summary);
                continue;
            }

            let scene_refs: Vec<String> =
                summary.candidates.iter().map(|c| c.scene_ref.clone()).collect();
            let fetched = fetch_scenes(&cache, mirror.clone(), scene_refs, config.retry, &network)
                .context("fetching scenes")?;
            let incomplete: HashSet<&String> = fetched.incomplete.iter().collect();
            let tasks: Vec<SceneTask> = summary
                .candidates
                .iter()
                .filter(|c| !incomplete.contains(&c.scene_ref))
                .map(|c| SceneTask {
                    scene_ref: c.scene_ref.clone(),
                    granule: c.granule,
                    path: cache.path_for(&c.scene_ref),
                })
                .collect();

            let shared = pipeline.clone();
            let outcomes = filtering
                .run_all(tasks, move |task| shared.process(&JsonSceneCodec, &task))
                .context("filtering scenes")?;
            let report = aggregate(mode, outcomes);

            summary.files = write_report(&config.directories.output, batch.start, &report)
                .with_context(|| format!("writing results for batch starting {}", batch.start))?;
            summary.incomplete = fetched.incomplete.clone();
            summary.unreadable = report.unreadable.clone();
            summary.scenes_reduced = report.scenes_reduced;
            result.attrition += &report.attrition;
            if let Some(scene) = report.most_cloud_free {
                let better = result
                    .most_cloud_free
                    .as_ref()
                    .map_or(true, |best| scene.mean_cloud_cover < best.mean_cloud_cover);
                if better {
                    result.most_cloud_free = Some(scene);
                }
            }
            info!(
                "Batch {} done: {} scenes reduced, {} incomplete, {} unreadable",
                number + 1,
                summary.scenes_reduced,
                summary.incomplete.len(),
                summary.unreadable.len()
            );
            result.batches.push(summary);
        }

        if !dry_run {
            let files: Vec<BatchFiles> = result.batches.iter().map(|b| b.files.clone()).collect();
            result.combined = combine_batches(&config.directories.output, &files)
                .context("combining batch tables")?;
            info!("-- FINAL STATS --");
            log_attrition(&result.attrition);
            log_most_cloud_free(result.most_cloud_free.as_ref());
        }
        Ok(result)
    }

    /// Rebuilds one year of the position cache from the mirror listing.
    pub fn build_positions(&self, year: i32) -> anyhow::Result<YearBuild> {
        let config = &self.config;
        let pool = WorkerPool::new("network", config.pools.network).context("starting network pool")?;
        let builder = PositionCacheBuilder::new(
            PositionCache::new(&config.directories.positions),
            Arc::new(LocalMirror::new(&config.directories.mirror)),
            config.retry,
        );
        let mut builds = builder
            .build_years(vec![year], &pool)
            .with_context(|| format!("rebuilding positions for {year}"))?;
        builds
            .pop()
            .with_context(|| format!("no position table built for {year}"))
    }
}
