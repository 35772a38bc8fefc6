use crate::prelude::{CoreError, CoreResult};
use log::debug;
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};
use tokio::sync::Semaphore;

/// Runs batches of independent blocking jobs with bounded concurrency.
///
/// Every call to [`WorkerPool::run_all`] is a barrier: it returns only once
/// all jobs of the batch have finished, with results in input order.
pub struct WorkerPool {
    name: String,
    size: usize,
    runtime: Runtime,
}

impl WorkerPool {
    pub fn new(name: &str, size: usize) -> CoreResult<Self> {
        let size = size.max(1);
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(size)
            .thread_name(format!("{name}-worker"))
            .build()
            .map_err(|err| CoreError::Worker(format!("cannot start {name} pool: {err}")))?;
        Ok(Self {
            name: name.to_string(),
            size,
            runtime,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn run_all<T, R, F>(&self, items: Vec<T>, job: F) -> CoreResult<Vec<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        let job = Arc::new(job);
        let permits = Arc::new(Semaphore::new(self.size));
        debug!("{} pool: {} jobs on {} workers", self.name, items.len(), self.size);

        self.runtime.block_on(async move {
            let mut handles = Vec::with_capacity(items.len());
            for item in items {
                let permit = permits
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|err| CoreError::Worker(err.to_string()))?;
                let job = job.clone();
                handles.push(tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    job(item)
                }));
            }

            let mut results = Vec::with_capacity(handles.len());
            for handle in handles {
                results.push(handle.await.map_err(|err| CoreError::Worker(err.to_string()))?);
            }
            Ok(results)
        })
    }
}
