use std::sync::Mutex;

/// Outcome counts shared by concurrent fetch tasks.
pub struct FetchMetrics {
    inner: Mutex<FetchCounts>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchCounts {
    pub fetched: usize,
    pub cached: usize,
    pub incomplete: usize,
}

impl FetchMetrics {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(FetchCounts::default()),
        }
    }

    pub fn record_fetched(&self) {
        if let Ok(mut counts) = self.inner.lock() {
            counts.fetched += 1;
        }
    }

    pub fn record_cached(&self) {
        if let Ok(mut counts) = self.inner.lock() {
            counts.cached += 1;
        }
    }

    pub fn record_incomplete(&self) {
        if let Ok(mut counts) = self.inner.lock() {
            counts.incomplete += 1;
        }
    }

    pub fn snapshot(&self) -> FetchCounts {
        if let Ok(counts) = self.inner.lock() {
            *counts
        } else {
            FetchCounts::default()
        }
    }
}

impl Default for FetchMetrics {
    fn default() -> Self {
        Self::new()
    }
}
