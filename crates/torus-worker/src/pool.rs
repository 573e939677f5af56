//! Ordered worker pool.
//!
//! The pool's order is load-bearing: the endpoint at position `i` always
//! computes partition `i`, and results are stitched in that order.

use std::sync::Arc;

use crate::endpoint::WorkerEndpoint;
use crate::error::WorkerError;
use crate::local::{LocalWorker, WorkerConfig};

/// A fixed, ordered list of worker endpoints.
#[derive(Clone)]
pub struct WorkerPool {
    workers: Vec<Arc<dyn WorkerEndpoint>>,
}

impl WorkerPool {
    /// Wrap an ordered list of endpoints.
    pub fn new(workers: Vec<Arc<dyn WorkerEndpoint>>) -> Self {
        Self { workers }
    }

    /// Start `count` in-process workers labelled `worker-0`, `worker-1`, ...
    ///
    /// Returns the pool plus the concrete handles so callers can join or
    /// inspect the workers. Already-started workers are shut down if a
    /// later one fails to spawn.
    pub fn spawn_local(
        count: usize,
        config: &WorkerConfig,
    ) -> Result<(Self, Vec<Arc<LocalWorker>>), WorkerError> {
        let mut handles = Vec::with_capacity(count);
        for i in 0..count {
            handles.push(Arc::new(LocalWorker::spawn(
                format!("worker-{i}"),
                config.clone(),
            )?));
        }
        let workers = handles
            .iter()
            .map(|w| Arc::clone(w) as Arc<dyn WorkerEndpoint>)
            .collect();
        Ok((Self { workers }, handles))
    }

    /// Number of workers.
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Endpoint at ordinal `index`.
    pub fn get(&self, index: usize) -> Option<&Arc<dyn WorkerEndpoint>> {
        self.workers.get(index)
    }

    /// Iterate over endpoints in ordinal order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn WorkerEndpoint>> {
        self.workers.iter()
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.workers.iter().map(|w| w.label()))
            .finish()
    }
}

impl FromIterator<Arc<dyn WorkerEndpoint>> for WorkerPool {
    fn from_iter<I: IntoIterator<Item = Arc<dyn WorkerEndpoint>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_pool_preserves_order() {
        let (pool, handles) = WorkerPool::spawn_local(3, &WorkerConfig::default()).unwrap();
        assert_eq!(pool.len(), 3);
        assert_eq!(handles.len(), 3);
        let labels: Vec<_> = pool.iter().map(|w| w.label().to_string()).collect();
        assert_eq!(labels, vec!["worker-0", "worker-1", "worker-2"]);
        assert_eq!(format!("{pool:?}"), r#"["worker-0", "worker-1", "worker-2"]"#);
    }

    #[test]
    fn empty_pool() {
        let pool = WorkerPool::new(Vec::new());
        assert!(pool.is_empty());
        assert!(pool.get(0).is_none());
    }
}
