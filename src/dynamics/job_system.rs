//! Worker pool used by the parallel stages of an update.

use log::debug;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::{
    config::JobSystemSettings,
    error::{PhysicsError, Result},
};

/// Fixed-size thread pool handed to [`PhysicsSystem::update`](crate::PhysicsSystem::update).
///
/// Each parallel stage is split into at most `max_jobs` chunks; the stage boundaries
/// inside an update act as the barriers.
pub struct JobSystem {
    pool: ThreadPool,
    settings: JobSystemSettings,
}

impl JobSystem {
    pub fn new(settings: JobSystemSettings) -> Result<Self> {
        let settings = settings.resolved();
        let pool = ThreadPoolBuilder::new()
            .num_threads(settings.num_threads as usize)
            .thread_name(|index| format!("strata-worker-{index}"))
            .build()
            .map_err(|err| PhysicsError::JobSystemInit(err.to_string()))?;
        debug!(
            "job system started: {} threads, {} jobs, {} barriers",
            settings.num_threads, settings.max_jobs, settings.max_barriers
        );
        Ok(Self { pool, settings })
    }

    pub fn settings(&self) -> &JobSystemSettings {
        &self.settings
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Runs `op` inside the pool so nested rayon iterators use its workers.
    pub fn install<R, F>(&self, op: F) -> R
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }

    /// Smallest chunk a stage over `items` elements may be split into.
    pub fn min_chunk(&self, items: usize) -> usize {
        items.div_ceil(self.settings.max_jobs.max(1) as usize).max(1)
    }
}

impl std::fmt::Debug for JobSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobSystem")
            .field("threads", &self.num_threads())
            .field("settings", &self.settings)
            .finish()
    }
}
