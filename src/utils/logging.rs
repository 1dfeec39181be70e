use log::{log_enabled, warn, Level};
use std::time::Instant;

use crate::core::types::UpdateError;

/// Simple scoped timer for profiling critical sections.
pub struct ScopedTimer<'a> {
    label: &'a str,
    start: Instant,
}

impl<'a> ScopedTimer<'a> {
    pub fn new(label: &'a str) -> Self {
        if log_enabled!(Level::Trace) {
            log::trace!("start {label}");
        }
        Self {
            label,
            start: Instant::now(),
        }
    }
}

impl<'a> Drop for ScopedTimer<'a> {
    fn drop(&mut self) {
        if log_enabled!(Level::Trace) {
            let elapsed = self.start.elapsed();
            log::trace!("end {} ({} µs)", self.label, elapsed.as_micros());
        }
    }
}

/// Emits one warning naming every capacity limit hit during an update.
pub fn warn_if_capacity_exceeded(errors: UpdateError, body_pairs: usize, constraints: usize) {
    if errors.is_empty() {
        return;
    }
    let mut hit = Vec::new();
    if errors.contains(UpdateError::BODY_PAIR_CACHE_FULL) {
        hit.push("body pairs");
    }
    if errors.contains(UpdateError::CONTACT_CONSTRAINT_FULL) {
        hit.push("contact constraints");
    }
    if errors.contains(UpdateError::MANIFOLD_CACHE_FULL) {
        hit.push("manifold cache");
    }
    warn!(
        "physics update exceeded capacity ({}): {} pairs, {} constraints requested",
        hit.join(", "),
        body_pairs,
        constraints
    );
}
