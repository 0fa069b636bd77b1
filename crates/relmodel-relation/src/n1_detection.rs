//! N+1 query detection for lazy relation access.
//!
//! The N+1 pattern occurs when code loads N records and then lazily resolves
//! a relation on each one, issuing N follow-up queries instead of one batched
//! eager load.
//!
//! # Example
//!
//! ```ignore
//! let mut ctx = RelationContext::new(registry, conn);
//! ctx.enable_n1_detection(3); // Warn after 3 lazy loads of one relation
//!
//! // This will trigger a warning:
//! for user in &mut users {
//!     ctx.get_relationship_from_method(&cx, user, "posts").await;
//! }
//!
//! // This is the fix:
//! let users = ctx.load(&cx, users, &EagerLoader::new().include("posts")).await;
//! ```

use std::collections::HashMap;

/// Counts lazy relation loads per (entity, relation).
#[derive(Debug)]
pub struct N1QueryTracker {
    counts: HashMap<(String, String), usize>,
    threshold: usize,
    enabled: bool,
}

impl Default for N1QueryTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics about N+1 detection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct N1Stats {
    /// Total number of lazy loads recorded
    pub total_loads: usize,
    /// Number of distinct relations loaded
    pub relationships_loaded: usize,
    /// Number of relations that reached the threshold
    pub potential_n1: usize,
}

impl N1QueryTracker {
    /// Create a new tracker with default threshold (3).
    #[must_use]
    pub fn new() -> Self {
        Self {
            counts: HashMap::new(),
            threshold: 3,
            enabled: true,
        }
    }

    /// Set the threshold for N+1 warnings.
    #[must_use]
    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    #[must_use]
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Record one lazy load of `relation` on an `entity` record.
    ///
    /// Emits a warning when the count for the pair reaches the threshold.
    pub fn record_load(&mut self, entity: &str, relation: &str) {
        if !self.enabled {
            return;
        }

        let count = self
            .counts
            .entry((entity.to_string(), relation.to_string()))
            .or_insert(0);
        *count += 1;

        if *count == self.threshold {
            tracing::warn!(
                target: "relmodel::n1",
                entity = entity,
                relation = relation,
                queries = *count,
                threshold = self.threshold,
                "N+1 QUERY PATTERN DETECTED! Consider eager loading with EagerLoader::include()."
            );
        }
    }

    /// Reset all counts. Call at the start of a new request scope.
    pub fn reset(&mut self) {
        self.counts.clear();
    }

    #[must_use]
    pub fn count_for(&self, entity: &str, relation: &str) -> usize {
        self.counts
            .get(&(entity.to_string(), relation.to_string()))
            .copied()
            .unwrap_or(0)
    }

    #[must_use]
    pub fn stats(&self) -> N1Stats {
        N1Stats {
            total_loads: self.counts.values().sum(),
            relationships_loaded: self.counts.len(),
            potential_n1: self
                .counts
                .values()
                .filter(|count| **count >= self.threshold)
                .count(),
        }
    }
}

/// RAII guard that logs an N+1 summary for a scope when dropped.
///
/// ```ignore
/// {
///     let _scope = N1DetectionScope::new(ctx.n1_stats().unwrap_or_default(), 3);
///     // ... lazy loads ...
/// } // summary logged here
/// ```
pub struct N1DetectionScope {
    initial_stats: N1Stats,
    final_stats: Option<N1Stats>,
    threshold: usize,
}

impl N1DetectionScope {
    #[must_use]
    pub fn new(initial_stats: N1Stats, threshold: usize) -> Self {
        tracing::debug!(
            target: "relmodel::n1",
            threshold = threshold,
            "N+1 detection scope started"
        );
        Self {
            initial_stats,
            final_stats: None,
            threshold,
        }
    }

    #[must_use]
    pub fn from_tracker(tracker: &N1QueryTracker) -> Self {
        Self::new(tracker.stats(), tracker.threshold())
    }

    /// Provide the stats to compare against when the scope ends.
    pub fn update_stats(&mut self, stats: N1Stats) {
        self.final_stats = Some(stats);
    }

    /// Log a summary of new loads since the scope started.
    pub fn log_summary(&self, final_stats: &N1Stats) {
        let new_loads = final_stats
            .total_loads
            .saturating_sub(self.initial_stats.total_loads);
        let new_n1 = final_stats
            .potential_n1
            .saturating_sub(self.initial_stats.potential_n1);

        if new_n1 > 0 {
            tracing::warn!(
                target: "relmodel::n1",
                potential_n1 = new_n1,
                total_loads = new_loads,
                threshold = self.threshold,
                "N+1 ISSUES DETECTED in this scope! Consider eager loading."
            );
        } else {
            tracing::debug!(
                target: "relmodel::n1",
                total_loads = new_loads,
                "N+1 detection scope completed (no issues)"
            );
        }
    }
}

impl Drop for N1DetectionScope {
    fn drop(&mut self) {
        if let Some(stats) = &self.final_stats {
            self.log_summary(stats);
        }
    }
}
