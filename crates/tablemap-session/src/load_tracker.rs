//! Detection of relationships loaded one owner at a time.
//!
//! Eager loading issues one secondary query per relationship no matter how
//! many owners were fetched. Callers that loop over owners and fetch each
//! one with `.with(..)` lose that and end up with N+1 queries. The tracker
//! counts relationship loads that ran for a single owner and warns once the
//! count for a (owner type, relationship) pair reaches the threshold.
//!
//! ```ignore
//! // Warns after three iterations:
//! for id in ids {
//!     let user: User = db.query().with("posts").find(id)?;
//! }
//!
//! // One query for users, one for posts:
//! let users: Vec<User> = db.query().with("posts").where_in("id", ids).get()?;
//! ```

use std::collections::HashMap;

/// Counts single-owner relationship loads.
#[derive(Debug)]
pub struct LoadTracker {
    /// (owner type, relationship name) -> load count
    counts: HashMap<(&'static str, String), usize>,
    threshold: usize,
    enabled: bool,
}

impl Default for LoadTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of tracker counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Single-owner loads recorded.
    pub total_loads: usize,
    /// Distinct (owner type, relationship) pairs seen.
    pub relationships_loaded: usize,
    /// Pairs at or above the threshold.
    pub potential_n1: usize,
}

impl LoadTracker {
    /// Tracker with the default threshold (3).
    #[must_use]
    pub fn new() -> Self {
        Self {
            counts: HashMap::new(),
            threshold: 3,
            enabled: true,
        }
    }

    /// Tracker configured from an optional threshold; `None` disables it.
    #[must_use]
    pub fn from_threshold(threshold: Option<usize>) -> Self {
        match threshold {
            Some(threshold) => Self::new().with_threshold(threshold),
            None => {
                let mut tracker = Self::new();
                tracker.disable();
                tracker
            }
        }
    }

    /// Warn after `threshold` single-owner loads instead of the default.
    #[must_use]
    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    /// Loads per relationship before a warning.
    #[must_use]
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Whether loads are being counted.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Stop counting loads.
    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// Resume counting loads.
    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Record one single-owner load of `relationship` on `owner_type`.
    pub fn record_load(&mut self, owner_type: &'static str, relationship: &str) {
        if !self.enabled {
            return;
        }

        let count = self
            .counts
            .entry((owner_type, relationship.to_string()))
            .or_insert(0);
        *count += 1;

        if *count == self.threshold {
            tracing::warn!(
                target: "tablemap::n1",
                owner = owner_type,
                relationship,
                loads = *count,
                threshold = self.threshold,
                "Relationship loaded one owner at a time; fetch owners together to batch the load"
            );
        }
    }

    /// Loads recorded for a pair.
    #[must_use]
    pub fn count_for(&self, owner_type: &'static str, relationship: &str) -> usize {
        self.counts
            .get(&(owner_type, relationship.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Forget all counts.
    pub fn reset(&mut self) {
        self.counts.clear();
    }

    /// Summary of the loads counted so far.
    #[must_use]
    pub fn stats(&self) -> LoadStats {
        LoadStats {
            total_loads: self.counts.values().sum(),
            relationships_loaded: self.counts.len(),
            potential_n1: self
                .counts
                .values()
                .filter(|&&c| c >= self.threshold)
                .count(),
        }
    }
}
