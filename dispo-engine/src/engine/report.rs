//! Propagation outputs: the passenger-path report and the delay histogram.

use std::collections::BTreeMap;

use itertools::Itertools;
use serde::Serialize;

use crate::network::EventActivityNetwork;
use crate::paths::Path;

/// One delivered passenger group on one path, in the wire shape consumed
/// by the reporting collaborators: ids are raw numbers and the activity
/// lists are comma-joined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathRecord {
    /// Passengers delivered on this path.
    pub weight: u64,
    pub source_event: u32,
    pub target_event: u32,
    pub source_station: u32,
    pub target_station: u32,
    /// Comma-joined change activity ids, in travel order.
    pub changes: String,
    /// Comma-joined headway activity ids, in travel order.
    pub headways: String,
}

impl PathRecord {
    pub(super) fn from_path(network: &EventActivityNetwork, path: &Path) -> Self {
        Self {
            weight: path.weight,
            source_event: path.source.get(),
            target_event: path.target.get(),
            source_station: network.event(path.source).station.get(),
            target_station: network.event(path.target).station.get(),
            changes: path.changes.iter().map(|id| id.get()).join(","),
            headways: path.headways.iter().map(|id| id.get()).join(","),
        }
    }
}

/// One row of the serialized delay histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DelayHistogramRow {
    /// Arrival delay in seconds against the undelayed reference.
    pub delay: i64,
    pub passengers: u64,
}

/// Passenger counts per arrival delay, kept sorted by delay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DelayHistogram {
    buckets: BTreeMap<i64, u64>,
}

impl DelayHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `passengers` arrivals with the given delay.
    pub fn record(&mut self, delay: i64, passengers: u64) {
        if passengers > 0 {
            *self.buckets.entry(delay).or_insert(0) += passengers;
        }
    }

    /// Total passengers across all delay buckets.
    pub fn total(&self) -> u64 {
        self.buckets.values().sum()
    }

    /// Passengers recorded with exactly this delay.
    pub fn passengers_at(&self, delay: i64) -> u64 {
        self.buckets.get(&delay).copied().unwrap_or(0)
    }

    /// `(delay, passengers)` pairs sorted by delay.
    pub fn iter(&self) -> impl Iterator<Item = (i64, u64)> + '_ {
        self.buckets.iter().map(|(&delay, &count)| (delay, count))
    }

    /// The histogram in its wire shape, sorted by delay.
    pub fn rows(&self) -> Vec<DelayHistogramRow> {
        self.iter()
            .map(|(delay, passengers)| DelayHistogramRow { delay, passengers })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
