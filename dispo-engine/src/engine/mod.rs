//! The delay-propagation engine.
//!
//! Given a network whose disposition timetable is already committed, the
//! engine decides per OD pair which paths passengers actually take, spreads
//! each pair's volume across departure groups under the configured arrival
//! model, writes the resulting weights back onto the network, and collects
//! the delay histogram and the passenger-path report.
//!
//! All run state lives in an explicit [`DelayPropagationContext`] built
//! once per run: the collapsed network, the reachability closure, the
//! per-station candidate caches and the output accumulators. There are no
//! globals; two engines over two networks do not interact.

mod config;
mod distribution;
mod report;

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::collapse::{CollapsedNetwork, ReachabilityMatrix};
use crate::domain::{EventId, EventTime, StationId, TimeView};
use crate::network::{
    ConsistencyError, EventActivityNetwork, OdEntry, PassengerArrivalTable, TimetableError,
};
use crate::paths::PathEnumerator;

pub use config::{ArrivalModel, EngineConfig};
pub use distribution::{apportion, on_time_cumulative_share, uniform_cumulative_share};
pub use report::{DelayHistogram, DelayHistogramRow, PathRecord};

/// Fatal distribution failure: upstream data is corrupt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DistributionError {
    /// The arrival-on-time model is asked to route more passengers than
    /// the undelayed reference ever recorded for this OD pair.
    #[error(
        "OD pair {origin} -> {destination}: routing {required} passengers but the reference \
         records only {available} arrivals"
    )]
    Overdistribution {
        origin: u32,
        destination: u32,
        required: u64,
        available: usize,
    },
}

/// Any fatal engine failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Consistency(#[from] ConsistencyError),

    #[error(transparent)]
    Timetable(#[from] TimetableError),

    #[error(transparent)]
    Distribution(#[from] DistributionError),
}

/// Everything a propagation run owns besides the network itself.
///
/// Built once per run from the constructed network; the derived views are
/// immutable from then on, only the accumulators grow.
#[derive(Debug)]
pub struct DelayPropagationContext {
    pub collapsed: CollapsedNetwork,
    pub reachability: ReachabilityMatrix,
    departures_by_station: HashMap<StationId, Vec<EventId>>,
    arrivals_by_station: HashMap<StationId, Vec<EventId>>,
    histogram: DelayHistogram,
    records: Vec<PathRecord>,
    /// Running sum of weight times actual arrival time, in
    /// passenger-seconds.
    weighted_arrival_total: i64,
    distributed_total: u64,
}

impl DelayPropagationContext {
    pub fn new(network: &EventActivityNetwork) -> Self {
        let collapsed = CollapsedNetwork::build(network);
        let reachability = ReachabilityMatrix::closure(&collapsed);

        let mut departures_by_station: HashMap<StationId, Vec<EventId>> = HashMap::new();
        let mut arrivals_by_station: HashMap<StationId, Vec<EventId>> = HashMap::new();
        for event in network.events() {
            let cache = if event.is_departure() {
                &mut departures_by_station
            } else {
                &mut arrivals_by_station
            };
            cache.entry(event.station).or_default().push(event.id);
        }

        Self {
            collapsed,
            reachability,
            departures_by_station,
            arrivals_by_station,
            histogram: DelayHistogram::new(),
            records: Vec::new(),
            weighted_arrival_total: 0,
            distributed_total: 0,
        }
    }

    /// Departure events at a station, ascending by id.
    pub fn departures_at(&self, station: StationId) -> &[EventId] {
        self.departures_by_station
            .get(&station)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Arrival events at a station, ascending by id.
    pub fn arrivals_at(&self, station: StationId) -> &[EventId] {
        self.arrivals_by_station
            .get(&station)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Aggregate results of a propagation run.
#[derive(Debug)]
pub struct PropagationSummary {
    /// Passenger count per arrival delay.
    pub histogram: DelayHistogram,
    /// One row per delivered path-group member.
    pub records: Vec<PathRecord>,
    /// Sum of weight times actual arrival time over all delivered paths.
    pub weighted_arrival_total: i64,
    /// Total passengers actually distributed.
    pub distributed_total: u64,
}

/// The engine: borrows the network mutably for the duration of a run.
pub struct DelayPropagationEngine<'a> {
    network: &'a mut EventActivityNetwork,
    config: EngineConfig,
    context: DelayPropagationContext,
}

impl<'a> DelayPropagationEngine<'a> {
    /// Prepares a run: optional strict checks, then the derived views.
    pub fn new(
        network: &'a mut EventActivityNetwork,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        if config.strict_checks {
            network.check_consistency()?;
            network.check_timetable()?;
        }
        let context = DelayPropagationContext::new(network);
        Ok(Self {
            network,
            config,
            context,
        })
    }

    /// Routes and distributes every OD pair, accumulating weights onto the
    /// network and results into the context. Zero-weight rows are skipped.
    pub fn propagate(
        &mut self,
        od_pairs: &[OdEntry],
        reference: &PassengerArrivalTable,
    ) -> Result<(), EngineError> {
        self.network.decide_connection_statuses();
        self.network.decide_headway_orders();

        let mut routed_pairs = 0usize;
        for od in od_pairs {
            if od.weight == 0 {
                continue;
            }
            self.propagate_pair(od, reference)?;
            routed_pairs += 1;
        }
        info!(
            pairs = routed_pairs,
            passengers = self.context.distributed_total,
            "propagation finished"
        );
        Ok(())
    }

    /// Consumes the engine and returns the accumulated results.
    pub fn finish(self) -> PropagationSummary {
        PropagationSummary {
            histogram: self.context.histogram,
            records: self.context.records,
            weighted_arrival_total: self.context.weighted_arrival_total,
            distributed_total: self.context.distributed_total,
        }
    }

    fn propagate_pair(
        &mut self,
        od: &OdEntry,
        reference: &PassengerArrivalTable,
    ) -> Result<(), EngineError> {
        let origin = od.origin_station();
        let destination = od.destination_station();
        let departures = self.context.departures_at(origin).to_vec();
        let arrivals = self.context.arrivals_at(destination).to_vec();
        if departures.is_empty() || arrivals.is_empty() {
            debug!(%origin, %destination, "OD pair without candidate events");
            return Ok(());
        }

        // The reference search under the scheduled view yields, per
        // departure event, the arrival time this demand would have had
        // without any delay; the delayed search decides where the
        // passengers actually go.
        let (reference_groups, mut groups) = {
            let enumerator = PathEnumerator::new(
                self.network,
                &self.context.collapsed,
                &self.context.reachability,
                self.config.max_hops,
            );
            (
                enumerator.minimal_hop_search(&departures, &arrivals, TimeView::Scheduled),
                enumerator.minimal_hop_search(&departures, &arrivals, TimeView::Disposition),
            )
        };

        let mut reference_arrival: HashMap<EventId, EventTime> = HashMap::new();
        for group in &reference_groups {
            for path in &group.paths {
                reference_arrival
                    .entry(path.source)
                    .and_modify(|t| *t = (*t).min(path.arrival))
                    .or_insert(path.arrival);
            }
        }
        let latest_reference_departure = reference_groups.last().map(|g| g.departure);

        if groups.is_empty() {
            warn!(%origin, %destination, weight = od.weight, "no route left for OD pair");
            return Ok(());
        }

        let total = od.weight;
        let reference_times = reference.arrivals(origin, destination);
        if self.config.arrival_model == ArrivalModel::OnTime
            && (reference_times.len() as u64) < total
        {
            return Err(DistributionError::Overdistribution {
                origin: od.origin,
                destination: od.destination,
                required: total,
                available: reference_times.len(),
            }
            .into());
        }

        let begin = EventTime::new(self.config.begin_of_day);
        let latest = od
            .latest_departure
            .map(EventTime::new)
            .or(latest_reference_departure)
            .unwrap_or(begin);

        // Cumulative shares per group, evaluated at the disposition
        // departure time: a held train collects the passengers that showed
        // up while it waited.
        let mut distributed = 0u64;
        for group in &mut groups {
            let cumulative = match self.config.arrival_model {
                ArrivalModel::OnTime => {
                    on_time_cumulative_share(reference_times, group.departure, total)
                }
                ArrivalModel::Uniform => {
                    uniform_cumulative_share(total, begin, latest, group.departure)
                }
            };
            let share = cumulative.saturating_sub(distributed);
            if share == 0 {
                continue;
            }
            let parts = apportion(share, group.paths.len());
            for (path, part) in group.paths.iter_mut().zip(parts) {
                path.weight = part;
            }
            distributed += share;
        }

        if distributed != total {
            let mismatch = total as i64 - distributed as i64;
            let path_count: usize = groups.iter().map(|g| g.paths.len()).sum();
            if mismatch.unsigned_abs() <= path_count as u64 {
                debug!(%origin, %destination, mismatch, "rounding mismatch tolerated");
            } else {
                warn!(
                    %origin,
                    %destination,
                    requested = total,
                    distributed,
                    "distributed weight deviates beyond rounding tolerance"
                );
            }
        }

        for group in &groups {
            for path in &group.paths {
                if path.weight == 0 {
                    continue;
                }
                let weight = path.weight as f64;
                for &change in &path.changes {
                    self.network.add_activity_weight(change, weight);
                }
                for &headway in &path.headways {
                    self.network.add_activity_weight(headway, weight);
                }
                self.network.add_event_weight(path.target, weight);

                // Undelayed reference arrival for this departure; when the
                // reference search pruned the departure, the scheduled time
                // of the reached arrival stands in.
                let original = reference_arrival
                    .get(&path.source)
                    .copied()
                    .unwrap_or(self.network.event(path.target).time);
                self.context.histogram.record(path.arrival - original, path.weight);
                self.context.weighted_arrival_total +=
                    path.weight as i64 * path.arrival.seconds();
                self.context
                    .records
                    .push(PathRecord::from_path(self.network, path));
                self.context.distributed_total += path.weight;
            }
        }
        Ok(())
    }
}
