//! Path enumeration between events.
//!
//! Two operations, both read-only over the network and its derived views:
//! a deterministic walk along one physical run ([`on_trip_path`]) and the
//! minimal-hop search across boarding opportunities
//! ([`minimal_hop_search`]). "No path" is a normal outcome everywhere here,
//! reported as `None` or an empty result, never as an error.
//!
//! [`on_trip_path`]: PathEnumerator::on_trip_path
//! [`minimal_hop_search`]: PathEnumerator::minimal_hop_search

use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use tracing::{debug, trace};

use crate::collapse::{CollapsedNetwork, ForwardConnection, ReachabilityMatrix};
use crate::domain::{ActivityId, CollapsedId, EventId, EventTime, TimeView};
use crate::network::EventActivityNetwork;

/// A passenger journey from one departure to one arrival.
///
/// Created with zero weight by the search; the propagation engine fills in
/// the weight during distribution, accumulates it onto the network, and
/// discards the path.
#[derive(Debug, Clone)]
pub struct Path {
    /// Passengers on this path; assigned during distribution.
    pub weight: u64,
    pub source: EventId,
    pub target: EventId,
    /// Arrival time at the target, under the view the search ran with.
    pub arrival: EventTime,
    /// Changes used, in travel order.
    pub changes: Vec<ActivityId>,
    /// Headways traversed, in travel order.
    pub headways: Vec<ActivityId>,
}

impl Path {
    /// Number of changes.
    pub fn change_count(&self) -> usize {
        self.changes.len()
    }
}

/// All equally-minimal paths sharing one departure time.
#[derive(Debug, Clone)]
pub struct PathGroup {
    pub departure: EventTime,
    pub paths: Vec<Path>,
}

/// Read-only path search over a network and its collapsed views.
pub struct PathEnumerator<'a> {
    network: &'a EventActivityNetwork,
    collapsed: &'a CollapsedNetwork,
    reachability: &'a ReachabilityMatrix,
    /// Safety cap on the hop depth; the search never needs more hops than
    /// there are collapsed nodes.
    max_hops: usize,
}

/// Completion chains per collapsed node: (arrival event, chain to it).
type Completions = HashMap<CollapsedId, Vec<(EventId, Vec<ActivityId>)>>;

impl<'a> PathEnumerator<'a> {
    pub fn new(
        network: &'a EventActivityNetwork,
        collapsed: &'a CollapsedNetwork,
        reachability: &'a ReachabilityMatrix,
        max_hops: usize,
    ) -> Self {
        Self {
            network,
            collapsed,
            reachability,
            max_hops,
        }
    }

    /// Walks drives and waits forward from `source` towards `destination`
    /// on the same physical run.
    ///
    /// At each step, a direct edge to the destination ends the walk as long
    /// as it is neither a headway nor a change (a change would not be an
    /// on-trip journey, and headways carry no passengers). Otherwise the
    /// walk continues along a drive/wait successor; where an event offers
    /// several, the one with the lowest target event id is taken, which
    /// makes the walk deterministic regardless of input ordering. Every
    /// edge used must satisfy its lower bound under `view`.
    ///
    /// Returns the activity chain, or `None` when the run does not lead to
    /// the destination.
    pub fn on_trip_path(
        &self,
        source: EventId,
        destination: EventId,
        view: TimeView,
    ) -> Option<Vec<ActivityId>> {
        let limit = self.network.activity_count();
        let mut chain = Vec::new();
        let mut current = source;

        loop {
            let direct = self
                .network
                .event(current)
                .outgoing
                .iter()
                .map(|&id| self.network.activity(id))
                .find(|a| {
                    a.target == destination
                        && !a.is_headway()
                        && !a.is_change()
                        && self.network.duration_satisfied(a, view)
                });
            if let Some(activity) = direct {
                chain.push(activity.id);
                return Some(chain);
            }

            let next = self
                .network
                .event(current)
                .outgoing
                .iter()
                .map(|&id| self.network.activity(id))
                .filter(|a| a.is_on_trip() && self.network.duration_satisfied(a, view))
                .min_by_key(|a| a.target)?;
            chain.push(next.id);
            current = next.target;

            if chain.len() > limit {
                // Only possible on malformed input with a drive/wait cycle.
                debug!(%source, %destination, "on-trip walk aborted, chain longer than the network");
                return None;
            }
        }
    }

    /// Finds, per identical-departure-time group, all paths with the
    /// smallest possible number of changes to an acceptable arrival.
    ///
    /// Departures are processed latest-first so that arrivals already
    /// achieved by a later departure prune the earlier ones: an arrival is
    /// only acceptable for a group if it is not later than the best arrival
    /// any later departure reached. Hop 0 is the on-trip walk; hop `h >= 1`
    /// enumerates chains of `h - 1` collapsed hops between a forward
    /// connection of the departure and a backward connection of an arrival,
    /// pruned by the reachability matrix. The depth is raised until the
    /// first one that yields a path, so the result is minimal in changes,
    /// not in time, and ties are all kept.
    ///
    /// Returns the groups ordered by ascending departure time.
    pub fn minimal_hop_search(
        &self,
        departures: &[EventId],
        arrivals: &[EventId],
        view: TimeView,
    ) -> Vec<PathGroup> {
        let mut ordered_departures = departures.to_vec();
        ordered_departures
            .sort_unstable_by_key(|&id| (self.network.event(id).time_for(view), id));
        ordered_departures.reverse();
        let mut ordered_arrivals = arrivals.to_vec();
        ordered_arrivals.sort_unstable_by_key(|&id| (self.network.event(id).time_for(view), id));

        let mut best_arrival: Option<EventTime> = None;
        let mut groups: Vec<PathGroup> = Vec::new();

        let by_departure_time = ordered_departures
            .iter()
            .chunk_by(|&&id| self.network.event(id).time_for(view));
        for (departure, group) in &by_departure_time {
            let group_events: Vec<EventId> = group.copied().collect();
            let acceptable: Vec<EventId> = ordered_arrivals
                .iter()
                .copied()
                .filter(|&a| {
                    best_arrival.is_none_or(|b| self.network.event(a).time_for(view) <= b)
                })
                .collect();
            if acceptable.is_empty() {
                trace!(%departure, "no acceptable arrival left for departure group");
                continue;
            }

            let paths = self.search_group(&group_events, &acceptable, view);
            if paths.is_empty() {
                debug!(%departure, "departure group has no onward path");
                continue;
            }

            let earliest = paths
                .iter()
                .map(|p| p.arrival)
                .min()
                .expect("group paths are non-empty");
            best_arrival = Some(best_arrival.map_or(earliest, |b| b.min(earliest)));
            groups.push(PathGroup { departure, paths });
        }

        groups.reverse();
        groups
    }

    /// All minimal-hop paths from one departure group to the acceptable
    /// arrivals.
    fn search_group(
        &self,
        departures: &[EventId],
        arrivals: &[EventId],
        view: TimeView,
    ) -> Vec<Path> {
        let mut paths = Vec::new();

        // Hop 0: the on-trip walk.
        for &departure in departures {
            for &arrival in arrivals {
                if let Some(chain) = self.on_trip_path(departure, arrival, view) {
                    paths.push(self.assemble(departure, arrival, &chain, view));
                }
            }
        }
        if !paths.is_empty() {
            return paths;
        }

        // Boarding opportunities that still reach an acceptable arrival.
        let mut completions: Completions = HashMap::new();
        for &arrival in arrivals {
            for connection in self.collapsed.backward_connections(self.network, arrival) {
                if self.chain_feasible(&connection.chain, view) {
                    completions
                        .entry(connection.source)
                        .or_default()
                        .push((arrival, connection.chain));
                }
            }
        }
        if completions.is_empty() {
            return paths;
        }
        let mask = self.reachability.target_mask(completions.keys().copied());

        // First boarding opportunities per departure.
        let starts: Vec<(EventId, ForwardConnection)> = departures
            .iter()
            .flat_map(|&departure| {
                self.collapsed
                    .forward_connections(self.network, departure)
                    .into_iter()
                    .filter(|connection| self.chain_feasible(&connection.chain, view))
                    .map(move |connection| (departure, connection))
            })
            .collect();

        let reachable_at_all = starts.iter().any(|(_, connection)| {
            completions.contains_key(&connection.target)
                || self.reachability.reaches_any(connection.target, &mask)
        });
        if !reachable_at_all {
            return paths;
        }

        let hop_cap = self.max_hops.min(self.collapsed.event_count() + 1);
        for hops in 1..=hop_cap {
            for (departure, connection) in &starts {
                let (mut changes, mut headways) = split_chain(self.network, &connection.chain);
                let mut visited = HashSet::from([connection.target]);
                self.descend(
                    connection.target,
                    hops - 1,
                    *departure,
                    &mut changes,
                    &mut headways,
                    &mut visited,
                    &completions,
                    &mask,
                    view,
                    &mut paths,
                );
            }
            if !paths.is_empty() {
                trace!(hops, count = paths.len(), "paths found at minimal hop depth");
                return paths;
            }
        }
        paths
    }

    /// Depth-limited enumeration over collapsed hops. Emits a path for
    /// every feasible completion exactly `remaining` hops below `at`.
    #[allow(clippy::too_many_arguments)]
    fn descend(
        &self,
        at: CollapsedId,
        remaining: usize,
        source: EventId,
        changes: &mut Vec<ActivityId>,
        headways: &mut Vec<ActivityId>,
        visited: &mut HashSet<CollapsedId>,
        completions: &Completions,
        mask: &[u64],
        view: TimeView,
        out: &mut Vec<Path>,
    ) {
        if remaining == 0 {
            if let Some(ends) = completions.get(&at) {
                for (arrival, chain) in ends {
                    let mut path_headways = headways.clone();
                    for &id in chain {
                        if self.network.activity(id).is_headway() {
                            path_headways.push(id);
                        }
                    }
                    out.push(Path {
                        weight: 0,
                        source,
                        target: *arrival,
                        arrival: self.network.event(*arrival).time_for(view),
                        changes: changes.clone(),
                        headways: path_headways,
                    });
                }
            }
            return;
        }

        for hop in self.collapsed.outgoing(at) {
            if visited.contains(&hop.target) {
                continue;
            }
            if !self.chain_feasible(&hop.chain, view) {
                continue;
            }
            let viable = if remaining == 1 {
                completions.contains_key(&hop.target)
            } else {
                completions.contains_key(&hop.target)
                    || self.reachability.reaches_any(hop.target, mask)
            };
            if !viable {
                continue;
            }

            let change_mark = changes.len();
            let headway_mark = headways.len();
            for &id in &hop.chain {
                let activity = self.network.activity(id);
                if activity.is_change() {
                    changes.push(id);
                } else if activity.is_headway() {
                    headways.push(id);
                }
            }
            visited.insert(hop.target);
            self.descend(
                hop.target,
                remaining - 1,
                source,
                changes,
                headways,
                visited,
                completions,
                mask,
                view,
                out,
            );
            visited.remove(&hop.target);
            changes.truncate(change_mark);
            headways.truncate(headway_mark);
        }
    }

    /// A hop-0 path from an on-trip chain.
    fn assemble(
        &self,
        source: EventId,
        target: EventId,
        chain: &[ActivityId],
        view: TimeView,
    ) -> Path {
        let (changes, headways) = split_chain(self.network, chain);
        Path {
            weight: 0,
            source,
            target,
            arrival: self.network.event(target).time_for(view),
            changes,
            headways,
        }
    }

    /// Whether every passenger-carrying activity of a chain satisfies its
    /// bound under the view. Headways are bookkeeping, not constraints on
    /// the passenger.
    fn chain_feasible(&self, chain: &[ActivityId], view: TimeView) -> bool {
        chain.iter().all(|&id| {
            let activity = self.network.activity(id);
            activity.is_headway() || self.network.duration_satisfied(activity, view)
        })
    }
}

/// Splits a chain into its change and headway ids, in travel order.
fn split_chain(
    network: &EventActivityNetwork,
    chain: &[ActivityId],
) -> (Vec<ActivityId>, Vec<ActivityId>) {
    let mut changes = Vec::new();
    let mut headways = Vec::new();
    for &id in chain {
        let activity = network.activity(id);
        if activity.is_change() {
            changes.push(id);
        } else if activity.is_headway() {
            headways.push(id);
        }
    }
    (changes, headways)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ActivityKind, EventKind};
    use crate::network::testutil::{act, ev, network};

    fn enumerator_parts(
        net: &EventActivityNetwork,
    ) -> (CollapsedNetwork, ReachabilityMatrix) {
        let collapsed = CollapsedNetwork::build(net);
        let reachability = ReachabilityMatrix::closure(&collapsed);
        (collapsed, reachability)
    }

    // One run A -> B -> C plus an alternative connection at B:
    //   E1 depA -d-> E2 arrB -w-> E3 depB -d-> E4 arrC
    //   E2 -change-> E5 depB -d-> E6 arrC
    fn rerouting_network() -> EventActivityNetwork {
        network(
            vec![
                ev(1, EventKind::Departure, 0, 1),
                ev(2, EventKind::Arrival, 10, 2),
                ev(3, EventKind::Departure, 12, 2),
                ev(4, EventKind::Arrival, 30, 3),
                ev(5, EventKind::Departure, 15, 2),
                ev(6, EventKind::Arrival, 40, 3),
            ],
            vec![
                act(1, ActivityKind::Drive, 1, 2, 8),
                act(2, ActivityKind::Wait, 2, 3, 1),
                act(3, ActivityKind::Drive, 3, 4, 15),
                act(4, ActivityKind::Change, 2, 5, 3),
                act(5, ActivityKind::Drive, 5, 6, 15),
            ],
        )
    }

    #[test]
    fn on_trip_path_follows_the_run() {
        let net = rerouting_network();
        let (collapsed, reachability) = enumerator_parts(&net);
        let enumerator = PathEnumerator::new(&net, &collapsed, &reachability, 8);

        let chain = enumerator
            .on_trip_path(EventId::new(1), EventId::new(4), TimeView::Scheduled)
            .unwrap();
        let ids: Vec<u32> = chain.iter().map(|a| a.get()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn on_trip_path_never_uses_a_change() {
        let net = rerouting_network();
        let (collapsed, reachability) = enumerator_parts(&net);
        let enumerator = PathEnumerator::new(&net, &collapsed, &reachability, 8);

        // E6 is only reachable through the change at E2.
        assert!(
            enumerator
                .on_trip_path(EventId::new(1), EventId::new(6), TimeView::Scheduled)
                .is_none()
        );
    }

    #[test]
    fn on_trip_successor_rule_is_lowest_target_id() {
        // A departure with two feasible onward drives: the walk must pick
        // the lowest target event id, independent of insertion order.
        let net = network(
            vec![
                ev(1, EventKind::Departure, 0, 1),
                ev(2, EventKind::Arrival, 700, 3),
                ev(3, EventKind::Arrival, 600, 2),
                ev(4, EventKind::Departure, 800, 3),
                ev(5, EventKind::Arrival, 1400, 4),
            ],
            vec![
                act(1, ActivityKind::Drive, 1, 2, 540),
                act(2, ActivityKind::Drive, 1, 3, 540),
                act(3, ActivityKind::Wait, 2, 4, 60),
                act(4, ActivityKind::Drive, 4, 5, 540),
            ],
        );
        let (collapsed, reachability) = enumerator_parts(&net);
        let enumerator = PathEnumerator::new(&net, &collapsed, &reachability, 8);

        // Both E2 (id 2) and E3 (id 3) continue the walk; E2 wins, so the
        // walk reaches E5.
        let chain = enumerator
            .on_trip_path(EventId::new(1), EventId::new(5), TimeView::Scheduled)
            .unwrap();
        let ids: Vec<u32> = chain.iter().map(|a| a.get()).collect();
        assert_eq!(ids, vec![1, 3, 4]);
    }

    #[test]
    fn scheduled_search_stays_on_trip() {
        let net = rerouting_network();
        let (collapsed, reachability) = enumerator_parts(&net);
        let enumerator = PathEnumerator::new(&net, &collapsed, &reachability, 8);

        let groups = enumerator.minimal_hop_search(
            &[EventId::new(1)],
            &[EventId::new(4), EventId::new(6)],
            TimeView::Scheduled,
        );

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].departure, EventTime::new(0));
        assert_eq!(groups[0].paths.len(), 1);
        let path = &groups[0].paths[0];
        assert_eq!(path.change_count(), 0);
        assert_eq!(path.target, EventId::new(4));
        assert_eq!(path.arrival, EventTime::new(30));
    }

    #[test]
    fn delayed_search_reroutes_through_the_change() {
        let mut net = rerouting_network();
        // E2 arrives at 20: the wait-connection onto E3 (dep 12) is gone,
        // the change onto E5 (held to 23) survives.
        net.set_disposition_times(&[(1, 0), (2, 20), (3, 12), (4, 30), (5, 23), (6, 40)])
            .unwrap();
        let (collapsed, reachability) = enumerator_parts(&net);
        let enumerator = PathEnumerator::new(&net, &collapsed, &reachability, 8);

        let groups = enumerator.minimal_hop_search(
            &[EventId::new(1)],
            &[EventId::new(4), EventId::new(6)],
            TimeView::Disposition,
        );

        assert_eq!(groups.len(), 1);
        let path = &groups[0].paths[0];
        assert_eq!(path.change_count(), 1);
        assert_eq!(path.changes, vec![ActivityId::new(4)]);
        assert_eq!(path.target, EventId::new(6));
        assert_eq!(path.arrival, EventTime::new(40));
    }

    #[test]
    fn broken_connection_with_no_alternative_yields_nothing() {
        let mut net = rerouting_network();
        // Both the wait and the change are missed.
        net.set_disposition_times(&[(1, 0), (2, 20), (3, 12), (4, 30), (5, 15), (6, 40)])
            .unwrap();
        let (collapsed, reachability) = enumerator_parts(&net);
        let enumerator = PathEnumerator::new(&net, &collapsed, &reachability, 8);

        let groups = enumerator.minimal_hop_search(
            &[EventId::new(1)],
            &[EventId::new(4), EventId::new(6)],
            TimeView::Disposition,
        );
        assert!(groups.is_empty());
    }

    // A diamond where a direct two-change chain and a one-change chain
    // coexist: minimality must pick the one-change path only.
    fn diamond_network() -> EventActivityNetwork {
        network(
            vec![
                ev(1, EventKind::Departure, 0, 1),
                ev(2, EventKind::Arrival, 100, 2),
                ev(3, EventKind::Departure, 200, 2),
                ev(4, EventKind::Arrival, 400, 4),
                ev(5, EventKind::Departure, 150, 2),
                ev(6, EventKind::Arrival, 300, 3),
                ev(7, EventKind::Departure, 400, 3),
                ev(8, EventKind::Arrival, 600, 4),
            ],
            vec![
                act(1, ActivityKind::Drive, 1, 2, 90),
                // One change: onto E3, straight to the destination.
                act(2, ActivityKind::Change, 2, 3, 60),
                act(3, ActivityKind::Drive, 3, 4, 180),
                // Two changes: onto E5, then at station 3 onto E7.
                act(4, ActivityKind::Change, 2, 5, 30),
                act(5, ActivityKind::Drive, 5, 6, 120),
                act(6, ActivityKind::Change, 6, 7, 60),
                act(7, ActivityKind::Drive, 7, 8, 150),
            ],
        )
    }

    #[test]
    fn search_returns_minimal_hop_depth_only() {
        let net = diamond_network();
        let (collapsed, reachability) = enumerator_parts(&net);
        let enumerator = PathEnumerator::new(&net, &collapsed, &reachability, 8);

        let groups = enumerator.minimal_hop_search(
            &[EventId::new(1)],
            &[EventId::new(4), EventId::new(8)],
            TimeView::Scheduled,
        );

        assert_eq!(groups.len(), 1);
        for path in &groups[0].paths {
            assert_eq!(path.change_count(), 1, "two-change path must not appear");
        }
        assert_eq!(groups[0].paths.len(), 1);
        assert_eq!(groups[0].paths[0].target, EventId::new(4));
    }

    #[test]
    fn two_changes_found_when_single_change_breaks() {
        let mut net = diamond_network();
        // The one-change connection onto E3 is missed; the two-change
        // chain via E5 and E7 survives.
        net.set_disposition_times(&[
            (1, 0),
            (2, 180),
            (3, 200),
            (4, 400),
            (5, 210),
            (6, 360),
            (7, 430),
            (8, 610),
        ])
        .unwrap();
        let (collapsed, reachability) = enumerator_parts(&net);
        let enumerator = PathEnumerator::new(&net, &collapsed, &reachability, 8);

        let groups = enumerator.minimal_hop_search(
            &[EventId::new(1)],
            &[EventId::new(4), EventId::new(8)],
            TimeView::Disposition,
        );

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].paths.len(), 1);
        let path = &groups[0].paths[0];
        assert_eq!(path.change_count(), 2);
        assert_eq!(
            path.changes,
            vec![ActivityId::new(4), ActivityId::new(6)]
        );
        assert_eq!(path.target, EventId::new(8));
    }

    #[test]
    fn later_departures_prune_earlier_ones() {
        // Two departures to the same destination. The later one (processed
        // first) arrives at 500; the earlier one can only reach an arrival
        // at 800, which is later than 500 and therefore pruned.
        let net = network(
            vec![
                ev(1, EventKind::Departure, 0, 1),
                ev(2, EventKind::Arrival, 800, 2),
                ev(3, EventKind::Departure, 100, 1),
                ev(4, EventKind::Arrival, 500, 2),
            ],
            vec![
                act(1, ActivityKind::Drive, 1, 2, 700),
                act(2, ActivityKind::Drive, 3, 4, 400),
            ],
        );
        let (collapsed, reachability) = enumerator_parts(&net);
        let enumerator = PathEnumerator::new(&net, &collapsed, &reachability, 8);

        let groups = enumerator.minimal_hop_search(
            &[EventId::new(1), EventId::new(3)],
            &[EventId::new(2), EventId::new(4)],
            TimeView::Scheduled,
        );

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].departure, EventTime::new(100));
        assert_eq!(groups[0].paths[0].target, EventId::new(4));
    }

    #[test]
    fn equal_departure_times_form_one_group() {
        // Two simultaneous departures on separate runs to the same
        // destination station: one group, both paths kept.
        let net = network(
            vec![
                ev(1, EventKind::Departure, 0, 1),
                ev(2, EventKind::Arrival, 500, 2),
                ev(3, EventKind::Departure, 0, 1),
                ev(4, EventKind::Arrival, 500, 2),
            ],
            vec![
                act(1, ActivityKind::Drive, 1, 2, 400),
                act(2, ActivityKind::Drive, 3, 4, 400),
            ],
        );
        let (collapsed, reachability) = enumerator_parts(&net);
        let enumerator = PathEnumerator::new(&net, &collapsed, &reachability, 8);

        let groups = enumerator.minimal_hop_search(
            &[EventId::new(1), EventId::new(3)],
            &[EventId::new(2), EventId::new(4)],
            TimeView::Scheduled,
        );

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].paths.len(), 2);
    }
}
