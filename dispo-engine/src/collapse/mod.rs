//! The collapsed connection network.
//!
//! Passengers only make decisions where they can board a vehicle after a
//! transfer. The collapsed network keeps exactly those decision points: one
//! node per departure event that is the target of some change activity, and
//! one edge per drive/wait run from such a node to the next reachable
//! change. Everything in between (the individual drives, waits, and any
//! headways passed on the way) is recorded on the edge's chain but hidden
//! from the graph structure.
//!
//! The collapsed network is a read-only view derived once per underlying
//! network; it stores ids, never references, and must be rebuilt if the
//! network's structure changes.

mod reachability;

use std::collections::HashMap;

use tracing::debug;

use crate::domain::{ActivityId, ActivityKind, CollapsedId, EventId};
use crate::network::EventActivityNetwork;

pub use reachability::ReachabilityMatrix;

/// A boarding opportunity: a departure event reachable via some change.
#[derive(Debug, Clone)]
pub struct CollapsedEvent {
    pub id: CollapsedId,
    /// The departure event this node wraps.
    pub event: EventId,
    /// Indices into the collapsed activity arena.
    pub outgoing: Vec<usize>,
}

/// One collapsed hop: a drive/wait run ending in a change.
#[derive(Debug, Clone)]
pub struct CollapsedActivity {
    pub source: CollapsedId,
    pub target: CollapsedId,
    /// The original activities realizing this hop, in traversal order. The
    /// final element is the change that boards the target; headways
    /// encountered along the run are absorbed for bookkeeping.
    pub chain: Vec<ActivityId>,
}

/// A first boarding opportunity ahead of an event.
///
/// Produced by [`CollapsedNetwork::forward_connections`]; the chain runs
/// from the queried event up to and including the boarding change.
#[derive(Debug, Clone)]
pub struct ForwardConnection {
    pub target: CollapsedId,
    pub chain: Vec<ActivityId>,
}

/// A boarding opportunity behind an arrival.
///
/// Produced by [`CollapsedNetwork::backward_connections`]; the chain runs
/// from the collapsed event's departure to the queried arrival, with no
/// change in between.
#[derive(Debug, Clone)]
pub struct BackwardConnection {
    pub source: CollapsedId,
    pub chain: Vec<ActivityId>,
}

/// The derived graph of passenger-relevant connection opportunities.
#[derive(Debug, Clone)]
pub struct CollapsedNetwork {
    events: Vec<CollapsedEvent>,
    activities: Vec<CollapsedActivity>,
    by_event: HashMap<EventId, CollapsedId>,
}

impl CollapsedNetwork {
    /// Builds the collapsed view of a network.
    ///
    /// Seeds one node per distinct change target, then runs an exhaustive
    /// forward walk from each seed: drives and waits are followed, every
    /// change found emits one collapsed activity, and headways met along
    /// the way are absorbed into the chain. A seed without an onward drive
    /// contributes no edges; that is a dead end worth a log line, not an
    /// error.
    pub fn build(network: &EventActivityNetwork) -> Self {
        let mut targets: Vec<EventId> = network
            .ids_of_kind(ActivityKind::Change)
            .iter()
            .map(|&id| network.activity(id).target)
            .collect();
        targets.sort_unstable();
        targets.dedup();

        let by_event: HashMap<EventId, CollapsedId> = targets
            .iter()
            .enumerate()
            .map(|(index, &event)| (event, CollapsedId::from_index(index)))
            .collect();
        let mut events: Vec<CollapsedEvent> = targets
            .iter()
            .enumerate()
            .map(|(index, &event)| CollapsedEvent {
                id: CollapsedId::from_index(index),
                event,
                outgoing: Vec::new(),
            })
            .collect();

        let mut activities = Vec::new();
        let mut collapsed = Self {
            events: Vec::new(),
            activities: Vec::new(),
            by_event,
        };

        for index in 0..events.len() {
            let seed = &events[index];
            let hops = collapsed.walk_forward(network, seed.event);
            if hops.is_empty() {
                debug!(event = %seed.event, "boarding opportunity without onward connection");
            }
            for (target, chain) in hops {
                let slot = activities.len();
                activities.push(CollapsedActivity {
                    source: CollapsedId::from_index(index),
                    target,
                    chain,
                });
                events[index].outgoing.push(slot);
            }
        }

        debug!(
            nodes = events.len(),
            edges = activities.len(),
            "collapsed network built"
        );
        collapsed.events = events;
        collapsed.activities = activities;
        collapsed
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> impl Iterator<Item = &CollapsedEvent> {
        self.events.iter()
    }

    pub fn activities(&self) -> impl Iterator<Item = &CollapsedActivity> {
        self.activities.iter()
    }

    pub fn event(&self, id: CollapsedId) -> &CollapsedEvent {
        &self.events[id.index()]
    }

    /// The collapsed node wrapping the given event, if it is one.
    pub fn collapsed_id(&self, event: EventId) -> Option<CollapsedId> {
        self.by_event.get(&event).copied()
    }

    /// Collapsed hops leaving the given node.
    pub fn outgoing(&self, id: CollapsedId) -> impl Iterator<Item = &CollapsedActivity> {
        self.events[id.index()]
            .outgoing
            .iter()
            .map(|&slot| &self.activities[slot])
    }

    /// Every boarding opportunity ahead of `from`, one entry per distinct
    /// realizing chain: the walk follows drives and waits, does not stop at
    /// the first change found, and reports each change's target.
    pub fn forward_connections(
        &self,
        network: &EventActivityNetwork,
        from: EventId,
    ) -> Vec<ForwardConnection> {
        self.walk_forward(network, from)
            .into_iter()
            .map(|(target, chain)| ForwardConnection { target, chain })
            .collect()
    }

    /// Every boarding opportunity behind `to`: collapsed nodes from whose
    /// departure the queried arrival is reachable along drives and waits
    /// alone.
    pub fn backward_connections(
        &self,
        network: &EventActivityNetwork,
        to: EventId,
    ) -> Vec<BackwardConnection> {
        let limit = network.activity_count();
        let mut connections = Vec::new();
        // Chains are accumulated back-to-front and reversed on emission.
        let mut stack: Vec<(EventId, Vec<ActivityId>)> = vec![(to, Vec::new())];

        while let Some((event, mut chain)) = stack.pop() {
            if chain.len() > limit {
                debug!(event = %event, "backward walk aborted, chain longer than the network");
                continue;
            }
            // Boarding here reaches `to` without any further change. The
            // node's own headways belong to the previous hop and are left
            // out.
            if let Some(&source) = self.by_event.get(&event) {
                let mut forward: Vec<ActivityId> = chain.clone();
                forward.reverse();
                connections.push(BackwardConnection {
                    source,
                    chain: forward,
                });
            }
            for &id in &network.event(event).outgoing {
                if network.activity(id).is_headway() {
                    chain.push(id);
                }
            }
            for &id in &network.event(event).incoming {
                let activity = network.activity(id);
                if activity.is_on_trip() {
                    let mut next = chain.clone();
                    next.push(id);
                    stack.push((activity.source, next));
                }
            }
        }
        connections
    }

    /// Shared forward walk: follows drives and waits from `from`, absorbs
    /// the headways of every event reached on the way, and reports each
    /// change found together with its realizing chain. The walk never
    /// traverses a change; branches continue past it.
    fn walk_forward(
        &self,
        network: &EventActivityNetwork,
        from: EventId,
    ) -> Vec<(CollapsedId, Vec<ActivityId>)> {
        let limit = network.activity_count();
        let mut found = Vec::new();
        let mut stack: Vec<(EventId, Vec<ActivityId>)> = Vec::new();

        // The starting event contributes its on-trip continuations only;
        // its own headways and changes belong to the hop that reached it.
        for &id in &network.event(from).outgoing {
            let activity = network.activity(id);
            if activity.is_on_trip() {
                stack.push((activity.target, vec![id]));
            }
        }

        while let Some((event, mut chain)) = stack.pop() {
            if chain.len() > limit {
                debug!(event = %event, "forward walk aborted, chain longer than the network");
                continue;
            }
            for &id in &network.event(event).outgoing {
                if network.activity(id).is_headway() {
                    chain.push(id);
                }
            }
            for &id in &network.event(event).outgoing {
                let activity = network.activity(id);
                match activity.kind() {
                    ActivityKind::Change => {
                        if let Some(&target) = self.by_event.get(&activity.target) {
                            let mut full = chain.clone();
                            full.push(id);
                            found.push((target, full));
                        }
                    }
                    ActivityKind::Drive | ActivityKind::Wait => {
                        let mut next = chain.clone();
                        next.push(id);
                        stack.push((activity.target, next));
                    }
                    _ => {}
                }
            }
        }
        found
    }
}
