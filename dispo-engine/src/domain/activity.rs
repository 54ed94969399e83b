//! Non-periodic activities: the typed edges of the event-activity network.
//!
//! The concrete activity kinds differ only in a small amount of extra state
//! (the tri-state decisions on changes and headways), so the model is a
//! single `Activity` struct with the shared fields and a payload enum for
//! the kind-specific part.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{ActivityId, EventId};

/// The kind of an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    /// A vehicle moving between two stations.
    Drive,
    /// A vehicle dwelling at a station between arrival and departure.
    Wait,
    /// A vehicle ending one trip and starting another.
    Turnaround,
    /// A passenger transfer from an arrival to a departure.
    Change,
    /// A minimum-separation constraint between two movements sharing
    /// infrastructure.
    Headway,
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActivityKind::Drive => "drive",
            ActivityKind::Wait => "wait",
            ActivityKind::Turnaround => "turnaround",
            ActivityKind::Change => "change",
            ActivityKind::Headway => "headway",
        };
        f.write_str(name)
    }
}

/// Whether a passenger connection survives the disposition timetable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionStatus {
    /// Not yet decided.
    #[default]
    Unset,
    /// The disposition times leave enough room for the transfer.
    Maintained,
    /// The connecting departure leaves before the transfer is possible.
    Missed,
}

/// Which direction of a headway pair holds under the disposition timetable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HeadwayOrder {
    /// Not yet decided.
    #[default]
    Unset,
    /// This direction goes first; its separation bound is enforced.
    Granted,
    /// The counterpart direction goes first.
    Yielded,
}

/// Kind-specific state of an activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityPayload {
    Drive,
    Wait,
    Turnaround,
    Change {
        status: ConnectionStatus,
    },
    Headway {
        /// The reverse-direction activity of the same station pair.
        counterpart: ActivityId,
        order: HeadwayOrder,
    },
}

impl ActivityPayload {
    pub fn kind(&self) -> ActivityKind {
        match self {
            ActivityPayload::Drive => ActivityKind::Drive,
            ActivityPayload::Wait => ActivityKind::Wait,
            ActivityPayload::Turnaround => ActivityKind::Turnaround,
            ActivityPayload::Change { .. } => ActivityKind::Change,
            ActivityPayload::Headway { .. } => ActivityKind::Headway,
        }
    }
}

/// A non-periodic activity connecting two events.
///
/// Owned by the [`EventActivityNetwork`](crate::network::EventActivityNetwork)
/// arena; `source` and `target` are arena ids, never references, so the graph
/// can be mutated freely during traversal bookkeeping.
#[derive(Debug, Clone)]
pub struct Activity {
    pub id: ActivityId,
    /// Id of the periodic activity this one was rolled out from.
    pub periodic_id: u32,
    pub source: EventId,
    pub target: EventId,
    /// Minimum duration in seconds.
    pub lower_bound: i64,
    /// Maximum duration in seconds.
    pub upper_bound: i64,
    /// Passenger weight accumulated onto this activity during propagation.
    pub weight: f64,
    /// Externally injected primary delay, in seconds.
    pub source_delay: i64,
    pub payload: ActivityPayload,
}

impl Activity {
    pub fn kind(&self) -> ActivityKind {
        self.payload.kind()
    }

    pub fn is_change(&self) -> bool {
        matches!(self.payload, ActivityPayload::Change { .. })
    }

    pub fn is_headway(&self) -> bool {
        matches!(self.payload, ActivityPayload::Headway { .. })
    }

    /// True for drive and wait activities, which keep a passenger on the
    /// same physical vehicle run.
    pub fn is_on_trip(&self) -> bool {
        matches!(
            self.payload,
            ActivityPayload::Drive | ActivityPayload::Wait
        )
    }

    /// The paired reverse-direction activity, for headways.
    pub fn counterpart(&self) -> Option<ActivityId> {
        match self.payload {
            ActivityPayload::Headway { counterpart, .. } => Some(counterpart),
            _ => None,
        }
    }

    /// The connection decision, for changes.
    pub fn connection_status(&self) -> Option<ConnectionStatus> {
        match self.payload {
            ActivityPayload::Change { status } => Some(status),
            _ => None,
        }
    }

    /// The priority decision, for headways.
    pub fn headway_order(&self) -> Option<HeadwayOrder> {
        match self.payload {
            ActivityPayload::Headway { order, .. } => Some(order),
            _ => None,
        }
    }

    pub(crate) fn set_connection_status(&mut self, status: ConnectionStatus) {
        if let ActivityPayload::Change { status: s } = &mut self.payload {
            *s = status;
        }
    }

    pub(crate) fn set_headway_order(&mut self, order: HeadwayOrder) {
        if let ActivityPayload::Headway { order: o, .. } = &mut self.payload {
            *o = order;
        }
    }
}
