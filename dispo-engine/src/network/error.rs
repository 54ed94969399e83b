//! Error types for network construction and validation.
//!
//! Three distinct failure classes, mirroring when they can occur: structural
//! errors at construction, consistency errors from the explicit invariant
//! checks, and timetable errors from the feasibility checks. "No path found"
//! is never an error anywhere in the crate.

use crate::domain::{ActivityId, ActivityKind, EventId};

/// A malformed graph that cannot be constructed.
///
/// Raised while building the network from input records; never recovered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructuralError {
    /// The event table was empty or absent.
    #[error("event table is empty")]
    NoEvents,

    /// The activity table was empty or absent.
    #[error("activity table is empty")]
    NoActivities,

    /// Event ids must be contiguous starting at 1.
    #[error("event ids are not contiguous: expected {expected}, found {found}")]
    NonContiguousEventId { expected: u32, found: u32 },

    /// Activity ids must be contiguous starting at 1.
    #[error("activity ids are not contiguous: expected {expected}, found {found}")]
    NonContiguousActivityId { expected: u32, found: u32 },

    /// An activity referenced an event id outside the event table.
    #[error("activity {activity} references unknown event {event}")]
    UnknownEndpoint { activity: u32, event: u32 },

    /// An activity with source == target.
    #[error("activity {0} is a self-loop")]
    SelfLoop(ActivityId),

    /// A headway activity whose reverse-direction partner could not be
    /// found, neither by explicit column nor by symmetric-endpoint search.
    #[error("headway activity {0} has no recoverable counterpart")]
    UnpairedHeadway(ActivityId),

    /// A lookup (disposition time, source delay) named an event that does
    /// not exist.
    #[error("unknown event id {0}")]
    UnknownEvent(u32),

    /// A lookup named an activity that does not exist.
    #[error("unknown activity id {0}")]
    UnknownActivity(u32),
}

/// A violated graph invariant, found by [`check_consistency`].
///
/// [`check_consistency`]: crate::network::EventActivityNetwork::check_consistency
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsistencyError {
    /// An event with no incident activity at all.
    #[error("event {0} is isolated (no incident activities)")]
    IsolatedEvent(EventId),

    /// An arena slot whose stored id disagrees with its position.
    #[error("event arena corrupt: slot {slot} holds id {found}")]
    MisplacedEvent { slot: usize, found: EventId },

    /// A typed bucket containing an activity of a different kind.
    #[error("activity {activity} is in the {bucket} bucket but has kind {actual}")]
    WrongBucket {
        activity: ActivityId,
        bucket: ActivityKind,
        actual: ActivityKind,
    },

    /// A headway pair whose counterparts are not mutual or whose endpoints
    /// are not mirrored.
    #[error("headway activities {first} and {second} are not a symmetric pair")]
    BrokenHeadwayPair {
        first: ActivityId,
        second: ActivityId,
    },

    /// Headway lower bounds must be strictly positive.
    #[error("headway activity {0} has a non-positive lower bound")]
    DegenerateHeadway(ActivityId),
}

/// A timetable that violates its own duration bounds, found by
/// [`check_timetable`].
///
/// [`check_timetable`]: crate::network::EventActivityNetwork::check_timetable
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimetableError {
    /// A fixed or change activity whose scheduled duration is below its
    /// lower bound.
    #[error(
        "activity {activity} ({kind}) has duration {actual}s, below its lower bound of {required}s"
    )]
    BoundViolated {
        activity: ActivityId,
        kind: ActivityKind,
        required: i64,
        actual: i64,
    },

    /// A headway pair where neither direction satisfies its bound.
    #[error("headway pair {first}/{second}: neither direction satisfies its lower bound")]
    InfeasibleHeadwayPair {
        first: ActivityId,
        second: ActivityId,
    },
}
