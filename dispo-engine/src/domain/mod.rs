//! Core domain types for the delay-management engine.
//!
//! Events, activities, times and identifiers. Everything here is plain data:
//! ownership and the structural invariants live in
//! [`network`](crate::network), which arranges these types into the
//! event-activity network.

mod activity;
mod event;
mod ids;
mod time;

pub use activity::{Activity, ActivityKind, ActivityPayload, ConnectionStatus, HeadwayOrder};
pub use event::{Event, EventKind};
pub use ids::{ActivityId, CollapsedId, EventId, StationId};
pub use time::{EventTime, TimeView, periodic_duration};
