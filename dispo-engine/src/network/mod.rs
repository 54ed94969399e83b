//! The event-activity network: ownership, construction and validation.
//!
//! [`EventActivityNetwork`] owns every event and activity of a rolled-out
//! timetable and guarantees the structural invariants the derived views
//! (collapsed network, reachability matrix) and the propagation engine
//! depend on. Input enters through the serde-derived interface records;
//! validation is split into construction-time
//! [`StructuralError`]s and opt-in [`ConsistencyError`]/[`TimetableError`]
//! checks.

mod build;
mod checks;
mod error;
mod graph;
mod records;

#[cfg(test)]
pub(crate) mod testutil;

pub use error::{ConsistencyError, StructuralError, TimetableError};
pub use graph::{EventActivityNetwork, NetworkStatistics};
pub use records::{
    ActivityRecord, EventRecord, OdEntry, PassengerArrivalRecord, PassengerArrivalTable,
};
