//! Non-periodic events: arrivals and departures of vehicle runs.

use serde::{Deserialize, Serialize};

use super::{ActivityId, EventId, EventTime, StationId, TimeView};

/// Whether an event is a vehicle arriving at or departing from its station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Arrival,
    Departure,
}

/// A non-periodic event in the event-activity network.
///
/// Events are owned by the
/// [`EventActivityNetwork`](crate::network::EventActivityNetwork) arena and
/// addressed by [`EventId`]. The incident activity lists are maintained by
/// the network builder and ordered by activity id.
///
/// An event carries two times: the scheduled `time` from the published
/// timetable and the `dispo_time` decided by the upstream re-timetabling
/// step. Until a disposition timetable is loaded, `dispo_time` holds the
/// sentinel `time - 1` so that accidental reads are visibly wrong.
#[derive(Debug, Clone)]
pub struct Event {
    pub id: EventId,
    /// Id of the periodic event this one was rolled out from.
    pub periodic_id: u32,
    pub kind: EventKind,
    pub station: StationId,
    /// Scheduled time.
    pub time: EventTime,
    /// Disposition (actual) time.
    pub dispo_time: EventTime,
    /// Externally injected primary delay, in seconds.
    pub source_delay: i64,
    /// Passenger weight accumulated onto this event during propagation.
    pub weight: f64,
    pub is_start_of_trip: bool,
    pub is_end_of_trip: bool,
    /// Activities leaving this event, ordered by activity id.
    pub outgoing: Vec<ActivityId>,
    /// Activities entering this event, ordered by activity id.
    pub incoming: Vec<ActivityId>,
}

impl Event {
    pub fn is_arrival(&self) -> bool {
        self.kind == EventKind::Arrival
    }

    pub fn is_departure(&self) -> bool {
        self.kind == EventKind::Departure
    }

    /// The event's time under the given timetable view.
    pub fn time_for(&self, view: TimeView) -> EventTime {
        match view {
            TimeView::Scheduled => self.time,
            TimeView::Disposition => self.dispo_time,
        }
    }

    /// Seconds this event occurs later than scheduled.
    pub fn delay(&self) -> i64 {
        self.dispo_time - self.time
    }
}
