//! Shared constructors for hand-built test networks.

use crate::domain::{ActivityKind, EventKind};

use super::{ActivityRecord, EventActivityNetwork, EventRecord};

pub(crate) fn ev(id: u32, kind: EventKind, time: i64, station: u32) -> EventRecord {
    EventRecord {
        id,
        periodic_id: id,
        kind,
        time,
        weight: 0.0,
        station: Some(station),
    }
}

pub(crate) fn act(id: u32, kind: ActivityKind, source: u32, target: u32, lower: i64) -> ActivityRecord {
    ActivityRecord {
        id,
        periodic_id: id,
        kind,
        source,
        target,
        lower_bound: lower,
        upper_bound: lower + 3600,
        weight: 0.0,
        counterpart: None,
    }
}

/// Builds a network and commits a disposition timetable equal to the
/// schedule, so tests only override the events they delay.
pub(crate) fn network(
    events: Vec<EventRecord>,
    activities: Vec<ActivityRecord>,
) -> EventActivityNetwork {
    let mut net = EventActivityNetwork::from_records(&events, &activities, &[], 3600)
        .expect("test network must build");
    let on_schedule: Vec<(u32, i64)> = events.iter().map(|e| (e.id, e.time)).collect();
    net.set_disposition_times(&on_schedule).unwrap();
    net
}
