//! Network construction from interface records.

use std::collections::HashMap;

use tracing::debug;

use crate::domain::{
    Activity, ActivityId, ActivityKind, ActivityPayload, ConnectionStatus, Event, EventId,
    EventTime, HeadwayOrder, StationId,
};

use super::{ActivityRecord, EventActivityNetwork, EventRecord, StructuralError};

impl EventActivityNetwork {
    /// Builds the network from the events, activities and end-of-trip
    /// tables.
    ///
    /// Every activity is cross-linked into its source's outgoing and its
    /// target's incoming list (ordered by activity id). Headway rows are
    /// paired through their explicit counterpart column when present;
    /// otherwise the partner is recovered by symmetric-endpoint search,
    /// preferring the adjacent row since exporters write pairs
    /// consecutively.
    ///
    /// # Errors
    ///
    /// Fails with a [`StructuralError`] on empty tables, non-contiguous
    /// ids, unknown endpoints, self-loops, or unpairable headways. A graph
    /// that fails here is never partially constructed.
    pub fn from_records(
        events: &[EventRecord],
        activities: &[ActivityRecord],
        end_of_trip: &[u32],
        period: i64,
    ) -> Result<Self, StructuralError> {
        if events.is_empty() {
            return Err(StructuralError::NoEvents);
        }
        if activities.is_empty() {
            return Err(StructuralError::NoActivities);
        }

        let mut event_rows: Vec<&EventRecord> = events.iter().collect();
        event_rows.sort_by_key(|r| r.id);
        for (index, row) in event_rows.iter().enumerate() {
            let expected = index as u32 + 1;
            if row.id != expected {
                return Err(StructuralError::NonContiguousEventId {
                    expected,
                    found: row.id,
                });
            }
        }

        let mut activity_rows: Vec<&ActivityRecord> = activities.iter().collect();
        activity_rows.sort_by_key(|r| r.id);
        for (index, row) in activity_rows.iter().enumerate() {
            let expected = index as u32 + 1;
            if row.id != expected {
                return Err(StructuralError::NonContiguousActivityId {
                    expected,
                    found: row.id,
                });
            }
        }

        let event_count = event_rows.len() as u32;
        for row in &activity_rows {
            for endpoint in [row.source, row.target] {
                if endpoint == 0 || endpoint > event_count {
                    return Err(StructuralError::UnknownEndpoint {
                        activity: row.id,
                        event: endpoint,
                    });
                }
            }
            if row.source == row.target {
                return Err(StructuralError::SelfLoop(ActivityId::new(row.id)));
            }
        }

        let counterparts = pair_headways(&activity_rows)?;

        let mut built_events: Vec<Event> = event_rows
            .iter()
            .map(|row| Event {
                id: EventId::new(row.id),
                periodic_id: row.periodic_id,
                kind: row.kind,
                station: row.station.map(StationId::new).unwrap_or(StationId::NONE),
                time: EventTime::new(row.time),
                // Sentinel until a disposition timetable is loaded.
                dispo_time: EventTime::new(row.time - 1),
                source_delay: 0,
                weight: row.weight,
                is_start_of_trip: false,
                is_end_of_trip: false,
                outgoing: Vec::new(),
                incoming: Vec::new(),
            })
            .collect();

        let mut drive = Vec::new();
        let mut wait = Vec::new();
        let mut turnaround = Vec::new();
        let mut change = Vec::new();
        let mut headway = Vec::new();

        let built_activities: Vec<Activity> = activity_rows
            .iter()
            .map(|row| {
                let id = ActivityId::new(row.id);
                let payload = match row.kind {
                    ActivityKind::Drive => {
                        drive.push(id);
                        ActivityPayload::Drive
                    }
                    ActivityKind::Wait => {
                        wait.push(id);
                        ActivityPayload::Wait
                    }
                    ActivityKind::Turnaround => {
                        turnaround.push(id);
                        ActivityPayload::Turnaround
                    }
                    ActivityKind::Change => {
                        change.push(id);
                        ActivityPayload::Change {
                            status: ConnectionStatus::Unset,
                        }
                    }
                    ActivityKind::Headway => {
                        headway.push(id);
                        ActivityPayload::Headway {
                            counterpart: counterparts[&row.id],
                            order: HeadwayOrder::Unset,
                        }
                    }
                };
                Activity {
                    id,
                    periodic_id: row.periodic_id,
                    source: EventId::new(row.source),
                    target: EventId::new(row.target),
                    lower_bound: row.lower_bound,
                    upper_bound: row.upper_bound,
                    weight: row.weight,
                    source_delay: 0,
                    payload,
                }
            })
            .collect();

        // Cross-link incident lists; ascending activity id because the rows
        // were sorted above.
        for activity in &built_activities {
            built_events[activity.source.index()].outgoing.push(activity.id);
            built_events[activity.target.index()].incoming.push(activity.id);
        }

        // Trip boundary flags: a trip starts where no drive/wait enters and
        // ends where the marker table says so, or where no drive/wait
        // leaves.
        for event in &mut built_events {
            event.is_start_of_trip = !event
                .incoming
                .iter()
                .any(|&a| built_activities[a.index()].is_on_trip());
            event.is_end_of_trip = !event
                .outgoing
                .iter()
                .any(|&a| built_activities[a.index()].is_on_trip());
        }
        for &id in end_of_trip {
            if id == 0 || id > event_count {
                return Err(StructuralError::UnknownEvent(id));
            }
            built_events[id as usize - 1].is_end_of_trip = true;
        }

        let network = Self {
            events: built_events,
            activities: built_activities,
            drive,
            wait,
            turnaround,
            change,
            headway,
            period,
        };

        let stats = network.statistics();
        debug!(
            events = stats.events,
            drive = stats.drive,
            wait = stats.wait,
            turnaround = stats.turnaround,
            change = stats.change,
            headway = stats.headway,
            "event-activity network built"
        );

        Ok(network)
    }
}

/// Resolves every headway row to its reverse-direction partner.
fn pair_headways(
    rows: &[&ActivityRecord],
) -> Result<HashMap<u32, ActivityId>, StructuralError> {
    // Endpoint index over headway rows only.
    let mut by_endpoints: HashMap<(u32, u32), Vec<u32>> = HashMap::new();
    for row in rows {
        if row.kind == ActivityKind::Headway {
            by_endpoints
                .entry((row.source, row.target))
                .or_default()
                .push(row.id);
        }
    }

    let mut counterparts = HashMap::new();
    for row in rows {
        if row.kind != ActivityKind::Headway {
            continue;
        }
        if let Some(explicit) = row.counterpart {
            // Rows are contiguous and sorted, so the id doubles as index.
            let partner = rows
                .get(explicit.wrapping_sub(1) as usize)
                .filter(|partner| partner.kind == ActivityKind::Headway)
                .ok_or(StructuralError::UnpairedHeadway(ActivityId::new(row.id)))?;
            counterparts.insert(row.id, ActivityId::new(partner.id));
            continue;
        }
        let reversed = by_endpoints
            .get(&(row.target, row.source))
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        // Pairs are normally exported adjacently; prefer the neighbouring
        // row when several share the same endpoints.
        let partner = reversed
            .iter()
            .find(|&&id| id == row.id + 1 || id + 1 == row.id)
            .or_else(|| reversed.first())
            .copied()
            .ok_or(StructuralError::UnpairedHeadway(ActivityId::new(row.id)))?;
        counterparts.insert(row.id, ActivityId::new(partner));
    }
    Ok(counterparts)
}

#[cfg(test)]
mod tests {
    use super::super::testutil::{act, ev};
    use super::*;
    use crate::domain::EventKind;

    fn simple_events() -> Vec<EventRecord> {
        vec![
            ev(1, EventKind::Departure, 0, 1),
            ev(2, EventKind::Arrival, 600, 2),
        ]
    }

    #[test]
    fn rejects_empty_tables() {
        let events = simple_events();
        let activities = vec![act(1, ActivityKind::Drive, 1, 2, 540)];

        assert_eq!(
            EventActivityNetwork::from_records(&[], &activities, &[], 3600).unwrap_err(),
            StructuralError::NoEvents
        );
        assert_eq!(
            EventActivityNetwork::from_records(&events, &[], &[], 3600).unwrap_err(),
            StructuralError::NoActivities
        );
    }

    #[test]
    fn rejects_gap_in_event_ids() {
        let events = vec![
            ev(1, EventKind::Departure, 0, 1),
            ev(3, EventKind::Arrival, 600, 2),
        ];
        let activities = vec![act(1, ActivityKind::Drive, 1, 3, 540)];

        assert_eq!(
            EventActivityNetwork::from_records(&events, &activities, &[], 3600).unwrap_err(),
            StructuralError::NonContiguousEventId {
                expected: 2,
                found: 3
            }
        );
    }

    #[test]
    fn rejects_unknown_endpoint_and_self_loop() {
        let events = simple_events();

        let dangling = vec![act(1, ActivityKind::Drive, 1, 9, 540)];
        assert_eq!(
            EventActivityNetwork::from_records(&events, &dangling, &[], 3600).unwrap_err(),
            StructuralError::UnknownEndpoint {
                activity: 1,
                event: 9
            }
        );

        let looped = vec![act(1, ActivityKind::Drive, 1, 1, 540)];
        assert_eq!(
            EventActivityNetwork::from_records(&events, &looped, &[], 3600).unwrap_err(),
            StructuralError::SelfLoop(ActivityId::new(1))
        );
    }

    #[test]
    fn cross_links_are_ordered_by_activity_id() {
        let events = vec![
            ev(1, EventKind::Departure, 0, 1),
            ev(2, EventKind::Arrival, 600, 2),
            ev(3, EventKind::Arrival, 700, 3),
        ];
        let activities = vec![
            act(2, ActivityKind::Drive, 1, 3, 600),
            act(1, ActivityKind::Drive, 1, 2, 540),
        ];
        let net = EventActivityNetwork::from_records(&events, &activities, &[], 3600).unwrap();

        let outgoing = &net.event(EventId::new(1)).outgoing;
        assert_eq!(outgoing, &[ActivityId::new(1), ActivityId::new(2)]);
    }

    #[test]
    fn headways_pair_by_symmetric_endpoints() {
        let events = vec![
            ev(1, EventKind::Departure, 0, 1),
            ev(2, EventKind::Departure, 120, 1),
            ev(3, EventKind::Arrival, 600, 2),
            ev(4, EventKind::Arrival, 720, 2),
        ];
        let activities = vec![
            act(1, ActivityKind::Drive, 1, 3, 540),
            act(2, ActivityKind::Drive, 2, 4, 540),
            act(3, ActivityKind::Headway, 1, 2, 120),
            act(4, ActivityKind::Headway, 2, 1, 120),
        ];
        let net = EventActivityNetwork::from_records(&events, &activities, &[], 3600).unwrap();

        assert_eq!(
            net.activity(ActivityId::new(3)).counterpart(),
            Some(ActivityId::new(4))
        );
        assert_eq!(
            net.activity(ActivityId::new(4)).counterpart(),
            Some(ActivityId::new(3))
        );
    }

    #[test]
    fn explicit_counterpart_column_wins_and_is_validated() {
        let events = vec![
            ev(1, EventKind::Departure, 0, 1),
            ev(2, EventKind::Departure, 120, 1),
            ev(3, EventKind::Arrival, 600, 2),
            ev(4, EventKind::Arrival, 720, 2),
        ];
        let mut activities = vec![
            act(1, ActivityKind::Drive, 1, 3, 540),
            act(2, ActivityKind::Drive, 2, 4, 540),
            act(3, ActivityKind::Headway, 1, 2, 120),
            act(4, ActivityKind::Headway, 2, 1, 120),
        ];
        activities[2].counterpart = Some(4);
        activities[3].counterpart = Some(3);
        let net = EventActivityNetwork::from_records(&events, &activities, &[], 3600).unwrap();
        assert_eq!(
            net.activity(ActivityId::new(3)).counterpart(),
            Some(ActivityId::new(4))
        );

        // Pointing at a non-headway row is rejected outright.
        activities[2].counterpart = Some(1);
        assert_eq!(
            EventActivityNetwork::from_records(&events, &activities, &[], 3600).unwrap_err(),
            StructuralError::UnpairedHeadway(ActivityId::new(3))
        );
    }

    #[test]
    fn unpaired_headway_is_rejected() {
        let events = vec![
            ev(1, EventKind::Departure, 0, 1),
            ev(2, EventKind::Departure, 120, 1),
            ev(3, EventKind::Arrival, 600, 2),
        ];
        let activities = vec![
            act(1, ActivityKind::Drive, 1, 3, 540),
            act(2, ActivityKind::Headway, 1, 2, 120),
        ];

        assert_eq!(
            EventActivityNetwork::from_records(&events, &activities, &[], 3600).unwrap_err(),
            StructuralError::UnpairedHeadway(ActivityId::new(2))
        );
    }

    #[test]
    fn trip_boundaries_are_derived_and_marked() {
        let events = vec![
            ev(1, EventKind::Departure, 0, 1),
            ev(2, EventKind::Arrival, 600, 2),
            ev(3, EventKind::Departure, 700, 2),
            ev(4, EventKind::Arrival, 1200, 3),
        ];
        let activities = vec![
            act(1, ActivityKind::Drive, 1, 2, 540),
            act(2, ActivityKind::Wait, 2, 3, 60),
            act(3, ActivityKind::Drive, 3, 4, 450),
        ];
        let net =
            EventActivityNetwork::from_records(&events, &activities, &[4], 3600).unwrap();

        assert!(net.event(EventId::new(1)).is_start_of_trip);
        assert!(!net.event(EventId::new(2)).is_start_of_trip);
        assert!(!net.event(EventId::new(2)).is_end_of_trip);
        assert!(net.event(EventId::new(4)).is_end_of_trip);
    }

    #[test]
    fn dispo_time_starts_at_sentinel() {
        let events = simple_events();
        let activities = vec![act(1, ActivityKind::Drive, 1, 2, 540)];
        let net = EventActivityNetwork::from_records(&events, &activities, &[], 3600).unwrap();

        assert_eq!(net.event(EventId::new(1)).dispo_time, EventTime::new(-1));
        assert_eq!(net.event(EventId::new(2)).dispo_time, EventTime::new(599));
    }
}
