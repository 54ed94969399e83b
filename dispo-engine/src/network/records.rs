//! Interface records: the row shapes exchanged with collaborators.
//!
//! Parsing and formatting live outside this crate; collaborators
//! deserialize their tables into these records and hand them over. The
//! records are deliberately flat and serde-derived so that any tabular
//! source can produce them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::{ActivityKind, EventKind, StationId};

/// One row of the events table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    /// 1-based event id; must be contiguous over the table.
    pub id: u32,
    /// Id of the periodic event this one was rolled out from.
    pub periodic_id: u32,
    pub kind: EventKind,
    /// Scheduled time in seconds from start of day.
    pub time: i64,
    pub weight: f64,
    /// Station id; optional in some upstream exports.
    pub station: Option<u32>,
}

/// One row of the activities table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// 1-based activity id; must be contiguous over the table.
    pub id: u32,
    /// Id of the periodic activity this one was rolled out from.
    pub periodic_id: u32,
    pub kind: ActivityKind,
    /// Source event id.
    pub source: u32,
    /// Target event id.
    pub target: u32,
    /// Minimum duration in seconds.
    pub lower_bound: i64,
    /// Maximum duration in seconds.
    pub upper_bound: i64,
    pub weight: f64,
    /// Explicit reverse-direction partner for headway rows, when the
    /// exporter recorded it. Absent pairing is recovered by
    /// symmetric-endpoint search.
    #[serde(default)]
    pub counterpart: Option<u32>,
}

/// One row of an expanded origin-destination table.
///
/// Rows with zero weight are ignored by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OdEntry {
    pub origin: u32,
    pub destination: u32,
    /// Passenger volume for this pair.
    pub weight: u64,
    /// Last departure time (seconds) at which this pair is still servable
    /// in the undelayed timetable. Used by the uniform arrival model; when
    /// absent the engine falls back to the reference search result.
    #[serde(default)]
    pub latest_departure: Option<i64>,
}

impl OdEntry {
    pub fn origin_station(&self) -> StationId {
        StationId::new(self.origin)
    }

    pub fn destination_station(&self) -> StationId {
        StationId::new(self.destination)
    }
}

/// One row of the original passenger arrival-time table: a single
/// passenger of an OD pair and the time they showed up at the origin
/// station, ready to depart, in the undelayed reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassengerArrivalRecord {
    pub origin: u32,
    pub destination: u32,
    /// Arrival time at the origin station, in seconds from start of day.
    pub arrival: i64,
}

/// Reference origin-arrival timestamps per OD pair, for the
/// arrival-on-time model.
///
/// Holds one timestamp per passenger. Built once from the exported rows;
/// lookups return the timestamps sorted ascending.
#[derive(Debug, Clone, Default)]
pub struct PassengerArrivalTable {
    entries: HashMap<(u32, u32), Vec<i64>>,
}

impl PassengerArrivalTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the table from exported rows, sorting each pair's multiset.
    pub fn from_records(records: &[PassengerArrivalRecord]) -> Self {
        let mut entries: HashMap<(u32, u32), Vec<i64>> = HashMap::new();
        for r in records {
            entries
                .entry((r.origin, r.destination))
                .or_default()
                .push(r.arrival);
        }
        for times in entries.values_mut() {
            times.sort_unstable();
        }
        Self { entries }
    }

    /// Adds a single passenger's reference arrival.
    pub fn push(&mut self, origin: u32, destination: u32, arrival: i64) {
        let times = self.entries.entry((origin, destination)).or_default();
        let pos = times.partition_point(|&t| t <= arrival);
        times.insert(pos, arrival);
    }

    /// Sorted reference arrivals for one OD pair; empty if none recorded.
    pub fn arrivals(&self, origin: StationId, destination: StationId) -> &[i64] {
        self.entries
            .get(&(origin.get(), destination.get()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrival_table_sorts_per_pair() {
        let records = vec![
            PassengerArrivalRecord {
                origin: 1,
                destination: 2,
                arrival: 300,
            },
            PassengerArrivalRecord {
                origin: 1,
                destination: 2,
                arrival: 100,
            },
            PassengerArrivalRecord {
                origin: 3,
                destination: 2,
                arrival: 50,
            },
        ];
        let table = PassengerArrivalTable::from_records(&records);

        assert_eq!(
            table.arrivals(StationId::new(1), StationId::new(2)),
            &[100, 300]
        );
        assert_eq!(table.arrivals(StationId::new(3), StationId::new(2)), &[50]);
        assert!(
            table
                .arrivals(StationId::new(2), StationId::new(1))
                .is_empty()
        );
    }

    #[test]
    fn push_keeps_order() {
        let mut table = PassengerArrivalTable::new();
        table.push(1, 2, 200);
        table.push(1, 2, 100);
        table.push(1, 2, 150);
        assert_eq!(
            table.arrivals(StationId::new(1), StationId::new(2)),
            &[100, 150, 200]
        );
    }

    #[test]
    fn activity_record_counterpart_defaults_to_none() {
        let json = r#"{
            "id": 1, "periodic_id": 1, "kind": "headway",
            "source": 1, "target": 2,
            "lower_bound": 60, "upper_bound": 60, "weight": 0.0
        }"#;
        let record: ActivityRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.counterpart, None);
        assert_eq!(record.kind, ActivityKind::Headway);
    }
}
