//! The event-activity network arena.

use tracing::debug;

use crate::domain::{
    Activity, ActivityId, ActivityKind, ConnectionStatus, Event, EventId, EventTime, HeadwayOrder,
    TimeView,
};

use super::StructuralError;

/// The full non-periodic event-activity network.
///
/// Owns every event and activity for its lifetime. Events and activities
/// live in dense arenas addressed by their 1-based ids; activities refer to
/// their endpoints by id, so there is no cyclic ownership and weight fields
/// can be mutated while ids are held elsewhere.
///
/// Construction goes through
/// [`from_records`](EventActivityNetwork::from_records); the arenas are
/// never resized afterwards. The disposition timetable and source delays
/// are the only inputs applied after construction.
#[derive(Debug, Clone)]
pub struct EventActivityNetwork {
    pub(super) events: Vec<Event>,
    pub(super) activities: Vec<Activity>,
    /// Typed id buckets, populated at construction.
    pub(super) drive: Vec<ActivityId>,
    pub(super) wait: Vec<ActivityId>,
    pub(super) turnaround: Vec<ActivityId>,
    pub(super) change: Vec<ActivityId>,
    pub(super) headway: Vec<ActivityId>,
    /// Period length of the periodic network this one was rolled out from.
    pub(super) period: i64,
}

impl EventActivityNetwork {
    pub fn event(&self, id: EventId) -> &Event {
        &self.events[id.index()]
    }

    pub fn activity(&self, id: ActivityId) -> &Activity {
        &self.activities[id.index()]
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    pub fn activities(&self) -> impl Iterator<Item = &Activity> {
        self.activities.iter()
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn activity_count(&self) -> usize {
        self.activities.len()
    }

    pub fn period(&self) -> i64 {
        self.period
    }

    /// Ids of all activities of the given kind, ascending.
    pub fn ids_of_kind(&self, kind: ActivityKind) -> &[ActivityId] {
        match kind {
            ActivityKind::Drive => &self.drive,
            ActivityKind::Wait => &self.wait,
            ActivityKind::Turnaround => &self.turnaround,
            ActivityKind::Change => &self.change,
            ActivityKind::Headway => &self.headway,
        }
    }

    /// An activity's duration under the given timetable view.
    pub fn duration_for(&self, activity: &Activity, view: TimeView) -> i64 {
        self.event(activity.target).time_for(view) - self.event(activity.source).time_for(view)
    }

    /// Whether an activity's duration under the given view meets its lower
    /// bound. This is the feasibility predicate shared by the timetable
    /// check and the path search: an activity that fails it cannot be used
    /// by a passenger in that timetable.
    pub fn duration_satisfied(&self, activity: &Activity, view: TimeView) -> bool {
        self.duration_for(activity, view) >= activity.lower_bound
    }

    /// Adds passenger weight onto an event's accumulator.
    pub fn add_event_weight(&mut self, id: EventId, weight: f64) {
        self.events[id.index()].weight += weight;
    }

    /// Adds passenger weight onto an activity's accumulator.
    pub fn add_activity_weight(&mut self, id: ActivityId, weight: f64) {
        self.activities[id.index()].weight += weight;
    }

    /// Clears all externally injected source delays.
    pub fn reset_source_delays(&mut self) {
        for event in &mut self.events {
            event.source_delay = 0;
        }
        for activity in &mut self.activities {
            activity.source_delay = 0;
        }
    }

    /// Discards all disposition decisions.
    ///
    /// Disposition times fall back to the `time - 1` sentinel (one second
    /// before schedule, so a stale read shows up immediately in any
    /// feasibility check) and all change/headway decisions return to unset.
    pub fn reset_disposition_decisions(&mut self) {
        for event in &mut self.events {
            event.dispo_time = event.time.offset(-1);
        }
        for activity in &mut self.activities {
            activity.set_connection_status(ConnectionStatus::Unset);
            activity.set_headway_order(HeadwayOrder::Unset);
        }
    }

    /// Loads the disposition timetable computed upstream.
    ///
    /// Rows are `(event id, disposition time in seconds)`.
    pub fn set_disposition_times(&mut self, rows: &[(u32, i64)]) -> Result<(), StructuralError> {
        for &(id, time) in rows {
            let index = self
                .lookup_event(id)
                .ok_or(StructuralError::UnknownEvent(id))?;
            self.events[index].dispo_time = EventTime::new(time);
        }
        Ok(())
    }

    /// Injects additive source delays from the optional delay tables.
    pub fn apply_source_delays(
        &mut self,
        event_rows: &[(u32, i64)],
        activity_rows: &[(u32, i64)],
    ) -> Result<(), StructuralError> {
        for &(id, delay) in event_rows {
            let index = self
                .lookup_event(id)
                .ok_or(StructuralError::UnknownEvent(id))?;
            self.events[index].source_delay += delay;
        }
        for &(id, delay) in activity_rows {
            if id == 0 || id as usize > self.activities.len() {
                return Err(StructuralError::UnknownActivity(id));
            }
            self.activities[id as usize - 1].source_delay += delay;
        }
        Ok(())
    }

    /// Derives every change activity's connection status from the committed
    /// disposition times: a connection is maintained exactly when the
    /// disposition duration still meets the lower bound.
    pub fn decide_connection_statuses(&mut self) {
        let mut maintained = 0usize;
        for index in 0..self.activities.len() {
            if !self.activities[index].is_change() {
                continue;
            }
            let activity = self.activities[index].clone();
            let status = if self.duration_satisfied(&activity, TimeView::Disposition) {
                maintained += 1;
                ConnectionStatus::Maintained
            } else {
                ConnectionStatus::Missed
            };
            self.activities[index].set_connection_status(status);
        }
        debug!(
            maintained,
            missed = self.change.len() - maintained,
            "connection statuses decided"
        );
    }

    /// Derives every headway pair's priority from the committed disposition
    /// times.
    ///
    /// The direction whose source event runs first is granted priority. On
    /// a tie, the direction with a zero lower bound and a not-later
    /// scheduled source time wins, evaluated for the lower-id activity of
    /// the pair first; otherwise the counterpart wins. The asymmetry is
    /// deliberate: it makes simultaneous conflicts resolve the same way on
    /// every run.
    pub fn decide_headway_orders(&mut self) {
        for index in 0..self.activities.len() {
            let (id, counterpart) = {
                let activity = &self.activities[index];
                match activity.counterpart() {
                    Some(cp) => (activity.id, cp),
                    None => continue,
                }
            };
            // Each pair is handled once, from its lower-id member.
            if counterpart < id {
                continue;
            }
            let first = self.activities[id.index()].clone();
            let second = self.activities[counterpart.index()].clone();
            let t_first = self.event(first.source).dispo_time;
            let t_second = self.event(second.source).dispo_time;

            let first_wins = match t_first.cmp(&t_second) {
                std::cmp::Ordering::Less => true,
                std::cmp::Ordering::Greater => false,
                std::cmp::Ordering::Equal => {
                    first.lower_bound == 0
                        && self.event(first.source).time <= self.event(second.source).time
                }
            };

            let (first_order, second_order) = if first_wins {
                (HeadwayOrder::Granted, HeadwayOrder::Yielded)
            } else {
                (HeadwayOrder::Yielded, HeadwayOrder::Granted)
            };
            self.activities[id.index()].set_headway_order(first_order);
            self.activities[counterpart.index()].set_headway_order(second_order);
        }
    }

    /// Summary counts, logged after construction and useful in tests.
    pub fn statistics(&self) -> NetworkStatistics {
        NetworkStatistics {
            events: self.events.len(),
            drive: self.drive.len(),
            wait: self.wait.len(),
            turnaround: self.turnaround.len(),
            change: self.change.len(),
            headway: self.headway.len(),
        }
    }

    fn lookup_event(&self, id: u32) -> Option<usize> {
        if id == 0 || id as usize > self.events.len() {
            None
        } else {
            Some(id as usize - 1)
        }
    }
}

/// Per-kind element counts of a constructed network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkStatistics {
    pub events: usize,
    pub drive: usize,
    pub wait: usize,
    pub turnaround: usize,
    pub change: usize,
    pub headway: usize,
}

impl NetworkStatistics {
    pub fn activities(&self) -> usize {
        self.drive + self.wait + self.turnaround + self.change + self.headway
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::{act, ev, network};
    use crate::domain::{
        ActivityKind, ConnectionStatus, EventKind, EventTime, HeadwayOrder, TimeView,
    };

    // A minimal two-trip network with a change between them:
    //   E1 dep A --drive--> E2 arr B --change--> E3 dep B --drive--> E4 arr C
    fn change_network() -> super::EventActivityNetwork {
        network(
            vec![
                ev(1, EventKind::Departure, 0, 1),
                ev(2, EventKind::Arrival, 600, 2),
                ev(3, EventKind::Departure, 900, 2),
                ev(4, EventKind::Arrival, 1800, 3),
            ],
            vec![
                act(1, ActivityKind::Drive, 1, 2, 540),
                act(2, ActivityKind::Change, 2, 3, 180),
                act(3, ActivityKind::Drive, 3, 4, 800),
            ],
        )
    }

    #[test]
    fn durations_per_view() {
        let mut net = change_network();
        net.set_disposition_times(&[(1, 0), (2, 700), (3, 900), (4, 1800)])
            .unwrap();

        let change = net.activity(crate::domain::ActivityId::new(2)).clone();
        assert_eq!(net.duration_for(&change, TimeView::Scheduled), 300);
        assert_eq!(net.duration_for(&change, TimeView::Disposition), 200);
        assert!(net.duration_satisfied(&change, TimeView::Scheduled));
        assert!(net.duration_satisfied(&change, TimeView::Disposition));
    }

    #[test]
    fn connection_status_follows_disposition() {
        let mut net = change_network();
        // Arrival delayed past the connecting departure.
        net.set_disposition_times(&[(1, 0), (2, 800), (3, 900), (4, 1800)])
            .unwrap();
        net.decide_connection_statuses();

        let change = net.activity(crate::domain::ActivityId::new(2));
        assert_eq!(change.connection_status(), Some(ConnectionStatus::Missed));

        // With the departure held, the connection is maintained again.
        net.set_disposition_times(&[(3, 1000)]).unwrap();
        net.decide_connection_statuses();
        let change = net.activity(crate::domain::ActivityId::new(2));
        assert_eq!(
            change.connection_status(),
            Some(ConnectionStatus::Maintained)
        );
    }

    #[test]
    fn reset_disposition_sets_sentinel() {
        let mut net = change_network();
        net.set_disposition_times(&[(1, 50)]).unwrap();
        net.reset_disposition_decisions();

        assert_eq!(net.event(crate::domain::EventId::new(1)).dispo_time, EventTime::new(-1));
        assert_eq!(
            net.activity(crate::domain::ActivityId::new(2))
                .connection_status(),
            Some(ConnectionStatus::Unset)
        );
    }

    #[test]
    fn unknown_ids_are_rejected() {
        let mut net = change_network();
        assert!(net.set_disposition_times(&[(99, 0)]).is_err());
        assert!(net.apply_source_delays(&[(0, 10)], &[]).is_err());
        assert!(net.apply_source_delays(&[], &[(99, 10)]).is_err());
    }

    #[test]
    fn source_delays_accumulate() {
        let mut net = change_network();
        net.apply_source_delays(&[(2, 60), (2, 30)], &[(1, 45)])
            .unwrap();
        assert_eq!(net.event(crate::domain::EventId::new(2)).source_delay, 90);
        assert_eq!(
            net.activity(crate::domain::ActivityId::new(1)).source_delay,
            45
        );

        net.reset_source_delays();
        assert_eq!(net.event(crate::domain::EventId::new(2)).source_delay, 0);
    }

    // Headway pair at a shared platform: departures E1 and E3 from the test
    // network above, separated by 120s in either direction.
    fn headway_network(lb_first: i64, lb_second: i64) -> super::EventActivityNetwork {
        network(
            vec![
                ev(1, EventKind::Departure, 0, 1),
                ev(2, EventKind::Arrival, 600, 2),
                ev(3, EventKind::Departure, 300, 1),
                ev(4, EventKind::Arrival, 900, 2),
            ],
            vec![
                act(1, ActivityKind::Drive, 1, 2, 540),
                act(2, ActivityKind::Drive, 3, 4, 540),
                act(3, ActivityKind::Headway, 1, 3, lb_first),
                act(4, ActivityKind::Headway, 3, 1, lb_second),
            ],
        )
    }

    #[test]
    fn headway_priority_follows_disposition_order() {
        let mut net = headway_network(120, 120);
        // Second train now runs first.
        net.set_disposition_times(&[(1, 400), (2, 1000), (3, 300), (4, 900)])
            .unwrap();
        net.decide_headway_orders();

        let first = net.activity(crate::domain::ActivityId::new(3));
        let second = net.activity(crate::domain::ActivityId::new(4));
        assert_eq!(first.headway_order(), Some(HeadwayOrder::Yielded));
        assert_eq!(second.headway_order(), Some(HeadwayOrder::Granted));
    }

    #[test]
    fn headway_tie_break_is_asymmetric() {
        // Tie in disposition times. The lower-id direction qualifies only
        // with a zero lower bound and a not-later scheduled source.
        let mut net = headway_network(0, 120);
        net.set_disposition_times(&[(1, 300), (2, 900), (3, 300), (4, 900)])
            .unwrap();
        net.decide_headway_orders();
        assert_eq!(
            net.activity(crate::domain::ActivityId::new(3)).headway_order(),
            Some(HeadwayOrder::Granted)
        );

        // With a positive lower bound the first direction no longer
        // qualifies and the counterpart wins the same tie.
        let mut net = headway_network(120, 120);
        net.set_disposition_times(&[(1, 300), (2, 900), (3, 300), (4, 900)])
            .unwrap();
        net.decide_headway_orders();
        assert_eq!(
            net.activity(crate::domain::ActivityId::new(3)).headway_order(),
            Some(HeadwayOrder::Yielded)
        );
        assert_eq!(
            net.activity(crate::domain::ActivityId::new(4)).headway_order(),
            Some(HeadwayOrder::Granted)
        );
    }

    #[test]
    fn statistics_count_per_kind() {
        let stats = change_network().statistics();
        assert_eq!(stats.events, 4);
        assert_eq!(stats.drive, 2);
        assert_eq!(stats.change, 1);
        assert_eq!(stats.activities(), 3);
    }
}
