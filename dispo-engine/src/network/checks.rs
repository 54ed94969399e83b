//! Invariant and feasibility checks over a constructed network.
//!
//! The checks are split by failure class: [`check_consistency`] guards the
//! structural invariants the rest of the crate relies on, and
//! [`check_timetable`] verifies the scheduled times against the duration
//! bounds. Both are optional at the caller's discretion; the engine forces
//! them on in strict mode. The cycle searches exist purely as debug
//! assertions: a cycle means the upstream timetable is infeasible.
//!
//! [`check_consistency`]: EventActivityNetwork::check_consistency
//! [`check_timetable`]: EventActivityNetwork::check_timetable

use crate::domain::{ActivityKind, EventId, TimeView};

use super::{ConsistencyError, EventActivityNetwork, TimetableError};

impl EventActivityNetwork {
    /// Validates the structural invariants, stopping at the first
    /// violation.
    ///
    /// Checked, in order: arena slots match their stored ids, no event is
    /// isolated, every typed bucket holds only activities of its kind, and
    /// every headway belongs to a symmetric pair with strictly positive
    /// lower bounds.
    pub fn check_consistency(&self) -> Result<(), ConsistencyError> {
        for (slot, event) in self.events.iter().enumerate() {
            if event.id.index() != slot {
                return Err(ConsistencyError::MisplacedEvent {
                    slot,
                    found: event.id,
                });
            }
            if event.incoming.is_empty() && event.outgoing.is_empty() {
                return Err(ConsistencyError::IsolatedEvent(event.id));
            }
        }

        for kind in [
            ActivityKind::Drive,
            ActivityKind::Wait,
            ActivityKind::Turnaround,
            ActivityKind::Change,
            ActivityKind::Headway,
        ] {
            for &id in self.ids_of_kind(kind) {
                let actual = self.activity(id).kind();
                if actual != kind {
                    return Err(ConsistencyError::WrongBucket {
                        activity: id,
                        bucket: kind,
                        actual,
                    });
                }
            }
        }

        for &id in &self.headway {
            let activity = self.activity(id);
            if activity.lower_bound <= 0 {
                return Err(ConsistencyError::DegenerateHeadway(id));
            }
            let counterpart_id = activity
                .counterpart()
                .expect("headway bucket holds headways only");
            let counterpart = self.activity(counterpart_id);
            let mutual = counterpart.counterpart() == Some(id);
            let mirrored =
                counterpart.source == activity.target && counterpart.target == activity.source;
            if !mutual || !mirrored {
                return Err(ConsistencyError::BrokenHeadwayPair {
                    first: id,
                    second: counterpart_id,
                });
            }
        }

        Ok(())
    }

    /// Validates the scheduled timetable against the duration bounds.
    ///
    /// Drive, wait, turnaround and change activities get a hard lower-bound
    /// check. A headway pair only needs one of its two orderings to hold.
    pub fn check_timetable(&self) -> Result<(), TimetableError> {
        for activity in &self.activities {
            if activity.is_headway() {
                continue;
            }
            let actual = self.duration_for(activity, TimeView::Scheduled);
            if actual < activity.lower_bound {
                return Err(TimetableError::BoundViolated {
                    activity: activity.id,
                    kind: activity.kind(),
                    required: activity.lower_bound,
                    actual,
                });
            }
        }

        for &id in &self.headway {
            let activity = self.activity(id);
            let counterpart_id = activity.counterpart().expect("checked by consistency");
            // Each pair once.
            if counterpart_id < id {
                continue;
            }
            let counterpart = self.activity(counterpart_id);
            let forward_ok = self.duration_satisfied(activity, TimeView::Scheduled);
            let reverse_ok = self.duration_satisfied(counterpart, TimeView::Scheduled);
            if !forward_ok && !reverse_ok {
                return Err(TimetableError::InfeasibleHeadwayPair {
                    first: id,
                    second: counterpart_id,
                });
            }
        }

        Ok(())
    }

    /// Whether the scheduled timetable contains a directed cycle.
    pub fn contains_timetable_cycle(&self) -> bool {
        self.contains_cycle(TimeView::Scheduled)
    }

    /// Whether the disposition timetable contains a directed cycle.
    pub fn contains_dispo_cycle(&self) -> bool {
        self.contains_cycle(TimeView::Disposition)
    }

    /// Cycle search over the subgraph of drive, wait, turnaround and change
    /// activities plus the headways that point forward in time under the
    /// given view.
    fn contains_cycle(&self, view: TimeView) -> bool {
        const UNSEEN: u8 = 0;
        const ON_STACK: u8 = 1;
        const DONE: u8 = 2;

        let mut state = vec![UNSEEN; self.events.len()];
        // Iterative DFS; a frame is (event, next outgoing position).
        let mut stack: Vec<(EventId, usize)> = Vec::new();

        for start in 0..self.events.len() {
            if state[start] != UNSEEN {
                continue;
            }
            stack.push((EventId::from_index(start), 0));
            state[start] = ON_STACK;

            while let Some((event, position)) = stack.last().copied() {
                let outgoing = &self.event(event).outgoing;
                if position >= outgoing.len() {
                    state[event.index()] = DONE;
                    stack.pop();
                    continue;
                }
                stack.last_mut().expect("frame just read").1 += 1;

                let activity = self.activity(outgoing[position]);
                if activity.is_headway() {
                    // Only forward-in-time headways order the events.
                    let forward = self.event(activity.source).time_for(view)
                        <= self.event(activity.target).time_for(view);
                    if !forward {
                        continue;
                    }
                }
                match state[activity.target.index()] {
                    ON_STACK => return true,
                    UNSEEN => {
                        state[activity.target.index()] = ON_STACK;
                        stack.push((activity.target, 0));
                    }
                    _ => {}
                }
            }
        }

        false
    }
}
