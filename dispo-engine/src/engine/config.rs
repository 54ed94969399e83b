//! Configuration for the delay-propagation engine.

/// How passenger demand is assumed to arrive at the origin station.
///
/// The two models are exclusive; the engine runs with exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrivalModel {
    /// Passengers arrive exactly as recorded in the reference arrival-time
    /// table of the undelayed timetable.
    OnTime,
    /// Passengers arrive uniformly between the start of day and the last
    /// feasible undelayed departure of their OD pair.
    Uniform,
}

/// Engine parameters.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Which arrival model distributes OD weight across departure groups.
    pub arrival_model: ArrivalModel,

    /// Start of the operating day in seconds; the left edge of the uniform
    /// model's arrival interval.
    pub begin_of_day: i64,

    /// Run the consistency and timetable checks before propagation.
    /// Skipping them saves a full pass over the network at the cost of
    /// silently tolerating bad input.
    pub strict_checks: bool,

    /// Hard cap on the hop depth of the minimal-hop search. The search
    /// additionally never exceeds the collapsed node count, so this only
    /// guards against degenerate inputs.
    pub max_hops: usize,
}

impl EngineConfig {
    /// Create a configuration with the given parameters.
    pub fn new(arrival_model: ArrivalModel, begin_of_day: i64, strict_checks: bool, max_hops: usize) -> Self {
        Self {
            arrival_model,
            begin_of_day,
            strict_checks,
            max_hops,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            arrival_model: ArrivalModel::Uniform,
            begin_of_day: 0,
            strict_checks: false,
            max_hops: 16,
        }
    }
}
