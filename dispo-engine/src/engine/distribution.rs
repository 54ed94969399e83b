//! Weight distribution arithmetic.
//!
//! Pure functions: the cumulative-share curves of the two arrival models
//! and the largest-remainder split of a group's weight across its paths.
//! Both cumulative curves are monotone in the departure time, so the
//! per-group increments the engine derives from them are never negative.

use crate::domain::EventTime;

/// Splits an integer weight across `parts` paths by largest remainder: the
/// first `weight % parts` paths carry one passenger more than the rest.
///
/// The parts always sum to `weight` and differ by at most one.
pub fn apportion(weight: u64, parts: usize) -> Vec<u64> {
    if parts == 0 {
        return Vec::new();
    }
    let parts = parts as u64;
    let base = weight / parts;
    let remainder = weight % parts;
    (0..parts)
        .map(|index| if index < remainder { base + 1 } else { base })
        .collect()
}

/// Cumulative share of the uniform model: the fraction of the arrival
/// interval `[begin, latest]` elapsed by `departure`, discretized onto
/// `total` passengers.
///
/// A departure before `begin` collects nobody; one at or after `latest`
/// collects everyone. A degenerate interval (`latest <= begin`) means the
/// whole demand is already waiting when the first vehicle leaves.
pub fn uniform_cumulative_share(
    total: u64,
    begin: EventTime,
    latest: EventTime,
    departure: EventTime,
) -> u64 {
    let span = latest - begin;
    if span <= 0 {
        return if departure >= begin { total } else { 0 };
    }
    let elapsed = (departure - begin).clamp(0, span);
    let share = (total as f64 * elapsed as f64 / span as f64).round() as u64;
    share.min(total)
}

/// Cumulative share of the arrival-on-time model: how many recorded
/// reference passengers had arrived at the origin by `departure`.
///
/// `reference` must be sorted ascending; the count is capped at `total`.
pub fn on_time_cumulative_share(reference: &[i64], departure: EventTime, total: u64) -> u64 {
    let arrived = reference.partition_point(|&t| t <= departure.seconds()) as u64;
    arrived.min(total)
}
