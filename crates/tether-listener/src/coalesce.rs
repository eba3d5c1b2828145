//! Granularity-window coalescing of queued notification timestamps.

use std::collections::VecDeque;

/// Remove the leading run of timestamps that fall within one granularity
/// window and return the timestamp to deliver for it.
///
/// The window is measured from the first queued timestamp: every following
/// timestamp `t` with `t <= first + granularity` joins the run, and the scan
/// stops at the first timestamp past the window. The returned timestamp is the
/// last member of the run. Timestamps after the run stay queued for the next
/// flush. Returns `None` for an empty queue.
pub fn take_coalesced_run(queue: &mut VecDeque<u64>, granularity: u64) -> Option<u64> {
    let first = *queue.front()?;
    let window_end = first.saturating_add(granularity);

    let mut chosen = first;
    let mut taken = 1;
    for &timestamp in queue.iter().skip(1) {
        if timestamp > window_end {
            break;
        }
        chosen = timestamp;
        taken += 1;
    }

    queue.drain(..taken);
    Some(chosen)
}
