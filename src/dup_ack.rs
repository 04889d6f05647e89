//! Duplicate-ACK bookkeeping for fast retransmit.
//!
//! The server re-acks its last good cumulative ACK whenever a segment
//! arrives out of order, so a run of identical ACK numbers is the signal
//! that the segment right after that number went missing.  This counter
//! just tallies the runs; the threshold policy lives in the session driver.

use std::collections::HashMap;

/// Occurrence counts per acknowledgment number.
#[derive(Debug, Default)]
pub struct DupAckCounter {
    counts: HashMap<u32, u32>,
}

impl DupAckCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one occurrence of `ack` and return the updated total.
    pub fn record(&mut self, ack: u32) -> u32 {
        let count = self.counts.entry(ack).or_insert(0);
        *count += 1;
        *count
    }

    /// Current count for `ack`.
    pub fn count(&self, ack: u32) -> u32 {
        self.counts.get(&ack).copied().unwrap_or(0)
    }

    /// Forget `ack` after a fast retransmit fired, so the same run of
    /// duplicates cannot trigger twice.
    pub fn reset(&mut self, ack: u32) {
        self.counts.remove(&ack);
    }

    /// Drop every entry keyed below `floor`.  Called when the window base
    /// slides; counts for acknowledged prefixes are stale.
    pub fn prune_below(&mut self, floor: u32) {
        self.counts.retain(|&ack, _| ack >= floor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_counts_up() {
        let mut c = DupAckCounter::new();
        assert_eq!(c.record(5), 1);
        assert_eq!(c.record(5), 2);
        assert_eq!(c.record(5), 3);
        assert_eq!(c.count(5), 3);
        assert_eq!(c.count(6), 0);
    }

    #[test]
    fn reset_starts_a_fresh_run() {
        let mut c = DupAckCounter::new();
        c.record(5);
        c.record(5);
        c.record(5);
        c.reset(5);
        assert_eq!(c.count(5), 0);
        assert_eq!(c.record(5), 1);
    }

    #[test]
    fn prune_drops_entries_below_floor_only() {
        let mut c = DupAckCounter::new();
        c.record(1);
        c.record(2);
        c.record(5);
        c.prune_below(3);
        assert_eq!(c.count(1), 0);
        assert_eq!(c.count(2), 0);
        assert_eq!(c.count(5), 1);
    }
}
