//! End-of-session statistics.
//!
//! The protocol engine hands its counters and RTT record to [`SessionReport`]
//! when a transfer finishes; everything here is plain arithmetic over that
//! data.

use std::fmt;
use std::time::Duration;

/// Counters and RTT record for one completed transfer.
#[derive(Debug, Clone)]
pub struct SessionReport {
    /// Segments the session was configured to move.
    pub total_segments: u32,
    /// Segments acknowledged (each counted once).
    pub acked_segments: u64,
    /// Retransmissions sent (timeout sweeps plus fast retransmits).
    pub retransmits: u64,
    /// One RTT sample per acknowledged segment, in arrival order.
    pub rtt_samples: Vec<Duration>,
}

impl SessionReport {
    /// The protocol's reported loss-rate figure:
    /// `total_segments / (acked + retransmits) × 100`.
    pub fn loss_rate(&self) -> f64 {
        let denominator = self.acked_segments + self.retransmits;
        if denominator == 0 {
            return 0.0;
        }
        f64::from(self.total_segments) / denominator as f64 * 100.0
    }

    pub fn max_rtt_ms(&self) -> f64 {
        self.rtt_ms().fold(0.0, f64::max)
    }

    pub fn min_rtt_ms(&self) -> f64 {
        if self.rtt_samples.is_empty() {
            return 0.0;
        }
        self.rtt_ms().fold(f64::INFINITY, f64::min)
    }

    pub fn mean_rtt_ms(&self) -> f64 {
        if self.rtt_samples.is_empty() {
            return 0.0;
        }
        self.rtt_ms().sum::<f64>() / self.rtt_samples.len() as f64
    }

    /// Sample standard deviation (n − 1 denominator) of the RTT record.
    pub fn stddev_rtt_ms(&self) -> f64 {
        let n = self.rtt_samples.len();
        if n < 2 {
            return 0.0;
        }
        let mean = self.mean_rtt_ms();
        let variance = self
            .rtt_ms()
            .map(|sample| (sample - mean).powi(2))
            .sum::<f64>()
            / (n - 1) as f64;
        variance.sqrt()
    }

    fn rtt_ms(&self) -> impl Iterator<Item = f64> + '_ {
        self.rtt_samples
            .iter()
            .map(|rtt| rtt.as_secs_f64() * 1000.0)
    }
}

impl fmt::Display for SessionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== transfer summary ===")?;
        writeln!(f, "segments:      {}", self.total_segments)?;
        writeln!(f, "acknowledged:  {}", self.acked_segments)?;
        writeln!(f, "retransmits:   {}", self.retransmits)?;
        writeln!(f, "loss rate:     {:.2}%", self.loss_rate())?;
        writeln!(f, "max RTT:       {:.2} ms", self.max_rtt_ms())?;
        writeln!(f, "min RTT:       {:.2} ms", self.min_rtt_ms())?;
        writeln!(f, "mean RTT:      {:.2} ms", self.mean_rtt_ms())?;
        write!(f, "RTT std dev:   {:.2} ms", self.stddev_rtt_ms())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(samples_ms: &[u64]) -> SessionReport {
        SessionReport {
            total_segments: 30,
            acked_segments: 30,
            retransmits: 0,
            rtt_samples: samples_ms
                .iter()
                .map(|&ms| Duration::from_millis(ms))
                .collect(),
        }
    }

    #[test]
    fn loss_rate_follows_the_documented_formula() {
        let mut r = report(&[10]);
        assert_eq!(r.loss_rate(), 100.0);

        r.retransmits = 10;
        assert!((r.loss_rate() - 75.0).abs() < 1e-9);
    }

    #[test]
    fn loss_rate_of_an_empty_session_is_zero() {
        let mut r = report(&[]);
        r.acked_segments = 0;
        assert_eq!(r.loss_rate(), 0.0);
    }

    #[test]
    fn rtt_extremes_and_mean() {
        let r = report(&[10, 20, 30, 40]);
        assert!((r.max_rtt_ms() - 40.0).abs() < 1e-9);
        assert!((r.min_rtt_ms() - 10.0).abs() < 1e-9);
        assert!((r.mean_rtt_ms() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn stddev_uses_the_sample_denominator() {
        // variance = ((-15)² + (-5)² + 5² + 15²) / 3 = 500/3
        let r = report(&[10, 20, 30, 40]);
        assert!((r.stddev_rtt_ms() - (500.0f64 / 3.0).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn empty_sample_record_yields_zeros() {
        let r = report(&[]);
        assert_eq!(r.max_rtt_ms(), 0.0);
        assert_eq!(r.min_rtt_ms(), 0.0);
        assert_eq!(r.mean_rtt_ms(), 0.0);
        assert_eq!(r.stddev_rtt_ms(), 0.0);
    }

    #[test]
    fn single_sample_has_zero_spread() {
        let r = report(&[25]);
        assert_eq!(r.stddev_rtt_ms(), 0.0);
        assert!((r.mean_rtt_ms() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn summary_block_mentions_every_figure() {
        let text = report(&[10, 20]).to_string();
        assert!(text.contains("loss rate"));
        assert!(text.contains("max RTT"));
        assert!(text.contains("std dev"));
        assert!(text.contains("retransmits"));
    }
}
