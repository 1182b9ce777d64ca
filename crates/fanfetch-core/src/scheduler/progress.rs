//! Progress reporting for a run (jobs cleaned, bytes landed, rate, ETA).

/// Snapshot published whenever a job reaches a terminal state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressStats {
    /// Jobs whose artifact is local and whose remote copy is gone.
    pub jobs_cleaned: usize,
    pub jobs_failed: usize,
    pub job_count: usize,
    /// Bytes of cleaned chunks.
    pub bytes_done: u64,
    pub total_bytes: u64,
    /// Elapsed time since the scheduler started (seconds).
    pub elapsed_secs: f64,
}

impl ProgressStats {
    /// `cleaned / total` in [0.0, 1.0]; never decreases during a run.
    pub fn fraction(&self) -> f64 {
        if self.job_count == 0 {
            return 1.0;
        }
        (self.jobs_cleaned as f64 / self.job_count as f64).min(1.0)
    }

    /// Landed bytes per second (0 if elapsed is 0).
    pub fn bytes_per_sec(&self) -> f64 {
        if self.elapsed_secs <= 0.0 {
            return 0.0;
        }
        self.bytes_done as f64 / self.elapsed_secs
    }

    /// Estimated seconds remaining (None if nothing landed yet).
    pub fn eta_secs(&self) -> Option<f64> {
        let remaining = self.total_bytes.saturating_sub(self.bytes_done);
        if remaining == 0 {
            return Some(0.0);
        }
        let rate = self.bytes_per_sec();
        if rate <= 0.0 {
            return None;
        }
        Some(remaining as f64 / rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(cleaned: usize, bytes: u64, secs: f64) -> ProgressStats {
        ProgressStats {
            jobs_cleaned: cleaned,
            jobs_failed: 0,
            job_count: 4,
            bytes_done: bytes,
            total_bytes: 1000,
            elapsed_secs: secs,
        }
    }

    #[test]
    fn fraction_counts_jobs() {
        assert_eq!(stats(1, 250, 1.0).fraction(), 0.25);
        assert_eq!(stats(4, 1000, 1.0).fraction(), 1.0);
    }

    #[test]
    fn eta_from_rate() {
        assert_eq!(stats(0, 0, 0.0).eta_secs(), None);
        assert_eq!(stats(2, 500, 5.0).eta_secs(), Some(5.0));
        assert_eq!(stats(4, 1000, 5.0).eta_secs(), Some(0.0));
    }
}
