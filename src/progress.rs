//! Progress display for long-running streams

use crate::pipeline::StreamStats;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::{Duration, Instant};

/// Refresh the spinner at most once per this many records
const UPDATE_EVERY: u64 = 4096;

/// Spinner showing records yielded and throughput
pub struct StreamProgress {
    /// None in quiet mode
    progress_bar: Option<ProgressBar>,
    start_time: Instant,
    records: u64,
}

impl StreamProgress {
    pub fn new(label: &str, quiet: bool) -> Self {
        let progress_bar = if !quiet {
            let pb = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {prefix} {pos} records {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            pb.set_prefix(label.to_string());
            pb.enable_steady_tick(Duration::from_millis(120));
            Some(pb)
        } else {
            None
        };

        Self {
            progress_bar,
            start_time: Instant::now(),
            records: 0,
        }
    }

    /// Count one record
    pub fn record(&mut self) {
        self.records += 1;
        if self.records % UPDATE_EVERY == 0 {
            if let Some(ref pb) = self.progress_bar {
                pb.set_position(self.records);
                pb.set_message(format!("({:.0}/s)", self.rate()));
            }
        }
    }

    pub fn records(&self) -> u64 {
        self.records
    }

    /// Records per second since creation
    pub fn rate(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.records as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Stop the spinner with a summary line
    pub fn finish(&self, stats: &StreamStats) {
        if let Some(ref pb) = self.progress_bar {
            pb.set_position(self.records);
            pb.finish_with_message(format!(
                "done: {} lines read, {} filtered, {} skipped",
                stats.lines_read, stats.lines_filtered, stats.lines_skipped
            ));
        }
    }

    /// Stop the spinner after a failure
    pub fn abandon(&self, reason: &str) {
        if let Some(ref pb) = self.progress_bar {
            pb.abandon_with_message(reason.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_progress_counts() {
        let mut progress = StreamProgress::new("test", true);
        for _ in 0..10 {
            progress.record();
        }
        assert_eq!(progress.records(), 10);
        progress.finish(&StreamStats::default());
    }
}
