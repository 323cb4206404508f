//! Progress tracking and display for assetpush

use crate::types::{DeleteSummary, RunStats};
use crate::upload::UploadSummary;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Progress bar fed from upload run counters
#[derive(Clone)]
pub struct ProgressTracker {
    bar: ProgressBar,
}

impl ProgressTracker {
    /// Create a new progress tracker
    pub fn new(enabled: bool) -> Self {
        let bar = if enabled {
            let pb = ProgressBar::new(0);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=>-"),
            );
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        } else {
            ProgressBar::hidden()
        };

        Self { bar }
    }

    /// Tracker that draws nothing
    pub fn hidden() -> Self {
        Self::new(false)
    }

    /// Refresh from a stats snapshot
    pub fn update(&self, stats: &RunStats) {
        self.bar.set_length(stats.total);
        self.bar.set_position(stats.completed());
        self.bar.set_message(format!(
            "| in flight: {} | failed: {}",
            stats.in_flight, stats.failed
        ));
    }

    /// Finish the progress bar
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::hidden()
    }
}

/// Format a duration for display
pub fn format_duration(secs: f64) -> String {
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else if secs < 3600.0 {
        let mins = secs / 60.0;
        format!("{:.1}m", mins)
    } else {
        let hours = secs / 3600.0;
        format!("{:.1}h", hours)
    }
}

/// Print a final summary after an upload run
pub fn print_summary(summary: &UploadSummary) {
    let skipped = summary.report.success.iter().filter(|s| s.skipped).count();
    println!("\n=== Upload Complete ===");
    println!("Duration:   {}", format_duration(summary.duration_secs));
    println!("Files:      {}", summary.stats.total);
    println!("Uploaded:   {}", summary.stats.succeeded as usize - skipped);
    println!("Skipped:    {}", skipped);
    println!("Failed:     {}", summary.stats.failed);
    for fail in &summary.report.fail {
        println!("  {} -> {}: {}", fail.file, fail.key, fail.msg);
    }
}

/// Print a summary after a purge
pub fn print_purge_summary(summary: &DeleteSummary, dry_run: bool) {
    if dry_run {
        println!("\n=== Dry Run Summary ===");
        println!("Objects to delete: {}", summary.listed);
        return;
    }
    println!("\n=== Purge Complete ===");
    println!("Objects listed:    {}", summary.listed);
    println!("Objects deleted:   {}", summary.deleted);
    println!("Objects failed:    {}", summary.failed);
    println!(
        "Batches:           {} ({} failed)",
        summary.batches, summary.failed_batches
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(1.5), "1.5s");
        assert_eq!(format_duration(90.0), "1.5m");
        assert_eq!(format_duration(5400.0), "1.5h");
    }

    #[test]
    fn test_hidden_tracker_accepts_updates() {
        let tracker = ProgressTracker::hidden();
        tracker.update(&RunStats {
            total: 4,
            in_flight: 2,
            succeeded: 1,
            failed: 1,
        });
        tracker.finish();
    }
}
