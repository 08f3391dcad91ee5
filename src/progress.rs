//! Progress display and run statistics
//!
//! Everything here writes to stderr so stdout carries only counts.

use bytesize::ByteSize;
use colored::*;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Print an info message
pub fn print_info(text: &str) {
    eprintln!("  {} {}", "ℹ".cyan(), text);
}

/// Print a warning message
pub fn print_warning(text: &str) {
    eprintln!("  {} {}", "⚠".yellow(), text.yellow());
}

/// Print an error message
pub fn print_error(text: &str) {
    eprintln!("  {} {}", "✖".red(), text.red());
}

/// Create a bytes-based progress bar on stderr
pub fn create_bytes_progress_bar(total_bytes: u64, msg: &str) -> ProgressBar {
    let pb = ProgressBar::with_draw_target(Some(total_bytes), ProgressDrawTarget::stderr());

    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.green/dim}] {bytes}/{total_bytes} ({bytes_per_sec}) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░"),
    );

    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));

    pb
}

/// Counters shared by all workers of a run
#[derive(Debug)]
pub struct ProcessingStats {
    pub total_targets: AtomicU64,
    pub processed_targets: AtomicU64,
    pub failed_targets: AtomicU64,
    pub bytes_scanned: AtomicU64,
    pub start_time: Instant,
}

impl ProcessingStats {
    pub fn new() -> Self {
        Self {
            total_targets: AtomicU64::new(0),
            processed_targets: AtomicU64::new(0),
            failed_targets: AtomicU64::new(0),
            bytes_scanned: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn add_targets(&self, count: u64) {
        self.total_targets.fetch_add(count, Ordering::Relaxed);
    }

    pub fn complete_target(&self) {
        self.processed_targets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fail_target(&self) {
        self.processed_targets.fetch_add(1, Ordering::Relaxed);
        self.failed_targets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_bytes(&self, bytes: u64) {
        self.bytes_scanned.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn get_total_targets(&self) -> u64 {
        self.total_targets.load(Ordering::Relaxed)
    }

    pub fn get_processed_targets(&self) -> u64 {
        self.processed_targets.load(Ordering::Relaxed)
    }

    pub fn get_failed_targets(&self) -> u64 {
        self.failed_targets.load(Ordering::Relaxed)
    }

    pub fn get_bytes_scanned(&self) -> u64 {
        self.bytes_scanned.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn bytes_per_second(&self) -> f64 {
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.get_bytes_scanned() as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Print final statistics
    pub fn print_summary(&self, workers: usize, kernel: &str, strategy: &str) {
        let failed = self.get_failed_targets();

        eprintln!();
        eprintln!("{}", "═".repeat(48).green());
        eprintln!("  {} {}/{}", "Targets:   ".green(),
            format_number(self.get_processed_targets()),
            format_number(self.get_total_targets()));
        eprintln!("  {} {}", "Scanned:   ".green(), ByteSize(self.get_bytes_scanned()));
        if failed > 0 {
            eprintln!("  {} {}", "Failed:    ".red(), format_number(failed).red());
        }
        eprintln!("  {} {} ({} / {})", "Workers:   ".green(), workers, kernel, strategy);
        eprintln!("  {} {}", "Duration:  ".green(), format_duration(self.elapsed()));
        eprintln!("  {} {}/sec", "Speed:     ".green(), ByteSize(self.bytes_per_second() as u64));
        eprintln!("{}", "═".repeat(48).green());
    }
}

impl Default for ProcessingStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a number with thousand separators
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    let chars: Vec<char> = s.chars().collect();

    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }

    result
}

/// Format duration as human-readable string
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();

    if secs < 60 {
        format!("{:.3}s", duration.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}
