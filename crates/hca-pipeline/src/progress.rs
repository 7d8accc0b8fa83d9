//! Progress bar with elapsed time and ETA.

use std::io::Write;
use std::time::{Duration, Instant};

pub const BAR_WIDTH: usize = 30;

/// Point-in-time progress figures for a loop of `total` items.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    pub current: usize,
    pub total: usize,
    pub elapsed: Duration,
    pub eta: Duration,
    pub filled: usize,
}

impl ProgressSnapshot {
    /// `current` is clamped into `1..=total`, so the ETA is never negative
    /// and is exactly zero on the last item.
    pub fn compute(current: usize, total: usize, elapsed: Duration) -> Self {
        let total = total.max(1);
        let current = current.clamp(1, total);
        let average = elapsed.as_secs_f64() / current as f64;
        let eta = average * (total - current) as f64;

        Self {
            current,
            total,
            elapsed,
            eta: Duration::from_secs_f64(eta),
            filled: BAR_WIDTH * current / total,
        }
    }

    pub fn bar(&self) -> String {
        format!("{}{}", "=".repeat(self.filled), "-".repeat(BAR_WIDTH - self.filled))
    }

    pub fn render(&self, label: &str) -> String {
        format!(
            "\r{} [{}] {}/{} | Elapsed: {:6.1}s | ETA: {:6.1}s",
            label,
            self.bar(),
            self.current,
            self.total,
            self.elapsed.as_secs_f64(),
            self.eta.as_secs_f64(),
        )
    }
}

/// Overwrite the current progress line on `out`. Write failures are ignored:
/// progress output never fails a stage.
pub fn report(out: &mut dyn Write, current: usize, total: usize, start: Instant, label: &str) {
    let snapshot = ProgressSnapshot::compute(current, total, start.elapsed());
    if out.write_all(snapshot.render(label).as_bytes()).and_then(|_| out.flush()).is_err() {
        tracing::trace!(label, "Progress line could not be written");
    }
}
