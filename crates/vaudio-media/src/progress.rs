//! Progress parsing and normalization.
//!
//! Converters report progress in whatever shape they have at hand. The
//! boundary adapters here turn those payloads into a [`ProgressEvent`], and
//! [`ProgressNormalizer`] reduces the events of one file into a single
//! monotonic percentage.

use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Progress information from FFmpeg.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FfmpegProgress {
    /// Output time in milliseconds
    pub out_time_ms: i64,
    /// Output time as string (HH:MM:SS.microseconds)
    pub out_time: String,
    /// Encoding speed (e.g., 1.5 = 1.5x realtime)
    pub speed: f64,
    /// Whether encoding is complete
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Map to a progress event given the probed input duration.
    ///
    /// Returns `None` while no time has been encoded and the total is unknown.
    pub fn to_event(&self, total_duration_ms: i64) -> Option<ProgressEvent> {
        if self.is_complete {
            return Some(ProgressEvent::Fraction(1.0));
        }
        if total_duration_ms <= 0 {
            return None;
        }
        Some(ProgressEvent::Ratio {
            completed: self.out_time_ms as f64,
            total: total_duration_ms as f64,
        })
    }

    /// Estimate time remaining in seconds.
    pub fn eta_seconds(&self, total_duration_ms: i64) -> Option<f64> {
        if self.speed <= 0.0 || self.out_time_ms <= 0 {
            return None;
        }

        let remaining_ms = total_duration_ms - self.out_time_ms;
        if remaining_ms <= 0 {
            return Some(0.0);
        }

        Some((remaining_ms as f64 / 1000.0) / self.speed)
    }
}

/// A progress report from a converter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressEvent {
    /// Directly reported fraction of the work done (nominally 0.0-1.0)
    Fraction(f64),
    /// Units completed out of a total
    Ratio { completed: f64, total: f64 },
}

impl ProgressEvent {
    /// Probe a loosely-shaped progress payload.
    ///
    /// A `fraction` field wins. Otherwise the total is read from `total` or
    /// `n` and must be non-zero, and the completed count from the first of
    /// `index`, `value`, `current` or `completed` that is present.
    pub fn from_fields(payload: &Value) -> Option<Self> {
        let fields = payload.as_object()?;
        let number = |key: &str| fields.get(key).and_then(Value::as_f64);

        if let Some(fraction) = number("fraction") {
            return Some(ProgressEvent::Fraction(fraction));
        }

        let total = ["total", "n"]
            .into_iter()
            .filter_map(number)
            .find(|total| *total != 0.0)?;
        let completed = ["index", "value", "current", "completed"]
            .into_iter()
            .find_map(number)?;

        Some(ProgressEvent::Ratio { completed, total })
    }

    /// The fraction of work done, if derivable.
    pub fn fraction(&self) -> Option<f64> {
        let fraction = match *self {
            ProgressEvent::Fraction(fraction) => fraction,
            ProgressEvent::Ratio { completed, total } if total > 0.0 => completed / total,
            ProgressEvent::Ratio { .. } => return None,
        };
        fraction.is_finite().then_some(fraction)
    }

    /// Rounded percentage clamped to `[0, 100]`.
    pub fn percent(&self) -> Option<u8> {
        self.fraction()
            .map(|fraction| (fraction * 100.0).round().clamp(0.0, 100.0) as u8)
    }
}

/// Reduces the progress events of one file into a monotonic percentage.
///
/// Events that carry no derivable fraction, or that would move the
/// percentage backwards, produce nothing; the last published value stands.
#[derive(Debug, Default)]
pub struct ProgressNormalizer {
    last: AtomicU8,
}

impl ProgressNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed an event; returns the percentage to publish, if it advanced.
    pub fn normalize(&self, event: &ProgressEvent) -> Option<u8> {
        let percent = event.percent()?;
        let previous = self.last.fetch_max(percent, Ordering::AcqRel);
        (percent > previous).then_some(percent)
    }

    /// Last published percentage.
    pub fn last(&self) -> u8 {
        self.last.load(Ordering::Acquire)
    }
}
