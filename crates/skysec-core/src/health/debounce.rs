//! Anti-flap debounce for hardware metrics
//!
//! A metric must breach its threshold on `limit` consecutive samples before
//! it counts as a sustained fault. Any non-breaching sample resets the run.

use serde::{Deserialize, Serialize};

/// Consecutive-breach counter for one metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DebounceCounter {
    pub count: u32,
    /// Samples strictly above this value breach
    pub threshold: f64,
    /// Consecutive breaches needed to trip
    pub limit: u32,
}

impl DebounceCounter {
    pub const fn new(threshold: f64, limit: u32) -> Self {
        Self {
            count: 0,
            threshold,
            limit,
        }
    }

    /// Fold one sample into the counter
    #[must_use]
    pub fn observe(self, sample: f64) -> Self {
        let count = if sample > self.threshold {
            self.count.saturating_add(1)
        } else {
            0
        };
        Self { count, ..self }
    }

    pub fn is_tripped(&self) -> bool {
        self.count >= self.limit
    }
}

/// Hardware metric watched by a debounce counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Cpu,
    Memory,
}

impl Metric {
    /// Label used in readiness reasons
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Cpu => "CPU",
            Metric::Memory => "RAM",
        }
    }

    /// Reason recorded when the metric's counter trips
    pub fn critical_reason(&self, value: f64) -> String {
        format!("{} Critical ({}%)", self.label(), value)
    }
}
