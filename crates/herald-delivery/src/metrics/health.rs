//! Threshold evaluation for delivery health.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use herald_core::config::HealthThresholds;

/// Measured values a health report is built from.
#[derive(Debug, Clone, Copy)]
pub struct HealthInputs {
    /// Drainable `queued + sending` rows.
    pub queue_depth: u64,
    /// Queued rows overdue by more than the stuck threshold.
    pub stuck_items: u64,
    /// Error rate over the configured window.
    pub error_rate: f64,
}

/// Health report with one warning per breached threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryHealth {
    /// No threshold breached.
    pub healthy: bool,
    /// Human-readable warnings.
    pub warnings: Vec<String>,
    /// Current queue depth.
    pub queue_depth: u64,
    /// Current stuck item count.
    pub stuck_items: u64,
    /// Windowed error rate.
    pub error_rate: f64,
    /// Evaluation time.
    pub checked_at: DateTime<Utc>,
}

impl DeliveryHealth {
    /// Apply `thresholds` to `inputs`.
    pub fn evaluate(
        thresholds: &HealthThresholds,
        inputs: HealthInputs,
        now: DateTime<Utc>,
    ) -> Self {
        let mut warnings = Vec::new();

        if inputs.queue_depth > thresholds.max_queue_depth {
            warnings.push(format!(
                "Queue depth {} exceeds {}",
                inputs.queue_depth, thresholds.max_queue_depth
            ));
        }
        if inputs.stuck_items > 0 {
            warnings.push(format!(
                "{} queued items overdue by more than {}s",
                inputs.stuck_items, thresholds.stuck_after_seconds
            ));
        }
        if inputs.error_rate > thresholds.max_error_rate {
            warnings.push(format!(
                "Error rate {:.1}% over the last {}s exceeds {:.1}%",
                inputs.error_rate * 100.0,
                thresholds.error_window_seconds,
                thresholds.max_error_rate * 100.0
            ));
        }

        Self {
            healthy: warnings.is_empty(),
            warnings,
            queue_depth: inputs.queue_depth,
            stuck_items: inputs.stuck_items,
            error_rate: inputs.error_rate,
            checked_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_threshold_contributes_a_warning() {
        let thresholds = HealthThresholds::default();
        let healthy = DeliveryHealth::evaluate(
            &thresholds,
            HealthInputs {
                queue_depth: 10,
                stuck_items: 0,
                error_rate: 0.01,
            },
            Utc::now(),
        );
        assert!(healthy.healthy);
        assert!(healthy.warnings.is_empty());

        let unhealthy = DeliveryHealth::evaluate(
            &thresholds,
            HealthInputs {
                queue_depth: thresholds.max_queue_depth + 1,
                stuck_items: 3,
                error_rate: 0.5,
            },
            Utc::now(),
        );
        assert!(!unhealthy.healthy);
        assert_eq!(unhealthy.warnings.len(), 3);
        assert!(unhealthy.warnings[2].contains("50.0%"));
    }
}
