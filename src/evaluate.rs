//! Threshold evaluation for polled readings.

use std::collections::HashMap;

use tracing::trace;

use crate::ReadingStatus;
use crate::store::Threshold;

/// Classifies polled values against the enabled thresholds of one
/// device.
///
/// Built once per polling session from a threshold snapshot, so a
/// threshold edited mid-session is picked up on the next session (the
/// staleness window is one session). Thresholds whose parameter cannot
/// be matched simply never trigger; the pair reads as "no threshold
/// configured".
#[derive(Debug, Clone, Default)]
pub struct ThresholdEvaluator {
    by_parameter: HashMap<i64, Vec<Threshold>>,
}

impl ThresholdEvaluator {
    /// Index a threshold snapshot by parameter. Disabled thresholds are
    /// dropped here so evaluation never has to re-check the flag.
    pub fn new(thresholds: Vec<Threshold>) -> Self {
        let mut by_parameter: HashMap<i64, Vec<Threshold>> = HashMap::new();
        for threshold in thresholds.into_iter().filter(|t| t.enabled) {
            by_parameter.entry(threshold.parameter_id).or_default().push(threshold);
        }
        Self { by_parameter }
    }

    /// Number of parameters with at least one enabled threshold.
    pub fn len(&self) -> usize {
        self.by_parameter.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_parameter.is_empty()
    }

    /// Classify one value.
    ///
    /// `Unknown` when the parameter has no enabled threshold, `Alarm`
    /// when the value falls outside any enabled threshold's bounds
    /// (bounds are inclusive: a value exactly on `low` or `high` is in
    /// range), `Ok` otherwise. A missing bound is unbounded on that
    /// side.
    pub fn evaluate(&self, parameter_id: i64, value: f64) -> ReadingStatus {
        let Some(thresholds) = self.by_parameter.get(&parameter_id) else {
            return ReadingStatus::Unknown;
        };

        for threshold in thresholds {
            let below = threshold.low.is_some_and(|low| value < low);
            let above = threshold.high.is_some_and(|high| value > high);
            if below || above {
                trace!(
                    "value {value} outside threshold {} ({:?}..{:?})",
                    threshold.id, threshold.low, threshold.high
                );
                return ReadingStatus::Alarm;
            }
        }

        ReadingStatus::Ok
    }
}
