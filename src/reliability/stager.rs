use std::collections::HashMap;

use serde::Serialize;

/// Consecutive failures before a metric is shown as offline.
pub const DEGRADE_AFTER: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Last good value is still shown.
    Normal,
    /// Sustained outage; the metric is shown as signal lost.
    Degraded,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Normal => "normal",
            Severity::Degraded => "degraded",
        }
    }
}

/// Per-metric run counter with hysteresis against one-off failures.
#[derive(Debug, Clone)]
pub struct FailureStager {
    counters: HashMap<String, u32>,
    threshold: u32,
}

impl Default for FailureStager {
    fn default() -> Self {
        Self::new(DEGRADE_AFTER)
    }
}

impl FailureStager {
    pub fn new(threshold: u32) -> Self {
        Self { counters: HashMap::new(), threshold: threshold.max(1) }
    }

    /// Returns the severity the metric had before the reset.
    pub fn report_success(&mut self, metric: &str) -> Severity {
        let before = self.severity(metric);
        self.counters.insert(metric.to_string(), 0);
        before
    }

    pub fn report_failure(&mut self, metric: &str) -> Severity {
        let count = self.counters.entry(metric.to_string()).or_insert(0);
        *count = count.saturating_add(1);
        let count = *count;
        self.classify(count)
    }

    pub fn severity(&self, metric: &str) -> Severity {
        self.classify(self.consecutive_failures(metric))
    }

    pub fn consecutive_failures(&self, metric: &str) -> u32 {
        self.counters.get(metric).copied().unwrap_or(0)
    }

    fn classify(&self, count: u32) -> Severity {
        if count >= self.threshold {
            Severity::Degraded
        } else {
            Severity::Normal
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_five_failures_sequence() {
        let mut s = FailureStager::default();
        let seq: Vec<Severity> = (0..5).map(|_| s.report_failure("price")).collect();
        assert_eq!(
            seq,
            vec![
                Severity::Normal,
                Severity::Normal,
                Severity::Degraded,
                Severity::Degraded,
                Severity::Degraded
            ]
        );
    }

    #[test]
    fn test_success_resets_run() {
        let mut s = FailureStager::default();
        s.report_failure("hashrate");
        s.report_failure("hashrate");
        assert_eq!(s.report_success("hashrate"), Severity::Normal);
        assert_eq!(s.report_failure("hashrate"), Severity::Normal);
        assert_eq!(s.report_failure("hashrate"), Severity::Normal);
        assert_eq!(s.report_failure("hashrate"), Severity::Degraded);
        assert_eq!(s.report_success("hashrate"), Severity::Degraded);
        assert_eq!(s.severity("hashrate"), Severity::Normal);
    }

    #[test]
    fn test_metrics_are_independent() {
        let mut s = FailureStager::default();
        for _ in 0..3 {
            s.report_failure("balance:a");
        }
        assert_eq!(s.severity("balance:a"), Severity::Degraded);
        assert_eq!(s.severity("balance:b"), Severity::Normal);
    }

    #[test]
    fn test_degraded_iff_last_three_failed() {
        // Exhaustive over all report sequences up to length 8.
        for len in 1..=8u32 {
            for bits in 0..(1u32 << len) {
                let mut s = FailureStager::default();
                let mut last = Severity::Normal;
                let mut history = Vec::new();
                for i in 0..len {
                    let fail = bits & (1 << i) != 0;
                    history.push(fail);
                    if fail {
                        last = s.report_failure("m");
                    } else {
                        s.report_success("m");
                        last = s.severity("m");
                    }
                }
                let tail_failed = history.len() >= 3 && history.iter().rev().take(3).all(|f| *f);
                assert_eq!(last == Severity::Degraded, tail_failed, "{:?}", history);
            }
        }
    }
}
