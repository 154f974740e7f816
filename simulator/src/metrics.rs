//! Workflow counters and latency summary for a simulation run.

use std::time::Duration;

/// Latency samples kept for the summary; older samples are dropped first.
const MAX_SAMPLES: usize = 10_000;

/// Counters collected while the simulator runs.
#[derive(Debug, Clone, Default)]
pub struct SimulationMetrics {
    /// Workflows attempted.
    pub total_workflows: u64,
    /// Workflows that behaved as expected.
    pub successful_workflows: u64,
    /// Workflows that hit an unexpected result.
    pub failed_workflows: u64,
    /// Stats polls performed.
    pub polls: u64,
    latencies_ms: Vec<u64>,
}

/// Workflow latency over the retained samples, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LatencySummary {
    pub average_ms: u64,
    pub p50_ms: u64,
    pub p99_ms: u64,
    pub max_ms: u64,
}

impl SimulationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, latency_ms: u64) {
        self.total_workflows += 1;
        self.successful_workflows += 1;
        self.push_latency(latency_ms);
    }

    pub fn record_failure(&mut self, latency_ms: u64) {
        self.total_workflows += 1;
        self.failed_workflows += 1;
        self.push_latency(latency_ms);
    }

    pub fn record_poll(&mut self) {
        self.polls += 1;
    }

    fn push_latency(&mut self, latency_ms: u64) {
        if self.latencies_ms.len() == MAX_SAMPLES {
            self.latencies_ms.remove(0);
        }
        self.latencies_ms.push(latency_ms);
    }

    /// Fraction of workflows that succeeded, 0.0 when none ran.
    pub fn success_rate(&self) -> f64 {
        if self.total_workflows == 0 {
            return 0.0;
        }
        self.successful_workflows as f64 / self.total_workflows as f64
    }

    /// Workflows per second over `elapsed`.
    pub fn throughput(&self, elapsed: Duration) -> f64 {
        let secs = elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.total_workflows as f64 / secs
    }

    /// Nearest-rank percentiles over the retained samples. All zero when
    /// nothing has been recorded.
    pub fn latency_summary(&self) -> LatencySummary {
        if self.latencies_ms.is_empty() {
            return LatencySummary::default();
        }

        let mut sorted = self.latencies_ms.clone();
        sorted.sort_unstable();
        let rank = |pct: usize| sorted[(sorted.len() * pct).div_ceil(100).saturating_sub(1)];

        LatencySummary {
            average_ms: sorted.iter().sum::<u64>() / sorted.len() as u64,
            p50_ms: rank(50),
            p99_ms: rank(99),
            max_ms: sorted[sorted.len() - 1],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics() {
        let mut metrics = SimulationMetrics::new();

        metrics.record_success(100);
        metrics.record_success(200);
        metrics.record_success(150);
        metrics.record_failure(150);
        metrics.record_poll();

        assert_eq!(metrics.total_workflows, 4);
        assert_eq!(metrics.successful_workflows, 3);
        assert_eq!(metrics.failed_workflows, 1);
        assert_eq!(metrics.polls, 1);
        assert_eq!(metrics.success_rate(), 0.75);
        assert_eq!(metrics.throughput(Duration::from_secs(2)), 2.0);
        assert_eq!(
            metrics.latency_summary(),
            LatencySummary {
                average_ms: 150,
                p50_ms: 150,
                p99_ms: 200,
                max_ms: 200,
            }
        );
    }

    #[test]
    fn test_empty_metrics() {
        let metrics = SimulationMetrics::new();
        assert_eq!(metrics.latency_summary(), LatencySummary::default());
        assert_eq!(metrics.success_rate(), 0.0);
        assert_eq!(metrics.throughput(Duration::ZERO), 0.0);
    }

    #[test]
    fn test_oldest_samples_dropped() {
        let mut metrics = SimulationMetrics::new();
        metrics.record_success(1_000_000);
        for _ in 0..MAX_SAMPLES {
            metrics.record_success(10);
        }

        assert_eq!(metrics.total_workflows, MAX_SAMPLES as u64 + 1);
        assert_eq!(metrics.latency_summary().max_ms, 10);
    }
}
