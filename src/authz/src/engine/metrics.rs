//! Decision counters and latency tracking

use super::decision::{Decision, DecisionSource};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Engine metrics snapshot
#[derive(Debug, Clone, Default)]
pub struct EngineMetrics {
    /// Total number of checks
    pub total_checks: u64,

    /// Number of allowed decisions
    pub allowed_decisions: u64,

    /// Number of denied decisions
    pub denied_decisions: u64,

    /// Decisions per deciding layer
    pub by_source: HashMap<DecisionSource, u64>,

    /// Snapshot cache hits
    pub cache_hits: u64,

    /// Snapshot cache misses
    pub cache_misses: u64,

    /// Average check latency
    pub avg_latency_ms: f64,

    /// Slowest check observed
    pub max_latency_ms: f64,
}

impl EngineMetrics {
    /// Calculate cache hit rate
    pub fn cache_hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }

    /// Calculate allow rate
    pub fn allow_rate(&self) -> f64 {
        let total = self.allowed_decisions + self.denied_decisions;
        if total == 0 {
            0.0
        } else {
            self.allowed_decisions as f64 / total as f64
        }
    }

    /// Number of decisions settled by `source`
    pub fn decisions_from(&self, source: DecisionSource) -> u64 {
        self.by_source.get(&source).copied().unwrap_or(0)
    }
}

/// Metrics collector
pub struct MetricsCollector {
    metrics: Arc<RwLock<EngineMetrics>>,
}

impl MetricsCollector {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            metrics: Arc::new(RwLock::new(EngineMetrics::default())),
        }
    }

    /// Record a cache hit
    pub async fn record_cache_hit(&self) {
        let mut metrics = self.metrics.write().await;
        metrics.cache_hits += 1;
    }

    /// Record a cache miss
    pub async fn record_cache_miss(&self) {
        let mut metrics = self.metrics.write().await;
        metrics.cache_misses += 1;
    }

    /// Record a decision and how long it took
    pub async fn record_decision(&self, decision: &Decision, latency: Duration) {
        let latency_ms = latency.as_secs_f64() * 1000.0;
        let mut metrics = self.metrics.write().await;

        metrics.total_checks += 1;
        if decision.allowed {
            metrics.allowed_decisions += 1;
        } else {
            metrics.denied_decisions += 1;
        }
        *metrics.by_source.entry(decision.source).or_insert(0) += 1;

        // Running average
        let n = metrics.total_checks as f64;
        metrics.avg_latency_ms += (latency_ms - metrics.avg_latency_ms) / n;
        if latency_ms > metrics.max_latency_ms {
            metrics.max_latency_ms = latency_ms;
        }
    }

    /// Get current metrics
    pub async fn get_metrics(&self) -> EngineMetrics {
        self.metrics.read().await.clone()
    }

    /// Reset all counters
    pub async fn reset(&self) {
        *self.metrics.write().await = EngineMetrics::default();
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
