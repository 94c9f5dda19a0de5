//! # Prometheus Metrics
//!
//! Exposes operational metrics for the custody node. Scraped by Prometheus
//! at the `/metrics` HTTP endpoint on the configured metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] with
//! the `custody` prefix so they do not collide with any default global
//! registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, Gauge, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;

use custody_contracts::{Devnet, DevnetError, VaultError};

/// Holds all Prometheus metric handles for the node.
#[derive(Clone)]
pub struct NodeMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// Vault operations attempted, by operation.
    pub operations_total: IntCounterVec,
    /// Vault operations refused, by operation.
    pub rejected_total: IntCounterVec,
    /// Vault operations whose external call failed and were rolled back.
    pub rollbacks_total: IntCounterVec,
    /// Native currency owed to depositors, in wei.
    pub native_custodied_wei: Gauge,
    /// Identities with any non-zero booked balance.
    pub depositors: IntGauge,
    /// Latency of vault operations, including the external call.
    pub operation_latency_seconds: HistogramVec,
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("custody".into()), None)?;

        let operations_total = IntCounterVec::new(
            Opts::new("operations_total", "Vault operations attempted"),
            &["op"],
        )?;
        registry.register(Box::new(operations_total.clone()))?;

        let rejected_total = IntCounterVec::new(
            Opts::new("rejected_total", "Vault operations refused"),
            &["op"],
        )?;
        registry.register(Box::new(rejected_total.clone()))?;

        let rollbacks_total = IntCounterVec::new(
            Opts::new(
                "rollbacks_total",
                "Vault operations rolled back after a failed external call",
            ),
            &["op"],
        )?;
        registry.register(Box::new(rollbacks_total.clone()))?;

        let native_custodied_wei = Gauge::new(
            "native_custodied_wei",
            "Native currency owed to depositors, in wei",
        )?;
        registry.register(Box::new(native_custodied_wei.clone()))?;

        let depositors = IntGauge::new("depositors", "Identities with a non-zero booked balance")?;
        registry.register(Box::new(depositors.clone()))?;

        let operation_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "operation_latency_seconds",
                "Vault operation latency in seconds",
            )
            .buckets(vec![0.00001, 0.0001, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]),
            &["op"],
        )?;
        registry.register(Box::new(operation_latency_seconds.clone()))?;

        Ok(Self {
            registry,
            operations_total,
            rejected_total,
            rollbacks_total,
            native_custodied_wei,
            depositors,
            operation_latency_seconds,
        })
    }

    /// Records the outcome of one vault operation.
    pub fn record(&self, op: &str, outcome: &Result<(), DevnetError>, elapsed: Duration) {
        self.operations_total.with_label_values(&[op]).inc();
        self.operation_latency_seconds
            .with_label_values(&[op])
            .observe(elapsed.as_secs_f64());

        match outcome {
            Ok(()) => {}
            Err(DevnetError::Vault(VaultError::TransferFailed(_))) => {
                self.rejected_total.with_label_values(&[op]).inc();
                self.rollbacks_total.with_label_values(&[op]).inc();
            }
            Err(_) => self.rejected_total.with_label_values(&[op]).inc(),
        }
    }

    /// Refreshes the gauges from the current vault state.
    pub fn refresh(&self, devnet: &Devnet) {
        let ledger = devnet.vault().ledger();
        self.native_custodied_wei.set(ledger.total_eth() as f64);
        self.depositors.set(ledger.depositor_count() as i64);
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<NodeMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use custody_contracts::ExternalError;

    #[test]
    fn records_rollbacks_separately() {
        let metrics = NodeMetrics::new().unwrap();
        let failed = Err(DevnetError::Vault(VaultError::TransferFailed(
            ExternalError::Overflow,
        )));

        metrics.record("withdraw_eth", &Ok(()), Duration::from_micros(5));
        metrics.record("withdraw_eth", &failed, Duration::from_micros(5));
        metrics.record(
            "withdraw_eth",
            &Err(DevnetError::Vault(VaultError::ZeroAmount)),
            Duration::from_micros(5),
        );

        let ops = metrics.operations_total.with_label_values(&["withdraw_eth"]);
        assert_eq!(ops.get(), 3);
        assert_eq!(metrics.rejected_total.with_label_values(&["withdraw_eth"]).get(), 2);
        assert_eq!(metrics.rollbacks_total.with_label_values(&["withdraw_eth"]).get(), 1);
    }

    #[test]
    fn encoded_output_carries_prefix() {
        let metrics = NodeMetrics::new().unwrap();
        metrics.record("deposit_eth", &Ok(()), Duration::from_micros(1));
        let text = metrics.encode().unwrap();
        assert!(text.contains("custody_operations_total"));
        assert!(text.contains("custody_depositors"));
    }
}
