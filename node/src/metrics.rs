//! # Prometheus Metrics
//!
//! Operational metrics for the DocAuth node, scraped at `/metrics` on the
//! metrics port. Everything lives in a dedicated [`prometheus::Registry`]
//! prefixed `docauth_`, so nothing collides with the global default.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::core::Collector;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Holds all Prometheus metric handles for the node.
///
/// Prometheus handles are `Arc`s internally, so clones are cheap and all
/// point at the same series.
#[derive(Clone)]
pub struct NodeMetrics {
    registry: Registry,
    /// Challenges handed out.
    pub challenges_issued_total: IntCounter,
    /// Assertions that verified.
    pub assertions_verified_total: IntCounter,
    /// Rejected assertions by `reason` label.
    pub assertion_failures_total: IntCounterVec,
    /// New document versions registered.
    pub documents_registered_total: IntCounter,
    /// Lookups by content or digest.
    pub document_lookups_total: IntCounter,
    /// Write-through failures to the sled store.
    pub persistence_failures_total: IntCounter,
    /// Outstanding challenges, refreshed by the purge task.
    pub pending_challenges: IntGauge,
    /// Wall time of `verify_assertion`, success or failure.
    pub assertion_verify_seconds: Histogram,
}

fn register<C: Collector + Clone + 'static>(
    registry: &Registry,
    collector: C,
) -> Result<C, prometheus::Error> {
    registry.register(Box::new(collector.clone()))?;
    Ok(collector)
}

impl NodeMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("docauth".into()), None)?;

        let challenges_issued_total = register(
            &registry,
            IntCounter::new("challenges_issued_total", "Total challenges issued")?,
        )?;
        let assertions_verified_total = register(
            &registry,
            IntCounter::new(
                "assertions_verified_total",
                "Total assertions that verified successfully",
            )?,
        )?;
        let assertion_failures_total = register(
            &registry,
            IntCounterVec::new(
                Opts::new(
                    "assertion_failures_total",
                    "Total rejected assertions by reason",
                ),
                &["reason"],
            )?,
        )?;
        let documents_registered_total = register(
            &registry,
            IntCounter::new(
                "documents_registered_total",
                "Total document versions registered",
            )?,
        )?;
        let document_lookups_total = register(
            &registry,
            IntCounter::new("document_lookups_total", "Total document lookups")?,
        )?;
        let persistence_failures_total = register(
            &registry,
            IntCounter::new(
                "persistence_failures_total",
                "Total failed writes to the document store",
            )?,
        )?;
        let pending_challenges = register(
            &registry,
            IntGauge::new("pending_challenges", "Challenges issued but not yet consumed")?,
        )?;
        let assertion_verify_seconds = register(
            &registry,
            Histogram::with_opts(
                HistogramOpts::new(
                    "assertion_verify_seconds",
                    "Assertion verification latency in seconds",
                )
                .buckets(vec![
                    0.000_05, 0.000_1, 0.000_25, 0.000_5, 0.001, 0.0025, 0.005, 0.01, 0.05,
                ]),
            )?,
        )?;

        Ok(Self {
            registry,
            challenges_issued_total,
            assertions_verified_total,
            assertion_failures_total,
            documents_registered_total,
            document_lookups_total,
            persistence_failures_total,
            pending_challenges,
            assertion_verify_seconds,
        })
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
