//! Metrics helper structs for convenient metric recording

use prometheus::{Encoder, TextEncoder};

use super::{
    CONTENT_UPSERTS_TOTAL, EMAILS_RENDERED_TOTAL, EXTRACTION_FAILURES_TOTAL,
    INLINE_RESOURCES_TOTAL, RENDER_FAILURES_TOTAL, RENDER_LATENCY,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording render metrics
pub struct RenderMetrics;

impl RenderMetrics {
    /// Record a rendered email and its inline resources
    pub fn record_rendered(resources: usize, latency_secs: f64) {
        EMAILS_RENDERED_TOTAL.inc();
        INLINE_RESOURCES_TOTAL.inc_by(resources as u64);
        RENDER_LATENCY.observe(latency_secs);
    }

    /// Record a failed render
    pub fn record_failed(reason: &str) {
        RENDER_FAILURES_TOTAL.with_label_values(&[reason]).inc();
    }
}

/// Helper struct for recording content metrics
pub struct ContentMetrics;

impl ContentMetrics {
    /// Record a content upsert that was saved
    pub fn record_upserted() {
        CONTENT_UPSERTS_TOTAL.with_label_values(&["saved"]).inc();
    }

    /// Record a rejected content upsert
    pub fn record_rejected() {
        CONTENT_UPSERTS_TOTAL.with_label_values(&["rejected"]).inc();
    }

    /// Record a merge tag extraction failure
    pub fn record_extraction_failed() {
        EXTRACTION_FAILURES_TOTAL.inc();
    }
}
