//! Prometheus metrics for template rendering.
//!
//! This module provides metrics for monitoring the template subsystem:
//! - Render metrics (rendered emails, failures by reason, inline resources)
//! - Content metrics (upserts, merge tag extraction failures)

mod helpers;

pub use helpers::{encode_metrics, ContentMetrics, RenderMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Histogram, IntCounter,
    IntCounterVec,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "ara";

lazy_static! {
    // ============================================================================
    // Render Metrics
    // ============================================================================

    /// Total emails rendered
    pub static ref EMAILS_RENDERED_TOTAL: IntCounter = register_int_counter!(
        format!("{}_emails_rendered_total", METRIC_PREFIX),
        "Total emails rendered"
    ).unwrap();

    /// Total render failures by reason
    pub static ref RENDER_FAILURES_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_render_failures_total", METRIC_PREFIX),
        "Total render failures",
        &["reason"]
    ).unwrap();

    /// Total inline linked resources produced
    pub static ref INLINE_RESOURCES_TOTAL: IntCounter = register_int_counter!(
        format!("{}_inline_resources_total", METRIC_PREFIX),
        "Total inline linked resources attached to rendered emails"
    ).unwrap();

    /// Render latency
    pub static ref RENDER_LATENCY: Histogram = register_histogram!(
        format!("{}_render_latency_seconds", METRIC_PREFIX),
        "Email render latency in seconds",
        vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]
    ).unwrap();

    // ============================================================================
    // Content Metrics
    // ============================================================================

    /// Total body content upserts by outcome
    pub static ref CONTENT_UPSERTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_content_upserts_total", METRIC_PREFIX),
        "Total body content upserts",
        &["outcome"]
    ).unwrap();

    /// Total merge tag extraction failures
    pub static ref EXTRACTION_FAILURES_TOTAL: IntCounter = register_int_counter!(
        format!("{}_merge_tag_extraction_failures_total", METRIC_PREFIX),
        "Total merge tag extraction failures"
    ).unwrap();
}
