//! Prometheus metrics for the LikeGate node.
//!
//! [`DispatchMetrics`] owns a dedicated [`Registry`] that the RPC `/metrics`
//! endpoint encodes into the Prometheus text exposition format.

use prometheus::{
    register_int_counter_vec_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};

use crate::dispatcher::CycleReport;

pub struct DispatchMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    /// Completed dispatcher cycles.
    pub cycles: IntCounter,
    /// Requests settled, labelled by terminal outcome.
    pub requests: IntCounterVec,
    /// Store operations that failed inside the dispatcher.
    pub store_errors: IntCounter,
    pub notify_failures: IntCounter,
    /// `/verify` results, labelled by outcome.
    pub verifications: IntCounterVec,
    /// Requests awaiting dispatch at the start of the last cycle.
    pub pending: IntGauge,
    /// Expired requests removed by housekeeping.
    pub purged: IntCounter,
}

impl DispatchMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let cycles = register_int_counter_with_registry!(
            Opts::new("likegate_dispatch_cycles_total", "Dispatcher cycles completed"),
            registry
        )?;
        let requests = register_int_counter_vec_with_registry!(
            Opts::new(
                "likegate_requests_processed_total",
                "Requests marked processed, by outcome"
            ),
            &["outcome"],
            registry
        )?;
        let store_errors = register_int_counter_with_registry!(
            Opts::new(
                "likegate_store_errors_total",
                "Store operations that failed during dispatch"
            ),
            registry
        )?;
        let notify_failures = register_int_counter_with_registry!(
            Opts::new(
                "likegate_notify_failures_total",
                "Result notifications that could not be delivered"
            ),
            registry
        )?;
        let verifications = register_int_counter_vec_with_registry!(
            Opts::new(
                "likegate_verifications_total",
                "Verification link visits, by outcome"
            ),
            &["outcome"],
            registry
        )?;
        let pending = register_int_gauge_with_registry!(
            Opts::new(
                "likegate_pending_requests",
                "Verified requests awaiting dispatch at the last cycle"
            ),
            registry
        )?;
        let purged = register_int_counter_with_registry!(
            Opts::new(
                "likegate_requests_purged_total",
                "Expired unverified requests removed"
            ),
            registry
        )?;

        Ok(Self {
            registry,
            cycles,
            requests,
            store_errors,
            notify_failures,
            verifications,
            pending,
            purged,
        })
    }

    /// Fold one cycle's report into the counters.
    pub fn record_cycle(&self, report: &CycleReport) {
        self.cycles.inc();
        self.pending.set(report.scanned as i64);
        self.requests
            .with_label_values(&["deferred"])
            .inc_by(report.deferred);
        self.requests
            .with_label_values(&["succeeded"])
            .inc_by(report.succeeded);
        self.requests
            .with_label_values(&["no_effect"])
            .inc_by(report.no_effect);
        self.requests
            .with_label_values(&["failed"])
            .inc_by(report.failed);
        self.store_errors.inc_by(report.store_errors);
        self.notify_failures.inc_by(report.notify_failures);
        self.purged.inc_by(report.purged);
    }
}
