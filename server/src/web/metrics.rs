//! Prometheus metrics exposed on `/metrics`.

use meeting_light_rs::{Actuation, ReconcileReport, StatusColor};
use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Installs the global recorder and registers metric descriptions.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metric_descriptions();
    Ok(handle)
}

fn register_metric_descriptions() {
    describe_gauge!(
        "meeting_light_info",
        "Information about the service (always 1, labels contain version info)"
    );
    describe_gauge!(
        "meeting_light_uptime_seconds",
        "Time in seconds since the service started"
    );
    describe_counter!(
        "meeting_light_triggers_total",
        "Color changes requested over HTTP, by color"
    );
    describe_counter!(
        "meeting_light_actuations_total",
        "Color assertions by outcome (applied, no_device, failed)"
    );
    describe_counter!(
        "meeting_light_reconciliations_total",
        "Reconciliation passes by decision"
    );
    describe_gauge!(
        "meeting_light_last_reconciliation_timestamp",
        "Unix timestamp of the last reconciliation pass"
    );
}

pub struct Metrics;

impl Metrics {
    pub fn set_uptime(start_time: Instant) {
        gauge!("meeting_light_uptime_seconds").set(start_time.elapsed().as_secs_f64());
    }

    pub fn set_info(version: &str) {
        gauge!("meeting_light_info", "version" => version.to_string()).set(1.0);
    }

    pub fn record_trigger(color: StatusColor, actuation: &Actuation) {
        counter!("meeting_light_triggers_total", "color" => color.as_str()).increment(1);
        Self::record_actuation(actuation);
    }

    pub fn record_actuation(actuation: &Actuation) {
        counter!("meeting_light_actuations_total", "outcome" => actuation.as_str()).increment(1);
    }

    pub fn record_reconciliation(report: &ReconcileReport, timestamp: i64) {
        counter!(
            "meeting_light_reconciliations_total",
            "decision" => report.decision.as_str()
        )
        .increment(1);
        if let Some(actuation) = &report.actuation {
            Self::record_actuation(actuation);
        }
        gauge!("meeting_light_last_reconciliation_timestamp").set(timestamp as f64);
    }
}
