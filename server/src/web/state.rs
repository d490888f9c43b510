//! Runtime counters shared by the web handlers and the poller.

use chrono::{DateTime, Utc};
use meeting_light_rs::{Actuation, ReconcileReport, StatusColor};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActuationCounts {
    pub applied: u64,
    pub no_device: u64,
    pub failed: u64,
}

impl ActuationCounts {
    fn record(&mut self, actuation: &Actuation) {
        match actuation {
            Actuation::Applied { .. } => self.applied += 1,
            Actuation::NoDevice => self.no_device += 1,
            Actuation::Failed { .. } => self.failed += 1,
        }
    }
}

#[derive(Debug)]
struct ServiceStateInner {
    start_time: Instant,
    trigger_count: u64,
    last_trigger: Option<StatusColor>,
    actuations: ActuationCounts,
    reconciliation_count: u64,
    last_reconciliation: Option<DateTime<Utc>>,
    last_reconciled_at: Option<Instant>,
    last_decision: Option<&'static str>,
    last_observed_hue: Option<u16>,
}

#[derive(Debug, Clone)]
pub struct ServiceState {
    inner: Arc<RwLock<ServiceStateInner>>,
}

impl Default for ServiceState {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceState {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(ServiceStateInner {
                start_time: Instant::now(),
                trigger_count: 0,
                last_trigger: None,
                actuations: ActuationCounts::default(),
                reconciliation_count: 0,
                last_reconciliation: None,
                last_reconciled_at: None,
                last_decision: None,
                last_observed_hue: None,
            })),
        }
    }

    pub fn start_time(&self) -> Instant {
        self.inner.read().start_time
    }

    pub fn record_trigger(&self, color: StatusColor, actuation: &Actuation) {
        let mut inner = self.inner.write();
        inner.trigger_count += 1;
        inner.last_trigger = Some(color);
        inner.actuations.record(actuation);
    }

    pub fn record_reconciliation(&self, report: &ReconcileReport, at: DateTime<Utc>) {
        let mut inner = self.inner.write();
        inner.reconciliation_count += 1;
        inner.last_reconciliation = Some(at);
        inner.last_reconciled_at = Some(Instant::now());
        inner.last_decision = Some(report.decision.as_str());
        inner.last_observed_hue = report.observed_hue;
        if let Some(actuation) = &report.actuation {
            inner.actuations.record(actuation);
        }
    }

    /// Healthy while reconciliations keep coming within `max_age`; before
    /// the first one the service start counts. `None` means polling is off.
    pub fn is_healthy(&self, max_age: Option<Duration>) -> bool {
        let Some(max_age) = max_age else {
            return true;
        };
        let inner = self.inner.read();
        inner
            .last_reconciled_at
            .unwrap_or(inner.start_time)
            .elapsed()
            <= max_age
    }

    pub fn summary(&self) -> ServiceStateSummary {
        let inner = self.inner.read();
        ServiceStateSummary {
            uptime_seconds: inner.start_time.elapsed().as_secs(),
            trigger_count: inner.trigger_count,
            last_trigger: inner.last_trigger.map(|c| c.as_str()),
            actuations: inner.actuations,
            reconciliation_count: inner.reconciliation_count,
            last_reconciliation: inner.last_reconciliation,
            last_decision: inner.last_decision,
            last_observed_hue: inner.last_observed_hue,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceStateSummary {
    pub uptime_seconds: u64,
    pub trigger_count: u64,
    pub last_trigger: Option<&'static str>,
    pub actuations: ActuationCounts,
    pub reconciliation_count: u64,
    pub last_reconciliation: Option<DateTime<Utc>>,
    pub last_decision: Option<&'static str>,
    pub last_observed_hue: Option<u16>,
}

impl ServiceStateSummary {
    pub fn uptime_display(&self) -> String {
        let secs = self.uptime_seconds;
        let days = secs / 86400;
        let hours = (secs % 86400) / 3600;
        let mins = (secs % 3600) / 60;
        let secs = secs % 60;

        if days > 0 {
            format!("{}d {}h {}m {}s", days, hours, mins, secs)
        } else if hours > 0 {
            format!("{}h {}m {}s", hours, mins, secs)
        } else if mins > 0 {
            format!("{}m {}s", mins, secs)
        } else {
            format!("{}s", secs)
        }
    }
}
