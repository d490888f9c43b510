use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use meeting_light_rs::{ConfigStore, DeviceNetwork, MeetingLight, ReconcileReport};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;

use crate::web::metrics::Metrics;
use crate::web::state::ServiceState;

/// One reconciliation pass, recorded in the shared state and metrics.
pub async fn reconcile_once<N, S>(
    service: &MeetingLight<N, S>,
    state: &ServiceState,
) -> ReconcileReport
where
    N: DeviceNetwork,
    S: ConfigStore,
{
    let now = Utc::now();
    let report = service.reconcile(now).await;
    state.record_reconciliation(&report, now);
    Metrics::record_reconciliation(&report, now.timestamp());
    report
}

/// Reconciles every `interval`, starting right away. A zero interval
/// disables polling and returns `None`.
pub fn spawn_poller<N, S>(
    service: Arc<MeetingLight<N, S>>,
    state: ServiceState,
    interval: Duration,
) -> Option<JoinHandle<()>>
where
    N: DeviceNetwork + 'static,
    S: ConfigStore + 'static,
{
    if interval.is_zero() {
        info!("Reconciliation polling is disabled");
        return None;
    }
    info!("Reconciling every {:?}", interval);

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // A slow pass (retries, discovery) must not trigger a burst afterwards
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            reconcile_once(&service, &state).await;
        }
    }))
}
