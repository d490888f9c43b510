use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::color::StatusColor;
use crate::device::{Actuation, Actuator, ConfigStore, DeviceNetwork};
use crate::events::EventStore;
use crate::protocol::messages::LightState;
use crate::reconcile::{ReconcileReport, decide_with_threshold, upcoming_threshold};

/// Entry points used by the HTTP layer, the poller and the CLI.
pub struct MeetingLight<N, S> {
    actuator: Actuator<N, S>,
    events: EventStore,
    upcoming_threshold: Duration,
}

impl<N, S> MeetingLight<N, S>
where
    N: DeviceNetwork,
    S: ConfigStore,
{
    pub fn new(actuator: Actuator<N, S>, events: EventStore) -> Self {
        Self {
            actuator,
            events,
            upcoming_threshold: upcoming_threshold(),
        }
    }

    pub fn with_upcoming_threshold(mut self, threshold: Duration) -> Self {
        self.upcoming_threshold = threshold;
        self
    }

    pub fn actuator(&self) -> &Actuator<N, S> {
        &self.actuator
    }

    pub fn events(&self) -> &EventStore {
        &self.events
    }

    /// "I joined": flags the matching event, then turns the light red. A
    /// missing event or a failed write does not stop the color change.
    pub async fn set_joined(&self, meeting_id: Option<&str>) -> Actuation {
        if let Some(meeting_id) = meeting_id.filter(|m| !m.is_empty()) {
            match self.events.mark_joined(meeting_id) {
                Ok(true) => {}
                Ok(false) => info!("Joined untracked meeting {}", meeting_id),
                Err(e) => warn!("Failed to record join of {}: {}", meeting_id, e),
            }
        }
        self.actuator.set_color(StatusColor::Joined).await
    }

    pub async fn set_free(&self) -> Actuation {
        self.actuator.set_color(StatusColor::Free).await
    }

    pub async fn set_upcoming(&self) -> Actuation {
        self.actuator.set_color(StatusColor::Upcoming).await
    }

    pub async fn set_ongoing(&self) -> Actuation {
        self.actuator.set_color(StatusColor::Ongoing).await
    }

    pub async fn set_color(&self, color: StatusColor) -> Actuation {
        match color {
            StatusColor::Joined => self.set_joined(None).await,
            StatusColor::Free => self.set_free().await,
            StatusColor::Upcoming => self.set_upcoming().await,
            StatusColor::Ongoing => self.set_ongoing().await,
        }
    }

    pub async fn status(&self) -> Option<LightState> {
        self.actuator.status().await
    }

    /// Reads events and the bulb, decides, and actuates when needed. The
    /// whole pass holds the actuator lock, so a manual trigger lands either
    /// before the read or after the write.
    pub async fn reconcile(&self, now: DateTime<Utc>) -> ReconcileReport {
        let threshold = self.upcoming_threshold;
        self.actuator
            .reconcile(|observed_hue| {
                let events = self.events.load();
                let decision = decide_with_threshold(&events, now, observed_hue, threshold);
                info!(
                    "Reconciliation over {} event(s), observed hue {:?}: {}",
                    events.len(),
                    observed_hue,
                    decision.as_str()
                );
                decision
            })
            .await
    }
}
