//! Decides which color the bulb should show next.
//!
//! Precedence, highest first:
//! 1. a red (joined) bulb is left alone, whatever the calendar says;
//! 2. a meeting in progress that was not joined turns it purple;
//! 3. a meeting starting within the threshold turns it blue;
//! 4. any color other than red or green falls back to green.
//!
//! Otherwise nothing changes. The decision is a pure function of the events,
//! the clock and the observed hue.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::color::StatusColor;
use crate::device::Actuation;
use crate::events::CalendarEvent;

pub const UPCOMING_THRESHOLD_MINUTES: i64 = 15;

pub fn upcoming_threshold() -> Duration {
    Duration::minutes(UPCOMING_THRESHOLD_MINUTES)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    NoChange,
    Assert(StatusColor),
}

impl Decision {
    pub fn target(&self) -> Option<StatusColor> {
        match self {
            Decision::NoChange => None,
            Decision::Assert(color) => Some(*color),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::NoChange => "no_change",
            Decision::Assert(color) => color.as_str(),
        }
    }
}

/// Result of one reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileReport {
    pub observed_hue: Option<u16>,
    pub decision: Decision,
    pub actuation: Option<Actuation>,
}

/// Calendar situation at one instant.
#[derive(Debug, Default, PartialEq)]
pub struct Schedule<'a> {
    /// Unjoined meeting running now. Later entries in the list win.
    pub in_progress: Option<&'a CalendarEvent>,
    /// Unjoined meeting starting within the threshold.
    pub upcoming: Option<&'a CalendarEvent>,
}

/// Classifies today's unjoined timed events relative to `now`. Events without
/// both instants, on another day, or already joined are skipped.
pub fn classify<'a>(
    events: &'a [CalendarEvent],
    now: DateTime<Utc>,
    threshold: Duration,
) -> Schedule<'a> {
    let today = now.date_naive();
    let limit = now + threshold;
    let mut schedule = Schedule::default();

    for event in events {
        let (Some(start), Some(end)) = (event.start_instant(), event.end_instant()) else {
            continue;
        };
        if start.date_naive() != today || event.is_joined() {
            continue;
        }
        if start <= now && now <= end {
            schedule.in_progress = Some(event);
        } else if now < start && start <= limit {
            schedule.upcoming = Some(event);
        }
    }
    schedule
}

/// One reconciliation pass with the default 15 minute threshold.
pub fn decide(events: &[CalendarEvent], now: DateTime<Utc>, observed_hue: Option<u16>) -> Decision {
    decide_with_threshold(events, now, observed_hue, upcoming_threshold())
}

/// `observed_hue` is `None` when the bulb could not be read; that counts as an
/// unexpected color and falls back to green.
pub fn decide_with_threshold(
    events: &[CalendarEvent],
    now: DateTime<Utc>,
    observed_hue: Option<u16>,
    threshold: Duration,
) -> Decision {
    let joined = StatusColor::Joined.hue();
    let free = StatusColor::Free.hue();

    if observed_hue == Some(joined) {
        debug!("Light shows joined, not overriding");
        return Decision::NoChange;
    }

    let schedule = classify(events, now, threshold);
    if let Some(event) = schedule.in_progress {
        debug!("Meeting {:?} in progress and not joined", event.id());
        Decision::Assert(StatusColor::Ongoing)
    } else if let Some(event) = schedule.upcoming {
        debug!("Meeting {:?} starts soon", event.id());
        Decision::Assert(StatusColor::Upcoming)
    } else if observed_hue != Some(free) {
        Decision::Assert(StatusColor::Free)
    } else {
        Decision::NoChange
    }
}
