use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::color::StatusColor;
use crate::device::registry::{DeviceRegistry, Resolution};
use crate::device::{ConfigStore, DeviceNetwork, LightDevice};
use crate::protocol::messages::LightState;
use crate::reconcile::{Decision, ReconcileReport};

pub const FULL_SATURATION: u8 = 100;
pub const FULL_BRIGHTNESS: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    /// Pause between two failed attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_millis(500),
        }
    }
}

/// What happened to a color assertion. Never an error: the light is a
/// best-effort signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actuation {
    Applied { attempts: u32 },
    NoDevice,
    Failed { attempts: u32 },
}

impl Actuation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Actuation::Applied { .. } => "applied",
            Actuation::NoDevice => "no_device",
            Actuation::Failed { .. } => "failed",
        }
    }
}

/// Resolves the bulb and asserts colors on it.
///
/// Device connections are stateful (connect, verify, write), so resolution
/// and the write run under one lock; concurrent triggers queue up.
pub struct Actuator<N, S> {
    registry: DeviceRegistry<N, S>,
    retry: RetryPolicy,
    lock: Mutex<()>,
}

impl<N, S> Actuator<N, S>
where
    N: DeviceNetwork,
    S: ConfigStore,
{
    pub fn new(registry: DeviceRegistry<N, S>, retry: RetryPolicy) -> Self {
        Self {
            registry,
            retry,
            lock: Mutex::new(()),
        }
    }

    pub fn registry(&self) -> &DeviceRegistry<N, S> {
        &self.registry
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub async fn set_color(&self, color: StatusColor) -> Actuation {
        info!("Setting light to {} (hue {})", color, color.hue());
        self.set_hue(color.hue()).await
    }

    pub async fn set_hue(&self, hue: u16) -> Actuation {
        let _guard = self.lock.lock().await;

        match self.registry.resolve().await {
            Resolution::Cached(device) | Resolution::Discovered(device) => {
                self.write_hue(&device, hue).await
            }
            Resolution::NotFound(reason) => {
                warn!("No light available ({:?}), skipping hue {}", reason, hue);
                Actuation::NoDevice
            }
        }
    }

    /// Current state of the bulb, or `None` when it cannot be reached.
    pub async fn status(&self) -> Option<LightState> {
        let _guard = self.lock.lock().await;
        let device = self.registry.resolve().await.into_device()?;
        read_state(&device).await
    }

    /// Reads the bulb, lets `decide` pick a color from the observed hue, and
    /// asserts it on the same handle, all under one lock hold. Triggers that
    /// arrive meanwhile run after the write, never between read and write.
    pub async fn reconcile<F>(&self, decide: F) -> ReconcileReport
    where
        F: FnOnce(Option<u16>) -> Decision + Send,
    {
        let _guard = self.lock.lock().await;

        let device = self.registry.resolve().await.into_device();
        let observed_hue = match &device {
            Some(device) => read_state(device).await.map(|s| s.hue),
            None => None,
        };
        let decision = decide(observed_hue);
        let actuation = match (decision.target(), &device) {
            (None, _) => None,
            (Some(color), Some(device)) => {
                info!("Setting light to {} (hue {})", color, color.hue());
                Some(self.write_hue(device, color.hue()).await)
            }
            (Some(color), None) => {
                warn!("No light available, skipping {}", color);
                Some(Actuation::NoDevice)
            }
        };
        ReconcileReport {
            observed_hue,
            decision,
            actuation,
        }
    }

    async fn write_hue(&self, device: &N::Device, hue: u16) -> Actuation {
        let attempts = self.retry.attempts.max(1);
        for attempt in 1..=attempts {
            match device.set_hsv(hue, FULL_SATURATION, FULL_BRIGHTNESS).await {
                Ok(()) => {
                    info!("Light at {} set to hue {}", device.host(), hue);
                    return Actuation::Applied { attempts: attempt };
                }
                Err(e) => {
                    warn!("Attempt {} failed: {}", attempt, e);
                    if attempt < attempts {
                        tokio::time::sleep(self.retry.delay).await;
                    }
                }
            }
        }
        error!("Failed to set light color after {} attempts", attempts);
        Actuation::Failed { attempts }
    }
}

async fn read_state<D: LightDevice>(device: &D) -> Option<LightState> {
    match device.light_state().await {
        Ok(state) => Some(state),
        Err(e) => {
            warn!("Failed to read light state from {}: {}", device.host(), e);
            None
        }
    }
}
