mod color;
mod device;
mod events;
mod protocol;
mod reconcile;
mod service;
#[cfg(test)]
mod test_helper;

pub use color::StatusColor;
pub use device::*;
pub use events::*;
pub use protocol::client::{BROADCAST_TARGET, DEFAULT_PORT, KasaBulb, KasaError, KasaOptions};
pub use protocol::messages::{LightState, SysInfo};
pub use protocol::scanner::Scanner;
pub use reconcile::{
    Decision, ReconcileReport, Schedule, UPCOMING_THRESHOLD_MINUTES, classify, decide,
    decide_with_threshold, upcoming_threshold,
};
pub use service::MeetingLight;

/// The production wiring: real bulbs, JSON config file.
pub type KasaMeetingLight = MeetingLight<KasaNetwork, JsonConfigFile>;
