use std::time::Duration;

use anyhow::Result;
use meeting_light_rs::{
    Actuator, DeviceRegistry, EventStore, JsonConfigFile, KasaMeetingLight, KasaNetwork,
    KasaOptions, MeetingLight, RetryPolicy,
};

use crate::Params;

pub fn kasa_options(params: &Params) -> Result<KasaOptions> {
    Ok(KasaOptions::builder()
        .timeout(Duration::from_secs(params.timeout_secs))
        .build()?)
}

pub fn create_service(params: &Params) -> Result<KasaMeetingLight> {
    let registry = DeviceRegistry::new(
        KasaNetwork::new(kasa_options(params)?),
        JsonConfigFile::new(&params.config),
    )
    .with_alias(params.alias.clone());
    let actuator = Actuator::new(registry, RetryPolicy::default());
    Ok(MeetingLight::new(actuator, EventStore::new(&params.events)))
}
