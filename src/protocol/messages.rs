use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::protocol::client::KasaError;

pub const SYSTEM_MODULE: &str = "system";
pub const LIGHTING_MODULE: &str = "smartlife.iot.smartbulb.lightingservice";

pub const GET_SYSINFO: &str = "get_sysinfo";
pub const TRANSITION_LIGHT_STATE: &str = "transition_light_state";

pub fn make_sysinfo_message() -> Value {
    json!({ SYSTEM_MODULE: { GET_SYSINFO: {} } })
}

pub fn make_transition_message(hue: u16, saturation: u8, brightness: u8) -> Value {
    json!({
        LIGHTING_MODULE: {
            TRANSITION_LIGHT_STATE: {
                "hue": hue,
                "saturation": saturation,
                "brightness": brightness,
                "color_temp": 0,
                "on_off": 1,
                "ignore_default": 1,
                "transition_period": 0,
            }
        }
    })
}

/// Extracts `response[module][method]`, failing on a missing section or a
/// non-zero `err_code`.
pub fn extract_result<'a>(
    response: &'a Value,
    module: &str,
    method: &str,
) -> Result<&'a Value, KasaError> {
    let result = response
        .get(module)
        .and_then(|m| m.get(method))
        .ok_or_else(|| KasaError::Protocol(format!("missing {module}.{method} in response")))?;
    let code = result.get("err_code").and_then(Value::as_i64).unwrap_or(0);
    if code != 0 {
        let msg = result
            .get("err_msg")
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        return Err(KasaError::Device { code, msg });
    }
    Ok(result)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLightState {
    #[serde(default)]
    pub on_off: u8,
    #[serde(default)]
    pub hue: Option<u16>,
    #[serde(default)]
    pub saturation: Option<u8>,
    #[serde(default)]
    pub brightness: Option<u8>,
    #[serde(default)]
    pub color_temp: Option<u16>,
    #[serde(default)]
    pub dft_on_state: Option<Box<RawLightState>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SysInfo {
    pub alias: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default, alias = "mic_mac")]
    pub mac: Option<String>,
    #[serde(default, alias = "mic_type", rename = "type")]
    pub device_type: Option<String>,
    #[serde(default)]
    pub light_state: Option<RawLightState>,
}

impl SysInfo {
    pub fn from_response(response: &Value) -> Result<Self, KasaError> {
        let info = extract_result(response, SYSTEM_MODULE, GET_SYSINFO)?;
        Ok(serde_json::from_value(info.clone())?)
    }

    /// Only devices reporting a light state can be recolored.
    pub fn is_light(&self) -> bool {
        self.light_state.is_some()
    }
}

/// Observed color state of a bulb.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightState {
    pub light_on: bool,
    pub hue: u16,
    pub saturation: u8,
    pub brightness: u8,
    pub color_temp: u16,
}

impl From<&RawLightState> for LightState {
    fn from(raw: &RawLightState) -> Self {
        let light_on = raw.on_off != 0;
        // Switched-off bulbs report their color under dft_on_state
        let source = match (&raw.dft_on_state, light_on) {
            (Some(dft), false) => dft.as_ref(),
            _ => raw,
        };
        LightState {
            light_on,
            hue: source.hue.unwrap_or_default(),
            saturation: source.saturation.unwrap_or_default(),
            brightness: source.brightness.unwrap_or_default(),
            color_temp: source.color_temp.unwrap_or_default(),
        }
    }
}
