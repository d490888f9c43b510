use anyhow::Result;
use meeting_light_rs::Scanner;

use crate::{Params, utils::kasa_options};

pub async fn scan(params: Params) -> Result<()> {
    let lights = Scanner::scan(&kasa_options(&params)?).await?;
    if lights.is_empty() {
        println!("No lights found");
    }
    for light in lights {
        println!(
            "Found '{}' at {} ({})",
            light.alias(),
            light.host(),
            light.sysinfo().model.as_deref().unwrap_or("unknown model")
        );
    }
    Ok(())
}
