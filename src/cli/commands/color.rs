use anyhow::Result;
use meeting_light_rs::{Actuation, StatusColor};

use crate::{Params, utils::create_service};

pub async fn status(params: Params) -> Result<()> {
    let service = create_service(&params)?;
    match service.status().await {
        Some(state) => println!("{}", serde_json::to_string_pretty(&state)?),
        None => println!("Light not reachable"),
    }
    Ok(())
}

pub async fn set_color(params: Params, color: StatusColor) -> Result<()> {
    let service = create_service(&params)?;
    report(color, service.set_color(color).await);
    Ok(())
}

pub async fn join(params: Params, meeting_id: Option<&str>) -> Result<()> {
    let service = create_service(&params)?;
    report(StatusColor::Joined, service.set_joined(meeting_id).await);
    Ok(())
}

fn report(color: StatusColor, actuation: Actuation) {
    match actuation {
        Actuation::Applied { attempts } => {
            println!("Light set to {color} after {attempts} attempt(s)")
        }
        Actuation::NoDevice => println!("Light not found, nothing changed"),
        Actuation::Failed { attempts } => {
            println!("Light did not accept {color} after {attempts} attempt(s)")
        }
    }
}
