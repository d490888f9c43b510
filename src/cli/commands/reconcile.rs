use anyhow::Result;
use chrono::Utc;

use crate::{Params, utils::create_service};

pub async fn reconcile(params: Params) -> Result<()> {
    let service = create_service(&params)?;
    let report = service.reconcile(Utc::now()).await;
    println!(
        "Observed hue: {}, decision: {}",
        report
            .observed_hue
            .map(|h| h.to_string())
            .unwrap_or_else(|| "unknown".to_string()),
        report.decision.as_str()
    );
    if let Some(actuation) = report.actuation {
        println!("Actuation: {}", actuation.as_str());
    }
    Ok(())
}
