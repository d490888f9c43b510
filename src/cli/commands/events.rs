use anyhow::{Context, Result};
use chrono::Utc;
use meeting_light_rs::{CalendarEvent, EventStore};

use crate::Params;

pub fn list_events(params: Params) -> Result<()> {
    let events = EventStore::new(&params.events).load();
    for event in &events {
        println!(
            "{} {} - {} meeting={} joined={}",
            event.id().unwrap_or("-"),
            event
                .start_instant()
                .map(|s| s.to_rfc3339())
                .unwrap_or_else(|| "-".to_string()),
            event
                .end_instant()
                .map(|e| e.to_rfc3339())
                .unwrap_or_else(|| "-".to_string()),
            event.meeting_id().unwrap_or("-"),
            event.is_joined()
        );
    }
    println!("{} event(s)", events.len());
    Ok(())
}

pub fn purge_events(params: Params) -> Result<()> {
    let removed = EventStore::new(&params.events).purge_stale(Utc::now().date_naive())?;
    println!("Removed {removed} stale event(s)");
    Ok(())
}

/// Merges a downloaded calendar (a JSON array of events) into the store.
pub fn import_events(params: Params, file: &str) -> Result<()> {
    let content =
        std::fs::read_to_string(file).with_context(|| format!("Cannot read events from {file}"))?;
    let incoming: Vec<CalendarEvent> =
        serde_json::from_str(&content).with_context(|| format!("Malformed events in {file}"))?;
    let received = incoming.len();
    let added = EventStore::new(&params.events).import(incoming, Utc::now().date_naive())?;
    println!("Imported {added} of {received} event(s)");
    Ok(())
}
