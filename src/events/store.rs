use chrono::NaiveDate;
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::device::StoreError;
use crate::events::event::{CalendarEvent, EventTime, START_KEY};

/// The flat event list shared with the calendar sync job.
///
/// Scans run in stored order. A meeting id that recurs across days resolves
/// to its first stored occurrence.
#[derive(Debug, Clone)]
pub struct EventStore {
    path: PathBuf,
}

impl EventStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads all events. A missing or corrupt file yields an empty list.
    pub fn load(&self) -> Vec<CalendarEvent> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                debug!("Cannot read events from {:?}: {}", self.path, e);
                return Vec::new();
            }
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!("Events file {:?} is malformed ({}), ignoring it", self.path, e);
            Vec::new()
        })
    }

    /// Replaces the stored list. Readers see either the old or the new file.
    pub fn save(&self, events: &[CalendarEvent]) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(events)
            .map_err(|e| StoreError::Serialize(self.path.clone(), e))?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, content).map_err(|e| StoreError::Io(tmp.clone(), e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| StoreError::Io(self.path.clone(), e))
    }

    /// Flags the first event carrying `meeting_id` as joined. Returns whether
    /// one matched; an unknown meeting is not an error.
    pub fn mark_joined(&self, meeting_id: &str) -> Result<bool, StoreError> {
        let mut events = self.load();
        let Some(event) = events
            .iter_mut()
            .find(|e| e.meeting_id() == Some(meeting_id))
        else {
            info!("No stored event for meeting {}", meeting_id);
            return Ok(false);
        };
        event.mark_joined();
        info!("Event {:?} marked as joined", event.id());
        self.save(&events)?;
        Ok(true)
    }

    /// Drops everything that does not start on `today`.
    pub fn purge_stale(&self, today: NaiveDate) -> Result<usize, StoreError> {
        let events = self.load();
        let before = events.len();
        let kept = retain_today(events, today);
        let removed = before - kept.len();
        if removed > 0 {
            self.save(&kept)?;
        }
        Ok(removed)
    }

    /// Folds a fresh calendar download into the store: drops stale events,
    /// then appends incoming ones with unseen ids. Returns how many were
    /// added. Existing records, `joined` included, are never replaced.
    pub fn import(
        &self,
        incoming: Vec<CalendarEvent>,
        today: NaiveDate,
    ) -> Result<usize, StoreError> {
        let current = retain_today(self.load(), today);
        let before = current.len();
        let merged = merge(current, incoming);
        let added = merged.len() - before;
        self.save(&merged)?;
        info!("Imported {} new event(s) into {:?}", added, self.path);
        Ok(added)
    }
}

/// Keeps events starting on `today` and events with no start at all.
/// Events whose start cannot be read are dropped.
pub fn retain_today(events: Vec<CalendarEvent>, today: NaiveDate) -> Vec<CalendarEvent> {
    events
        .into_iter()
        .filter(|event| match event.fields().get(START_KEY) {
            None | Some(Value::Null) => true,
            Some(value) => match EventTime::from_value(value) {
                Ok(start) if start.is_set() => start.day() == Some(today),
                Ok(_) => true,
                Err(_) => false,
            },
        })
        .collect()
}

/// Appends incoming events whose id is not already stored. Incoming events
/// without an id are skipped.
pub fn merge(mut existing: Vec<CalendarEvent>, incoming: Vec<CalendarEvent>) -> Vec<CalendarEvent> {
    let mut ids: HashSet<String> = existing
        .iter()
        .filter_map(|e| e.id().map(str::to_string))
        .collect();
    for event in incoming {
        let fresh = match event.id() {
            Some(id) => ids.insert(id.to_string()),
            None => false,
        };
        if fresh {
            existing.push(event);
        }
    }
    existing
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use tempfile::TempDir;

    fn event(id: &str, day: u32, hour: u32) -> CalendarEvent {
        let start = Utc.with_ymd_and_hms(2026, 10, day, hour, 0, 0).unwrap();
        CalendarEvent::new(id, start, start + chrono::Duration::minutes(30))
    }

    fn store_with(events: &[CalendarEvent]) -> (TempDir, EventStore) {
        let dir = TempDir::new().unwrap();
        let store = EventStore::new(dir.path().join("events.json"));
        store.save(events).unwrap();
        (dir, store)
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let store = EventStore::new(dir.path().join("events.json"));
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_load_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("events.json");
        std::fs::write(&path, "[{\"id\": ").unwrap();
        assert!(EventStore::new(path).load().is_empty());
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("events.json");
        std::fs::write(
            &path,
            r#"[{"id":"e1","summary":"Review","start":{"dateTime":"2026-10-18T10:00:00Z"},"end":{"dateTime":"2026-10-18T10:30:00Z"},"conferenceData":{"conferenceId":"m1"},"joined":false,"attendees":[{"email":"a@example.com"}]}]"#,
        )
        .unwrap();
        let store = EventStore::new(&path);

        let loaded = store.load();
        store.save(&loaded).unwrap();

        assert_eq!(store.load(), loaded);
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw[0]["attendees"][0]["email"], "a@example.com");
        assert!(!dir.path().join("events.json.tmp").exists());
    }

    #[test]
    fn test_mark_joined_is_idempotent() {
        let (_dir, store) = store_with(&[
            event("e1", 18, 10).with_meeting_id("m1"),
            event("e2", 18, 11).with_meeting_id("m2"),
        ]);

        assert!(store.mark_joined("m1").unwrap());
        assert!(store.mark_joined("m1").unwrap());

        let joined: Vec<_> = store.load().into_iter().filter(|e| e.is_joined()).collect();
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].id(), Some("e1"));
    }

    #[test]
    fn test_mark_joined_unknown_meeting() {
        let (_dir, store) = store_with(&[event("e1", 18, 10).with_meeting_id("m1")]);

        assert!(!store.mark_joined("zoom-42").unwrap());
        assert!(!store.mark_joined("zoom-42").unwrap());
        assert!(store.load().iter().all(|e| !e.is_joined()));
    }

    #[test]
    fn test_mark_joined_first_occurrence_wins() {
        let (_dir, store) = store_with(&[
            event("monday", 12, 9).with_meeting_id("weekly"),
            event("today", 18, 9).with_meeting_id("weekly"),
        ]);

        assert!(store.mark_joined("weekly").unwrap());

        let events = store.load();
        assert!(events[0].is_joined());
        assert!(!events[1].is_joined());
    }

    #[test]
    fn test_retain_today() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let mut no_start = event("floating", 18, 9);
        no_start.fields_mut().remove(START_KEY);
        let mut null_start = event("tbd", 18, 9);
        null_start.fields_mut().insert(START_KEY.to_string(), Value::Null);
        let mut all_day = event("holiday", 18, 0);
        all_day
            .fields_mut()
            .insert(START_KEY.to_string(), json!({"date": "2026-10-18"}));
        let mut broken = event("broken", 18, 9);
        broken
            .fields_mut()
            .insert(START_KEY.to_string(), json!({"dateTime": "not a date"}));
        let mut garbage = event("garbage", 18, 9);
        garbage
            .fields_mut()
            .insert(START_KEY.to_string(), json!("yesterday"));

        let kept = retain_today(
            vec![
                event("old", 17, 9),
                event("now", 18, 9),
                no_start,
                null_start,
                all_day,
                broken,
                garbage,
            ],
            today,
        );

        let ids: Vec<_> = kept.iter().map(|e| e.id().unwrap()).collect();
        assert_eq!(ids, vec!["now", "floating", "tbd", "holiday"]);
    }

    #[test]
    fn test_purge_stale_rewrites_file() {
        let (_dir, store) = store_with(&[event("old", 17, 9), event("now", 18, 9)]);

        let removed = store
            .purge_stale(NaiveDate::from_ymd_opt(2026, 10, 18).unwrap())
            .unwrap();

        assert_eq!(removed, 1);
        assert_eq!(store.load().len(), 1);
    }

    #[test]
    fn test_merge_skips_known_ids() {
        let mut joined = event("e1", 18, 9);
        joined.mark_joined();
        let mut anonymous = event("x", 18, 11);
        anonymous.fields_mut().remove("id");
        let merged = merge(
            vec![joined],
            vec![event("e1", 18, 9), event("e2", 18, 10), anonymous],
        );

        assert_eq!(merged.len(), 2);
        assert!(merged[0].is_joined());
        assert_eq!(merged[1].id(), Some("e2"));
    }

    #[test]
    fn test_save_keeps_sparse_records_intact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("events.json");
        let original = r#"[{"summary":"no id","start":null,"end":{"dateTime":"2026-10-18T10:30:00Z"}}]"#;
        std::fs::write(&path, original).unwrap();
        let store = EventStore::new(&path);

        store.save(&store.load()).unwrap();

        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw, serde_json::from_str::<Value>(original).unwrap());
    }

    #[test]
    fn test_import_purges_then_merges() {
        let mut joined = event("e1", 18, 9).with_meeting_id("m1");
        joined.mark_joined();
        let (_dir, store) = store_with(&[event("old", 17, 9), joined]);

        let added = store
            .import(
                vec![event("e1", 18, 9), event("e2", 18, 10)],
                NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
            )
            .unwrap();

        assert_eq!(added, 1);
        let events = store.load();
        let ids: Vec<_> = events.iter().map(|e| e.id().unwrap()).collect();
        assert_eq!(ids, vec!["e1", "e2"]);
        assert!(events[0].is_joined());
    }
}
