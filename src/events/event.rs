use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

pub const ID_KEY: &str = "id";
pub const START_KEY: &str = "start";
pub const END_KEY: &str = "end";
pub const JOINED_KEY: &str = "joined";

/// Start or end of a calendar event. Timed events carry `dateTime`,
/// all-day events only `date`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl EventTime {
    /// Reads a `start`/`end` object. Anything that is not one yields an error.
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        EventTime::deserialize(value)
    }

    /// The instant of a timed event; `None` for all-day or malformed values.
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        self.date_time.as_deref().and_then(parse_instant)
    }

    /// Calendar day (UTC) of this time, from `date` or `dateTime`.
    pub fn day(&self) -> Option<NaiveDate> {
        if let Some(date) = self.date.as_deref() {
            return NaiveDate::parse_from_str(date, "%Y-%m-%d").ok();
        }
        self.instant().map(|i| i.date_naive())
    }

    pub fn is_set(&self) -> bool {
        self.date_time.is_some() || self.date.is_some()
    }
}

/// A calendar event exactly as the sync job stored it.
///
/// The record is kept as its JSON object. Only `joined` is ever written by
/// this crate, so saving a loaded list reproduces every other key untouched,
/// including absent ids and explicit nulls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalendarEvent {
    fields: Map<String, Value>,
}

impl CalendarEvent {
    pub fn new(id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        let mut fields = Map::new();
        fields.insert(ID_KEY.to_string(), json!(id));
        fields.insert(START_KEY.to_string(), json!({ "dateTime": start.to_rfc3339() }));
        fields.insert(END_KEY.to_string(), json!({ "dateTime": end.to_rfc3339() }));
        CalendarEvent { fields }
    }

    pub fn with_meeting_id(mut self, meeting_id: &str) -> Self {
        self.fields.insert(
            "conferenceData".to_string(),
            json!({ "conferenceId": meeting_id }),
        );
        self
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.fields
    }

    pub fn id(&self) -> Option<&str> {
        self.fields.get(ID_KEY).and_then(Value::as_str)
    }

    pub fn summary(&self) -> Option<&str> {
        self.fields.get("summary").and_then(Value::as_str)
    }

    pub fn meeting_id(&self) -> Option<&str> {
        self.fields
            .get("conferenceData")
            .and_then(|c| c.get("conferenceId"))
            .and_then(Value::as_str)
    }

    pub fn is_joined(&self) -> bool {
        self.fields
            .get(JOINED_KEY)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn mark_joined(&mut self) {
        self.fields.insert(JOINED_KEY.to_string(), Value::Bool(true));
    }

    /// The `start` object, when present and readable.
    pub fn start(&self) -> Option<EventTime> {
        self.time(START_KEY)
    }

    pub fn end(&self) -> Option<EventTime> {
        self.time(END_KEY)
    }

    pub fn start_instant(&self) -> Option<DateTime<Utc>> {
        self.start().as_ref().and_then(EventTime::instant)
    }

    pub fn end_instant(&self) -> Option<DateTime<Utc>> {
        self.end().as_ref().and_then(EventTime::instant)
    }

    fn time(&self, key: &str) -> Option<EventTime> {
        self.fields
            .get(key)
            .and_then(|v| EventTime::from_value(v).ok())
    }
}

/// Parses an RFC 3339 timestamp. Values without an offset are taken as UTC.
pub fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}
