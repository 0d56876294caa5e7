//! Member activity documents.
//!
//! Every member of a server owns exactly one document. The document is
//! stored as JSON and only ever grows: history arrays are appended to, never
//! rewritten.

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::stats::{self, CalendarSpan};

/// Shown when the voice history holds no complete connect/disconnect pair.
pub const CONNECTION_TIME_UNKNOWN: &str = "Unable to calculate Member's connection time. \
    But, I can say that they've probably spent way too much time playing games with their friends";

mod day_format {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%d/%m/%Y";

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&date.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDate::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}

mod clock_format {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M:%S";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}

/// A local wall-clock moment with one second resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp {
    #[serde(with = "day_format")]
    pub date: NaiveDate,
    #[serde(with = "clock_format")]
    pub time: NaiveTime,
}

impl Timestamp {
    pub fn now() -> Self {
        Self::from(Local::now().naive_local())
    }

    pub fn at(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }
}

impl From<NaiveDateTime> for Timestamp {
    fn from(at: NaiveDateTime) -> Self {
        let time = at.time();
        Self {
            date: at.date(),
            time: time.with_nanosecond(0).unwrap_or(time),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEntry {
    #[serde(flatten)]
    pub sent: Timestamp,
    pub text: String,
}

/// Activity document of one member on one server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRecord {
    /// Server whose collection holds this document. Not part of the document.
    #[serde(skip)]
    pub server_id: String,
    pub id: String,
    /// Name at the time the document was created
    pub username: String,
    #[serde(with = "day_format")]
    pub join_date: NaiveDate,
    #[serde(with = "clock_format")]
    pub join_time: NaiveTime,
    #[serde(default)]
    pub connections: Vec<Timestamp>,
    #[serde(default)]
    pub disconnections: Vec<Timestamp>,
    #[serde(default)]
    pub afk_entrances: Vec<Timestamp>,
    #[serde(default)]
    pub afk_exits: Vec<Timestamp>,
    #[serde(default)]
    pub messages: Vec<MessageEntry>,
}

impl MemberRecord {
    pub fn new(server_id: &str, id: &str, username: &str, joined: Timestamp) -> Self {
        Self {
            server_id: server_id.to_owned(),
            id: id.to_owned(),
            username: username.to_owned(),
            join_date: joined.date,
            join_time: joined.time,
            connections: Vec::new(),
            disconnections: Vec::new(),
            afk_entrances: Vec::new(),
            afk_exits: Vec::new(),
            messages: Vec::new(),
        }
    }

    /// Parses a stored document belonging to `server_id`'s collection.
    pub fn from_document(server_id: &str, document: &str) -> Result<Self, serde_json::Error> {
        let mut record: Self = serde_json::from_str(document)?;
        record.server_id = server_id.to_owned();
        Ok(record)
    }

    pub fn to_document(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn joined(&self) -> Timestamp {
        Timestamp { date: self.join_date, time: self.join_time }
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn disconnection_count(&self) -> usize {
        self.disconnections.len()
    }

    pub fn afk_entrance_count(&self) -> usize {
        self.afk_entrances.len()
    }

    pub fn afk_exit_count(&self) -> usize {
        self.afk_exits.len()
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn total_connected_time(&self) -> Option<CalendarSpan> {
        stats::total_span(&self.connections, &self.disconnections)
    }

    pub fn total_afk_time(&self) -> Option<CalendarSpan> {
        stats::total_span(&self.afk_entrances, &self.afk_exits)
    }

    /// Human readable total connected time, or a fixed note when the voice
    /// history can't be paired up.
    pub fn total_connected_duration(&self) -> String {
        match self.total_connected_time() {
            Some(span) => format!(
                "{} has been connected to the server for {}",
                self.username, span
            ),
            None => CONNECTION_TIME_UNKNOWN.to_string(),
        }
    }
}

/// A single append to one of a document's history arrays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberUpdate {
    Connection(Timestamp),
    Disconnection(Timestamp),
    AfkEntrance(Timestamp),
    AfkExit(Timestamp),
    Message(MessageEntry),
}

impl MemberUpdate {
    /// JSON path of the array end this update appends to.
    pub fn path(&self) -> &'static str {
        match self {
            MemberUpdate::Connection(_) => "$.connections[#]",
            MemberUpdate::Disconnection(_) => "$.disconnections[#]",
            MemberUpdate::AfkEntrance(_) => "$.afk_entrances[#]",
            MemberUpdate::AfkExit(_) => "$.afk_exits[#]",
            MemberUpdate::Message(_) => "$.messages[#]",
        }
    }

    /// The appended element, serialized.
    pub fn payload(&self) -> Result<String, serde_json::Error> {
        match self {
            MemberUpdate::Connection(at)
            | MemberUpdate::Disconnection(at)
            | MemberUpdate::AfkEntrance(at)
            | MemberUpdate::AfkExit(at) => serde_json::to_string(at),
            MemberUpdate::Message(entry) => serde_json::to_string(entry),
        }
    }

    /// Mirrors the append on an in-memory record.
    pub fn apply_to(self, record: &mut MemberRecord) {
        match self {
            MemberUpdate::Connection(at) => record.connections.push(at),
            MemberUpdate::Disconnection(at) => record.disconnections.push(at),
            MemberUpdate::AfkEntrance(at) => record.afk_entrances.push(at),
            MemberUpdate::AfkExit(at) => record.afk_exits.push(at),
            MemberUpdate::Message(entry) => record.messages.push(entry),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stamp(day: u32, hour: u32, minute: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(2024, 5, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .map(Timestamp::from)
            .unwrap()
    }

    fn record() -> MemberRecord {
        MemberRecord::new("1234", "100", "testmember", stamp(1, 8, 0))
    }

    #[test]
    fn test_timestamp_document_format() {
        let json = serde_json::to_string(&stamp(7, 9, 5)).unwrap();
        assert_eq!(json, r#"{"date":"07/05/2024","time":"09:05:00"}"#);

        let parsed: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, stamp(7, 9, 5));
    }

    #[test]
    fn test_timestamp_drops_subseconds() {
        let at = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_milli_opt(10, 0, 0, 750)
            .unwrap();
        assert_eq!(Timestamp::from(at).time, NaiveTime::from_hms_opt(10, 0, 0).unwrap());
    }

    #[test]
    fn test_new_record_is_empty() {
        let record = record();
        assert_eq!(record.connection_count(), 0);
        assert_eq!(record.disconnection_count(), 0);
        assert_eq!(record.afk_entrance_count(), 0);
        assert_eq!(record.afk_exit_count(), 0);
        assert_eq!(record.message_count(), 0);
        assert_eq!(record.joined(), stamp(1, 8, 0));
    }

    #[test]
    fn test_document_keeps_server_out() {
        let document = record().to_document().unwrap();
        assert!(!document.contains("server_id"));
        assert!(document.contains(r#""join_date":"01/05/2024""#));

        let parsed = MemberRecord::from_document("1234", &document).unwrap();
        assert_eq!(parsed, record());
    }

    #[test]
    fn test_message_payload_is_flat() {
        let update = MemberUpdate::Message(MessageEntry {
            sent: stamp(2, 12, 30),
            text: "Hello".to_string(),
        });
        assert_eq!(update.path(), "$.messages[#]");
        assert_eq!(
            update.payload().unwrap(),
            r#"{"date":"02/05/2024","time":"12:30:00","text":"Hello"}"#
        );
    }

    #[test]
    fn test_apply_to_appends_at_end() {
        let mut record = record();
        MemberUpdate::Connection(stamp(2, 10, 0)).apply_to(&mut record);
        MemberUpdate::Connection(stamp(3, 10, 0)).apply_to(&mut record);
        MemberUpdate::AfkExit(stamp(3, 11, 0)).apply_to(&mut record);

        assert_eq!(record.connections, vec![stamp(2, 10, 0), stamp(3, 10, 0)]);
        assert_eq!(record.afk_exit_count(), 1);
        assert_eq!(record.afk_entrance_count(), 0);
    }

    #[test]
    fn test_total_connected_duration() {
        let mut record = record();
        record.connections = vec![stamp(1, 10, 0), stamp(1, 11, 0)];
        record.disconnections = vec![stamp(1, 9, 30), stamp(1, 10, 30), stamp(1, 11, 30)];

        assert_eq!(
            record.total_connected_duration(),
            "testmember has been connected to the server for \
             0 years, 0 months, 0 days, 1 hours, 0 minutes, 0 seconds"
        );
    }

    #[test]
    fn test_connection_time_unknown_text() {
        assert_eq!(
            CONNECTION_TIME_UNKNOWN,
            "Unable to calculate Member's connection time. But, I can say that they've \
             probably spent way too much time playing games with their friends"
        );
    }

    #[test]
    fn test_total_connected_duration_without_pairs() {
        let mut record = record();
        assert_eq!(record.total_connected_duration(), CONNECTION_TIME_UNKNOWN);

        // disconnected before ever connecting, then connected without leaving
        record.disconnections.push(stamp(1, 8, 50));
        record.connections.push(stamp(1, 9, 0));
        record.connections.push(stamp(1, 9, 10));
        assert_eq!(record.total_connected_duration(), CONNECTION_TIME_UNKNOWN);
    }
}
