//! Typed records stored under the three keys of the key-value store.
//!
//! Reads never fail: a missing key, a store error, or a blob that does not
//! parse all come back as "no prior data" so the caller falls back to
//! defaults.

use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::warn;

use crate::session::SessionType;
use crate::settings::Settings;
use crate::store::KeyValueStore;

pub const SETTINGS_KEY: &str = "settings";
pub const SESSION_DATA_KEY: &str = "session_data";
pub const CURRENT_STATE_KEY: &str = "current_state";

/// Completed focus sessions for one calendar day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub count: u32,
}

/// Timer state captured when the app loses visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub running: bool,
    pub time_left_seconds: u32,
    pub session_type: SessionType,
    pub saved_at_epoch_ms: i64,
}

/// A write requested by the timer; the daily count is dated by the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Record {
    Settings(Settings),
    DailyCount(u32),
    Snapshot(Snapshot),
}

fn read_json<T: DeserializeOwned>(store: &impl KeyValueStore, key: &str) -> Option<T> {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            warn!(key, error = %e, "store read failed, using defaults");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, error = %e, "discarding malformed record");
            None
        }
    }
}

/// Persisted settings merged over defaults; invalid durations fall back to defaults.
pub fn load_settings(store: &impl KeyValueStore) -> Settings {
    let Some(settings) = read_json::<Settings>(store, SETTINGS_KEY) else {
        return Settings::default();
    };
    match settings.validate() {
        Ok(()) => settings,
        Err(e) => {
            warn!(error = %e, "ignoring persisted settings");
            Settings::default()
        }
    }
}

/// Today's completed focus count, or zero when the record is from another day.
pub fn load_daily_count(store: &impl KeyValueStore, today: NaiveDate) -> u32 {
    read_json::<DailyRecord>(store, SESSION_DATA_KEY)
        .filter(|record| record.date == today)
        .map(|record| record.count)
        .unwrap_or(0)
}

/// Reads the background snapshot and deletes it so it is consumed once.
pub fn take_snapshot(store: &mut impl KeyValueStore) -> Option<Snapshot> {
    let snapshot = read_json::<Snapshot>(store, CURRENT_STATE_KEY);
    if let Err(e) = store.remove(CURRENT_STATE_KEY) {
        warn!(error = %e, "failed to clear consumed snapshot");
    }
    snapshot
}

/// Best-effort write of `record`; failures are logged and dropped.
pub fn write_record(store: &mut impl KeyValueStore, record: &Record, today: NaiveDate) {
    let (key, encoded) = match record {
        Record::Settings(settings) => (SETTINGS_KEY, serde_json::to_string(settings)),
        Record::DailyCount(count) => (
            SESSION_DATA_KEY,
            serde_json::to_string(&DailyRecord {
                date: today,
                count: *count,
            }),
        ),
        Record::Snapshot(snapshot) => (CURRENT_STATE_KEY, serde_json::to_string(snapshot)),
    };
    let encoded = match encoded {
        Ok(encoded) => encoded,
        Err(e) => {
            warn!(key, error = %e, "failed to encode record");
            return;
        }
    };
    if let Err(e) = store.set(key, &encoded) {
        warn!(key, error = %e, "failed to persist record");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    #[test]
    fn daily_count_only_restored_for_today() {
        let mut store = MemoryStore::new();
        write_record(&mut store, &Record::DailyCount(7), day(17));

        assert_eq!(load_daily_count(&store, day(17)), 7);
        assert_eq!(load_daily_count(&store, day(18)), 0);
    }

    #[test]
    fn daily_record_wire_format() {
        let mut store = MemoryStore::new();
        write_record(&mut store, &Record::DailyCount(2), day(18));
        let raw = store.get(SESSION_DATA_KEY).unwrap().unwrap();
        assert_eq!(raw, r#"{"date":"2026-10-18","count":2}"#);
    }

    #[test]
    fn malformed_blobs_read_as_absent() {
        let mut store = MemoryStore::new();
        store.set(SETTINGS_KEY, "{not json").unwrap();
        store.set(SESSION_DATA_KEY, "[]").unwrap();
        store.set(CURRENT_STATE_KEY, "null").unwrap();

        assert_eq!(load_settings(&store), Settings::default());
        assert_eq!(load_daily_count(&store, day(18)), 0);
        assert_eq!(take_snapshot(&mut store), None);
    }

    #[test]
    fn zero_duration_settings_fall_back_to_defaults() {
        let mut store = MemoryStore::new();
        store
            .set(SETTINGS_KEY, r#"{"focusMinutes":0,"soundEnabled":false}"#)
            .unwrap();
        assert_eq!(load_settings(&store), Settings::default());
    }

    #[test]
    fn snapshot_is_consumed_once() {
        let mut store = MemoryStore::new();
        let snapshot = Snapshot {
            running: true,
            time_left_seconds: 42,
            session_type: SessionType::ShortBreak,
            saved_at_epoch_ms: 1_000,
        };
        write_record(&mut store, &Record::Snapshot(snapshot), day(18));

        let raw = store.get(CURRENT_STATE_KEY).unwrap().unwrap();
        assert!(raw.contains(r#""timeLeftSeconds":42"#));
        assert!(raw.contains(r#""sessionType":"shortBreak""#));
        assert!(raw.contains(r#""savedAtEpochMs":1000"#));

        assert_eq!(take_snapshot(&mut store), Some(snapshot));
        assert_eq!(take_snapshot(&mut store), None);
    }
}
