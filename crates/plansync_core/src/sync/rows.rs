//! Record <-> remote row mapping.
//!
//! # Invariants
//! - A row is the record's own serde form plus `user_id`; decoding drops
//!   `user_id` and ignores unknown columns.
//! - Equal records always encode to equal rows.

use crate::model::habit::{Habit, HabitLog};
use crate::model::item::Item;
use crate::model::journal::{ChatMessage, Goal, LifeAreaScore, Reflection};
use crate::model::snapshot::{Profile, Settings, Snapshot};
use crate::sync::remote::{RemoteRow, RemoteTable};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const USER_ID_COLUMN: &str = "user_id";

/// Snapshot record that maps 1:1 onto a remote row.
pub trait SyncRecord: Serialize + DeserializeOwned + PartialEq {
    const TABLE: RemoteTable;

    fn record_id(&self) -> String;
}

macro_rules! sync_record {
    ($record:ty, $table:expr) => {
        impl SyncRecord for $record {
            const TABLE: RemoteTable = $table;

            fn record_id(&self) -> String {
                self.id.to_string()
            }
        }
    };
}

sync_record!(Item, RemoteTable::Items);
sync_record!(Habit, RemoteTable::Habits);
sync_record!(HabitLog, RemoteTable::HabitLogs);
sync_record!(Goal, RemoteTable::Goals);
sync_record!(Reflection, RemoteTable::Reflections);
sync_record!(LifeAreaScore, RemoteTable::LifeAreaScores);
sync_record!(ChatMessage, RemoteTable::Messages);

/// Profile and settings flattened into one row keyed by account id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRow {
    pub id: String,
    #[serde(flatten)]
    pub profile: Profile,
    #[serde(flatten)]
    pub settings: Settings,
}

impl ProfileRow {
    pub fn from_snapshot(snapshot: &Snapshot, account_id: &str) -> Self {
        Self {
            id: account_id.to_string(),
            profile: snapshot.profile.clone(),
            settings: snapshot.settings.clone(),
        }
    }
}

impl SyncRecord for ProfileRow {
    const TABLE: RemoteTable = RemoteTable::Profiles;

    fn record_id(&self) -> String {
        self.id.clone()
    }
}

/// Encodes `record` as a row owned by `account_id`.
pub fn to_row<T: Serialize>(record: &T, account_id: &str) -> serde_json::Result<RemoteRow> {
    match serde_json::to_value(record)? {
        Value::Object(mut row) => {
            row.insert(
                USER_ID_COLUMN.to_string(),
                Value::String(account_id.to_string()),
            );
            Ok(row)
        }
        other => Err(serde::ser::Error::custom(format!(
            "record did not serialize to an object: {other}"
        ))),
    }
}

/// Decodes a row back into its record.
pub fn from_row<T: DeserializeOwned>(row: &RemoteRow) -> serde_json::Result<T> {
    let mut fields = row.clone();
    fields.remove(USER_ID_COLUMN);
    serde_json::from_value(Value::Object(fields))
}
