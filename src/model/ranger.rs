//! Ranger: one treasure-hunt participant.

use crate::config::{ColumnDefault, ColumnKind, EntityDef, FieldDef};
use crate::error::AppError;
use crate::service::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

pub const RANGER_PATH: &str = "ranger";
pub const ID: &str = "ranger_id";
pub const COMPLETE: &str = "complete";

/// Progress through the hunt, stored in `complete`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i16)]
pub enum Completion {
    NotYet = 0,
    JustCompleted = 1,
    /// Completed and claimed one of the first-come prizes.
    ClaimedFirst = 2,
}

impl Completion {
    pub const fn code(self) -> i16 {
        self as i16
    }
}

pub fn definition() -> EntityDef {
    let flag = |name: &str| FieldDef::new(name, ColumnKind::SmallInt).default(ColumnDefault::Literal("0".into()));
    EntityDef::new("ranger", RANGER_PATH, ID, "create_time")
        .updated("update_time")
        .field(
            FieldDef::new(ID, ColumnKind::text(36))
                .read_only()
                .default(ColumnDefault::Uuid)
                .alias("id"),
        )
        .field(FieldDef::new("nickname", ColumnKind::text(30)).unique())
        .field(FieldDef::new("ph_number", ColumnKind::text(20)).unique().alias("phone"))
        .field(flag("treasure1"))
        .field(flag("treasure2"))
        .field(flag("treasure3"))
        .field(flag(COMPLETE))
        .field(FieldDef::new("address", ColumnKind::Text { max_length: None }).nullable())
        .field(
            FieldDef::new("create_time", ColumnKind::Timestamp)
                .read_only()
                .default(ColumnDefault::Now),
        )
        .field(
            FieldDef::new("update_time", ColumnKind::Timestamp)
                .read_only()
                .default(ColumnDefault::Now),
        )
}

/// Public read shape of a ranger.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Ranger {
    pub ranger_id: String,
    pub nickname: String,
    pub ph_number: String,
    pub treasure1: i16,
    pub treasure2: i16,
    pub treasure3: i16,
    pub complete: i16,
    pub address: Option<String>,
    pub create_time: DateTime<Utc>,
    pub update_time: DateTime<Utc>,
}

impl Ranger {
    pub fn from_record(record: Record) -> Result<Self, AppError> {
        Ok(serde_json::from_value(Value::Object(record))?)
    }

    pub fn status(&self) -> RangerStatus {
        RangerStatus {
            treasure1: self.treasure1,
            treasure2: self.treasure2,
            treasure3: self.treasure3,
            complete: self.complete,
        }
    }

    /// The follow-up patch that marks a ranger complete: all three treasures found and
    /// `complete` still unset. None once the ranger is complete (the flag never goes back).
    pub fn completion_patch(&self) -> Option<Record> {
        let found_all = self.treasure1 != 0 && self.treasure2 != 0 && self.treasure3 != 0;
        if found_all && self.complete == Completion::NotYet.code() {
            let mut patch = Map::new();
            patch.insert(COMPLETE.into(), Value::from(Completion::JustCompleted.code()));
            Some(patch)
        } else {
            None
        }
    }
}

/// Narrow projection returned by get-by-id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RangerStatus {
    pub treasure1: i16,
    pub treasure2: i16,
    pub treasure3: i16,
    pub complete: i16,
}

/// Create request.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateRanger {
    #[schema(example = "이재선")]
    pub nickname: String,
    #[serde(alias = "phone")]
    #[schema(example = "010-8XX8-2XX0")]
    pub ph_number: String,
}

impl CreateRanger {
    pub fn into_record(self) -> Record {
        let mut m = Map::new();
        m.insert("nickname".into(), Value::String(self.nickname));
        m.insert("ph_number".into(), Value::String(self.ph_number));
        m
    }
}
