//! Convert serde_json::Value to typed values that sqlx can bind, per column kind.

use crate::config::{ColumnInfo, ColumnKind};
use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::{Database, Type};

/// A value bound to a PostgreSQL query. Each variant announces its own type to the server.
#[derive(Clone, Debug, PartialEq)]
pub enum BindValue {
    Null(ColumnKind),
    SmallInt(i16),
    Text(String),
    Timestamp(DateTime<Utc>),
    Json(Value),
}

impl BindValue {
    /// Coerce a request value into the column's type. This is the typed setter for a field.
    pub fn for_column(col: &ColumnInfo, v: &Value) -> Result<Self, AppError> {
        if v.is_null() {
            if !col.nullable {
                return Err(AppError::Validation(format!("{} cannot be null", col.name)));
            }
            return Ok(BindValue::Null(col.kind));
        }
        let mismatch = |expected: &str| AppError::Validation(format!("{} must be {}", col.name, expected));
        Ok(match col.kind {
            ColumnKind::SmallInt => match v {
                Value::Bool(b) => BindValue::SmallInt(i16::from(*b)),
                Value::Number(n) => {
                    let i = n
                        .as_i64()
                        .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                        .ok_or_else(|| mismatch("an integer"))?;
                    BindValue::SmallInt(i16::try_from(i).map_err(|_| mismatch("a small integer"))?)
                }
                _ => return Err(mismatch("an integer")),
            },
            ColumnKind::Text { max_length } => {
                let s = match v {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    _ => return Err(mismatch("a string")),
                };
                if let Some(max) = max_length {
                    if s.chars().count() > max {
                        return Err(AppError::Validation(format!(
                            "{} must be at most {} characters",
                            col.name, max
                        )));
                    }
                }
                BindValue::Text(s)
            }
            ColumnKind::Timestamp => match v {
                Value::String(s) => {
                    let t = DateTime::parse_from_rfc3339(s).map_err(|_| mismatch("an RFC 3339 timestamp"))?;
                    BindValue::Timestamp(t.with_timezone(&Utc))
                }
                _ => return Err(mismatch("an RFC 3339 timestamp")),
            },
            ColumnKind::Json => BindValue::Json(v.clone()),
        })
    }
}

impl<'q> Encode<'q, Postgres> for BindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        match self {
            BindValue::Null(_) => Ok(IsNull::Yes),
            BindValue::SmallInt(n) => <i16 as Encode<Postgres>>::encode_by_ref(n, buf),
            BindValue::Text(s) => <String as Encode<Postgres>>::encode_by_ref(s, buf),
            BindValue::Timestamp(t) => <DateTime<Utc> as Encode<Postgres>>::encode_by_ref(t, buf),
            BindValue::Json(v) => <Value as Encode<Postgres>>::encode_by_ref(v, buf),
        }
    }

    fn produces(&self) -> Option<PgTypeInfo> {
        Some(match self {
            BindValue::Null(kind) => kind.type_info(),
            BindValue::SmallInt(_) => <i16 as Type<Postgres>>::type_info(),
            BindValue::Text(_) => <String as Type<Postgres>>::type_info(),
            BindValue::Timestamp(_) => <DateTime<Utc> as Type<Postgres>>::type_info(),
            BindValue::Json(_) => <Value as Type<Postgres>>::type_info(),
        })
    }
}

impl Type<Postgres> for BindValue {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("TEXT")
    }
}
