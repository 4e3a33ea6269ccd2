//! Generic CRUD execution against PostgreSQL.
//!
//! Every operation takes the request's connection and a resolved entity, so the same code
//! serves any record type. Records travel as JSON objects keyed by column name; values are
//! coerced to the column's type before they reach SQL.

use crate::config::{ColumnDefault, ColumnInfo, ColumnKind, ResolvedEntity};
use crate::error::{AppError, ConfigError};
use crate::response::{total_pages, Page};
use crate::sql::{count_where, delete, insert, select_where, update, BindValue, Condition, Order, QueryBuf};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use serde_json::{Map, Value};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{PgConnection, Postgres, Row};
use utoipa::ToSchema;

/// A row as a JSON object keyed by column name.
pub type Record = Map<String, Value>;

/// Calendar used for "today" windows.
pub const SERVICE_TIMEZONE: Tz = chrono_tz::Asia::Seoul;

/// 1-based page request.
#[derive(Clone, Copy, Debug, Deserialize, ToSchema)]
pub struct PageRequest {
    pub page: i64,
    pub size: i64,
}

pub struct CrudService;

impl CrudService {
    /// All rows, ordered by primary key.
    pub async fn list_all(conn: &mut PgConnection, entity: &ResolvedEntity) -> Result<Vec<Record>, AppError> {
        let q = select_where(entity, &[], Order::PrimaryKey, None, None);
        Self::fetch_all(conn, entity, &q).await
    }

    /// First row matching every equality filter, or None.
    pub async fn get_one(
        conn: &mut PgConnection,
        entity: &ResolvedEntity,
        filter: &Record,
    ) -> Result<Option<Record>, AppError> {
        let conds = equality_conditions(entity, filter)?;
        let q = select_where(entity, &conds, Order::PrimaryKey, Some(1), None);
        Self::fetch_optional(conn, entity, &q).await
    }

    /// Insert one row and return it with generated fields. A UUID primary key is generated
    /// when the body omits it; timestamps come from column defaults.
    pub async fn create(conn: &mut PgConnection, entity: &ResolvedEntity, body: &Record) -> Result<Record, AppError> {
        let mut values = write_values(entity, body.iter(), true)?;
        for col in &entity.columns {
            if col.default == Some(ColumnDefault::Uuid) && !values.iter().any(|(n, _)| *n == col.name) {
                values.push((col.name.clone(), BindValue::Text(uuid::Uuid::new_v4().to_string())));
            }
        }
        let q = insert(entity, &values);
        let row = Self::fetch_optional(conn, entity, &q)
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))?;
        tracing::debug!(table = %entity.table_name, "record created");
        Ok(row)
    }

    /// Overwrite every given field, nulls included.
    pub async fn update(
        conn: &mut PgConnection,
        entity: &ResolvedEntity,
        existing: &Record,
        body: &Record,
    ) -> Result<Record, AppError> {
        let sets = write_values(entity, body.iter(), false)?;
        Self::apply(conn, entity, existing, &sets).await
    }

    /// Overwrite only fields whose new value is truthy or numeric zero; see [`is_truthy_or_zero`].
    pub async fn patch(
        conn: &mut PgConnection,
        entity: &ResolvedEntity,
        existing: &Record,
        body: &Record,
    ) -> Result<Record, AppError> {
        let sets = patch_values(entity, body)?;
        Self::apply(conn, entity, existing, &sets).await
    }

    /// Delete the first row matching the filter. Ok(false) when nothing matched.
    pub async fn delete(conn: &mut PgConnection, entity: &ResolvedEntity, filter: &Record) -> Result<bool, AppError> {
        let Some(row) = Self::get_one(&mut *conn, entity, filter).await? else {
            return Ok(false);
        };
        let id = primary_key_of(entity, &row)?;
        let q = delete(entity, &id);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let affected = bind_all(sqlx::query(&q.sql), &q.params)
            .execute(&mut *conn)
            .await?
            .rows_affected();
        Ok(affected > 0)
    }

    /// One page of rows, newest first.
    pub async fn paginate(
        conn: &mut PgConnection,
        entity: &ResolvedEntity,
        req: PageRequest,
    ) -> Result<Page<Record>, AppError> {
        if req.page < 1 {
            return Err(AppError::Validation("Page number should be positive".into()));
        }
        if req.size < 1 {
            return Err(AppError::Validation("Size should be positive".into()));
        }
        let offset = (req.page - 1)
            .checked_mul(req.size)
            .ok_or_else(|| AppError::Validation("page is out of range".into()))?;
        let total_row = Self::count(&mut *conn, entity, &[]).await?;
        let q = select_where(entity, &[], Order::NewestFirst, Some(req.size), Some(offset));
        let items = Self::fetch_all(conn, entity, &q).await?;
        Ok(Page {
            items,
            total_pages: total_pages(total_row, req.size),
            page: req.page,
            size: req.size,
            total_row,
        })
    }

    /// Rows matching every filter: numbers by equality, strings by substring, lists by JSON containment.
    pub async fn search(
        conn: &mut PgConnection,
        entity: &ResolvedEntity,
        filters: &Record,
    ) -> Result<Vec<Record>, AppError> {
        let conds = search_conditions(entity, filters)?;
        let q = select_where(entity, &conds, Order::PrimaryKey, None, None);
        Self::fetch_all(conn, entity, &q).await
    }

    /// Count rows updated during `now`'s calendar day in [`SERVICE_TIMEZONE`] whose
    /// `status_column` equals `status`.
    pub async fn count_updated_today(
        conn: &mut PgConnection,
        entity: &ResolvedEntity,
        status_column: &str,
        status: i16,
        now: DateTime<Utc>,
    ) -> Result<i64, AppError> {
        let updated = entity.updated_column.as_deref().ok_or_else(|| ConfigError::MissingReference {
            kind: "updated column",
            id: entity.table_name.clone(),
        })?;
        let status_col = known_column(entity, status_column)?;
        let (from, until) = day_window(now, SERVICE_TIMEZONE)?;
        let conds = [
            Condition::Within {
                column: updated.to_string(),
                from,
                until,
            },
            Condition::Eq {
                column: status_col.name.clone(),
                value: BindValue::for_column(status_col, &Value::from(status))?,
            },
        ];
        Self::count(conn, entity, &conds).await
    }

    async fn apply(
        conn: &mut PgConnection,
        entity: &ResolvedEntity,
        existing: &Record,
        sets: &[(String, BindValue)],
    ) -> Result<Record, AppError> {
        let id = primary_key_of(entity, existing)?;
        let q = update(entity, &id, sets);
        Self::fetch_optional(conn, entity, &q)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} {:?}", entity.table_name, id)))
    }

    async fn count(conn: &mut PgConnection, entity: &ResolvedEntity, conds: &[Condition]) -> Result<i64, AppError> {
        let q = count_where(entity, conds);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query_scalar::<_, i64>(&q.sql);
        for p in &q.params {
            query = query.bind(p.clone());
        }
        Ok(query.fetch_one(&mut *conn).await?)
    }

    async fn fetch_all(
        conn: &mut PgConnection,
        entity: &ResolvedEntity,
        q: &QueryBuf,
    ) -> Result<Vec<Record>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let rows = bind_all(sqlx::query(&q.sql), &q.params).fetch_all(&mut *conn).await?;
        rows.iter().map(|r| row_to_record(entity, r)).collect()
    }

    async fn fetch_optional(
        conn: &mut PgConnection,
        entity: &ResolvedEntity,
        q: &QueryBuf,
    ) -> Result<Option<Record>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_optional(&mut *conn)
            .await?;
        row.map(|r| row_to_record(entity, &r)).transpose()
    }
}

fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &[BindValue],
) -> Query<'q, Postgres, PgArguments> {
    for p in params {
        query = query.bind(p.clone());
    }
    query
}

/// The patch rule: a value is applied when it is truthy or exactly a number.
/// `null`, `false`, `""`, `[]` and `{}` are skipped; `0` and `0.0` are applied.
pub fn is_truthy_or_zero(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(_) => true,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Start and end (exclusive) of `now`'s calendar day in `tz`, as UTC instants.
pub fn day_window(now: DateTime<Utc>, tz: Tz) -> Result<(DateTime<Utc>, DateTime<Utc>), AppError> {
    let today = now.with_timezone(&tz).date_naive();
    let tomorrow = today
        .succ_opt()
        .ok_or_else(|| AppError::Validation("date out of range".into()))?;
    Ok((local_midnight(tz, today)?, local_midnight(tz, tomorrow)?))
}

fn local_midnight(tz: Tz, date: NaiveDate) -> Result<DateTime<Utc>, AppError> {
    tz.from_local_datetime(&date.and_time(NaiveTime::MIN))
        .earliest()
        .map(|t| t.with_timezone(&Utc))
        .ok_or_else(|| AppError::Validation(format!("no local midnight on {}", date)))
}

fn known_column<'e>(entity: &'e ResolvedEntity, key: &str) -> Result<&'e ColumnInfo, AppError> {
    entity
        .column(key)
        .ok_or_else(|| AppError::BadRequest(format!("unknown field '{}' for {}", key, entity.table_name)))
}

fn primary_key_of(entity: &ResolvedEntity, row: &Record) -> Result<BindValue, AppError> {
    let pk = known_column(entity, &entity.pk_column)?;
    let v = row
        .get(&pk.name)
        .ok_or_else(|| AppError::Validation(format!("record has no {}", pk.name)))?;
    BindValue::for_column(pk, v)
}

/// Typed assignments for the given fields. Read-only fields are refused, except the
/// primary key when `allow_pk` is set (inserts may choose their own id).
fn write_values<'a, I>(entity: &ResolvedEntity, fields: I, allow_pk: bool) -> Result<Vec<(String, BindValue)>, AppError>
where
    I: Iterator<Item = (&'a String, &'a Value)>,
{
    let mut out: Vec<(String, BindValue)> = Vec::new();
    for (key, v) in fields {
        let col = known_column(entity, key)?;
        let is_pk = col.name == entity.pk_column;
        if !col.writable && !(allow_pk && is_pk) {
            return Err(AppError::BadRequest(format!("{} is read-only", col.name)));
        }
        if out.iter().any(|(n, _)| *n == col.name) {
            return Err(AppError::BadRequest(format!("{} given more than once", col.name)));
        }
        out.push((col.name.clone(), BindValue::for_column(col, v)?));
    }
    Ok(out)
}

fn patch_values(entity: &ResolvedEntity, body: &Record) -> Result<Vec<(String, BindValue)>, AppError> {
    write_values(entity, body.iter().filter(|(_, v)| is_truthy_or_zero(v)), false)
}

fn equality_conditions(entity: &ResolvedEntity, filter: &Record) -> Result<Vec<Condition>, AppError> {
    filter
        .iter()
        .map(|(key, v)| {
            let col = known_column(entity, key)?;
            Ok(if v.is_null() {
                Condition::IsNull {
                    column: col.name.clone(),
                }
            } else {
                Condition::Eq {
                    column: col.name.clone(),
                    value: BindValue::for_column(col, v)?,
                }
            })
        })
        .collect()
}

fn search_conditions(entity: &ResolvedEntity, filters: &Record) -> Result<Vec<Condition>, AppError> {
    let mut conds = Vec::with_capacity(filters.len());
    for (key, v) in filters {
        if !is_truthy_or_zero(v) {
            continue;
        }
        let col = known_column(entity, key)?;
        let column = col.name.clone();
        let cond = match v {
            Value::Number(_) | Value::Bool(_) => Condition::Eq {
                column,
                value: BindValue::for_column(col, v)?,
            },
            Value::String(s) => Condition::Contains {
                column,
                needle: s.clone(),
            },
            Value::Array(_) if col.kind == ColumnKind::Json => Condition::JsonContains {
                column,
                value: v.clone(),
            },
            Value::Array(_) => {
                return Err(AppError::Validation(format!("{} does not hold a list", col.name)));
            }
            Value::Object(_) | Value::Null => {
                tracing::debug!(field = %key, "ignoring search filter without a match rule");
                continue;
            }
        };
        conds.push(cond);
    }
    Ok(conds)
}

fn row_to_record(entity: &ResolvedEntity, row: &PgRow) -> Result<Record, AppError> {
    let mut map = Map::with_capacity(entity.columns.len());
    for col in &entity.columns {
        let name = col.name.as_str();
        let v = match col.kind {
            ColumnKind::SmallInt => row.try_get::<Option<i16>, _>(name)?.map(Value::from),
            ColumnKind::Text { .. } => row.try_get::<Option<String>, _>(name)?.map(Value::String),
            ColumnKind::Timestamp => row
                .try_get::<Option<DateTime<Utc>>, _>(name)?
                .map(|t| Value::String(t.to_rfc3339())),
            ColumnKind::Json => row.try_get::<Option<Value>, _>(name)?,
        };
        map.insert(col.name.clone(), v.unwrap_or(Value::Null));
    }
    Ok(map)
}
