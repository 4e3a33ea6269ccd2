//! Builds parameterized SELECT, COUNT, INSERT, UPDATE, DELETE from a resolved entity.
//! Identifiers come from the entity model only; values are always bound as parameters.

use crate::config::ResolvedEntity;
use crate::sql::BindValue;
use chrono::{DateTime, Utc};

/// Quote identifier for PostgreSQL (safe: only from the entity model).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Full qualified table name.
pub fn qualified_table(entity: &ResolvedEntity) -> String {
    format!("{}.{}", quoted(&entity.schema_name), quoted(&entity.table_name))
}

#[derive(Debug, Default)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<BindValue>,
}

impl QueryBuf {
    fn push_param(&mut self, v: BindValue) -> usize {
        self.params.push(v);
        self.params.len()
    }
}

/// One WHERE predicate. Predicates are AND-combined.
#[derive(Clone, Debug, PartialEq)]
pub enum Condition {
    Eq { column: String, value: BindValue },
    IsNull { column: String },
    /// Case-sensitive substring match on the column's text rendering.
    Contains { column: String, needle: String },
    /// JSON containment (`@>`) against a JSON column.
    JsonContains { column: String, value: serde_json::Value },
    /// Half-open range `[from, until)`.
    Within {
        column: String,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Order {
    PrimaryKey,
    /// Creation time descending, primary key descending to break ties.
    NewestFirst,
}

fn select_column_list(entity: &ResolvedEntity) -> String {
    entity
        .columns
        .iter()
        .map(|c| quoted(&c.name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn where_clause(q: &mut QueryBuf, conditions: &[Condition]) -> String {
    let mut parts = Vec::with_capacity(conditions.len());
    for cond in conditions {
        let part = match cond {
            Condition::Eq { column, value } => {
                let n = q.push_param(value.clone());
                format!("{} = ${}", quoted(column), n)
            }
            Condition::IsNull { column } => format!("{} IS NULL", quoted(column)),
            Condition::Contains { column, needle } => {
                let n = q.push_param(BindValue::Text(needle.clone()));
                format!("strpos({}::text, ${}) > 0", quoted(column), n)
            }
            Condition::JsonContains { column, value } => {
                let n = q.push_param(BindValue::Json(value.clone()));
                format!("{}::jsonb @> ${}", quoted(column), n)
            }
            Condition::Within { column, from, until } => {
                let a = q.push_param(BindValue::Timestamp(*from));
                let b = q.push_param(BindValue::Timestamp(*until));
                format!("{col} >= ${} AND {col} < ${}", a, b, col = quoted(column))
            }
        };
        parts.push(part);
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

fn order_clause(entity: &ResolvedEntity, order: Order) -> String {
    let pk = quoted(&entity.pk_column);
    match order {
        Order::PrimaryKey => format!(" ORDER BY {}", pk),
        Order::NewestFirst => format!(" ORDER BY {} DESC, {} DESC", quoted(&entity.created_column), pk),
    }
}

/// SELECT with AND-combined conditions, ordering, optional LIMIT/OFFSET.
pub fn select_where(
    entity: &ResolvedEntity,
    conditions: &[Condition],
    order: Order,
    limit: Option<i64>,
    offset: Option<i64>,
) -> QueryBuf {
    let mut q = QueryBuf::default();
    let where_sql = where_clause(&mut q, conditions);
    let mut sql = format!(
        "SELECT {} FROM {}{}{}",
        select_column_list(entity),
        qualified_table(entity),
        where_sql,
        order_clause(entity, order)
    );
    // LIMIT/OFFSET are integers, inlined rather than bound.
    if let Some(n) = limit {
        sql.push_str(&format!(" LIMIT {}", n.max(0)));
    }
    if let Some(n) = offset {
        sql.push_str(&format!(" OFFSET {}", n.max(0)));
    }
    q.sql = sql;
    q
}

/// SELECT COUNT(*) with AND-combined conditions.
pub fn count_where(entity: &ResolvedEntity, conditions: &[Condition]) -> QueryBuf {
    let mut q = QueryBuf::default();
    let where_sql = where_clause(&mut q, conditions);
    q.sql = format!("SELECT COUNT(*) FROM {}{}", qualified_table(entity), where_sql);
    q
}

/// INSERT the given columns. Columns not listed fall back to their database defaults.
pub fn insert(entity: &ResolvedEntity, values: &[(String, BindValue)]) -> QueryBuf {
    let mut q = QueryBuf::default();
    let table = qualified_table(entity);
    let returning = select_column_list(entity);
    if values.is_empty() {
        q.sql = format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", table, returning);
        return q;
    }
    let mut cols = Vec::with_capacity(values.len());
    let mut placeholders = Vec::with_capacity(values.len());
    for (name, v) in values {
        let n = q.push_param(v.clone());
        cols.push(quoted(name));
        placeholders.push(format!("${}", n));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        table,
        cols.join(", "),
        placeholders.join(", "),
        returning
    );
    q
}

/// UPDATE by primary key, setting the given columns and refreshing the update timestamp.
/// With nothing to set, reads the row back unchanged.
pub fn update(entity: &ResolvedEntity, id: &BindValue, sets: &[(String, BindValue)]) -> QueryBuf {
    let mut q = QueryBuf::default();
    let table = qualified_table(entity);
    let pk = quoted(&entity.pk_column);
    let returning = select_column_list(entity);
    if sets.is_empty() {
        q.push_param(id.clone());
        q.sql = format!("SELECT {} FROM {} WHERE {} = $1", returning, table, pk);
        return q;
    }
    let mut assignments = Vec::with_capacity(sets.len() + 1);
    for (name, v) in sets {
        let n = q.push_param(v.clone());
        assignments.push(format!("{} = ${}", quoted(name), n));
    }
    if let Some(updated) = &entity.updated_column {
        if !sets.iter().any(|(name, _)| name == updated) {
            assignments.push(format!("{} = NOW()", quoted(updated)));
        }
    }
    let id_param = q.push_param(id.clone());
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = ${} RETURNING {}",
        table,
        assignments.join(", "),
        pk,
        id_param,
        returning
    );
    q
}

/// DELETE by primary key.
pub fn delete(entity: &ResolvedEntity, id: &BindValue) -> QueryBuf {
    let mut q = QueryBuf::default();
    q.push_param(id.clone());
    q.sql = format!(
        "DELETE FROM {} WHERE {} = $1",
        qualified_table(entity),
        quoted(&entity.pk_column)
    );
    q
}
