//! Declarative entity definitions: each record type lists its fields once, and the
//! definitions are validated and resolved into a lookup table at startup.

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::Type;

/// Storage kind of a column. Drives DDL, value coercion on write, and decoding on read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    /// 0/1 flags and small enums.
    SmallInt,
    /// Text with an optional width (VARCHAR(n) when set).
    Text { max_length: Option<usize> },
    Timestamp,
    Json,
}

impl ColumnKind {
    pub const fn text(max_length: usize) -> Self {
        ColumnKind::Text {
            max_length: Some(max_length),
        }
    }

    pub fn sql_type(&self) -> String {
        match self {
            ColumnKind::SmallInt => "SMALLINT".into(),
            ColumnKind::Text { max_length: Some(n) } => format!("VARCHAR({})", n),
            ColumnKind::Text { max_length: None } => "TEXT".into(),
            ColumnKind::Timestamp => "TIMESTAMPTZ".into(),
            ColumnKind::Json => "JSONB".into(),
        }
    }

    pub fn type_info(&self) -> PgTypeInfo {
        match self {
            ColumnKind::SmallInt => <i16 as Type<Postgres>>::type_info(),
            ColumnKind::Text { .. } => <String as Type<Postgres>>::type_info(),
            ColumnKind::Timestamp => <DateTime<Utc> as Type<Postgres>>::type_info(),
            ColumnKind::Json => <serde_json::Value as Type<Postgres>>::type_info(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColumnDefault {
    /// SQL literal, e.g. `0`.
    Literal(String),
    /// Current transaction timestamp.
    Now,
    /// Random UUID v4 rendered as text; generated by the service on insert.
    Uuid,
}

impl ColumnDefault {
    pub fn sql(&self) -> String {
        match self {
            ColumnDefault::Literal(s) => s.clone(),
            ColumnDefault::Now => "NOW()".into(),
            ColumnDefault::Uuid => "gen_random_uuid()::text".into(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct FieldDef {
    pub name: String,
    pub kind: ColumnKind,
    pub nullable: bool,
    pub unique: bool,
    /// Read-only fields are server managed: they can be filtered on but not written by callers.
    pub writable: bool,
    pub default: Option<ColumnDefault>,
    /// Alternate request keys accepted for this field.
    pub aliases: Vec<String>,
}

impl FieldDef {
    pub fn new(name: &str, kind: ColumnKind) -> Self {
        FieldDef {
            name: name.to_string(),
            kind,
            nullable: false,
            unique: false,
            writable: true,
            default: None,
            aliases: Vec::new(),
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    pub fn default(mut self, default: ColumnDefault) -> Self {
        self.default = Some(default);
        self
    }

    pub fn alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_string());
        self
    }
}

/// One record type backed by one table.
#[derive(Clone, Debug)]
pub struct EntityDef {
    pub table_name: String,
    pub path_segment: String,
    pub primary_key: String,
    /// Creation timestamp; pagination orders by it.
    pub created_column: String,
    /// Refreshed on every update when set.
    pub updated_column: Option<String>,
    pub fields: Vec<FieldDef>,
}

impl EntityDef {
    pub fn new(table_name: &str, path_segment: &str, primary_key: &str, created_column: &str) -> Self {
        EntityDef {
            table_name: table_name.to_string(),
            path_segment: path_segment.to_string(),
            primary_key: primary_key.to_string(),
            created_column: created_column.to_string(),
            updated_column: None,
            fields: Vec::new(),
        }
    }

    pub fn updated(mut self, column: &str) -> Self {
        self.updated_column = Some(column.to_string());
        self
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }
}

/// Per-field request rules derived from the definition (presence and width).
#[derive(Clone, Debug, Default)]
pub struct ValidationRule {
    pub required: bool,
    pub max_length: Option<usize>,
}
