//! Resolved entity model: definitions validated and flattened for runtime use.

use crate::config::{validate, ColumnDefault, ColumnKind, EntityDef, ValidationRule};
use crate::error::ConfigError;
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Clone, Debug)]
pub struct ColumnInfo {
    pub name: String,
    pub kind: ColumnKind,
    pub nullable: bool,
    pub unique: bool,
    pub writable: bool,
    pub default: Option<ColumnDefault>,
}

#[derive(Clone, Debug)]
pub struct ResolvedEntity {
    pub schema_name: String,
    pub table_name: String,
    pub path_segment: String,
    pub pk_column: String,
    pub created_column: String,
    pub updated_column: Option<String>,
    pub columns: Vec<ColumnInfo>,
    /// Column name or alias -> index into `columns`.
    field_index: HashMap<String, usize>,
    pub validation: HashMap<String, ValidationRule>,
}

impl ResolvedEntity {
    fn from_def(def: &EntityDef, schema: &str) -> Self {
        let mut field_index = HashMap::new();
        let mut validation = HashMap::new();
        let mut columns = Vec::with_capacity(def.fields.len());
        for (i, f) in def.fields.iter().enumerate() {
            field_index.insert(f.name.clone(), i);
            for alias in &f.aliases {
                field_index.insert(alias.clone(), i);
            }
            if f.writable {
                let max_length = match f.kind {
                    ColumnKind::Text { max_length } => max_length,
                    _ => None,
                };
                validation.insert(
                    f.name.clone(),
                    ValidationRule {
                        required: !f.nullable && f.default.is_none(),
                        max_length,
                    },
                );
            }
            columns.push(ColumnInfo {
                name: f.name.clone(),
                kind: f.kind,
                nullable: f.nullable,
                unique: f.unique,
                writable: f.writable,
                default: f.default.clone(),
            });
        }
        ResolvedEntity {
            schema_name: schema.to_string(),
            table_name: def.table_name.clone(),
            path_segment: def.path_segment.clone(),
            pk_column: def.primary_key.clone(),
            created_column: def.created_column.clone(),
            updated_column: def.updated_column.clone(),
            columns,
            field_index,
            validation,
        }
    }

    /// Look up a column by name or alias.
    pub fn column(&self, key: &str) -> Option<&ColumnInfo> {
        self.field_index.get(key).and_then(|&i| self.columns.get(i))
    }

    /// Rewrite aliased keys to column names. Keys that match no field are returned separately.
    pub fn normalize(&self, body: Map<String, Value>) -> (Map<String, Value>, Vec<String>) {
        let mut known = Map::new();
        let mut unknown = Vec::new();
        for (k, v) in body {
            match self.column(&k) {
                Some(c) => {
                    known.insert(c.name.clone(), v);
                }
                None => unknown.push(k),
            }
        }
        (known, unknown)
    }
}

#[derive(Clone, Debug, Default)]
pub struct ResolvedModel {
    pub entity_by_path: HashMap<String, ResolvedEntity>,
}

impl ResolvedModel {
    pub fn entity_by_path(&self, path: &str) -> Option<&ResolvedEntity> {
        self.entity_by_path.get(path)
    }
}

/// Validate definitions and build the runtime model with all tables in `schema`.
pub fn resolve(defs: &[EntityDef], schema: &str) -> Result<ResolvedModel, ConfigError> {
    validate(defs, schema)?;
    let entity_by_path = defs
        .iter()
        .map(|d| (d.path_segment.clone(), ResolvedEntity::from_def(d, schema)))
        .collect();
    Ok(ResolvedModel { entity_by_path })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldDef;
    use serde_json::json;

    fn model() -> ResolvedModel {
        let def = EntityDef::new("item", "items", "item_id", "created")
            .field(
                FieldDef::new("item_id", ColumnKind::text(36))
                    .read_only()
                    .default(ColumnDefault::Uuid)
                    .alias("id"),
            )
            .field(FieldDef::new("label", ColumnKind::text(12)).unique())
            .field(FieldDef::new("note", ColumnKind::Text { max_length: None }).nullable())
            .field(
                FieldDef::new("created", ColumnKind::Timestamp)
                    .read_only()
                    .default(ColumnDefault::Now),
            );
        resolve(&[def], "hunt").unwrap()
    }

    #[test]
    fn resolves_columns_and_aliases() {
        let m = model();
        let e = m.entity_by_path("items").unwrap();
        assert_eq!(e.schema_name, "hunt");
        assert_eq!(e.column("id").unwrap().name, "item_id");
        assert_eq!(e.column(&e.pk_column).unwrap().name, "item_id");
        assert!(e.column("missing").is_none());
    }

    #[test]
    fn derives_validation_rules_for_writable_fields() {
        let m = model();
        let e = m.entity_by_path("items").unwrap();
        let label = &e.validation["label"];
        assert!(label.required);
        assert_eq!(label.max_length, Some(12));
        assert!(!e.validation["note"].required);
        assert!(!e.validation.contains_key("item_id"));
        assert!(!e.validation.contains_key("created"));
    }

    #[test]
    fn normalize_rewrites_aliases_and_collects_unknown_keys() {
        let m = model();
        let e = m.entity_by_path("items").unwrap();
        let body = json!({"id": "abc", "label": "x", "colour": "red"});
        let Value::Object(body) = body else { unreachable!() };
        let (known, unknown) = e.normalize(body);
        assert_eq!(known.get("item_id"), Some(&json!("abc")));
        assert_eq!(known.get("label"), Some(&json!("x")));
        assert_eq!(unknown, vec!["colour".to_string()]);
    }
}
