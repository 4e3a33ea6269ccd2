//! Entity definition validation: identifiers, key columns, and name collisions.

use crate::config::{ColumnKind, EntityDef};
use crate::error::ConfigError;
use std::collections::HashSet;

/// PostgreSQL identifiers accepted in definitions and settings: `[A-Za-z_][A-Za-z0-9_]*`, at most 63 bytes.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    s.len() <= 63
        && (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn validate(defs: &[EntityDef], schema: &str) -> Result<(), ConfigError> {
    if !is_identifier(schema) {
        return Err(ConfigError::Validation(format!("invalid schema name '{}'", schema)));
    }
    let mut segments = HashSet::new();
    for def in defs {
        if !segments.insert(def.path_segment.as_str()) {
            return Err(ConfigError::DuplicatePathSegment(def.path_segment.clone()));
        }
        validate_entity(def)?;
    }
    Ok(())
}

fn validate_entity(def: &EntityDef) -> Result<(), ConfigError> {
    if !is_identifier(&def.table_name) {
        return Err(ConfigError::Validation(format!("invalid table name '{}'", def.table_name)));
    }
    let mut keys = HashSet::new();
    for f in &def.fields {
        if !is_identifier(&f.name) {
            return Err(ConfigError::Validation(format!(
                "{}: invalid column name '{}'",
                def.table_name, f.name
            )));
        }
        for key in std::iter::once(&f.name).chain(f.aliases.iter()) {
            if !keys.insert(key.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "{}: field key '{}' declared twice",
                    def.table_name, key
                )));
            }
        }
    }

    let pk = def
        .fields
        .iter()
        .find(|f| f.name == def.primary_key)
        .ok_or_else(|| ConfigError::InvalidPrimaryKey {
            table: def.table_name.clone(),
            column: def.primary_key.clone(),
        })?;
    if pk.nullable || (pk.writable && pk.default.is_none()) {
        return Err(ConfigError::InvalidPrimaryKey {
            table: def.table_name.clone(),
            column: def.primary_key.clone(),
        });
    }

    let timestamps = std::iter::once(&def.created_column).chain(def.updated_column.iter());
    for col in timestamps {
        let field = def
            .fields
            .iter()
            .find(|f| &f.name == col)
            .ok_or_else(|| ConfigError::MissingReference {
                kind: "column",
                id: format!("{}.{}", def.table_name, col),
            })?;
        if field.kind != ColumnKind::Timestamp {
            return Err(ConfigError::Validation(format!(
                "{}.{} must be a timestamp column",
                def.table_name, col
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ColumnDefault, FieldDef};
    use rstest::rstest;

    fn base() -> EntityDef {
        EntityDef::new("item", "item", "item_id", "created")
            .field(
                FieldDef::new("item_id", ColumnKind::text(36))
                    .read_only()
                    .default(ColumnDefault::Uuid),
            )
            .field(FieldDef::new("label", ColumnKind::text(30)))
            .field(
                FieldDef::new("created", ColumnKind::Timestamp)
                    .read_only()
                    .default(ColumnDefault::Now),
            )
    }

    #[rstest]
    #[case("public", true)]
    #[case("_private9", true)]
    #[case("9lives", false)]
    #[case("drop table", false)]
    #[case("", false)]
    #[case("quo\"te", false)]
    fn identifier_rules(#[case] name: &str, #[case] ok: bool) {
        assert_eq!(is_identifier(name), ok);
    }

    #[test]
    fn accepts_well_formed_definition() {
        assert!(validate(&[base()], "public").is_ok());
    }

    #[test]
    fn rejects_bad_schema() {
        assert!(matches!(validate(&[base()], "a-b"), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_duplicate_path_segment() {
        let err = validate(&[base(), base()], "public").unwrap_err();
        assert!(matches!(err, ConfigError::DuplicatePathSegment(s) if s == "item"));
    }

    #[test]
    fn rejects_unknown_primary_key() {
        let mut def = base();
        def.primary_key = "nope".into();
        assert!(matches!(validate(&[def], "public"), Err(ConfigError::InvalidPrimaryKey { .. })));
    }

    #[test]
    fn rejects_alias_colliding_with_column() {
        let def = base().field(FieldDef::new("other", ColumnKind::SmallInt).alias("label"));
        assert!(matches!(validate(&[def], "public"), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn created_column_must_be_timestamp() {
        let mut def = base();
        def.created_column = "label".into();
        assert!(matches!(validate(&[def], "public"), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn missing_updated_column_is_reported() {
        let def = base().updated("touched");
        assert!(matches!(
            validate(&[def], "public"),
            Err(ConfigError::MissingReference { kind: "column", .. })
        ));
    }
}
