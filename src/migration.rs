//! Apply the entity model to the database: schema, tables, unique constraints, and the
//! creation-time index used by pagination. Idempotent.

use crate::config::{ResolvedEntity, ResolvedModel};
use crate::error::AppError;
use crate::sql::qualified_table;
use sqlx::PgPool;

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// DDL for one entity, in execution order.
pub fn entity_ddl(entity: &ResolvedEntity) -> Vec<String> {
    let table = qualified_table(entity);
    let mut col_defs = Vec::with_capacity(entity.columns.len() + 1);
    for c in &entity.columns {
        let mut def = format!("{} {}", quote(&c.name), c.kind.sql_type());
        if !c.nullable {
            def.push_str(" NOT NULL");
        }
        if let Some(d) = &c.default {
            def.push_str(" DEFAULT ");
            def.push_str(&d.sql());
        }
        if c.unique && c.name != entity.pk_column {
            def.push_str(" UNIQUE");
        }
        col_defs.push(def);
    }
    col_defs.push(format!("PRIMARY KEY ({})", quote(&entity.pk_column)));

    let index_name = format!("{}_{}_idx", entity.table_name, entity.created_column);
    vec![
        format!("CREATE SCHEMA IF NOT EXISTS {}", quote(&entity.schema_name)),
        format!("CREATE TABLE IF NOT EXISTS {} ({})", table, col_defs.join(", ")),
        format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} ({} DESC)",
            quote(&index_name),
            table,
            quote(&entity.created_column)
        ),
    ]
}

/// Create every entity's table when missing. Existing tables are left as they are.
pub async fn apply_migrations(pool: &PgPool, model: &ResolvedModel) -> Result<(), AppError> {
    let mut entities: Vec<&ResolvedEntity> = model.entity_by_path.values().collect();
    entities.sort_by(|a, b| a.table_name.cmp(&b.table_name));
    for entity in entities {
        for sql in entity_ddl(entity) {
            tracing::debug!(sql = %sql, "migration");
            sqlx::query(&sql).execute(pool).await?;
        }
        tracing::info!(table = %qualified_table(entity), "table ready");
    }
    Ok(())
}
