//! Shared application state for all routes, and the request-scoped database session.

use crate::config::{ResolvedEntity, ResolvedModel};
use crate::error::{AppError, ConfigError};
use sqlx::pool::PoolConnection;
use sqlx::{PgConnection, PgPool, Postgres};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub model: Arc<ResolvedModel>,
}

impl AppState {
    pub fn new(pool: PgPool, model: ResolvedModel) -> Self {
        AppState {
            pool,
            model: Arc::new(model),
        }
    }

    /// Resolved entity served under `path`.
    pub fn entity(&self, path: &str) -> Result<&ResolvedEntity, AppError> {
        self.model.entity_by_path(path).ok_or_else(|| {
            AppError::Config(ConfigError::MissingReference {
                kind: "entity",
                id: path.to_string(),
            })
        })
    }

    /// Check out one pooled connection for the current request.
    pub async fn session(&self) -> Result<Session, AppError> {
        let conn = self.pool.acquire().await?;
        Ok(Session(conn))
    }
}

/// A pooled connection held for one request; returned to the pool on drop.
pub struct Session(PoolConnection<Postgres>);

impl Deref for Session {
    type Target = PgConnection;

    fn deref(&self) -> &PgConnection {
        &self.0
    }
}

impl DerefMut for Session {
    fn deref_mut(&mut self) -> &mut PgConnection {
        &mut self.0
    }
}
