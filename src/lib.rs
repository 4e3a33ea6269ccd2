//! Huntreasure: treasure-hunt ranger REST backend over PostgreSQL.

pub mod config;
pub mod doc;
pub mod error;
pub mod handlers;
pub mod migration;
pub mod model;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;

pub use config::{resolve, ResolvedEntity, ResolvedModel, Settings};
pub use error::{AppError, ConfigError};
pub use migration::apply_migrations;
pub use routes::app;
pub use service::CrudService;
pub use state::AppState;
pub use store::{connect, ensure_database_exists};
