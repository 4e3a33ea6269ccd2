//! Record types served by the API.

pub mod ranger;

use crate::config::EntityDef;

pub use ranger::{Completion, CreateRanger, Ranger, RangerStatus};

/// Definitions of every entity, resolved into the runtime model at startup.
pub fn definitions() -> Vec<EntityDef> {
    vec![ranger::definition()]
}
