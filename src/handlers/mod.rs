//! HTTP handlers.

pub mod ranger;
