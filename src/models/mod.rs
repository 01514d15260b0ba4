//! Core data models for the streaming relay.
//!
//! These entities represent the metadata side of the backend store. They
//! map to database tables via `sqlx::FromRow` and serialize naturally as
//! JSON via `serde`.

pub mod container;
pub mod object;
