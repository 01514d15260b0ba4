//! Conditional-GET streaming relay.
//!
//! Serves binary objects out of a local object-store backend over HTTP,
//! honoring `If-Modified-Since` so unchanged content short-circuits into
//! `304 Not Modified`, and optionally burning the modification time into
//! image payloads on the way out so cache behavior is visible.

pub mod conditional;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod pipeline;
pub mod routes;
pub mod services;
