//! Library crate for turtle-soup-back, exposing modules for binaries and integration tests.

pub mod config;
pub mod dto;
pub mod error;
pub mod oracle;
pub mod routes;
pub mod sanitize;
pub mod services;
pub mod state;
pub mod store;
