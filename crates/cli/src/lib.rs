//! Cumulus service: the HTTP chat endpoint, its configuration and the
//! stdio tool server.

pub mod config;
pub mod error;
pub mod frame;
pub mod rpc;
pub mod server;
pub mod tool_server;
pub mod tools;

pub use config::{Config, ConfigError};
pub use error::{Error, Result};
pub use server::{AppState, Health, router, serve};
