//! Resilient static file server for an esmbox output directory

pub mod index;
pub mod server;

pub use server::{bind, BoundServer, ServerConfig};
