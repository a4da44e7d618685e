//! # Railsync Server
//! The authoritative relay of a railsync session: owns the canonical entity
//! store, arbitrates per-car authority with latency-equalized handoff, runs
//! initialization barriers for newly introduced cars, and rebroadcasts
//! accepted mutations to every other connected client.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod authority;
mod barrier;
mod error;
mod schedule;
mod server;
mod server_config;
mod users;

pub use authority::AuthorityManager;
pub use barrier::BarrierCoordinator;
pub use error::ServerError;
pub use server::Server;
pub use server_config::ServerConfig;
pub use users::UserRegistry;
