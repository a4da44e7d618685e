//! # Railsync Client
//! Non-authoritative replica of a railsync session: mirrors the server's
//! entity store, defers edits that arrive before the initial sync, heals
//! coupling relations when cars materialize, and exposes the outbound surface
//! the local simulation sends its own mutations through.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod client;
mod error;
mod world_hook;

pub use client::Client;
pub use error::ClientError;
pub use world_hook::WorldHook;
