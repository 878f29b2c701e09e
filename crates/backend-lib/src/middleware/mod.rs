// ============================
// crates/backend-lib/src/middleware/mod.rs
// ============================
//! Middleware for the `warden` HTTP server.

pub mod gate;

pub use gate::{gate, SessionContext};
