// ============================
// crates/backend-lib/src/metrics.rs
// ============================
//! Central place for metric keys
pub const AUTH_HASH: &str = "auth.hash";
pub const AUTH_VERIFY: &str = "auth.verify";
pub const AUTH_REGISTER: &str = "auth.register";
pub const AUTH_LOGIN_SUCCESS: &str = "auth.login.success";
pub const AUTH_LOGIN_FAILURE: &str = "auth.login.failure";
pub const AUTH_REHASH: &str = "auth.rehash";
pub const SESSION_ISSUED: &str = "auth.session.issued";
pub const GATE_ALLOW: &str = "gate.allow";
pub const GATE_DENY: &str = "gate.deny";
