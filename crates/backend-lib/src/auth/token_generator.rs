// ============================
// crates/backend-lib/src/auth/token_generator.rs
// ============================
//! Random secrets: signing keys for `warden keygen` and throwaway secrets.
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;

/// Default token size in bytes (32 bytes = 256 bits of entropy)
const DEFAULT_TOKEN_BYTES: usize = 32;

/// Generate a base64url (unpadded) random secret suitable as an HMAC signing key
pub fn generate_secure_token() -> String {
    generate_secure_token_with_size(DEFAULT_TOKEN_BYTES)
}

/// Generate a random secret of `bytes` bytes, base64url encoded without padding
pub fn generate_secure_token_with_size(bytes: usize) -> String {
    let mut buffer = vec![0u8; bytes];
    rand::rng().fill_bytes(&mut buffer);
    URL_SAFE_NO_PAD.encode(buffer)
}
