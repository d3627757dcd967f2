use base64::{Engine as _, engine::general_purpose};
use rand::RngCore;

/// Generates a cryptographically secure API key with 384 bits of entropy.
///
/// The key is formatted as `sk-{base64url_encoded_random_bytes}` where the
/// random bytes are 48 bytes of cryptographically secure random data,
/// yielding a 67-character URL-safe string.
pub fn generate_api_key() -> String {
    let mut key_bytes = [0u8; 48];
    rand::rng().fill_bytes(&mut key_bytes);

    format!("sk-{}", general_purpose::URL_SAFE_NO_PAD.encode(key_bytes))
}
