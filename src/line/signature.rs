//! Webhook signature verification
//!
//! LINE signs each webhook body with HMAC-SHA256 over the raw bytes, keyed
//! by the channel secret, and sends the base64 digest in
//! `X-Line-Signature`.

use base64::prelude::{Engine as _, BASE64_STANDARD};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Check `signature` (base64) against the HMAC-SHA256 of `body`. The digest
/// comparison is constant-time.
pub fn verify_signature(channel_secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(expected) = BASE64_STANDARD.decode(signature) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(channel_secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}
