//! HMAC signature generation and verification.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{WebhookError, WebhookResult};

type HmacSha256 = Hmac<Sha256>;

/// Prefix some senders prepend to the hex signature.
pub const SHA256_PREFIX: &str = "sha256=";

/// Verifies that a payload was produced by a holder of the shared secret.
///
/// Implementations compare against a bare hex digest; any algorithm prefix
/// must already be removed by the caller.
pub trait SignatureValidator: Send + Sync {
    /// Checks `signature` against `payload`.
    fn validate(&self, payload: &[u8], signature: &str) -> WebhookResult<()>;
}

/// HMAC-SHA256 validator over the raw payload bytes.
pub struct HmacValidator {
    secret: String,
}

impl HmacValidator {
    /// Creates a new validator with the given secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Generates the lowercase hex signature for the given payload.
    pub fn sign(&self, payload: &[u8]) -> String {
        hex::encode(self.mac(payload).finalize().into_bytes())
    }

    /// Generates a full `X-Webhook-Signature` header value.
    pub fn sign_header(&self, payload: &[u8]) -> String {
        format!("{}{}", SHA256_PREFIX, self.sign(payload))
    }

    fn mac(&self, payload: &[u8]) -> HmacSha256 {
        let mut mac =
            HmacSha256::new_from_slice(self.secret.as_bytes()).expect("HMAC can take key of any size");
        mac.update(payload);
        mac
    }
}

impl SignatureValidator for HmacValidator {
    fn validate(&self, payload: &[u8], signature: &str) -> WebhookResult<()> {
        if signature.is_empty() {
            return Err(WebhookError::InvalidSignature);
        }

        let signature = hex::decode(signature).map_err(|_| WebhookError::InvalidSignature)?;

        // verify_slice compares in constant time
        self.mac(payload)
            .verify_slice(&signature)
            .map_err(|_| WebhookError::InvalidSignature)
    }
}

/// Removes a known algorithm prefix from a signature header value.
pub fn strip_signature_prefix(header: &str) -> &str {
    header.strip_prefix(SHA256_PREFIX).unwrap_or(header)
}
