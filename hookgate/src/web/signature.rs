//! Webhook payload signatures.
//!
//! Senders sign the raw request body with HMAC and put the result in the
//! `X-Hub-Signature` header as `<algorithm>=<hex digest>`, for example
//! `sha256=3f1c...`. Verification recomputes that string and compares it
//! to the header value in constant time.

use std::fmt;
use std::str::FromStr;

use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::{Sha224, Sha256, Sha384, Sha512};
use sha3::{Sha3_224, Sha3_256, Sha3_384, Sha3_512};
use subtle::ConstantTimeEq;
use tracing::warn;

use crate::error::WebhookError;

/// Header carrying the client-computed signature.
pub const SIGNATURE_HEADER: &str = "X-Hub-Signature";

/// Names of every hash algorithm a credential may be configured with.
pub const SUPPORTED_ALGORITHMS: &[&str] = &[
    "sha1", "sha224", "sha256", "sha384", "sha512", "sha3_224", "sha3_256", "sha3_384",
    "sha3_512",
];

/// Hash algorithms usable for webhook HMACs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
    Sha3_224,
    Sha3_256,
    Sha3_384,
    Sha3_512,
}

impl DigestAlgorithm {
    /// Lowercase name, as used in the signature prefix.
    pub fn name(self) -> &'static str {
        match self {
            DigestAlgorithm::Sha1 => "sha1",
            DigestAlgorithm::Sha224 => "sha224",
            DigestAlgorithm::Sha256 => "sha256",
            DigestAlgorithm::Sha384 => "sha384",
            DigestAlgorithm::Sha512 => "sha512",
            DigestAlgorithm::Sha3_224 => "sha3_224",
            DigestAlgorithm::Sha3_256 => "sha3_256",
            DigestAlgorithm::Sha3_384 => "sha3_384",
            DigestAlgorithm::Sha3_512 => "sha3_512",
        }
    }

    fn hex_digest(self, secret: &[u8], payload: &[u8]) -> Result<String, WebhookError> {
        match self {
            DigestAlgorithm::Sha1 => keyed_hex::<Hmac<Sha1>>(secret, payload),
            DigestAlgorithm::Sha224 => keyed_hex::<Hmac<Sha224>>(secret, payload),
            DigestAlgorithm::Sha256 => keyed_hex::<Hmac<Sha256>>(secret, payload),
            DigestAlgorithm::Sha384 => keyed_hex::<Hmac<Sha384>>(secret, payload),
            DigestAlgorithm::Sha512 => keyed_hex::<Hmac<Sha512>>(secret, payload),
            DigestAlgorithm::Sha3_224 => keyed_hex::<Hmac<Sha3_224>>(secret, payload),
            DigestAlgorithm::Sha3_256 => keyed_hex::<Hmac<Sha3_256>>(secret, payload),
            DigestAlgorithm::Sha3_384 => keyed_hex::<Hmac<Sha3_384>>(secret, payload),
            DigestAlgorithm::Sha3_512 => keyed_hex::<Hmac<Sha3_512>>(secret, payload),
        }
    }
}

impl FromStr for DigestAlgorithm {
    type Err = WebhookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha1" => Ok(DigestAlgorithm::Sha1),
            "sha224" => Ok(DigestAlgorithm::Sha224),
            "sha256" => Ok(DigestAlgorithm::Sha256),
            "sha384" => Ok(DigestAlgorithm::Sha384),
            "sha512" => Ok(DigestAlgorithm::Sha512),
            "sha3_224" | "sha3-224" => Ok(DigestAlgorithm::Sha3_224),
            "sha3_256" | "sha3-256" => Ok(DigestAlgorithm::Sha3_256),
            "sha3_384" | "sha3-384" => Ok(DigestAlgorithm::Sha3_384),
            "sha3_512" | "sha3-512" => Ok(DigestAlgorithm::Sha3_512),
            _ => Err(WebhookError::UnsupportedAlgorithm {
                algorithm: s.to_string(),
                supported: SUPPORTED_ALGORITHMS.join(", "),
            }),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn keyed_hex<M>(secret: &[u8], payload: &[u8]) -> Result<String, WebhookError>
where
    M: Mac + KeyInit,
{
    let mut mac = <M as Mac>::new_from_slice(secret).map_err(|_| {
        warn!("hmac_invalid_key");
        WebhookError::AuthRejected
    })?;
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Compute the signature string a sender would put in `X-Hub-Signature`.
///
/// The algorithm name is checked against [`SUPPORTED_ALGORITHMS`] before any
/// hashing happens.
///
/// # Returns
///
/// `"<algorithm>=<hex digest>"`, both parts lowercase.
pub fn compute_signature(
    secret: &[u8],
    algorithm: &str,
    payload: &[u8],
) -> Result<String, WebhookError> {
    let algorithm: DigestAlgorithm = algorithm.parse()?;
    let digest = algorithm.hex_digest(secret, payload)?;
    Ok(format!("{}={}", algorithm, digest))
}

/// Check a client-supplied signature against the one computed for `payload`.
///
/// Returns `Ok(false)` on mismatch and `Err` only when the algorithm is unusable.
pub fn verify_signature(
    secret: &[u8],
    algorithm: &str,
    payload: &[u8],
    client_signature: &str,
) -> Result<bool, WebhookError> {
    let expected = compute_signature(secret, algorithm, payload)?;
    Ok(constant_time_compare(&expected, client_signature))
}

/// Constant-time string comparison to prevent timing attacks.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_sha1(secret: &[u8], payload: &[u8]) -> String {
        let mut mac = <Hmac<Sha1> as Mac>::new_from_slice(secret).unwrap();
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_compute_signature_format() {
        let sig = compute_signature(b"s3cr3t", "sha1", br#"{"x":1}"#).unwrap();
        assert_eq!(
            sig,
            format!("sha1={}", reference_sha1(b"s3cr3t", br#"{"x":1}"#))
        );
        // sha1 digests are 40 hex chars
        assert_eq!(sig.len(), "sha1=".len() + 40);
    }

    #[test]
    fn test_compute_signature_known_vector() {
        // RFC 4231 test case 2
        let sig = compute_signature(b"Jefe", "sha256", b"what do ya want for nothing?").unwrap();
        assert_eq!(
            sig,
            "sha256=5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_algorithm_name_is_case_insensitive() {
        let upper = compute_signature(b"key", "SHA256", b"body").unwrap();
        let lower = compute_signature(b"key", "sha256", b"body").unwrap();
        assert_eq!(upper, lower);
        assert!(upper.starts_with("sha256="));
    }

    #[test]
    fn test_digest_lengths() {
        for (name, hex_len) in [
            ("sha1", 40),
            ("sha224", 56),
            ("sha256", 64),
            ("sha384", 96),
            ("sha512", 128),
            ("sha3_224", 56),
            ("sha3_256", 64),
            ("sha3_384", 96),
            ("sha3_512", 128),
        ] {
            let sig = compute_signature(b"key", name, b"body").unwrap();
            let (prefix, digest) = sig.split_once('=').unwrap();
            assert_eq!(prefix, name);
            assert_eq!(digest.len(), hex_len);
            assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn test_sha3_accepts_hyphenated_name() {
        let body = b"payload";
        let sig = compute_signature(b"key", "SHA3-256", body).unwrap();
        assert!(sig.starts_with("sha3_256="));
        assert!(verify_signature(b"key", "sha3_256", body, &sig).unwrap());

        let sha2 = compute_signature(b"key", "sha256", body).unwrap();
        assert_ne!(sig.split_once('=').unwrap().1, sha2.split_once('=').unwrap().1);
    }

    #[test]
    fn test_unsupported_algorithm() {
        let err = compute_signature(b"key", "md5", b"body").unwrap_err();
        match err {
            WebhookError::UnsupportedAlgorithm { algorithm, supported } => {
                assert_eq!(algorithm, "md5");
                assert!(supported.contains("sha256"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_verify_signature_roundtrip() {
        let body = b"payload bytes";
        let sig = compute_signature(b"secret", "sha256", body).unwrap();
        assert!(verify_signature(b"secret", "sha256", body, &sig).unwrap());
        assert!(!verify_signature(b"other", "sha256", body, &sig).unwrap());
        assert!(!verify_signature(b"secret", "sha256", b"payload bytez", &sig).unwrap());
    }

    #[test]
    fn test_verify_signature_requires_prefix() {
        let body = b"payload";
        let sig = compute_signature(b"secret", "sha1", body).unwrap();
        let bare_digest = sig.trim_start_matches("sha1=");
        assert!(!verify_signature(b"secret", "sha1", body, bare_digest).unwrap());
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
        assert!(constant_time_compare("", ""));
    }
}
