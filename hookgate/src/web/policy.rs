//! HMAC authorization policy.
//!
//! Decides, per request, whether a handler may run:
//!
//! | secret configured | signature header | outcome                    |
//! |-------------------|------------------|----------------------------|
//! | no                | no               | `ExemptNoSecretConfigured` |
//! | no                | yes              | `Rejected`                 |
//! | yes               | no               | `Rejected`                 |
//! | yes               | yes              | `Verified` iff it matches  |

use tracing::{debug, error, warn};

use crate::credential::Credential;
use crate::error::WebhookError;
use crate::web::signature::verify_signature;

/// Outcome of running a request through [`authorize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationResult {
    /// The signature matched the configured secret.
    Verified,
    /// Authentication failed. Callers answer 401 without saying why.
    Rejected,
    /// No secret is configured and the client sent no signature.
    ExemptNoSecretConfigured,
}

impl VerificationResult {
    /// Whether the handler may be invoked.
    pub fn is_allowed(self) -> bool {
        !matches!(self, VerificationResult::Rejected)
    }
}

/// Authorize a request body against a credential.
///
/// Never fails: misconfiguration such as an unsupported algorithm is logged
/// and reported as [`VerificationResult::Rejected`].
pub fn authorize(
    credential: &Credential,
    raw_body: &[u8],
    header_signature: Option<&str>,
) -> VerificationResult {
    match (credential.hmac_key(), header_signature) {
        (None, None) => {
            debug!("hmac_exempt_no_secret");
            VerificationResult::ExemptNoSecretConfigured
        }
        (None, Some(_)) => {
            // Fail closed: a signature we cannot check is not accepted.
            warn!("hmac_signature_unexpected");
            VerificationResult::Rejected
        }
        (Some(_), None) => {
            warn!("hmac_signature_missing");
            VerificationResult::Rejected
        }
        (Some(secret), Some(signature)) => {
            let algorithm = credential.hmac_algorithm();
            match verify_signature(secret, &algorithm, raw_body, signature) {
                Ok(true) => {
                    debug!(algorithm = %algorithm, "hmac_verified");
                    VerificationResult::Verified
                }
                Ok(false) => {
                    warn!(
                        algorithm = %algorithm,
                        body_length = raw_body.len(),
                        signature_length = signature.len(),
                        "hmac_signature_mismatch"
                    );
                    VerificationResult::Rejected
                }
                Err(WebhookError::UnsupportedAlgorithm { algorithm, supported }) => {
                    error!(
                        configured_algorithm = %algorithm,
                        supported_algorithms = %supported,
                        "hmac_invalid_hash_mode"
                    );
                    VerificationResult::Rejected
                }
                Err(e) => {
                    error!(error = %e, "hmac_verification_failed");
                    VerificationResult::Rejected
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::CapturedLogs;
    use crate::web::signature::compute_signature;

    const BODY: &[u8] = br#"{"x":1}"#;

    fn signed(secret: &str, algorithm: &str) -> Credential {
        Credential::new("user", "pass").with_hmac(secret, algorithm)
    }

    #[test]
    fn test_no_secret_no_signature_is_exempt() {
        let cred = Credential::new("user", "pass");
        assert_eq!(
            authorize(&cred, BODY, None),
            VerificationResult::ExemptNoSecretConfigured
        );
        assert_eq!(
            authorize(&cred, b"", None),
            VerificationResult::ExemptNoSecretConfigured
        );
    }

    #[test]
    fn test_no_secret_with_signature_is_rejected() {
        let cred = Credential::new("user", "pass");
        let sig = compute_signature(b"s3cr3t", "sha1", BODY).unwrap();
        assert_eq!(authorize(&cred, BODY, Some(&sig)), VerificationResult::Rejected);
    }

    #[test]
    fn test_secret_without_signature_is_rejected() {
        let cred = signed("s3cr3t", "sha1");
        assert_eq!(authorize(&cred, BODY, None), VerificationResult::Rejected);
    }

    #[test]
    fn test_valid_signature_is_verified() {
        let cred = signed("s3cr3t", "sha1");
        let sig = compute_signature(b"s3cr3t", "sha1", BODY).unwrap();
        assert_eq!(authorize(&cred, BODY, Some(&sig)), VerificationResult::Verified);
    }

    #[test]
    fn test_uppercase_configured_algorithm_is_verified() {
        let cred = signed("s3cr3t", "SHA256");
        let sig = compute_signature(b"s3cr3t", "sha256", BODY).unwrap();
        assert_eq!(authorize(&cred, BODY, Some(&sig)), VerificationResult::Verified);
    }

    #[test]
    fn test_body_bit_flip_is_rejected() {
        let cred = signed("s3cr3t", "sha256");
        let sig = compute_signature(b"s3cr3t", "sha256", BODY).unwrap();
        for i in 0..BODY.len() {
            for bit in 0..8 {
                let mut mutated = BODY.to_vec();
                mutated[i] ^= 1 << bit;
                assert_eq!(
                    authorize(&cred, &mutated, Some(&sig)),
                    VerificationResult::Rejected,
                    "byte {} bit {}",
                    i,
                    bit
                );
            }
        }
    }

    #[test]
    fn test_header_bit_flip_is_rejected() {
        let cred = signed("s3cr3t", "sha256");
        let sig = compute_signature(b"s3cr3t", "sha256", BODY).unwrap();
        let bytes = sig.as_bytes();
        for i in 0..bytes.len() {
            let mut mutated = bytes.to_vec();
            mutated[i] ^= 0x01;
            let Ok(mutated) = String::from_utf8(mutated) else {
                continue;
            };
            assert_eq!(
                authorize(&cred, BODY, Some(&mutated)),
                VerificationResult::Rejected
            );
        }
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let cred = signed("s3cr3t", "sha1");
        let sig = compute_signature(b"not-it", "sha1", BODY).unwrap();
        assert_eq!(authorize(&cred, BODY, Some(&sig)), VerificationResult::Rejected);
    }

    #[test]
    fn test_algorithm_mismatch_is_rejected() {
        let cred = signed("s3cr3t", "sha1");
        let sig = compute_signature(b"s3cr3t", "sha256", BODY).unwrap();
        assert_eq!(authorize(&cred, BODY, Some(&sig)), VerificationResult::Rejected);
    }

    #[test]
    fn test_unsupported_algorithm_is_rejected() {
        for algorithm in ["md5", "whirlpool", "", "sha3"] {
            let cred = signed("s3cr3t", algorithm);
            assert_eq!(
                authorize(&cred, BODY, Some("md5=abcdef")),
                VerificationResult::Rejected
            );
        }
    }

    #[test]
    fn test_unsupported_algorithm_logs_configured_and_supported() {
        let logs = CapturedLogs::default();
        let cred = signed("s3cr3t", "md5");
        let result = tracing::subscriber::with_default(logs.subscriber(), || {
            authorize(&cred, BODY, Some("md5=abcdef"))
        });
        assert_eq!(result, VerificationResult::Rejected);

        let out = logs.contents();
        assert!(out.contains("ERROR"), "{}", out);
        assert!(out.contains("hmac_invalid_hash_mode"), "{}", out);
        assert!(out.contains("configured_algorithm=md5"), "{}", out);
        assert!(out.contains("supported_algorithms=sha1, sha224, sha256"), "{}", out);
        assert!(out.contains("sha3_512"), "{}", out);
    }

    #[test]
    fn test_is_allowed() {
        assert!(VerificationResult::Verified.is_allowed());
        assert!(VerificationResult::ExemptNoSecretConfigured.is_allowed());
        assert!(!VerificationResult::Rejected.is_allowed());
    }
}
