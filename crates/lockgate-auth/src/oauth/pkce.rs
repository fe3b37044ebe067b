//! PKCE (Proof Key for Code Exchange) implementation (RFC 7636).
//!
//! Supports both transformation methods from the RFC. Clients that must
//! not downgrade to `plain` set `force_s256_code_challenge_method` on
//! their registration; the authorization request processor rejects the
//! weaker method for them before any challenge is stored.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Minimum code verifier length per RFC 7636 Section 4.1.
pub const MIN_VERIFIER_LENGTH: usize = 43;

/// Maximum code verifier length per RFC 7636 Section 4.1.
pub const MAX_VERIFIER_LENGTH: usize = 128;

/// PKCE code challenge transformation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PkceChallengeMethod {
    /// `code_challenge = code_verifier` (RFC 7636 Section 4.2).
    #[serde(rename = "plain")]
    Plain,
    /// `code_challenge = BASE64URL(SHA256(code_verifier))`.
    #[serde(rename = "S256")]
    S256,
}

impl PkceChallengeMethod {
    /// Parses the `code_challenge_method` parameter. Case-sensitive per
    /// the RFC registry; unknown values are rejected by the caller.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "plain" => Some(Self::Plain),
            "S256" => Some(Self::S256),
            _ => None,
        }
    }

    /// Returns the registered method name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::S256 => "S256",
        }
    }
}

impl Default for PkceChallengeMethod {
    /// RFC 7636 Section 4.3: the method defaults to `plain` when a
    /// challenge is sent without `code_challenge_method`.
    fn default() -> Self {
        Self::Plain
    }
}

impl std::fmt::Display for PkceChallengeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A PKCE code challenge as stored with an authorization code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PkceChallenge {
    /// The challenge value from the authorization request.
    pub value: String,
    /// The transformation method.
    pub method: PkceChallengeMethod,
}

impl PkceChallenge {
    /// Creates a challenge from request parameters.
    #[must_use]
    pub fn new(value: impl Into<String>, method: PkceChallengeMethod) -> Self {
        Self {
            value: value.into(),
            method,
        }
    }

    /// Verifies a code verifier against this challenge.
    ///
    /// Returns `false` for verifiers with invalid length as well as for
    /// transformation mismatches.
    #[must_use]
    pub fn verify(&self, verifier: &str) -> bool {
        if verifier.len() < MIN_VERIFIER_LENGTH || verifier.len() > MAX_VERIFIER_LENGTH {
            return false;
        }
        match self.method {
            PkceChallengeMethod::Plain => self.value == verifier,
            PkceChallengeMethod::S256 => {
                let digest = Sha256::digest(verifier.as_bytes());
                URL_SAFE_NO_PAD.encode(digest) == self.value
            }
        }
    }
}

/// Computes the S256 challenge for a verifier. Used by tests and by
/// tooling that drives the flow programmatically.
#[must_use]
pub fn compute_s256_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Generates a random code verifier of maximum entropy.
#[must_use]
pub fn generate_verifier() -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";
    let mut rng = rand::thread_rng();
    (0..MAX_VERIFIER_LENGTH)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test vector from RFC 7636 Appendix B.
    const RFC_VERIFIER: &str = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
    const RFC_CHALLENGE: &str = "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM";

    #[test]
    fn test_rfc7636_appendix_b_vector() {
        assert_eq!(compute_s256_challenge(RFC_VERIFIER), RFC_CHALLENGE);

        let challenge = PkceChallenge::new(RFC_CHALLENGE, PkceChallengeMethod::S256);
        assert!(challenge.verify(RFC_VERIFIER));
    }

    #[test]
    fn test_s256_rejects_wrong_verifier() {
        let challenge = PkceChallenge::new(RFC_CHALLENGE, PkceChallengeMethod::S256);
        assert!(!challenge.verify("wrong-verifier-wrong-verifier-wrong-verifier"));
    }

    #[test]
    fn test_plain_method_is_identity() {
        let verifier = "plain-verifier-plain-verifier-plain-verifier-12345";
        let challenge = PkceChallenge::new(verifier, PkceChallengeMethod::Plain);
        assert!(challenge.verify(verifier));
        assert!(!challenge.verify("other-verifier-other-verifier-other-verifier-1"));
    }

    #[test]
    fn test_verifier_length_bounds() {
        let short = "a".repeat(MIN_VERIFIER_LENGTH - 1);
        let challenge = PkceChallenge::new(short.clone(), PkceChallengeMethod::Plain);
        assert!(!challenge.verify(&short));

        let long = "a".repeat(MAX_VERIFIER_LENGTH + 1);
        let challenge = PkceChallenge::new(long.clone(), PkceChallengeMethod::Plain);
        assert!(!challenge.verify(&long));
    }

    #[test]
    fn test_method_parse_is_case_sensitive() {
        assert_eq!(
            PkceChallengeMethod::parse("S256"),
            Some(PkceChallengeMethod::S256)
        );
        assert_eq!(
            PkceChallengeMethod::parse("plain"),
            Some(PkceChallengeMethod::Plain)
        );
        assert_eq!(PkceChallengeMethod::parse("s256"), None);
        assert_eq!(PkceChallengeMethod::parse("PLAIN"), None);
    }

    #[test]
    fn test_default_method_is_plain() {
        assert_eq!(PkceChallengeMethod::default(), PkceChallengeMethod::Plain);
    }

    #[test]
    fn test_generated_verifier_roundtrip() {
        let verifier = generate_verifier();
        assert_eq!(verifier.len(), MAX_VERIFIER_LENGTH);

        let challenge =
            PkceChallenge::new(compute_s256_challenge(&verifier), PkceChallengeMethod::S256);
        assert!(challenge.verify(&verifier));
    }
}
