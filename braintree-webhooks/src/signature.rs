//! Webhook signature generation and verification
//!
//! The processor signs the base64 payload with HMAC-SHA1, keyed by the raw
//! SHA-1 digest of the merchant's private key. The signature field holds one
//! or more `public_key|hex_digest` pairs joined by `&`; the pair for our
//! public key is the one checked.

use crate::{Result, WebhookError};
use braintree_payments::Credentials;
use ring::{digest, hmac};
use secrecy::{ExposeSecret, SecretString};

/// Signature verification for one credential set
#[derive(Debug, Clone)]
pub struct WebhookSignature {
    public_key: String,
    private_key: SecretString,
}

impl WebhookSignature {
    /// Create a verifier for an API key pair
    pub fn new(public_key: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
            private_key: SecretString::from(private_key.into()),
        }
    }

    /// Verifier for a gateway's API keys.
    ///
    /// Delegated access tokens cannot verify webhooks, so the key pair is required.
    pub fn from_credentials(credentials: &Credentials) -> Result<Self> {
        if !credentials.has_api_keys() {
            return Err(WebhookError::ConfigError(
                "webhook verification requires a public and private key".to_string(),
            ));
        }
        Ok(Self {
            public_key: credentials.public_key.clone(),
            private_key: credentials.private_key.clone(),
        })
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// Sign a payload as the processor would
    pub fn sign(&self, payload: &str) -> String {
        format!("{}|{}", self.public_key, self.digest(payload))
    }

    /// Verify a signature field against its payload
    pub fn verify(&self, signature: &str, payload: &str) -> Result<()> {
        if payload.bytes().any(|b| !is_payload_byte(b)) {
            return Err(WebhookError::SignatureInvalid(
                "payload contains illegal characters".to_string(),
            ));
        }

        let digest = self.matching_digest(signature).ok_or_else(|| {
            WebhookError::SignatureInvalid("no matching public key".to_string())
        })?;
        let tag = hex::decode(digest).map_err(|_| {
            WebhookError::SignatureInvalid("signature is not hex encoded".to_string())
        })?;

        let key = self.key();
        let matches = hmac::verify(&key, payload.as_bytes(), &tag).is_ok()
            || hmac::verify(&key, format!("{}\n", payload).as_bytes(), &tag).is_ok();

        if !matches {
            return Err(WebhookError::SignatureInvalid(
                "signature does not match payload - one has been modified".to_string(),
            ));
        }
        Ok(())
    }

    /// Answer a webhook URL verification challenge
    pub fn verify_challenge(&self, challenge: &str) -> Result<String> {
        let valid = (20..=32).contains(&challenge.len())
            && challenge.bytes().all(|b| matches!(b, b'a'..=b'f' | b'0'..=b'9'));
        if !valid {
            return Err(WebhookError::SignatureInvalid(
                "challenge contains non-hex characters".to_string(),
            ));
        }
        Ok(self.sign(challenge))
    }

    fn matching_digest<'a>(&self, signature: &'a str) -> Option<&'a str> {
        signature.split('&').find_map(|pair| {
            let (public_key, digest) = pair.trim().split_once('|')?;
            (public_key == self.public_key).then_some(digest)
        })
    }

    fn key(&self) -> hmac::Key {
        let secret = digest::digest(
            &digest::SHA1_FOR_LEGACY_USE_ONLY,
            self.private_key.expose_secret().as_bytes(),
        );
        hmac::Key::new(hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY, secret.as_ref())
    }

    fn digest(&self, payload: &str) -> String {
        hex::encode(hmac::sign(&self.key(), payload.as_bytes()))
    }
}

fn is_payload_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'+' | b'=' | b'/' | b'\n')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> WebhookSignature {
        WebhookSignature::new("public_key", "private_key")
    }

    #[test]
    fn test_sign_and_verify() {
        let signer = signer();
        let payload = "PG5vdGlmaWNhdGlvbj4=\n";

        let signature = signer.sign(payload);
        assert!(signature.starts_with("public_key|"));
        assert_eq!(signature.len(), "public_key|".len() + 40);
        assert!(signer.verify(&signature, payload).is_ok());
    }

    #[test]
    fn test_trailing_newline_is_tolerated() {
        let signer = signer();
        let signature = signer.sign("cGF5bG9hZA==\n");
        assert!(signer.verify(&signature, "cGF5bG9hZA==").is_ok());
    }

    #[test]
    fn test_matching_pair_is_selected() {
        let signer = signer();
        let signature = format!("other_key|{}&{}", "0".repeat(40), signer.sign("cGF5bG9hZA=="));
        assert!(signer.verify(&signature, "cGF5bG9hZA==").is_ok());
    }

    #[test]
    fn test_wrong_key() {
        let other = WebhookSignature::new("public_key", "another_private_key");
        let signature = other.sign("cGF5bG9hZA==");

        let err = signer().verify(&signature, "cGF5bG9hZA==").unwrap_err();
        assert!(matches!(err, WebhookError::SignatureInvalid(_)));
    }

    #[test]
    fn test_unknown_public_key() {
        let other = WebhookSignature::new("someone_else", "private_key");
        let signature = other.sign("cGF5bG9hZA==");

        let err = signer().verify(&signature, "cGF5bG9hZA==").unwrap_err();
        assert_eq!(err.to_string(), "Signature verification failed: no matching public key");
    }

    #[test]
    fn test_illegal_payload_characters() {
        let signer = signer();
        let payload = "cGF5bG9hZA==<script>";
        let err = signer.verify(&signer.sign(payload), payload).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Signature verification failed: payload contains illegal characters"
        );
    }

    #[test]
    fn test_challenge() {
        let signer = signer();
        let response = signer.verify_challenge("20f9f8ed05f77439fe955c977e4c8a53").unwrap();
        assert!(response.starts_with("public_key|"));
        assert!(signer.verify_challenge("not-hex").is_err());
    }

    #[test]
    fn test_from_credentials() {
        let credentials = Credentials::api_keys("merchant", "pk", "sk");
        assert_eq!(WebhookSignature::from_credentials(&credentials).unwrap().public_key(), "pk");

        let delegated = Credentials::access_token("merchant", "access$token");
        assert!(matches!(
            WebhookSignature::from_credentials(&delegated),
            Err(WebhookError::ConfigError(_))
        ));
    }
}
