// src/wallet/signing.rs
//! Signing of published TLS-DID state with the domain's TLS private key.
//!
//! Uses RSA PKCS#1 v1.5 with SHA-256 (via `ring`), matching what a TLS
//! server key for the domain can produce.

use crate::utils::certificate::{parse_certificate, subject_public_key};
use async_trait::async_trait;
use ring::rand::SystemRandom;
use ring::signature::{RsaKeyPair, UnparsedPublicKey, RSA_PKCS1_2048_8192_SHA256, RSA_PKCS1_SHA256};
use serde_json::{json, Map, Value};
use thiserror::Error;

const PKCS8_TAG: &str = "PRIVATE KEY";
const PKCS1_TAG: &str = "RSA PRIVATE KEY";

#[derive(Error, Debug)]
pub enum SigningError {
    #[error("private key is not valid PEM: {0}")]
    Pem(#[from] pem::PemError),

    #[error("unsupported private key block `{0}`")]
    UnsupportedKey(String),

    #[error("private key rejected: {0}")]
    KeyRejected(String),

    #[error("payload could not be serialized: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("signature computation failed")]
    Unspecified,
}

/// Raw signature bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature(pub Vec<u8>);

impl Signature {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// The state a TLS-DID signature covers: domain, expiry (unix seconds),
/// submitted certificates and document attributes.
pub fn signing_payload(
    domain: &str,
    expiry: Option<i64>,
    chain: &[String],
    attributes: &Map<String, Value>,
) -> Value {
    json!({
        "domain": domain,
        "expiry": expiry,
        "chain": chain,
        "attributes": attributes,
    })
}

/// Checks a signature over `payload` against the leaf certificate's key.
pub fn verify_signature(payload: &Value, signature: &[u8], leaf_pem: &str) -> Result<(), String> {
    let leaf = parse_certificate(leaf_pem)?;
    let public_key = subject_public_key(leaf.contents())
        .ok_or_else(|| "leaf certificate has no readable public key".to_string())?;
    let message = serde_json::to_vec(payload).map_err(|e| e.to_string())?;

    UnparsedPublicKey::new(&RSA_PKCS1_2048_8192_SHA256, public_key)
        .verify(&message, signature)
        .map_err(|_| "signature does not match the leaf certificate".to_string())
}

/// Produces signatures over a TLS-DID's published state.
#[async_trait]
pub trait SigningService: Send + Sync {
    async fn sign(&self, payload: &Value, private_key_pem: &str) -> Result<Signature, SigningError>;
}

/// `SigningService` backed by `ring`'s RSA implementation.
pub struct RingSigner {
    rng: SystemRandom,
}

impl Default for RingSigner {
    fn default() -> Self {
        Self::new()
    }
}

impl RingSigner {
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }

    /// Decodes a PKCS#8 or PKCS#1 PEM key.
    pub fn load_key(private_key_pem: &str) -> Result<RsaKeyPair, SigningError> {
        let block = pem::parse(private_key_pem)?;
        let parsed = match block.tag() {
            PKCS8_TAG => RsaKeyPair::from_pkcs8(block.contents()),
            PKCS1_TAG => RsaKeyPair::from_der(block.contents()),
            other => return Err(SigningError::UnsupportedKey(other.to_string())),
        };
        parsed.map_err(|e| SigningError::KeyRejected(e.to_string()))
    }

    /// Signs raw bytes. Synchronous; the async trait method wraps it.
    pub fn sign_bytes(&self, message: &[u8], private_key_pem: &str) -> Result<Signature, SigningError> {
        let key_pair = Self::load_key(private_key_pem)?;
        let mut signature = vec![0u8; key_pair.public_modulus_len()];
        key_pair
            .sign(&RSA_PKCS1_SHA256, &self.rng, message, &mut signature)
            .map_err(|_| SigningError::Unspecified)?;
        Ok(Signature(signature))
    }
}

#[async_trait]
impl SigningService for RingSigner {
    async fn sign(&self, payload: &Value, private_key_pem: &str) -> Result<Signature, SigningError> {
        // Same serialization as `verify_signature`.
        let message = serde_json::to_vec(payload)?;
        self.sign_bytes(&message, private_key_pem)
    }
}
