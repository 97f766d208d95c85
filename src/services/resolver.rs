// src/services/resolver.rs
//! `did:tls` resolution.
//!
//! [`RegistryResolver`] reads every claim for the domain and returns the
//! document of the first one that is signed, unexpired and whose signature
//! matches its leaf certificate. Validating that leaf against trusted roots
//! is out of scope here.

use crate::contracts::tls_did_registry::{OnChainClaim, RegistryError, RegistryReader};
use crate::document::{DocumentDraft, PatchOperation};
use crate::models::did::{domain_of, DIDDocument};
use crate::wallet::signing::{signing_payload, verify_signature};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolverError {
    #[error("`{0}` is not a did:tls identifier")]
    InvalidDid(String),

    #[error("no claim is registered for `{0}`")]
    UnknownDomain(String),

    #[error("no valid claim for `{domain}`: {reasons}")]
    NoValidClaim { domain: String, reasons: String },

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// Resolves a DID string to its document.
#[async_trait]
pub trait DidResolver: Send + Sync {
    async fn resolve(&self, did: &str) -> Result<DIDDocument, ResolverError>;
}

/// Resolver reading claims straight from the registry.
#[derive(Clone)]
pub struct RegistryResolver {
    registry: Arc<dyn RegistryReader>,
}

impl RegistryResolver {
    pub fn new(registry: Arc<dyn RegistryReader>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl DidResolver for RegistryResolver {
    async fn resolve(&self, did: &str) -> Result<DIDDocument, ResolverError> {
        let domain = domain_of(did).ok_or_else(|| ResolverError::InvalidDid(did.to_string()))?;

        let claims = self.registry.claims(domain).await?;
        if claims.is_empty() {
            return Err(ResolverError::UnknownDomain(domain.to_string()));
        }

        let mut reasons = Vec::new();
        for (i, claim) in claims.iter().enumerate() {
            match document_from_claim(domain, claim) {
                Ok(document) => {
                    log::debug!("{} resolved from claim {} of {}", did, i, claims.len());
                    return Ok(document);
                }
                Err(reason) => reasons.push(format!("claim {}: {}", i, reason)),
            }
        }

        Err(ResolverError::NoValidClaim {
            domain: domain.to_string(),
            reasons: reasons.join("; "),
        })
    }
}

fn document_from_claim(domain: &str, claim: &OnChainClaim) -> Result<DIDDocument, String> {
    let signature = claim.signature.as_deref().ok_or("not signed")?;

    if let Some(expiry) = claim.expiry {
        if expiry <= Utc::now().timestamp() {
            return Err(format!("expired at unix time {}", expiry));
        }
    }

    let leaf = claim.cert_chain.first().ok_or("no certificate chain")?;

    let mut draft = DocumentDraft::new();
    for (path, value) in &claim.attributes {
        let operation = PatchOperation::new(path, value.as_str()).map_err(|e| e.to_string())?;
        draft.apply(&operation).map_err(|e| e.to_string())?;
    }

    let payload = signing_payload(domain, claim.expiry, &claim.cert_chain, draft.as_map());
    verify_signature(&payload, signature, leaf)?;

    Ok(DIDDocument::new(domain, draft.into_map()))
}
