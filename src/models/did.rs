// src/models/did.rs
//! TLS-DID identifiers and the resolved DID Document.
//!
//! A TLS-DID binds an identity to a domain: `did:tls:<domain>`. The document
//! body is whatever attributes the domain's claimant wrote to the registry.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// DID method prefix for TLS-backed identifiers.
pub const DID_TLS_PREFIX: &str = "did:tls:";

/// JSON-LD context every resolved document carries.
pub const DID_CONTEXT: &str = "https://www.w3.org/ns/did/v1";

/// Builds the DID for a domain.
pub fn did_for_domain(domain: &str) -> String {
    format!("{}{}", DID_TLS_PREFIX, domain)
}

/// Extracts the domain from a `did:tls:<domain>` string.
pub fn domain_of(did: &str) -> Option<&str> {
    did.strip_prefix(DID_TLS_PREFIX)
        .filter(|domain| !domain.is_empty())
}

/// A resolved DID Document.
///
/// `id` and `@context` are fixed by the resolver; every other top-level key
/// comes from the attributes written on-chain.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DIDDocument {
    #[serde(rename = "@context")]
    pub context: String,

    /// The complete DID string identifier
    /// Example: "did:tls:tls-did.de"
    pub id: String,

    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl DIDDocument {
    pub fn new(domain: &str, attributes: Map<String, Value>) -> Self {
        Self {
            context: DID_CONTEXT.to_string(),
            id: did_for_domain(domain),
            attributes,
        }
    }
}
