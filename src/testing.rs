// src/testing.rs
//! In-memory collaborators and fixtures for unit tests.

use crate::config::Settings;
use crate::contracts::tls_did_registry::{
    OnChainClaim, RegistryClient, RegistryError, RegistryReader, TxResult,
};
use crate::document::{DocumentDraft, PatchOperation};
use crate::models::did::DIDDocument;
use crate::models::identity::KeyRef;
use crate::services::lifecycle::Collaborators;
use crate::services::resolver::{DidResolver, RegistryResolver, ResolverError};
use crate::wallet::key_material::StaticKeyMaterial;
use crate::wallet::signing::{signing_payload, RingSigner, SigningService};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const LEAF: &str = include_str!("../testdata/leaf.pem");
pub const INTERMEDIATE: &str = include_str!("../testdata/intermediate.pem");
pub const ROOT: &str = include_str!("../testdata/root.pem");
pub const KEY: &str = include_str!("../testdata/leaf-key.pem");

pub const REGISTRY_ADDRESS: &str = "0xe28131a74c9Fb412f0e57AD4614dB1A8D6a01793";

pub fn settings() -> Settings {
    Settings::new(REGISTRY_ADDRESS, "http://localhost:8545")
}

pub fn key_material() -> StaticKeyMaterial {
    StaticKeyMaterial {
        cert_chain: vec![LEAF.to_string(), INTERMEDIATE.to_string()],
        private_key: KEY.to_string(),
    }
}

/// Collaborators backed by `registry`, with a real signer and resolver.
pub fn collaborators(registry: &Arc<InMemoryRegistry>) -> Collaborators {
    Collaborators {
        registry: registry.clone(),
        signer: Arc::new(RingSigner::new()),
        resolver: Arc::new(RegistryResolver::new(registry.clone())),
    }
}

#[derive(Default)]
struct State {
    /// Claims per domain in registration order
    claims: HashMap<String, Vec<(KeyRef, OnChainClaim)>>,
    calls: Vec<&'static str>,
    rejected: HashSet<&'static str>,
    /// Fail `register` once this many registrations have succeeded
    register_limit: Option<usize>,
    registrations: usize,
}

/// Registry keeping claims in memory. Each call is logged by method name.
#[derive(Default)]
pub struct InMemoryRegistry {
    state: Mutex<State>,
}

impl InMemoryRegistry {
    /// Makes every later call of `method` fail with `Rejected`.
    pub fn reject(&self, method: &'static str) {
        self.state.lock().unwrap().rejected.insert(method);
    }

    /// Lets `count` more registrations succeed, then rejects the rest.
    pub fn limit_registrations(&self, count: usize) {
        let mut state = self.state.lock().unwrap();
        state.register_limit = Some(state.registrations + count);
    }

    pub fn insert_claim(&self, domain: &str, key: &str, claim: OnChainClaim) {
        self.state
            .lock()
            .unwrap()
            .claims
            .entry(domain.to_string())
            .or_default()
            .push((KeyRef::from(key), claim));
    }

    pub fn claims_of(&self, domain: &str) -> Vec<OnChainClaim> {
        self.state
            .lock()
            .unwrap()
            .claims
            .get(domain)
            .map(|claims| claims.iter().map(|(_, claim)| claim.clone()).collect())
            .unwrap_or_default()
    }

    pub fn claim_count(&self, domain: &str) -> usize {
        self.claims_of(domain).len()
    }

    pub fn calls(&self, method: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|call| **call == method)
            .count()
    }

    fn update(
        &self,
        method: &'static str,
        domain: &str,
        key: &KeyRef,
        change: impl FnOnce(&mut OnChainClaim),
    ) -> Result<TxResult, RegistryError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(method);
        if state.rejected.contains(method) {
            return Err(RegistryError::Rejected(format!("{} refused", method)));
        }
        let claim = state
            .claims
            .get_mut(domain)
            .and_then(|claims| claims.iter_mut().find(|(owner, _)| owner == key))
            .map(|(_, claim)| claim)
            .ok_or_else(|| RegistryError::Rejected(format!("{} has no claim for {:?}", domain, key)))?;
        change(claim);
        Ok(TxResult::default())
    }
}

#[async_trait]
impl RegistryClient for InMemoryRegistry {
    async fn register(&self, domain: &str, key: &KeyRef) -> Result<TxResult, RegistryError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("register");
        let limited = state
            .register_limit
            .map_or(false, |limit| state.registrations >= limit);
        if state.rejected.contains("register") || limited {
            return Err(RegistryError::Rejected("register refused".into()));
        }

        let claims = state.claims.entry(domain.to_string()).or_default();
        if claims.iter().any(|(owner, _)| owner == key) {
            return Err(RegistryError::AlreadyClaimed {
                domain: domain.to_string(),
                reason: "key already holds a claim".into(),
            });
        }
        claims.push((key.clone(), OnChainClaim::default()));
        state.registrations += 1;
        Ok(TxResult::default())
    }

    async fn publish_chain(
        &self,
        domain: &str,
        key: &KeyRef,
        certs: &[String],
    ) -> Result<TxResult, RegistryError> {
        self.update("publish_chain", domain, key, |claim| {
            claim.cert_chain = certs.to_vec()
        })
    }

    async fn write_attribute(
        &self,
        domain: &str,
        key: &KeyRef,
        path: &str,
        value: &str,
    ) -> Result<TxResult, RegistryError> {
        self.update("write_attribute", domain, key, |claim| {
            claim.attributes.push((path.to_string(), value.to_string()))
        })
    }

    async fn set_expiry(
        &self,
        domain: &str,
        key: &KeyRef,
        expiry: DateTime<Utc>,
    ) -> Result<TxResult, RegistryError> {
        self.update("set_expiry", domain, key, |claim| {
            claim.expiry = Some(expiry.timestamp())
        })
    }

    async fn submit_signature(
        &self,
        domain: &str,
        key: &KeyRef,
        signature: &[u8],
    ) -> Result<TxResult, RegistryError> {
        self.update("submit_signature", domain, key, |claim| {
            claim.signature = Some(signature.to_vec())
        })
    }

    async fn delete(&self, domain: &str, key: &KeyRef) -> Result<TxResult, RegistryError> {
        self.update("delete", domain, key, |_| ())?;
        let mut state = self.state.lock().unwrap();
        if let Some(claims) = state.claims.get_mut(domain) {
            claims.retain(|(owner, _)| owner != key);
            if claims.is_empty() {
                state.claims.remove(domain);
            }
        }
        Ok(TxResult::default())
    }
}

#[async_trait]
impl RegistryReader for InMemoryRegistry {
    async fn claims(&self, domain: &str) -> Result<Vec<OnChainClaim>, RegistryError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("claims");
        if state.rejected.contains("claims") {
            return Err(RegistryError::Transport("node unreachable".into()));
        }
        Ok(state
            .claims
            .get(domain)
            .map(|claims| claims.iter().map(|(_, claim)| claim.clone()).collect())
            .unwrap_or_default())
    }
}

/// A claim with the test chain, `attributes`, a one-year expiry and a valid
/// signature by the leaf key.
pub async fn signed_claim(domain: &str, attributes: &[(&str, &str)]) -> OnChainClaim {
    let chain = vec![LEAF.to_string(), INTERMEDIATE.to_string()];
    let expiry = (Utc::now() + Duration::days(365)).timestamp();

    let mut draft = DocumentDraft::new();
    for (path, value) in attributes {
        draft.apply(&PatchOperation::new(path, *value).unwrap()).unwrap();
    }

    let payload = signing_payload(domain, Some(expiry), &chain, draft.as_map());
    let signature = RingSigner::new().sign(&payload, KEY).await.unwrap();

    OnChainClaim {
        cert_chain: chain,
        attributes: attributes
            .iter()
            .map(|(path, value)| (path.to_string(), value.to_string()))
            .collect(),
        expiry: Some(expiry),
        signature: Some(signature.0),
    }
}

/// Resolver wrapper failing on chosen call numbers (0-based).
pub struct FlakyResolver {
    inner: Arc<dyn DidResolver>,
    failing_calls: HashSet<usize>,
    calls: AtomicUsize,
}

impl FlakyResolver {
    pub fn new(inner: Arc<dyn DidResolver>, failing_calls: &[usize]) -> Self {
        Self {
            inner,
            failing_calls: failing_calls.iter().copied().collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl DidResolver for FlakyResolver {
    async fn resolve(&self, did: &str) -> Result<DIDDocument, ResolverError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_calls.contains(&call) {
            return Err(ResolverError::Registry(RegistryError::Transport(
                "connection reset".into(),
            )));
        }
        self.inner.resolve(did).await
    }
}
