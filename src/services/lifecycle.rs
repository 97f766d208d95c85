// src/services/lifecycle.rs
//! Lifecycle of one TLS-DID claim.
//!
//! ```text
//! created -> registered -> chainPublished -> attributed* -> expirySet -> signed -> deleted
//! ```
//! Steps only move forward; `attributed` may repeat. Steps may be skipped
//! (an identity left unsigned is still resolvable, just invalid), and
//! `delete` is accepted from any live state. Each step awaits its registry
//! transaction before returning, so later steps always see the on-chain
//! state of earlier ones.

use crate::config::Settings;
use crate::contracts::tls_did_registry::{RegistryClient, RegistryError};
use crate::document::{DocumentDraft, PatchOperation};
use crate::error::{Result, TlsDidError};
use crate::models::did::DIDDocument;
use crate::models::identity::{IdentityRecord, KeyRef, LifecycleState, RegistrationStatus};
use crate::services::resolver::DidResolver;
use crate::utils::certificate::{abbreviate, is_self_issued, parse_certificate};
use crate::wallet::signing::{signing_payload, SigningService};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

/// External services a lifecycle talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub registry: Arc<dyn RegistryClient>,
    pub signer: Arc<dyn SigningService>,
    pub resolver: Arc<dyn DidResolver>,
}

/// A lifecycle shared between tasks; the mutex keeps its steps sequential.
pub type SharedIdentity = Arc<Mutex<IdentityLifecycle>>;

/// Drives one [`IdentityRecord`] through registration, publication and
/// deletion.
///
/// Every step takes `&mut self`, so no two steps on the same record can be in
/// flight at once.
pub struct IdentityLifecycle {
    record: IdentityRecord,
    state: LifecycleState,
    /// Attributes accepted by the registry so far; dropped after signing
    draft: Option<DocumentDraft>,
    collaborators: Collaborators,
}

impl fmt::Debug for IdentityLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityLifecycle")
            .field("record", &self.record)
            .field("state", &self.state)
            .field("draft", &self.draft)
            .finish_non_exhaustive()
    }
}

impl IdentityLifecycle {
    /// Creates an unregistered identity for `domain` claimed by `key_ref`.
    ///
    /// # Errors
    /// `Config` if the domain is empty or the registry address / RPC url in
    /// `settings` is missing or malformed.
    pub fn create(
        domain: &str,
        key_ref: KeyRef,
        settings: &Settings,
        collaborators: Collaborators,
    ) -> Result<Self> {
        settings.validate()?;
        if domain.trim().is_empty() {
            return Err(TlsDidError::Config("domain is empty".into()));
        }

        Ok(Self {
            record: IdentityRecord::new(domain, key_ref),
            state: LifecycleState::Created,
            draft: Some(DocumentDraft::new()),
            collaborators,
        })
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn record(&self) -> &IdentityRecord {
        &self.record
    }

    pub fn draft(&self) -> Option<&DocumentDraft> {
        self.draft.as_ref()
    }

    pub fn into_shared(self) -> SharedIdentity {
        Arc::new(Mutex::new(self))
    }

    fn ensure_live(&self) -> Result<()> {
        if self.state == LifecycleState::Deleted {
            return Err(TlsDidError::Lifecycle("already deleted".into()));
        }
        Ok(())
    }

    fn ensure_can_enter(&self, target: LifecycleState) -> Result<()> {
        self.ensure_live()?;
        let repeat = target == LifecycleState::Attributed && self.state == LifecycleState::Attributed;
        if target <= self.state && !repeat {
            return Err(TlsDidError::Lifecycle(format!(
                "cannot move from {} to {}",
                self.state, target
            )));
        }
        if target > LifecycleState::Registered && !self.record.is_registered() {
            return Err(TlsDidError::Lifecycle(format!(
                "{} requires a registered identity",
                target
            )));
        }
        Ok(())
    }

    /// Claims the domain for this identity's key.
    pub async fn register(&mut self) -> Result<()> {
        self.ensure_can_enter(LifecycleState::Registered)?;
        log::info!("Registering claim for {}", self.record.domain);

        self.collaborators
            .registry
            .register(&self.record.domain, &self.record.key_ref)
            .await
            .map_err(|e| TlsDidError::Registration(e.to_string()))?;

        self.record.status = RegistrationStatus::Registered;
        self.state = LifecycleState::Registered;
        Ok(())
    }

    /// Publishes the certificate chain (leaf first). A trailing self-issued
    /// root is left out; it is the resolver's trust anchor.
    pub async fn publish_chain(&mut self, chain: &[String]) -> Result<()> {
        self.ensure_can_enter(LifecycleState::ChainPublished)?;
        if chain.is_empty() {
            return Err(TlsDidError::Chain("certificate chain is empty".into()));
        }

        let mut ders = Vec::with_capacity(chain.len());
        for (i, pem) in chain.iter().enumerate() {
            let block = parse_certificate(pem)
                .map_err(|e| TlsDidError::Chain(format!("certificate {}: {}", i, e)))?;
            ders.push(block.into_contents());
        }

        let ends_in_root = chain.len() > 1
            && ders.last().and_then(|der| is_self_issued(der)) == Some(true);
        let submitted = if ends_in_root {
            &chain[..chain.len() - 1]
        } else {
            chain
        };

        log::info!(
            "Adding cert chain: {:?}",
            submitted.iter().map(|pem| abbreviate(pem)).collect::<Vec<_>>()
        );
        self.collaborators
            .registry
            .publish_chain(&self.record.domain, &self.record.key_ref, submitted)
            .await
            .map_err(|e| TlsDidError::Chain(e.to_string()))?;

        self.record.cert_chain = submitted.to_vec();
        self.state = LifecycleState::ChainPublished;
        Ok(())
    }

    /// Writes one document attribute, e.g. `assertionMethod[0]/id`.
    ///
    /// The path and the resulting document shape are checked locally before
    /// anything is sent to the registry.
    pub async fn add_attribute(&mut self, path: &str, value: &str) -> Result<()> {
        self.ensure_can_enter(LifecycleState::Attributed)?;

        let operation = PatchOperation::new(path, value)?;
        let mut draft = self.draft.clone().unwrap_or_default();
        draft.apply(&operation)?;

        log::debug!("Adding attribute {} = {}", operation.path, operation.value);
        self.collaborators
            .registry
            .write_attribute(
                &self.record.domain,
                &self.record.key_ref,
                &operation.path.to_string(),
                &operation.value,
            )
            .await
            .map_err(submission_error)?;

        self.draft = Some(draft);
        self.state = LifecycleState::Attributed;
        Ok(())
    }

    /// Sets when the claim stops being valid. Must be in the future.
    pub async fn set_expiry(&mut self, expiry: DateTime<Utc>) -> Result<()> {
        self.ensure_can_enter(LifecycleState::ExpirySet)?;

        let now = Utc::now();
        if expiry <= now {
            return Err(TlsDidError::Expiry(format!(
                "{} is not after {}",
                expiry.to_rfc3339(),
                now.to_rfc3339()
            )));
        }

        log::info!("Setting expiry {}", expiry.to_rfc3339());
        self.collaborators
            .registry
            .set_expiry(&self.record.domain, &self.record.key_ref, expiry)
            .await
            .map_err(submission_error)?;

        self.record.expiry = Some(expiry);
        self.state = LifecycleState::ExpirySet;
        Ok(())
    }

    /// Signs everything published so far with the TLS key and submits the
    /// signature. The draft is discarded afterwards.
    pub async fn sign(&mut self, private_key_pem: &str) -> Result<()> {
        self.ensure_can_enter(LifecycleState::Signed)?;

        let payload = self.signing_payload();
        let signature = self
            .collaborators
            .signer
            .sign(&payload, private_key_pem)
            .await
            .map_err(|e| TlsDidError::Signing(e.to_string()))?;

        log::info!("Signing written data for {}", self.record.domain);
        self.collaborators
            .registry
            .submit_signature(&self.record.domain, &self.record.key_ref, signature.as_bytes())
            .await
            .map_err(submission_error)?;

        self.record.signed = true;
        self.draft = None;
        self.state = LifecycleState::Signed;
        Ok(())
    }

    /// The state a signature covers, as the resolver will rebuild it.
    pub fn signing_payload(&self) -> serde_json::Value {
        let empty = DocumentDraft::new();
        let attributes = self.draft.as_ref().unwrap_or(&empty);
        signing_payload(
            &self.record.domain,
            self.record.expiry.map(|expiry| expiry.timestamp()),
            &self.record.cert_chain,
            attributes.as_map(),
        )
    }

    /// Resolves this identity's DID. Does not change the lifecycle state.
    pub async fn resolve(&self) -> Result<DIDDocument> {
        self.ensure_live()?;
        let did = self.record.did();
        log::info!("Resolving DID Document for did: {}", did);

        self.collaborators
            .resolver
            .resolve(&did)
            .await
            .map_err(|e| TlsDidError::Resolution(e.to_string()))
    }

    /// Removes the claim from the registry and marks the record deleted.
    ///
    /// A claim that was never registered is only marked. If the registry
    /// refuses, the identity stays live so the delete can be retried.
    pub async fn delete(&mut self) -> Result<()> {
        self.ensure_live()?;

        if self.record.is_registered() {
            log::info!("Deleting TLS-DID claim for {}", self.record.domain);
            self.collaborators
                .registry
                .delete(&self.record.domain, &self.record.key_ref)
                .await
                .map_err(submission_error)?;
        }

        self.record.status = RegistrationStatus::Deleted;
        self.draft = None;
        self.state = LifecycleState::Deleted;
        Ok(())
    }
}

fn submission_error(err: RegistryError) -> TlsDidError {
    TlsDidError::Submission(err.to_string())
}
