// src/services/tls_did.rs
//! Caller-facing TLS-DID operations.

use crate::config::Settings;
use crate::contracts::tls_did_registry::EthRegistry;
use crate::error::{Result, TlsDidError};
use crate::models::did::{did_for_domain, DIDDocument};
use crate::models::identity::KeyRef;
use crate::services::benchmark::{BenchmarkRunner, ResolutionSample};
use crate::services::lifecycle::{Collaborators, IdentityLifecycle};
use crate::services::resolver::RegistryResolver;
use crate::wallet::key_material::{FileKeyMaterial, KeyMaterialSource};
use crate::wallet::signing::RingSigner;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;

/// Entry point for creating, resolving and deleting TLS-DIDs.
#[derive(Clone)]
pub struct TlsDidService {
    settings: Settings,
    collaborators: Collaborators,
    /// TLS chain and private key used for publishing and signing
    key_material: Arc<dyn KeyMaterialSource>,
}

impl TlsDidService {
    pub fn new(
        settings: Settings,
        collaborators: Collaborators,
        key_material: Arc<dyn KeyMaterialSource>,
    ) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            collaborators,
            key_material,
        })
    }

    /// Wires the on-chain registry, `ring` signer and file key material
    /// described by `settings`.
    pub async fn connect(settings: Settings) -> Result<Self> {
        let registry = Arc::new(EthRegistry::connect(&settings).await?);
        log::info!("Using TLS-DID registry at {:?}", registry.address());

        let collaborators = Collaborators {
            registry: registry.clone(),
            signer: Arc::new(RingSigner::new()),
            resolver: Arc::new(RegistryResolver::new(registry)),
        };
        let key_material = Arc::new(FileKeyMaterial::from_settings(&settings.ssl));
        Self::new(settings, collaborators, key_material)
    }

    pub fn key_material(&self) -> &dyn KeyMaterialSource {
        self.key_material.as_ref()
    }

    /// Registers `domain` for `key_ref`, publishes `cert_chain`, writes
    /// `attributes` in order, sets `expiry` and, when `sign` is set, signs
    /// with the TLS key from the service's key material.
    ///
    /// If a step after registration fails, the partial claim is removed
    /// (best effort) and the step's error is returned.
    pub async fn create_and_publish_identity(
        &self,
        domain: &str,
        key_ref: KeyRef,
        cert_chain: &[String],
        attributes: &[(String, String)],
        expiry: DateTime<Utc>,
        sign: bool,
    ) -> Result<IdentityLifecycle> {
        let mut identity =
            IdentityLifecycle::create(domain, key_ref, &self.settings, self.collaborators.clone())?;

        log::info!("Register claim for {}", domain);
        identity.register().await?;

        if let Err(err) = self
            .publish(&mut identity, cert_chain, attributes, expiry, sign)
            .await
        {
            log::warn!("Publishing {} failed, removing claim: {}", domain, err);
            if let Err(cleanup) = identity.delete().await {
                log::error!("Could not remove partial claim for {}: {}", domain, cleanup);
            }
            return Err(err);
        }

        Ok(identity)
    }

    async fn publish(
        &self,
        identity: &mut IdentityLifecycle,
        cert_chain: &[String],
        attributes: &[(String, String)],
        expiry: DateTime<Utc>,
        sign: bool,
    ) -> Result<()> {
        identity.publish_chain(cert_chain).await?;

        log::info!("Adding {} attributes to DID Document", attributes.len());
        for (path, value) in attributes {
            identity.add_attribute(path, value).await?;
        }

        identity.set_expiry(expiry).await?;

        if sign {
            let private_key = self.key_material.private_key()?;
            identity.sign(&private_key).await?;
        }
        Ok(())
    }

    /// Resolves `did:tls:<domain>`.
    pub async fn resolve_identity(&self, domain: &str) -> Result<DIDDocument> {
        if domain.trim().is_empty() {
            return Err(TlsDidError::Resolution("domain is empty".into()));
        }
        let did = did_for_domain(domain);
        log::debug!("Resolving {}", did);

        self.collaborators
            .resolver
            .resolve(&did)
            .await
            .map_err(|e| TlsDidError::Resolution(e.to_string()))
    }

    pub async fn delete_identity(&self, identity: &mut IdentityLifecycle) -> Result<()> {
        identity.delete().await
    }

    /// Measures resolution of `domain` while one unsigned competing claim is
    /// added per extra key. See [`BenchmarkRunner::run`].
    pub async fn run_benchmark(
        &self,
        domain: &str,
        key_refs: &[KeyRef],
    ) -> Result<Vec<ResolutionSample>> {
        BenchmarkRunner::new(self).run(domain, key_refs).await
    }
}

/// Attributes written by the demo flow and the benchmark.
pub fn example_attributes(domain: &str) -> Vec<(String, String)> {
    let did = did_for_domain(domain);
    [
        ("parent/child", "value".to_string()),
        ("arrayA[0]/element", "value".to_string()),
        ("arrayB[0]", "value".to_string()),
        ("assertionMethod[0]/id", format!("{}#keys-2", did)),
        ("assertionMethod[0]/type", "Ed25519VerificationKey2018".to_string()),
        ("assertionMethod[0]/controller", did.clone()),
        (
            "assertionMethod[0]/publicKeyBase58",
            "H3C2AVvLMv6gmMNam3uVAjZpfkcJCwDwnZn6z3wXmqPV".to_string(),
        ),
    ]
    .into_iter()
    .map(|(path, value)| (path.to_string(), value))
    .collect()
}

/// Expiry used by the demo flow: 2040-12-12, midnight UTC.
pub fn demo_expiry() -> Result<DateTime<Utc>> {
    Utc.with_ymd_and_hms(2040, 12, 12, 0, 0, 0)
        .single()
        .ok_or_else(|| TlsDidError::Expiry("2040-12-12 is not a valid UTC time".into()))
}
