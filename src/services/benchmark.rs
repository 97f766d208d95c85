// src/services/benchmark.rs
//! Resolution latency under a growing number of competing claims.
//!
//! One signed identity is created first. Each iteration times a single
//! resolution of the domain and then adds one unsigned claim from the next
//! key, so iteration `i` resolves against `i + 1` claims. Timing is plain
//! wall-clock per iteration.

use crate::error::{Result, TlsDidError};
use crate::models::identity::KeyRef;
use crate::services::lifecycle::IdentityLifecycle;
use crate::services::tls_did::{demo_expiry, example_attributes, TlsDidService};
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};

/// Duration of one resolution and whether it produced a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionSample {
    pub elapsed: Duration,
    pub succeeded: bool,
}

impl ResolutionSample {
    pub fn millis(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }
}

pub struct BenchmarkRunner<'a> {
    service: &'a TlsDidService,
    expiry: Option<DateTime<Utc>>,
}

impl<'a> BenchmarkRunner<'a> {
    pub fn new(service: &'a TlsDidService) -> Self {
        Self {
            service,
            expiry: None,
        }
    }

    /// Expiry for every created identity; defaults to the demo expiry.
    pub fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// Runs `key_refs.len()` resolutions and returns one sample each, in
    /// order. Every created identity is deleted afterwards; deletion failures
    /// are logged and skipped.
    ///
    /// # Errors
    /// `Config` when `key_refs` is empty. A failure creating an identity stops
    /// the run; identities created so far are deleted before it is returned.
    pub async fn run(&self, domain: &str, key_refs: &[KeyRef]) -> Result<Vec<ResolutionSample>> {
        let (first, _) = key_refs
            .split_first()
            .ok_or_else(|| TlsDidError::Config("benchmark needs at least one key".into()))?;

        let chain = self.service.key_material().cert_chain()?;
        let attributes = example_attributes(domain);
        let expiry = match self.expiry {
            Some(expiry) => expiry,
            None => demo_expiry()?,
        };

        log::info!("Running benchmark for {} with {} keys", domain, key_refs.len());
        let mut identities = Vec::with_capacity(key_refs.len());
        let mut samples = Vec::with_capacity(key_refs.len());

        let signed = self
            .service
            .create_and_publish_identity(domain, first.clone(), &chain, &attributes, expiry, true)
            .await?;
        identities.push(signed);

        for i in 0..key_refs.len() {
            samples.push(self.time_resolution(domain).await);

            if let Some(next) = key_refs.get(i + 1) {
                let created = self
                    .service
                    .create_and_publish_identity(domain, next.clone(), &chain, &attributes, expiry, false)
                    .await;
                match created {
                    Ok(identity) => identities.push(identity),
                    Err(err) => {
                        log::error!("Creating competing identity {} failed: {}", i + 1, err);
                        self.cleanup(&mut identities).await;
                        return Err(err);
                    }
                }
            }
        }

        log::info!(
            "Resolution times (ms): {:?}",
            samples.iter().map(ResolutionSample::millis).collect::<Vec<_>>()
        );
        self.cleanup(&mut identities).await;
        Ok(samples)
    }

    async fn time_resolution(&self, domain: &str) -> ResolutionSample {
        let start = Instant::now();
        let result = self.service.resolve_identity(domain).await;
        let elapsed = start.elapsed();

        match &result {
            Ok(document) => log::debug!("DID Document: {:?}", document),
            Err(err) => log::error!("Error while resolving did: {}", err),
        }
        log::info!("Resolving DID took {} milliseconds", elapsed.as_secs_f64() * 1000.0);

        ResolutionSample {
            elapsed,
            succeeded: result.is_ok(),
        }
    }

    async fn cleanup(&self, identities: &mut [IdentityLifecycle]) {
        log::info!("Deleting {} TLS-DIDs", identities.len());
        for identity in identities.iter_mut() {
            if let Err(err) = self.service.delete_identity(identity).await {
                log::warn!(
                    "Deleting claim of {:?} failed: {}",
                    identity.record().key_ref,
                    err
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::lifecycle::Collaborators;
    use crate::services::resolver::RegistryResolver;
    use crate::testing::{collaborators, key_material, settings, FlakyResolver, InMemoryRegistry};
    use std::sync::Arc;

    const DOMAIN: &str = "tls-did.de";

    fn keys(n: usize) -> Vec<KeyRef> {
        (1..=n).map(|i| KeyRef::new(format!("0x{:02x}", i))).collect()
    }

    fn service_with(collaborators: Collaborators) -> TlsDidService {
        TlsDidService::new(settings(), collaborators, Arc::new(key_material())).unwrap()
    }

    #[tokio::test]
    async fn resolves_once_per_key_and_cleans_up() {
        let registry = Arc::new(InMemoryRegistry::default());
        let service = service_with(collaborators(&registry));

        let samples = service.run_benchmark(DOMAIN, &keys(4)).await.unwrap();

        assert_eq!(samples.len(), 4);
        assert!(samples.iter().all(|sample| sample.succeeded));
        assert_eq!(registry.calls("claims"), 4);
        assert_eq!(registry.calls("register"), 4);
        assert_eq!(registry.calls("submit_signature"), 1);
        assert_eq!(registry.calls("delete"), 4);
        assert_eq!(registry.claim_count(DOMAIN), 0);
    }

    #[tokio::test]
    async fn single_key_runs_one_resolution() {
        let registry = Arc::new(InMemoryRegistry::default());
        let service = service_with(collaborators(&registry));

        let samples = service.run_benchmark(DOMAIN, &keys(1)).await.unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(registry.calls("register"), 1);
        assert_eq!(registry.calls("delete"), 1);
    }

    #[tokio::test]
    async fn failed_resolution_is_recorded_not_fatal() {
        let registry = Arc::new(InMemoryRegistry::default());
        let mut collaborators = collaborators(&registry);
        collaborators.resolver = Arc::new(FlakyResolver::new(
            Arc::new(RegistryResolver::new(registry.clone())),
            &[1],
        ));
        let service = service_with(collaborators);

        let samples = service.run_benchmark(DOMAIN, &keys(3)).await.unwrap();
        assert_eq!(
            samples.iter().map(|sample| sample.succeeded).collect::<Vec<_>>(),
            vec![true, false, true]
        );
        assert_eq!(registry.calls("delete"), 3);
    }

    #[tokio::test]
    async fn delete_failures_are_swallowed() {
        let registry = Arc::new(InMemoryRegistry::default());
        let service = service_with(collaborators(&registry));
        registry.reject("delete");

        let samples = service.run_benchmark(DOMAIN, &keys(3)).await.unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(registry.calls("delete"), 3);
        assert_eq!(registry.claim_count(DOMAIN), 3);
    }

    #[tokio::test]
    async fn creation_failure_cleans_up_and_propagates() {
        let registry = Arc::new(InMemoryRegistry::default());
        let service = service_with(collaborators(&registry));
        registry.limit_registrations(2);

        let err = service.run_benchmark(DOMAIN, &keys(4)).await.unwrap_err();
        assert!(matches!(err, TlsDidError::Registration(_)));
        assert_eq!(registry.calls("delete"), 2);
        assert_eq!(registry.claim_count(DOMAIN), 0);
    }

    #[tokio::test]
    async fn empty_key_list_is_config_error() {
        let registry = Arc::new(InMemoryRegistry::default());
        let service = service_with(collaborators(&registry));

        let err = service.run_benchmark(DOMAIN, &[]).await.unwrap_err();
        assert!(matches!(err, TlsDidError::Config(_)));
        assert_eq!(registry.calls("register"), 0);
    }

    #[tokio::test]
    async fn custom_expiry_is_used() {
        let registry = Arc::new(InMemoryRegistry::default());
        let service = service_with(collaborators(&registry));
        registry.reject("delete");
        let expiry = Utc::now() + chrono::Duration::days(2);

        BenchmarkRunner::new(&service)
            .with_expiry(expiry)
            .run(DOMAIN, &keys(2))
            .await
            .unwrap();
        assert!(registry
            .claims_of(DOMAIN)
            .iter()
            .all(|claim| claim.expiry == Some(expiry.timestamp())));
    }
}
