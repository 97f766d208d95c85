// src/contracts/tls_did_registry.rs
//! TLS-DID registry contract interface.
//!
//! The registry stores one claim per (domain, claimant account). A claim holds
//! the submitted certificate chain, attribute writes in submission order, an
//! expiry and the TLS-key signature over all of it.
//!
//! The bundled ABI (`abi/TLSDIDRegistry.json`) is this crate's own registry
//! interface, not the published TLS-DID registry contract. A deployed
//! contract must expose the same functions (`registerClaim`, `addChain`,
//! `setAttribute`, `setExpiry`, `setSignature`, `removeClaim`, `getClaimants`
//! and the five-output `getClaim`) for `EthRegistry` to talk to it.

use crate::blockchain::eth_client::EthClient;
use crate::config::Settings;
use crate::error::{Result as TlsDidResult, TlsDidError};
use crate::models::identity::KeyRef;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ethers_core::abi::Abi;
use ethers_core::types::{Address, Bytes, H256, U256};
use thiserror::Error;

/// Failures reported by the registry or the chain underneath it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("transaction rejected: {0}")]
    Rejected(String),

    #[error("domain `{domain}` is already claimed: {reason}")]
    AlreadyClaimed { domain: String, reason: String },

    #[error("invalid claimant key: {0}")]
    InvalidKey(String),

    #[error("contract ABI error: {0}")]
    Abi(String),
}

/// Outcome of a mined registry transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TxResult {
    pub tx_hash: H256,
    pub block_number: Option<u64>,
}

/// Write side of the registry. Every call acts on the claim of `key` for
/// `domain`.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    async fn register(&self, domain: &str, key: &KeyRef) -> Result<TxResult, RegistryError>;

    async fn publish_chain(
        &self,
        domain: &str,
        key: &KeyRef,
        certs: &[String],
    ) -> Result<TxResult, RegistryError>;

    async fn write_attribute(
        &self,
        domain: &str,
        key: &KeyRef,
        path: &str,
        value: &str,
    ) -> Result<TxResult, RegistryError>;

    async fn set_expiry(
        &self,
        domain: &str,
        key: &KeyRef,
        expiry: DateTime<Utc>,
    ) -> Result<TxResult, RegistryError>;

    async fn submit_signature(
        &self,
        domain: &str,
        key: &KeyRef,
        signature: &[u8],
    ) -> Result<TxResult, RegistryError>;

    async fn delete(&self, domain: &str, key: &KeyRef) -> Result<TxResult, RegistryError>;
}

/// A claim as stored on-chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OnChainClaim {
    pub cert_chain: Vec<String>,
    /// (path, value) pairs in submission order
    pub attributes: Vec<(String, String)>,
    /// Unix seconds
    pub expiry: Option<i64>,
    pub signature: Option<Vec<u8>>,
}

/// Read side of the registry, used by the resolver.
#[async_trait]
pub trait RegistryReader: Send + Sync {
    /// All live claims for `domain`, oldest first.
    async fn claims(&self, domain: &str) -> Result<Vec<OnChainClaim>, RegistryError>;
}

/// Registry contract reached through [`EthClient`].
#[derive(Clone)]
pub struct EthRegistry {
    client: EthClient,
    address: Address,
    abi: Abi,
}

impl EthRegistry {
    pub fn new(client: EthClient, address: Address) -> Result<Self, RegistryError> {
        let abi = Abi::load(&include_bytes!("abi/TLSDIDRegistry.json")[..])
            .map_err(|e| RegistryError::Abi(e.to_string()))?;
        Ok(Self {
            client,
            address,
            abi,
        })
    }

    /// Validates `settings` and connects to its RPC endpoint.
    pub async fn connect(settings: &Settings) -> TlsDidResult<Self> {
        let address = settings.registry()?;
        let rpc_url = settings.rpc_endpoint()?;
        let client = EthClient::new(rpc_url.as_str())
            .await
            .map_err(|e| TlsDidError::Config(format!("cannot reach {}: {}", rpc_url, e)))?;
        Self::new(client, address).map_err(|e| TlsDidError::Config(e.to_string()))
    }

    pub fn address(&self) -> Address {
        self.address
    }

    async fn send<T: ethers_core::abi::Tokenize + Send>(
        &self,
        key: &KeyRef,
        method: &str,
        params: T,
    ) -> Result<TxResult, RegistryError> {
        self.client
            .send_transaction(key, self.address, &self.abi, method, params)
            .await
    }
}

#[async_trait]
impl RegistryClient for EthRegistry {
    async fn register(&self, domain: &str, key: &KeyRef) -> Result<TxResult, RegistryError> {
        self.send(key, "registerClaim", (domain.to_string(),))
            .await
            .map_err(|e| match e {
                RegistryError::Rejected(reason) if reason.contains("claimed") => {
                    RegistryError::AlreadyClaimed {
                        domain: domain.to_string(),
                        reason,
                    }
                }
                other => other,
            })
    }

    async fn publish_chain(
        &self,
        domain: &str,
        key: &KeyRef,
        certs: &[String],
    ) -> Result<TxResult, RegistryError> {
        self.send(key, "addChain", (domain.to_string(), certs.to_vec()))
            .await
    }

    async fn write_attribute(
        &self,
        domain: &str,
        key: &KeyRef,
        path: &str,
        value: &str,
    ) -> Result<TxResult, RegistryError> {
        self.send(
            key,
            "setAttribute",
            (domain.to_string(), path.to_string(), value.to_string()),
        )
        .await
    }

    async fn set_expiry(
        &self,
        domain: &str,
        key: &KeyRef,
        expiry: DateTime<Utc>,
    ) -> Result<TxResult, RegistryError> {
        let seconds = u64::try_from(expiry.timestamp())
            .map_err(|_| RegistryError::Rejected(format!("expiry {} predates 1970", expiry)))?;
        self.send(key, "setExpiry", (domain.to_string(), U256::from(seconds)))
            .await
    }

    async fn submit_signature(
        &self,
        domain: &str,
        key: &KeyRef,
        signature: &[u8],
    ) -> Result<TxResult, RegistryError> {
        self.send(
            key,
            "setSignature",
            (domain.to_string(), Bytes::from(signature.to_vec())),
        )
        .await
    }

    async fn delete(&self, domain: &str, key: &KeyRef) -> Result<TxResult, RegistryError> {
        self.send(key, "removeClaim", (domain.to_string(),)).await
    }
}

#[async_trait]
impl RegistryReader for EthRegistry {
    async fn claims(&self, domain: &str) -> Result<Vec<OnChainClaim>, RegistryError> {
        let claimants: Vec<Address> = self
            .client
            .query_contract(self.address, &self.abi, "getClaimants", (domain.to_string(),))
            .await?;

        let mut claims = Vec::with_capacity(claimants.len());
        for claimant in claimants {
            let (cert_chain, paths, values, expiry, signature): (
                Vec<String>,
                Vec<String>,
                Vec<String>,
                U256,
                Bytes,
            ) = self
                .client
                .query_contract(
                    self.address,
                    &self.abi,
                    "getClaim",
                    (domain.to_string(), claimant),
                )
                .await?;

            if paths.len() != values.len() {
                return Err(RegistryError::Abi(format!(
                    "claim of {:?} has {} paths but {} values",
                    claimant,
                    paths.len(),
                    values.len()
                )));
            }

            claims.push(OnChainClaim {
                cert_chain,
                attributes: paths.into_iter().zip(values).collect(),
                expiry: expiry_seconds(expiry),
                signature: (!signature.is_empty()).then(|| signature.to_vec()),
            });
        }

        Ok(claims)
    }
}

/// On-chain expiry to unix seconds. Zero means no expiry; values past
/// `i64::MAX` saturate so they still read as far in the future.
fn expiry_seconds(expiry: U256) -> Option<i64> {
    if expiry.is_zero() {
        return None;
    }
    if expiry > U256::from(i64::MAX as u64) {
        return Some(i64::MAX);
    }
    Some(i64::try_from(expiry.as_u64()).unwrap_or(i64::MAX))
}
