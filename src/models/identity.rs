// src/models/identity.rs
//! On-chain identity records and their lifecycle states.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;

/// Ethereum private key of the account claiming a domain.
///
/// Hex-encoded, with or without `0x`. `Debug` never prints the key.
#[derive(Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(transparent)]
pub struct KeyRef(String);

impl KeyRef {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for KeyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tail = self
            .0
            .get(self.0.len().saturating_sub(4)..)
            .unwrap_or_default();
        write!(f, "KeyRef(..{})", tail)
    }
}

impl From<&str> for KeyRef {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for KeyRef {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Registration status of a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStatus {
    Unregistered,
    Registered,
    Deleted,
}

/// Steps of the identity lifecycle, in the only order they may be taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecycleState {
    Created,
    Registered,
    ChainPublished,
    Attributed,
    ExpirySet,
    Signed,
    Deleted,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Created => "created",
            LifecycleState::Registered => "registered",
            LifecycleState::ChainPublished => "chainPublished",
            LifecycleState::Attributed => "attributed",
            LifecycleState::ExpirySet => "expirySet",
            LifecycleState::Signed => "signed",
            LifecycleState::Deleted => "deleted",
        };
        f.write_str(name)
    }
}

/// One claim of a domain by one key.
#[derive(Debug, Clone)]
pub struct IdentityRecord {
    pub domain: String,
    pub key_ref: KeyRef,
    pub status: RegistrationStatus,
    /// PEM certificates as submitted, leaf first
    pub cert_chain: Vec<String>,
    pub expiry: Option<DateTime<Utc>>,
    pub signed: bool,
}

impl IdentityRecord {
    pub fn new(domain: impl Into<String>, key_ref: KeyRef) -> Self {
        Self {
            domain: domain.into(),
            key_ref,
            status: RegistrationStatus::Unregistered,
            cert_chain: Vec::new(),
            expiry: None,
            signed: false,
        }
    }

    pub fn did(&self) -> String {
        crate::models::did::did_for_domain(&self.domain)
    }

    pub fn is_registered(&self) -> bool {
        self.status == RegistrationStatus::Registered
    }
}
