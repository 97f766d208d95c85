// src/lib.rs

//! # TLS-DID Flow
//!
//! Registers a TLS-certificate-backed DID (`did:tls:<domain>`) on an Ethereum
//! registry, writes its DID Document attributes, signs them with the domain's
//! TLS key, resolves the document back and deletes the claim.
//!
//! ## Layers
//! 1. **Document**: attribute path parsing and draft assembly
//! 2. **Services**: identity lifecycle, resolver, benchmark and [`TlsDidService`]
//! 3. **Contracts / Blockchain**: registry ABI bindings over an `ethers` client
//! 4. **Wallet**: TLS key material and RSA signing

pub mod blockchain;
pub mod config;
pub mod contracts;
pub mod document;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;
pub mod wallet;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Settings;
pub use error::{Result, TlsDidError};
pub use models::did::DIDDocument;
pub use models::identity::{IdentityRecord, KeyRef, LifecycleState};
pub use services::benchmark::ResolutionSample;
pub use services::lifecycle::IdentityLifecycle;
pub use services::tls_did::TlsDidService;
