// src/error.rs
//! Error taxonomy for the TLS-DID flow.
//!
//! Collaborator failures (registry transactions, signing, resolution) are
//! mapped into [`TlsDidError`] at the lifecycle boundary, so callers only ever
//! match on the variants below.

use crate::document::attribute_path::ParseError;
use crate::document::builder::ShapeError;
use thiserror::Error;

/// Every failure the TLS-DID flow can surface to its caller.
#[derive(Error, Debug)]
pub enum TlsDidError {
    /// Malformed attribute path
    #[error("Invalid attribute path: {0}")]
    Parse(#[from] ParseError),

    /// Attribute write conflicts with the document structure
    #[error("Document shape conflict: {0}")]
    Shape(#[from] ShapeError),

    /// Missing or malformed registry / RPC configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Claim registration was refused
    #[error("Registration failed: {0}")]
    Registration(String),

    /// Certificate chain is malformed or was not accepted
    #[error("Certificate chain error: {0}")]
    Chain(String),

    /// Registry rejected an attribute or signature write
    #[error("Submission rejected: {0}")]
    Submission(String),

    /// Expiry is not in the future
    #[error("Invalid expiry: {0}")]
    Expiry(String),

    /// TLS key could not produce a signature
    #[error("Signing failed: {0}")]
    Signing(String),

    /// DID could not be resolved
    #[error("Resolution failed: {0}")]
    Resolution(String),

    /// Operation on a deleted or out-of-order identity
    #[error("Lifecycle error: {0}")]
    Lifecycle(String),

    /// Certificate or key files could not be read
    #[error("Key material error: {0}")]
    KeyMaterial(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TlsDidError>;
