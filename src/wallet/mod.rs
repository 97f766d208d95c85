// src/wallet/mod.rs
//! TLS key material and document signing.

pub mod key_material;
pub mod signing;
