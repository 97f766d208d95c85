// src/contracts/mod.rs
//! Smart contract interfaces.

pub mod tls_did_registry;
