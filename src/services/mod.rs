// src/services/mod.rs
//! Identity lifecycle, resolution and the benchmark built on them.

pub mod benchmark;
pub mod lifecycle;
pub mod resolver;
pub mod tls_did;
