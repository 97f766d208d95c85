// src/utils/mod.rs
//! Helpers shared by the registry and signing layers.

pub mod certificate;
