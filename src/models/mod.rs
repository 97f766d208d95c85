// src/models/mod.rs
//! Data structures shared across the flow.

pub mod did;
pub mod identity;
