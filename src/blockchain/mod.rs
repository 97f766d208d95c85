// src/blockchain/mod.rs
//! Chain access.

pub mod eth_client;
