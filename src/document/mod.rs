// src/document/mod.rs
//! DID Document attribute encoding: path parsing and draft assembly.

pub mod attribute_path;
pub mod builder;

pub use attribute_path::{AttributePath, ParseError, PatchOperation, Segment};
pub use builder::{DocumentDraft, ShapeError};
