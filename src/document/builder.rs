// src/document/builder.rs
//! Accumulates attribute writes into a nested DID Document draft.

use crate::document::attribute_path::{PatchOperation, Segment};
use serde_json::{Map, Value};
use thiserror::Error;

/// Conflicts between a patch and the shape already present in the draft.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    #[error("`{at}` is not an object")]
    ExpectedObject { at: String },

    #[error("`{at}` is not an array")]
    ExpectedArray { at: String },

    #[error("`{at}` skips past the end of an array of length {len}")]
    IndexGap { at: String, len: usize },

    #[error("`{at}` holds a nested value and cannot be replaced by a scalar")]
    ContainerOverwrite { at: String },
}

/// Mutable DID Document body built from [`PatchOperation`]s.
///
/// Arrays are dense: an element index may replace an existing element or
/// append exactly at the end, never leave a gap.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentDraft {
    root: Map<String, Value>,
}

impl DocumentDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one patch. On error the draft is left exactly as it was.
    pub fn apply(&mut self, operation: &PatchOperation) -> Result<(), ShapeError> {
        let mut next = self.root.clone();
        write(&mut next, operation)?;
        self.root = next;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.root
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.root
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.root.clone())
    }
}

fn write(root: &mut Map<String, Value>, operation: &PatchOperation) -> Result<(), ShapeError> {
    let path = &operation.path;
    let segments = path.segments();
    let last = segments.len() - 1;
    let mut object = root;

    for (i, segment) in segments.iter().enumerate() {
        let at = || path.prefix(i + 1);
        let terminal = i == last;

        object = match segment {
            Segment::Field(name) if terminal => {
                set_scalar(object.entry(name.clone()).or_insert(Value::Null), &operation.value, at)?;
                return Ok(());
            }
            Segment::Field(name) => object
                .entry(name.clone())
                .or_insert_with(|| Value::Object(Map::new()))
                .as_object_mut()
                .ok_or_else(|| ShapeError::ExpectedObject { at: at() })?,
            Segment::Element { name, index } => {
                let array = object
                    .entry(name.clone())
                    .or_insert_with(|| Value::Array(Vec::new()))
                    .as_array_mut()
                    .ok_or_else(|| ShapeError::ExpectedArray {
                        at: field_location(&path.prefix(i), name),
                    })?;

                let len = array.len();
                if *index > len {
                    return Err(ShapeError::IndexGap { at: at(), len });
                }
                if *index == len {
                    array.push(if terminal {
                        Value::Null
                    } else {
                        Value::Object(Map::new())
                    });
                }
                let element = &mut array[*index];

                if terminal {
                    set_scalar(element, &operation.value, at)?;
                    return Ok(());
                }
                element
                    .as_object_mut()
                    .ok_or_else(|| ShapeError::ExpectedObject { at: at() })?
            }
        };
    }

    Ok(())
}

fn field_location(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

fn set_scalar(
    slot: &mut Value,
    value: &str,
    at: impl Fn() -> String,
) -> Result<(), ShapeError> {
    if slot.is_object() || slot.is_array() {
        return Err(ShapeError::ContainerOverwrite { at: at() });
    }
    *slot = Value::String(value.to_string());
    Ok(())
}
