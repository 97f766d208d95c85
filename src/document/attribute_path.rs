// src/document/attribute_path.rs
//! Attribute path mini-language for DID Document writes.
//!
//! A path addresses one leaf of the document:
//! ```text
//! parent/child          -> {"parent": {"child": ..}}
//! arrayA[0]/element     -> {"arrayA": [{"element": ..}]}
//! arrayB[0]             -> {"arrayB": [..]}
//! ```
//! Segments are separated by `/`. A segment of the form `name[index]` selects
//! an array element; any other segment names an object field.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Reasons a path string is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("path is empty")]
    Empty,

    #[error("segment {position} of `{path}` is empty")]
    EmptySegment { path: String, position: usize },

    #[error("segment `{segment}` has unbalanced brackets")]
    UnbalancedBrackets { segment: String },

    #[error("segment `{segment}` has no field name before `[`")]
    MissingName { segment: String },

    #[error("segment `{segment}` has invalid index `{index}`")]
    InvalidIndex { segment: String, index: String },
}

/// One step of an [`AttributePath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Object field: `name`
    Field(String),
    /// Array element held in an object field: `name[index]`
    Element { name: String, index: usize },
}

impl Segment {
    /// Field name this segment reads from its parent object.
    pub fn name(&self) -> &str {
        match self {
            Segment::Field(name) => name,
            Segment::Element { name, .. } => name,
        }
    }

    fn parse(segment: &str) -> Result<Self, ParseError> {
        let unbalanced = || ParseError::UnbalancedBrackets {
            segment: segment.to_string(),
        };

        let Some(open) = segment.find('[') else {
            if segment.contains(']') {
                return Err(unbalanced());
            }
            return Ok(Segment::Field(segment.to_string()));
        };

        // Exactly one `[...]` pair, closing the segment.
        if !segment.ends_with(']')
            || segment.matches('[').count() != 1
            || segment.matches(']').count() != 1
        {
            return Err(unbalanced());
        }

        let name = &segment[..open];
        if name.is_empty() {
            return Err(ParseError::MissingName {
                segment: segment.to_string(),
            });
        }

        let digits = &segment[open + 1..segment.len() - 1];
        let invalid = || ParseError::InvalidIndex {
            segment: segment.to_string(),
            index: digits.to_string(),
        };
        // usize::from_str accepts a leading `+`, so check the digits ourselves.
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let index = digits.parse::<usize>().map_err(|_| invalid())?;

        Ok(Segment::Element {
            name: name.to_string(),
            index,
        })
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Field(name) => write!(f, "{}", name),
            Segment::Element { name, index } => write!(f, "{}[{}]", name, index),
        }
    }
}

/// Parsed, non-empty attribute path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributePath {
    segments: Vec<Segment>,
}

impl AttributePath {
    /// Parses a path string. Nothing is returned on failure, not even the
    /// segments that parsed before the error.
    pub fn parse(path: &str) -> Result<Self, ParseError> {
        if path.is_empty() {
            return Err(ParseError::Empty);
        }

        let segments = path
            .split('/')
            .enumerate()
            .map(|(position, segment)| {
                if segment.is_empty() {
                    Err(ParseError::EmptySegment {
                        path: path.to_string(),
                        position,
                    })
                } else {
                    Segment::parse(segment)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Renders the first `len` segments, used to locate errors.
    pub(crate) fn prefix(&self, len: usize) -> String {
        self.segments[..len.min(self.segments.len())]
            .iter()
            .map(Segment::to_string)
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl FromStr for AttributePath {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.prefix(self.segments.len()))
    }
}

/// A single leaf assignment into the DID Document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchOperation {
    pub path: AttributePath,
    pub value: String,
}

impl PatchOperation {
    pub fn new(path: &str, value: impl Into<String>) -> Result<Self, ParseError> {
        Ok(Self {
            path: AttributePath::parse(path)?,
            value: value.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fields_and_elements() {
        let path = AttributePath::parse("arrayA[0]/element").unwrap();
        assert_eq!(
            path.segments(),
            &[
                Segment::Element {
                    name: "arrayA".into(),
                    index: 0
                },
                Segment::Field("element".into()),
            ]
        );

        let path = AttributePath::parse("parent/child").unwrap();
        assert_eq!(path.segments().len(), 2);
        assert_eq!(path.segments()[0].name(), "parent");
    }

    #[test]
    fn renders_back_to_the_same_string() {
        for input in [
            "a",
            "a/b[0]/c",
            "parent/child",
            "arrayB[0]",
            "assertionMethod[0]/publicKeyBase58",
            "x[12]/y[3]/z",
        ] {
            let path: AttributePath = input.parse().unwrap();
            assert_eq!(path.to_string(), input);
            assert_eq!(AttributePath::parse(&path.to_string()).unwrap(), path);
        }
    }

    #[test]
    fn rejects_malformed_paths() {
        let cases = [
            ("", ParseError::Empty),
            (
                "a//b",
                ParseError::EmptySegment {
                    path: "a//b".into(),
                    position: 1,
                },
            ),
            (
                "a/",
                ParseError::EmptySegment {
                    path: "a/".into(),
                    position: 1,
                },
            ),
            (
                "a[0",
                ParseError::UnbalancedBrackets {
                    segment: "a[0".into(),
                },
            ),
            (
                "a0]",
                ParseError::UnbalancedBrackets {
                    segment: "a0]".into(),
                },
            ),
            (
                "a[0]b",
                ParseError::UnbalancedBrackets {
                    segment: "a[0]b".into(),
                },
            ),
            (
                "a[[0]]",
                ParseError::UnbalancedBrackets {
                    segment: "a[[0]]".into(),
                },
            ),
            (
                "[0]",
                ParseError::MissingName {
                    segment: "[0]".into(),
                },
            ),
            (
                "a[x]/b",
                ParseError::InvalidIndex {
                    segment: "a[x]".into(),
                    index: "x".into(),
                },
            ),
            (
                "a[-1]",
                ParseError::InvalidIndex {
                    segment: "a[-1]".into(),
                    index: "-1".into(),
                },
            ),
            (
                "a[+1]",
                ParseError::InvalidIndex {
                    segment: "a[+1]".into(),
                    index: "+1".into(),
                },
            ),
            (
                "a[]",
                ParseError::InvalidIndex {
                    segment: "a[]".into(),
                    index: "".into(),
                },
            ),
        ];

        for (input, expected) in cases {
            assert_eq!(AttributePath::parse(input), Err(expected), "{input}");
        }
    }

    #[test]
    fn rejects_index_overflow() {
        let err = AttributePath::parse("a[99999999999999999999999]").unwrap_err();
        assert!(matches!(err, ParseError::InvalidIndex { .. }));
    }
}
