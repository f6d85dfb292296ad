//! Identifiers, edges and the reconstructed chain.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PartchainError, Result};

/// Characters that would let a token escape its `<...>` slot in a query.
const FORBIDDEN: &[char] = &['<', '>', '"', '{', '}', '|', '\\', '^', '`'];

fn validate_token(raw: &str) -> Result<()> {
    if raw.is_empty() || raw.chars().any(|c| c.is_whitespace() || FORBIDDEN.contains(&c)) {
        return Err(PartchainError::InvalidToken(raw.to_string()));
    }
    Ok(())
}

/// Opaque repository object identifier (a pid such as `uva-lib:1234`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        validate_token(&raw)?;
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ResourceId {
    type Error = PartchainError;

    fn try_from(raw: String) -> Result<Self> {
        Self::new(raw)
    }
}

impl From<ResourceId> for String {
    fn from(id: ResourceId) -> Self {
        id.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Relation URI. Never checked against a vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Predicate(String);

impl Predicate {
    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        validate_token(&raw)?;
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Predicate {
    type Error = PartchainError;

    fn try_from(raw: String) -> Result<Self> {
        Self::new(raw)
    }
}

impl From<Predicate> for String {
    fn from(p: Predicate) -> Self {
        p.0
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A bound value in a result row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// `info:fedora/` reference, prefix stripped.
    Resource(ResourceId),
    /// Literal text, or a URI outside the repository scheme.
    Literal(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Resource(id) => write!(f, "{}", id),
            Value::Literal(s) => write!(f, "\"{}\"", s),
        }
    }
}

/// `successor` follows `predecessor`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Edge {
    pub successor: ResourceId,
    pub predecessor: ResourceId,
}

impl Edge {
    pub fn new(successor: ResourceId, predecessor: ResourceId) -> Self {
        Self {
            successor,
            predecessor,
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} --> {}", self.predecessor, self.successor)
    }
}

/// Members of a parent in reading order.
///
/// Only produced by [`crate::order::reconstruct`], which guarantees that
/// consecutive pairs are exactly the retrieved edge set with no repeats.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Chain(Vec<ResourceId>);

impl Chain {
    pub(crate) fn from_walk(members: Vec<ResourceId>) -> Self {
        Self(members)
    }

    pub fn members(&self) -> &[ResourceId] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<ResourceId> {
        self.0
    }
}

impl IntoIterator for Chain {
    type Item = ResourceId;
    type IntoIter = std::vec::IntoIter<ResourceId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Chain {
    type Item = &'a ResourceId;
    type IntoIter = std::slice::Iter<'a, ResourceId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
