//! Entity ID type: a domain-qualified reference such as `sensor.tent1_temp`

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for malformed entity IDs
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EntityIdError {
    #[error("entity_id must contain exactly one '.' separator")]
    InvalidFormat,

    #[error("domain cannot be empty")]
    EmptyDomain,

    #[error("object_id cannot be empty")]
    EmptyObjectId,

    #[error("domain must be lowercase alphanumeric with underscores")]
    InvalidDomainChars,

    #[error("object_id must be lowercase alphanumeric with underscores")]
    InvalidObjectIdChars,
}

/// A platform entity reference (e.g. `"switch.tent1_exhaust"`)
///
/// The core never creates entities; it only holds on to their ids. The id is
/// kept as a single string with the separator position cached so that
/// borrowing the full id is free.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId {
    raw: String,
    dot: usize,
}

impl EntityId {
    /// Build an id from its two halves
    pub fn new(domain: &str, object_id: &str) -> Result<Self, EntityIdError> {
        format!("{domain}.{object_id}").parse()
    }

    /// The coarse category, e.g. `sensor`, `switch`, `fan`
    pub fn domain(&self) -> &str {
        &self.raw[..self.dot]
    }

    /// The part after the separator
    pub fn object_id(&self) -> &str {
        &self.raw[self.dot + 1..]
    }

    /// The full `domain.object_id` string
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Underscore-separated words of the object id, lowercased
    pub fn object_tokens(&self) -> impl Iterator<Item = &str> {
        self.object_id().split('_').filter(|t| !t.is_empty())
    }

    fn valid_part(s: &str) -> bool {
        !s.starts_with('_')
            && !s.ends_with('_')
            && s
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    }
}

impl FromStr for EntityId {
    type Err = EntityIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('.');
        let (domain, object_id) = match (parts.next(), parts.next(), parts.next()) {
            (Some(d), Some(o), None) => (d, o),
            _ => return Err(EntityIdError::InvalidFormat),
        };

        if domain.is_empty() {
            return Err(EntityIdError::EmptyDomain);
        }
        if object_id.is_empty() {
            return Err(EntityIdError::EmptyObjectId);
        }
        if !Self::valid_part(domain) || domain.contains("__") {
            return Err(EntityIdError::InvalidDomainChars);
        }
        if !Self::valid_part(object_id) {
            return Err(EntityIdError::InvalidObjectIdChars);
        }

        Ok(Self {
            raw: s.to_string(),
            dot: domain.len(),
        })
    }
}

impl TryFrom<String> for EntityId {
    type Error = EntityIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> String {
        id.raw
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
