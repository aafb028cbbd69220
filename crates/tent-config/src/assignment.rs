//! Slot assignment values
//!
//! A slot holds nothing, one entity, or an ordered de-duplicated list of
//! entities. On disk a single assignment is a plain string and a multiple
//! assignment is an array, matching what the dashboard has always written.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The entities assigned to one slot
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SlotAssignment {
    #[default]
    Empty,
    Single(String),
    Multiple(Vec<String>),
}

impl SlotAssignment {
    /// Build a multiple assignment, dropping blanks and repeats
    pub fn multiple<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for id in ids {
            let id = id.into();
            if !id.is_empty() && !out.contains(&id) {
                out.push(id);
            }
        }
        if out.is_empty() {
            SlotAssignment::Empty
        } else {
            SlotAssignment::Multiple(out)
        }
    }

    /// Build a single assignment; an empty id yields `Empty`
    pub fn single(id: impl Into<String>) -> Self {
        let id = id.into();
        if id.is_empty() {
            SlotAssignment::Empty
        } else {
            SlotAssignment::Single(id)
        }
    }

    /// Assigned entity ids in display order
    pub fn ids(&self) -> &[String] {
        match self {
            SlotAssignment::Empty => &[],
            SlotAssignment::Single(id) => std::slice::from_ref(id),
            SlotAssignment::Multiple(ids) => ids,
        }
    }

    pub fn first(&self) -> Option<&str> {
        self.ids().first().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids().is_empty()
    }

    pub fn contains(&self, entity_id: &str) -> bool {
        self.ids().iter().any(|id| id == entity_id)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAssignment {
    One(String),
    Many(Vec<Option<String>>),
}

impl Serialize for SlotAssignment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SlotAssignment::Empty => serializer.serialize_none(),
            SlotAssignment::Single(id) => serializer.serialize_str(id),
            SlotAssignment::Multiple(ids) => ids.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for SlotAssignment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<RawAssignment>::deserialize(deserializer)? {
            None => SlotAssignment::Empty,
            Some(RawAssignment::One(id)) => SlotAssignment::single(id),
            Some(RawAssignment::Many(ids)) => SlotAssignment::multiple(ids.into_iter().flatten()),
        })
    }
}
