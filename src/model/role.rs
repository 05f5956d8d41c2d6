// File: ./src/model/role.rs
// Closed role enumeration and the per-principal role set.
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use strum::{EnumIter, IntoEnumIterator};

pub const NO_ROLES_LABEL: &str = "No roles assigned";

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum RoleTag {
    Admin,
    Member,
    Teacher,
    Parent,
    Student,
}

impl RoleTag {
    /// Stable value used in storage.
    pub fn machine_value(&self) -> &'static str {
        match self {
            RoleTag::Admin => "admin",
            RoleTag::Member => "member",
            RoleTag::Teacher => "teacher",
            RoleTag::Parent => "parent",
            RoleTag::Student => "student",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RoleTag::Admin => "Admin",
            RoleTag::Member => "Member",
            RoleTag::Teacher => "Teacher",
            RoleTag::Parent => "Parent",
            RoleTag::Student => "Student",
        }
    }
}

impl fmt::Display for RoleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for RoleTag {
    type Err = Error;

    /// Exact, case-sensitive match on the machine value.
    fn from_str(s: &str) -> Result<Self> {
        RoleTag::iter()
            .find(|tag| tag.machine_value() == s)
            .ok_or_else(|| Error::InvalidRole(s.to_string()))
    }
}

/// Deduplicated roles held by one principal.
///
/// Iteration follows the declaration order of [`RoleTag`], so labels and the
/// encoded form are deterministic even though order carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<RoleTag>);

impl RoleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from machine values, failing on the first unknown one.
    pub fn from_machine_values<'a, I>(values: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        values
            .into_iter()
            .map(RoleTag::from_str)
            .collect::<Result<BTreeSet<_>>>()
            .map(Self)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = RoleTag> + '_ {
        self.0.iter().copied()
    }

    pub fn has_role(&self, tag: RoleTag) -> bool {
        self.0.contains(&tag)
    }

    /// False for an empty `tags`.
    pub fn has_any_role(&self, tags: &[RoleTag]) -> bool {
        tags.iter().any(|t| self.0.contains(t))
    }

    /// True for an empty `tags`.
    pub fn has_all_roles(&self, tags: &[RoleTag]) -> bool {
        tags.iter().all(|t| self.0.contains(t))
    }

    /// Returns false when the tag was already present.
    pub fn add_role(&mut self, tag: RoleTag) -> bool {
        self.0.insert(tag)
    }

    /// Returns false when the tag was absent.
    pub fn remove_role(&mut self, tag: RoleTag) -> bool {
        self.0.remove(&tag)
    }

    /// Replaces the whole set. Returns whether the contents changed.
    pub fn set_roles<I>(&mut self, tags: I) -> bool
    where
        I: IntoIterator<Item = RoleTag>,
    {
        let next: BTreeSet<RoleTag> = tags.into_iter().collect();
        if next == self.0 {
            return false;
        }
        self.0 = next;
        true
    }

    /// JSON array of machine values. The empty set encodes as `[]`.
    pub fn encode(&self) -> String {
        let values: Vec<&str> = self.iter().map(|t| t.machine_value()).collect();
        // Serializing a Vec<&str> cannot fail.
        serde_json::to_string(&values).unwrap_or_else(|_| "[]".to_string())
    }

    /// Inverse of [`RoleSet::encode`]. An absent value, an empty string and
    /// JSON `null` all decode to the empty set.
    pub fn decode(stored: Option<&str>) -> Result<Self> {
        let Some(raw) = stored.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(Self::new());
        };
        let values: Option<Vec<String>> =
            serde_json::from_str(raw).map_err(|e| Error::InvalidEncoding(e.to_string()))?;
        match values {
            Some(values) => Self::from_machine_values(values.iter().map(String::as_str)),
            None => Ok(Self::new()),
        }
    }

    /// Comma-joined display labels, or [`NO_ROLES_LABEL`].
    pub fn labels(&self) -> String {
        if self.is_empty() {
            return NO_ROLES_LABEL.to_string();
        }
        self.iter().map(|t| t.label()).collect::<Vec<_>>().join(", ")
    }
}

impl FromIterator<RoleTag> for RoleSet {
    fn from_iter<I: IntoIterator<Item = RoleTag>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for RoleSet {
    type Item = RoleTag;
    type IntoIter = std::collections::btree_set::IntoIter<RoleTag>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.labels())
    }
}
