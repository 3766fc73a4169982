// SPDX-License-Identifier: Apache-2.0

//! Named attribute sets.
//!
//! The universal manifest/config/result container passed across every
//! runtime boundary. Keys live in two disjoint spaces (string and numeric);
//! one logical set keeps to one space. Payloads are deep-copied on insert
//! and on clone, so a set never aliases caller-owned memory.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::AttrError;

use super::value::{AttrValue, KindMismatch};
use super::AttrKind;

/// An attribute key: either a name or a numeric id. The two spaces are
/// disjoint by construction (`Name("7")` never equals `Id(7)`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttrKey {
    Name(String),
    Id(u64),
}

impl From<&str> for AttrKey {
    fn from(name: &str) -> Self {
        AttrKey::Name(name.to_owned())
    }
}

impl From<String> for AttrKey {
    fn from(name: String) -> Self {
        AttrKey::Name(name)
    }
}

impl From<u64> for AttrKey {
    fn from(id: u64) -> Self {
        AttrKey::Id(id)
    }
}

impl fmt::Display for AttrKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "{}", name),
            Self::Id(id) => write!(f, "#{}", id),
        }
    }
}

/// A mapping from attribute keys to tagged values.
///
/// Value type: clones are independent deep copies; a set owns every payload
/// it holds, nested sets included.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttrSet {
    entries: BTreeMap<AttrKey, AttrValue>,
}

impl AttrSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Insert or overwrite a pair. The value payload is moved (or deep-copied
    /// by the `Into` conversion); the set never aliases caller memory.
    pub fn add(&mut self, key: impl Into<AttrKey>, value: impl Into<AttrValue>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Look up a value. Fails with `NotFound` for an absent key.
    pub fn get(&self, key: impl Into<AttrKey>) -> Result<&AttrValue, AttrError> {
        let key = key.into();
        self.entries
            .get(&key)
            .ok_or(AttrError::NotFound { key })
    }

    /// Look up a value and extract it as `T`. Fails with `NotFound` for an
    /// absent key and `TypeMismatch` when the stored kind differs.
    pub fn get_as<'a, T>(&'a self, key: impl Into<AttrKey>) -> Result<T, AttrError>
    where
        T: TryFrom<&'a AttrValue, Error = KindMismatch>,
    {
        let key = key.into();
        let value = self
            .entries
            .get(&key)
            .ok_or_else(|| AttrError::NotFound { key: key.clone() })?;
        T::try_from(value).map_err(|m| AttrError::TypeMismatch {
            key,
            requested: m.requested,
            actual: m.actual,
        })
    }

    /// Remove a pair, returning its value. Fails with `NotFound` if absent.
    pub fn delete(&mut self, key: impl Into<AttrKey>) -> Result<AttrValue, AttrError> {
        let key = key.into();
        self.entries
            .remove(&key)
            .ok_or(AttrError::NotFound { key })
    }

    /// Whether the key is present.
    pub fn has(&self, key: impl Into<AttrKey>) -> bool {
        self.entries.contains_key(&key.into())
    }

    /// The stored kind of a key, if present.
    pub fn kind_of(&self, key: impl Into<AttrKey>) -> Option<AttrKind> {
        self.entries.get(&key.into()).map(AttrValue::kind)
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set holds no pairs.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The key at enumeration position `index`.
    pub fn key_at(&self, index: usize) -> Option<&AttrKey> {
        self.entries.keys().nth(index)
    }

    /// Iterate over pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&AttrKey, &AttrValue)> {
        self.entries.iter()
    }

    /// True iff every pair in `self` is present in `other` with identical
    /// kind and equal value. With `exact`, the sets must also have equal
    /// cardinality - i.e. full equality.
    pub fn subset(&self, other: &AttrSet, exact: bool) -> bool {
        if exact && self.entries.len() != other.entries.len() {
            return false;
        }
        self.entries
            .iter()
            .all(|(key, value)| other.entries.get(key) == Some(value))
    }
}

impl<'a> IntoIterator for &'a AttrSet {
    type Item = (&'a AttrKey, &'a AttrValue);
    type IntoIter = std::collections::btree_map::Iter<'a, AttrKey, AttrValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<K, V> FromIterator<(K, V)> for AttrSet
where
    K: Into<AttrKey>,
    V: Into<AttrValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = AttrSet::new();
        for (key, value) in iter {
            set.add(key, value);
        }
        set
    }
}
