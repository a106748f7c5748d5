// Copyright 2026 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Entities: out-of-band annotations (links, mentions, …) referenced by
//! character metadata via stable keys.
//!
//! The table is append-only. Instances are never deleted — they are
//! superseded via [`EntityTable::merge_data`] / [`EntityTable::replace_data`],
//! which produce a new instance under the same key. The table is a value
//! carried inside every `DocumentState`, not process-global, so two
//! documents can never corrupt one another's keys.

use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use serde_json::Value;
use strum_macros::{Display, EnumString};

/// Opaque entity payload, e.g. `{"url": "https://matrix.org"}`.
pub type EntityData = BTreeMap<String, Value>;

/// Stable reference to one [`EntityInstance`] within a document lineage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityKey(u64);

impl EntityKey {
    #[cfg(test)]
    pub fn test_key(raw: u64) -> Self {
        Self(raw)
    }

    pub(crate) fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// How edits near an entity's character range are resolved.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Display, EnumString,
)]
#[strum(serialize_all = "UPPERCASE")]
pub enum EntityMutability {
    /// The entity's text can be edited freely; removal ranges are used
    /// verbatim.
    Mutable,
    /// The entity is atomic: any removal touching it removes the whole
    /// contiguous span.
    Immutable,
    /// The entity's text is a sequence of space-delimited segments that
    /// can only be removed whole, one segment at a time.
    Segmented,
}

/// One annotation instance: type, mutability policy, opaque data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityInstance {
    entity_type: String,
    mutability: EntityMutability,
    data: EntityData,
}

impl EntityInstance {
    pub fn new(
        entity_type: &str,
        mutability: EntityMutability,
        data: EntityData,
    ) -> Self {
        Self {
            entity_type: entity_type.to_owned(),
            mutability,
            data,
        }
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn mutability(&self) -> EntityMutability {
        self.mutability
    }

    pub fn data(&self) -> &EntityData {
        &self.data
    }
}

/// Append-only store of entity instances, addressed by [`EntityKey`].
#[derive(Clone, Debug, Default)]
pub struct EntityTable {
    entries: IndexMap<EntityKey, EntityInstance>,
    next_key: u64,
}

impl EntityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an instance, returning the new table and the assigned key.
    pub fn create(&self, instance: EntityInstance) -> (Self, EntityKey) {
        let key = EntityKey(self.next_key);
        let mut entries = self.entries.clone();
        entries.insert(key, instance);
        (
            Self {
                entries,
                next_key: self.next_key + 1,
            },
            key,
        )
    }

    pub fn get(&self, key: EntityKey) -> Option<&EntityInstance> {
        self.entries.get(&key)
    }

    /// Look up an instance that must exist.
    ///
    /// A dangling key means some character references an entity the table
    /// never held — a consistency-invariant violation, so this panics
    /// rather than degrading silently.
    pub fn resolve(&self, key: EntityKey) -> &EntityInstance {
        self.entries
            .get(&key)
            .unwrap_or_else(|| panic!("dangling entity key: {key}"))
    }

    /// Supersede the instance at `key` with one whose data has `patch`
    /// merged in (patch wins on conflicting fields).
    pub fn merge_data(&self, key: EntityKey, patch: &EntityData) -> Self {
        let old = self.resolve(key);
        let mut data = old.data.clone();
        for (k, v) in patch {
            data.insert(k.clone(), v.clone());
        }
        self.replace_data(key, data)
    }

    /// Supersede the instance at `key` with one carrying `data`.
    pub fn replace_data(&self, key: EntityKey, data: EntityData) -> Self {
        let old = self.resolve(key);
        let superseded = EntityInstance {
            entity_type: old.entity_type.clone(),
            mutability: old.mutability,
            data,
        };
        let mut entries = self.entries.clone();
        entries.insert(key, superseded);
        Self {
            entries,
            next_key: self.next_key,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (EntityKey, &EntityInstance)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use serde_json::json;

    use super::{
        EntityData, EntityInstance, EntityMutability, EntityTable,
    };

    fn link(url: &str) -> EntityInstance {
        let mut data = EntityData::new();
        data.insert("url".to_owned(), json!(url));
        EntityInstance::new("LINK", EntityMutability::Mutable, data)
    }

    #[test]
    fn creating_an_entity_assigns_distinct_keys() {
        let table = EntityTable::new();
        let (table, a) = table.create(link("https://a.example"));
        let (table, b) = table.create(link("https://b.example"));
        assert_ne!(a, b);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn the_original_table_is_untouched_by_create() {
        let table = EntityTable::new();
        let (_bigger, _key) = table.create(link("https://a.example"));
        assert!(table.is_empty());
    }

    #[test]
    fn merge_data_supersedes_under_the_same_key() {
        let (table, key) = EntityTable::new().create(link("https://a.example"));
        let mut patch = EntityData::new();
        patch.insert("title".to_owned(), json!("A"));

        let merged = table.merge_data(key, &patch);
        let instance = merged.resolve(key);
        assert_eq!(instance.data()["url"], json!("https://a.example"));
        assert_eq!(instance.data()["title"], json!("A"));
        // Old table still holds the original instance.
        assert!(!table.resolve(key).data().contains_key("title"));
    }

    #[test]
    fn replace_data_drops_old_fields() {
        let (table, key) = EntityTable::new().create(link("https://a.example"));
        let replaced = table.replace_data(key, EntityData::new());
        assert!(replaced.resolve(key).data().is_empty());
    }

    #[test]
    #[should_panic(expected = "dangling entity key")]
    fn resolving_a_dangling_key_panics() {
        let table = EntityTable::new();
        table.resolve(super::EntityKey(99));
    }

    #[test]
    fn mutability_round_trips_through_strings() {
        assert_eq!(EntityMutability::Segmented.to_string(), "SEGMENTED");
        assert_eq!(
            EntityMutability::from_str("IMMUTABLE").unwrap(),
            EntityMutability::Immutable
        );
    }
}
