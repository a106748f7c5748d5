// Copyright 2026 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! The ordered, key-addressable block collection.
//!
//! Insertion order is document order. Blocks are stored behind `Arc` so
//! a new map version shares every untouched block with its predecessor;
//! "mutation" clones the index but never the block payloads.

use std::collections::BTreeMap;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::block::{BlockKey, TextBlock, TreeLinks};

/// Ordered map from [`BlockKey`] to block, preserving document order.
#[derive(Clone, Debug, Default)]
pub struct BlockMap<B: TextBlock> {
    blocks: IndexMap<BlockKey, Arc<B>>,
}

impl<B: TextBlock> BlockMap<B> {
    pub fn new() -> Self {
        Self {
            blocks: IndexMap::new(),
        }
    }

    /// Build a map from blocks in document order.
    ///
    /// Panics on duplicate keys — key collisions silently dropping a
    /// block would corrupt the document.
    pub fn from_blocks(blocks: impl IntoIterator<Item = B>) -> Self {
        let mut map = IndexMap::new();
        for block in blocks {
            let key = block.key().clone();
            let prev = map.insert(key.clone(), Arc::new(block));
            assert!(prev.is_none(), "duplicate block key: {key}");
        }
        Self { blocks: map }
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn contains_key(&self, key: &BlockKey) -> bool {
        self.blocks.contains_key(key)
    }

    pub fn get(&self, key: &BlockKey) -> Option<&B> {
        self.blocks.get(key).map(|b| b.as_ref())
    }

    pub fn index_of(&self, key: &BlockKey) -> Option<usize> {
        self.blocks.get_index_of(key)
    }

    pub fn at(&self, index: usize) -> Option<&B> {
        self.blocks.get_index(index).map(|(_, b)| b.as_ref())
    }

    pub fn first(&self) -> Option<&B> {
        self.at(0)
    }

    pub fn last(&self) -> Option<&B> {
        self.at(self.len().wrapping_sub(1))
    }

    pub fn iter(&self) -> impl Iterator<Item = &B> {
        self.blocks.values().map(|b| b.as_ref())
    }

    pub fn keys(&self) -> impl Iterator<Item = &BlockKey> {
        self.blocks.keys()
    }

    /// The block immediately before `key` in document order.
    pub fn block_before(&self, key: &BlockKey) -> Option<&B> {
        let idx = self.index_of(key)?;
        if idx == 0 {
            None
        } else {
            self.at(idx - 1)
        }
    }

    /// The block immediately after `key` in document order.
    pub fn block_after(&self, key: &BlockKey) -> Option<&B> {
        self.at(self.index_of(key)? + 1)
    }

    /// Keys from `start` to `end` inclusive, in document order.
    ///
    /// Panics if either key is unknown or `end` precedes `start`.
    pub fn keys_in_range(
        &self,
        start: &BlockKey,
        end: &BlockKey,
    ) -> Vec<BlockKey> {
        let from = self
            .index_of(start)
            .unwrap_or_else(|| panic!("unknown block key: {start}"));
        let to = self
            .index_of(end)
            .unwrap_or_else(|| panic!("unknown block key: {end}"));
        assert!(from <= to, "block range end precedes its start");
        (from..=to)
            .map(|i| self.blocks.get_index(i).expect("index in range").0)
            .cloned()
            .collect()
    }

    /// A new map with the block under `block.key()` replaced, keeping
    /// its position. Panics if the key is unknown.
    pub fn replace(&self, block: B) -> Self {
        assert!(
            self.contains_key(block.key()),
            "unknown block key: {}",
            block.key()
        );
        let mut blocks = self.blocks.clone();
        blocks.insert(block.key().clone(), Arc::new(block));
        Self { blocks }
    }

    /// A new map with `block` inserted immediately after `after`.
    pub fn insert_after(&self, after: &BlockKey, block: B) -> Self {
        let idx = self
            .index_of(after)
            .unwrap_or_else(|| panic!("unknown block key: {after}"));
        let mut blocks = self.blocks.clone();
        blocks.shift_insert(idx + 1, block.key().clone(), Arc::new(block));
        Self { blocks }
    }

    /// A new map where the contiguous span from `start` to `end`
    /// (inclusive) is replaced by `replacement`, in order.
    pub fn replace_span(
        &self,
        start: &BlockKey,
        end: &BlockKey,
        replacement: Vec<B>,
    ) -> Self {
        let from = self
            .index_of(start)
            .unwrap_or_else(|| panic!("unknown block key: {start}"));
        let to = self
            .index_of(end)
            .unwrap_or_else(|| panic!("unknown block key: {end}"));
        assert!(from <= to, "block span end precedes its start");

        let mut blocks = IndexMap::with_capacity(
            self.len() - (to - from + 1) + replacement.len(),
        );
        for (i, (key, block)) in self.blocks.iter().enumerate() {
            if i == from {
                for b in &replacement {
                    blocks.insert(b.key().clone(), Arc::new(b.clone()));
                }
            }
            if i < from || i > to {
                blocks.insert(key.clone(), block.clone());
            }
        }
        Self { blocks }
    }

    /// A copy with every key regenerated, returning the old→new mapping.
    /// Tree links are remapped through the mapping; links pointing
    /// outside the map are dropped.
    pub fn with_regenerated_keys(
        &self,
    ) -> (Self, BTreeMap<BlockKey, BlockKey>) {
        let mut mapping = BTreeMap::new();
        for key in self.blocks.keys() {
            mapping.insert(key.clone(), BlockKey::generate());
        }

        let remap = |key: &Option<BlockKey>| -> Option<BlockKey> {
            key.as_ref().and_then(|k| mapping.get(k).cloned())
        };

        let mut blocks = IndexMap::with_capacity(self.len());
        for block in self.iter() {
            let new_key = mapping[block.key()].clone();
            let mut renamed = block.with_key(new_key.clone());
            if let Some(links) = block.tree_links() {
                renamed = renamed.with_tree_links(TreeLinks {
                    parent: remap(&links.parent),
                    prev_sibling: remap(&links.prev_sibling),
                    next_sibling: remap(&links.next_sibling),
                    children: links
                        .children
                        .iter()
                        .filter_map(|k| mapping.get(k).cloned())
                        .collect(),
                });
            }
            blocks.insert(new_key, Arc::new(renamed));
        }
        (Self { blocks }, mapping)
    }

    /// Check that sibling/parent/child links are mutually consistent.
    ///
    /// Used by tests after structural edits; not invoked at runtime.
    pub fn validate_tree_links(&self) -> Result<(), String> {
        for block in self.iter() {
            let Some(links) = block.tree_links() else {
                continue;
            };
            if let Some(parent) = &links.parent {
                let parent_block = self
                    .get(parent)
                    .ok_or_else(|| format!("{}: dangling parent", block.key()))?;
                if !parent_block.children().contains(block.key()) {
                    return Err(format!(
                        "{}: not among its parent's children",
                        block.key()
                    ));
                }
            }
            if let Some(next) = &links.next_sibling {
                let next_block = self
                    .get(next)
                    .ok_or_else(|| format!("{}: dangling next sibling", block.key()))?;
                if next_block.prev_sibling() != Some(block.key()) {
                    return Err(format!(
                        "{}: next sibling does not link back",
                        block.key()
                    ));
                }
            }
            if let Some(prev) = &links.prev_sibling {
                let prev_block = self
                    .get(prev)
                    .ok_or_else(|| format!("{}: dangling prev sibling", block.key()))?;
                if prev_block.next_sibling() != Some(block.key()) {
                    return Err(format!(
                        "{}: prev sibling does not link back",
                        block.key()
                    ));
                }
            }
            for child in &links.children {
                let child_block = self
                    .get(child)
                    .ok_or_else(|| format!("{}: dangling child", block.key()))?;
                if child_block.parent() != Some(block.key()) {
                    return Err(format!(
                        "{}: child does not link back",
                        block.key()
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::BlockMap;
    use crate::block::{ContentBlock, TextBlock, TreeBlock, TreeLinks};

    fn map_of(texts: &[&str]) -> BlockMap<ContentBlock> {
        BlockMap::from_blocks(texts.iter().map(|t| ContentBlock::of_text(t)))
    }

    #[test]
    fn insertion_order_is_document_order() {
        let map = map_of(&["one", "two", "three"]);
        let texts: Vec<String> =
            map.iter().map(|b| b.text().to_string()).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
    }

    #[test]
    fn block_before_and_after_walk_the_order() {
        let map = map_of(&["one", "two", "three"]);
        let middle = map.at(1).unwrap().key().clone();
        assert_eq!(
            map.block_before(&middle).unwrap().text().to_string(),
            "one"
        );
        assert_eq!(
            map.block_after(&middle).unwrap().text().to_string(),
            "three"
        );
        let first = map.at(0).unwrap().key().clone();
        assert!(map.block_before(&first).is_none());
    }

    #[test]
    fn replace_keeps_the_block_position() {
        let map = map_of(&["one", "two", "three"]);
        let middle = map.at(1).unwrap().clone();
        let map = map.replace(middle.with_content(
            widestring::Utf16String::from_str("TWO"),
            vec![crate::char_meta::CharacterMetadata::new(); 3],
        ));
        let texts: Vec<String> =
            map.iter().map(|b| b.text().to_string()).collect();
        assert_eq!(texts, vec!["one", "TWO", "three"]);
    }

    #[test]
    fn replace_span_splices_replacement_in_place() {
        let map = map_of(&["one", "two", "three", "four"]);
        let start = map.at(1).unwrap().key().clone();
        let end = map.at(2).unwrap().key().clone();
        let map = map.replace_span(
            &start,
            &end,
            vec![ContentBlock::of_text("merged")],
        );
        let texts: Vec<String> =
            map.iter().map(|b| b.text().to_string()).collect();
        assert_eq!(texts, vec!["one", "merged", "four"]);
    }

    #[test]
    fn regenerated_keys_are_all_fresh() {
        let map = map_of(&["one", "two"]);
        let (copy, mapping) = map.with_regenerated_keys();
        assert_eq!(copy.len(), 2);
        for key in map.keys() {
            assert!(!copy.contains_key(key));
            assert!(copy.contains_key(&mapping[key]));
        }
    }

    #[test]
    fn regenerating_keys_remaps_tree_links() {
        let parent = TreeBlock::of_text("p");
        let child = TreeBlock::of_text("c");
        let parent = parent.with_tree_links(TreeLinks {
            children: vec![child.key().clone()],
            ..TreeLinks::default()
        });
        let child = child.with_tree_links(TreeLinks {
            parent: Some(parent.key().clone()),
            ..TreeLinks::default()
        });
        let map = BlockMap::from_blocks([parent, child]);
        assert!(map.validate_tree_links().is_ok());

        let (copy, _) = map.with_regenerated_keys();
        assert!(copy.validate_tree_links().is_ok());
    }

    #[test]
    #[should_panic(expected = "duplicate block key")]
    fn duplicate_keys_panic() {
        let block = ContentBlock::of_text("x");
        let twin = block.clone();
        let _ = BlockMap::from_blocks([block, twin]);
    }
}
