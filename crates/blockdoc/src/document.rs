// Copyright 2026 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! The document aggregate: block collection + entity table + the
//! selection snapshots taken before and after the last edit.
//!
//! A [`DocumentState`] is immutable. Every transaction produces a new
//! value whose untouched blocks and entity table are shared by `Arc`
//! with its predecessor, so keeping old versions around (undo,
//! snapshotting, concurrent readers) costs almost nothing. Operations
//! that change nothing return a state sharing everything — callers can
//! detect this with [`DocumentState::shares_content_with`].

use std::sync::Arc;

use crate::block::{BlockKey, TextBlock};
use crate::block_map::BlockMap;
use crate::entity::{
    EntityData, EntityInstance, EntityKey, EntityTable,
};
use crate::selection::SelectionState;

/// Immutable document version.
#[derive(Clone, Debug)]
pub struct DocumentState<B: TextBlock> {
    blocks: Arc<BlockMap<B>>,
    entities: Arc<EntityTable>,
    selection_before: SelectionState,
    selection_after: SelectionState,
}

impl<B: TextBlock> DocumentState<B> {
    /// Build a document from blocks in document order.
    ///
    /// Panics if `blocks` is empty — a document always holds at least
    /// one block, so a selection always has somewhere to live.
    pub fn from_blocks(blocks: impl IntoIterator<Item = B>) -> Self {
        let map = BlockMap::from_blocks(blocks);
        assert!(!map.is_empty(), "a document must hold at least one block");
        let cursor = SelectionState::collapsed(
            map.first().expect("non-empty").key().clone(),
            0,
        );
        Self {
            blocks: Arc::new(map),
            entities: Arc::new(EntityTable::new()),
            selection_before: cursor.clone(),
            selection_after: cursor,
        }
    }

    /// Build a document from blocks plus an already-populated entity
    /// table. Same emptiness contract as [`DocumentState::from_blocks`].
    pub fn from_parts(
        blocks: impl IntoIterator<Item = B>,
        entities: EntityTable,
    ) -> Self {
        let mut state = Self::from_blocks(blocks);
        state.entities = Arc::new(entities);
        state
    }

    /// The block map, in document order.
    pub fn block_map(&self) -> &BlockMap<B> {
        &self.blocks
    }

    pub fn entity_table(&self) -> &EntityTable {
        &self.entities
    }

    /// The block under `key`. Panics on unknown keys: selections and
    /// operations must only ever name blocks that exist.
    pub fn block(&self, key: &BlockKey) -> &B {
        self.blocks
            .get(key)
            .unwrap_or_else(|| panic!("unknown block key: {key}"))
    }

    /// The entity under `key`. Panics on dangling keys (consistency
    /// violation, see [`EntityTable::resolve`]).
    pub fn entity(&self, key: EntityKey) -> &EntityInstance {
        self.entities.resolve(key)
    }

    pub fn selection_before(&self) -> &SelectionState {
        &self.selection_before
    }

    pub fn selection_after(&self) -> &SelectionState {
        &self.selection_after
    }

    /// All block text joined with `\n`.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for (i, block) in self.blocks.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&block.text().to_string());
        }
        out
    }

    /// Whether `other` shares this state's block map and entity table
    /// by reference — true exactly when an operation was a structural
    /// no-op.
    pub fn shares_content_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.blocks, &other.blocks)
            && Arc::ptr_eq(&self.entities, &other.entities)
    }

    // ── Derived versions ────────────────────────────────────────────────

    /// A version with new content, carrying the given selections.
    /// `selection_before` is the pre-edit selection (for undo),
    /// `selection_after` the post-edit cursor.
    pub fn with_content(
        &self,
        blocks: BlockMap<B>,
        selection_before: SelectionState,
        selection_after: SelectionState,
    ) -> Self {
        #[cfg(feature = "assert-invariants")]
        if let Err(violation) = blocks.validate_tree_links() {
            panic!("inconsistent tree links: {violation}");
        }
        Self {
            blocks: Arc::new(blocks),
            entities: self.entities.clone(),
            selection_before,
            selection_after,
        }
    }

    /// A version that only moves the selection; content is shared.
    pub fn with_selection(&self, selection: SelectionState) -> Self {
        Self {
            blocks: self.blocks.clone(),
            entities: self.entities.clone(),
            selection_before: self.selection_before.clone(),
            selection_after: selection,
        }
    }

    /// A no-op result: everything shared, selections carried forward.
    pub fn unchanged(&self) -> Self {
        self.clone()
    }

    /// A version carrying a different pre-edit selection. Used by
    /// compound operations whose intermediate steps would otherwise
    /// record the wrong undo target.
    pub(crate) fn with_selection_before(
        &self,
        selection: SelectionState,
    ) -> Self {
        Self {
            blocks: self.blocks.clone(),
            entities: self.entities.clone(),
            selection_before: selection,
            selection_after: self.selection_after.clone(),
        }
    }

    /// Register a new entity instance, returning the new state and the
    /// assigned key.
    pub fn create_entity(
        &self,
        instance: EntityInstance,
    ) -> (Self, EntityKey) {
        let (table, key) = self.entities.create(instance);
        (
            Self {
                blocks: self.blocks.clone(),
                entities: Arc::new(table),
                selection_before: self.selection_before.clone(),
                selection_after: self.selection_after.clone(),
            },
            key,
        )
    }

    /// Supersede the entity at `key`, merging `patch` into its data.
    pub fn merge_entity_data(
        &self,
        key: EntityKey,
        patch: &EntityData,
    ) -> Self {
        Self {
            blocks: self.blocks.clone(),
            entities: Arc::new(self.entities.merge_data(key, patch)),
            selection_before: self.selection_before.clone(),
            selection_after: self.selection_after.clone(),
        }
    }

    /// Supersede the entity at `key` with entirely new data.
    pub fn replace_entity_data(
        &self,
        key: EntityKey,
        data: EntityData,
    ) -> Self {
        Self {
            blocks: self.blocks.clone(),
            entities: Arc::new(self.entities.replace_data(key, data)),
            selection_before: self.selection_before.clone(),
            selection_after: self.selection_after.clone(),
        }
    }
}

impl DocumentState<crate::block::ContentBlock> {
    /// A flat-block document from plain text; lines become unstyled
    /// blocks. Empty input yields a single empty block.
    pub fn from_text(text: &str) -> Self {
        Self::from_blocks(
            text.split('\n').map(crate::block::ContentBlock::of_text),
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::DocumentState;
    use crate::block::{ContentBlock, TextBlock};
    use crate::entity::{EntityData, EntityInstance, EntityMutability};

    fn link_instance() -> EntityInstance {
        let mut data = EntityData::new();
        data.insert("url".to_owned(), json!("https://example.org"));
        EntityInstance::new("LINK", EntityMutability::Mutable, data)
    }

    #[test]
    fn from_text_splits_lines_into_blocks() {
        let doc = DocumentState::from_text("abc\ndef");
        assert_eq!(doc.block_map().len(), 2);
        assert_eq!(doc.plain_text(), "abc\ndef");
    }

    #[test]
    fn empty_text_still_yields_one_block() {
        let doc = DocumentState::from_text("");
        assert_eq!(doc.block_map().len(), 1);
        assert!(doc.block_map().first().unwrap().is_empty());
    }

    #[test]
    fn initial_selection_sits_at_the_first_block() {
        let doc = DocumentState::from_text("abc\ndef");
        let first = doc.block_map().first().unwrap().key().clone();
        assert_eq!(doc.selection_after().anchor_key, first);
        assert!(doc.selection_after().is_collapsed());
    }

    #[test]
    fn unchanged_states_share_content() {
        let doc = DocumentState::from_text("abc");
        let copy = doc.unchanged();
        assert!(doc.shares_content_with(&copy));
    }

    #[test]
    fn selection_moves_share_content() {
        let doc = DocumentState::from_text("abc");
        let key = doc.block_map().first().unwrap().key().clone();
        let moved = doc.with_selection(
            crate::selection::SelectionState::collapsed(key, 2),
        );
        assert!(doc.shares_content_with(&moved));
        assert_eq!(moved.selection_after().anchor_offset, 2);
    }

    #[test]
    fn creating_an_entity_forks_the_table_only() {
        let doc = DocumentState::from_text("abc");
        let (with_entity, key) = doc.create_entity(link_instance());
        assert!(doc.entity_table().get(key).is_none());
        assert_eq!(with_entity.entity(key).entity_type(), "LINK");
        // Blocks are still shared.
        assert!(std::sync::Arc::ptr_eq(
            &doc.blocks,
            &with_entity.blocks
        ));
    }

    #[test]
    #[should_panic(expected = "unknown block key")]
    fn unknown_block_key_panics() {
        let doc = DocumentState::from_text("abc");
        let _ = doc.block(&crate::block::BlockKey::from("nope"));
    }

    #[test]
    #[should_panic(expected = "at least one block")]
    fn empty_block_list_panics() {
        let _ = DocumentState::<ContentBlock>::from_blocks(vec![]);
    }
}
