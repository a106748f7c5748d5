// Copyright 2026 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! The stateful editing session: one current document version, an
//! undo/redo history and an optional decoration pass, behind key-level
//! operations (`type_text`, `backspace`, `enter`, …).
//!
//! The transaction functions in [`crate::modifier`] are pure and work
//! in UTF-16 code units; this layer adds what a front end needs on
//! top: grapheme-aware deletion, inline-style and mutable-entity
//! continuation while typing, and history recording with the right
//! change kinds.

use unicode_segmentation::UnicodeSegmentation;

use crate::block::{BlockData, BlockKey, BlockType, TextBlock};
use crate::block_map::BlockMap;
use crate::decorator::{CompositeDecorator, DecorationLeaf};
use crate::document::DocumentState;
use crate::entity::{
    EntityData, EntityInstance, EntityKey, EntityMutability,
};
use crate::entity_removal::RemovalDirection;
use crate::history::{ChangeKind, History};
use crate::modifier;
use crate::modifier::BlockDataMerge;
use crate::selection::SelectionState;

/// An editing session over one document lineage.
pub struct Editor<B: TextBlock> {
    history: History<B>,
    decorator: Option<CompositeDecorator>,
}

impl<B: TextBlock> Editor<B> {
    pub fn new(initial: DocumentState<B>) -> Self {
        Self {
            history: History::new(initial),
            decorator: None,
        }
    }

    pub fn with_decorator(mut self, decorator: CompositeDecorator) -> Self {
        self.decorator = Some(decorator);
        self
    }

    pub fn state(&self) -> &DocumentState<B> {
        self.history.current()
    }

    pub fn selection(&self) -> &SelectionState {
        self.state().selection_after()
    }

    pub fn plain_text(&self) -> String {
        self.state().plain_text()
    }

    // ── Selection ───────────────────────────────────────────────────────

    /// Move the selection. Costs no undo unit.
    ///
    /// Panics if the selection names unknown blocks or offsets past a
    /// block's end.
    pub fn set_selection(&mut self, sel: SelectionState) {
        let state = self.state();
        for (key, offset) in [
            (&sel.anchor_key, sel.anchor_offset),
            (&sel.focus_key, sel.focus_offset),
        ] {
            let block = state.block(key);
            assert!(
                offset <= block.len(),
                "selection offset out of bounds for block {key}"
            );
        }
        let next = state.with_selection(sel);
        self.history.move_selection(next);
    }

    /// Submit a transaction result built directly with the
    /// [`crate::modifier`] functions, recording it under `change`.
    /// Everything the key-level operations below do goes through the
    /// same recording path.
    pub fn apply(&mut self, next: DocumentState<B>, change: ChangeKind) {
        self.history.record(next, change);
    }

    // ── Typing ──────────────────────────────────────────────────────────

    /// Insert `text` at the selection (replacing it if non-collapsed),
    /// continuing the inline styles in force at the insertion point and
    /// extending a `MUTABLE` entity when typing directly after it.
    pub fn type_text(&mut self, text: &str) {
        let state = self.state().clone();
        let sel = state.selection_after().clone();

        let (styles, entity) = if sel.is_collapsed() {
            let block = state.block(sel.start_key());
            let offset = sel.start_offset();
            let styles = if offset > 0 {
                block.style_at(offset - 1)
            } else {
                block.style_at(0)
            };
            let entity = if offset > 0 {
                block.entity_at(offset - 1).filter(|key| {
                    state.entity(*key).mutability()
                        == EntityMutability::Mutable
                })
            } else {
                None
            };
            (styles, entity)
        } else {
            let block = state.block(sel.start_key());
            (block.style_at(sel.start_offset()), None)
        };

        let next =
            modifier::replace_text(&state, &sel, text, Some(styles), entity);
        self.history.record(next, ChangeKind::InsertCharacters);
    }

    /// Delete backward: the selected range if any, else one grapheme
    /// cluster before the cursor; at a block start, merge into the
    /// previous block. A cursor at the document start is a no-op.
    pub fn backspace(&mut self) {
        let state = self.state().clone();
        let sel = state.selection_after().clone();
        let range = if !sel.is_collapsed() {
            sel.clone()
        } else {
            let key = sel.start_key().clone();
            let offset = sel.start_offset();
            if offset == 0 {
                let Some(prev) = state.block_map().block_before(&key)
                else {
                    return;
                };
                SelectionState {
                    anchor_key: prev.key().clone(),
                    anchor_offset: prev.len(),
                    focus_key: key,
                    focus_offset: 0,
                    is_backward: false,
                    has_focus: sel.has_focus,
                }
            } else {
                let block = state.block(&key);
                let width = grapheme_width_before(block, offset);
                let mut range =
                    SelectionState::range_in(key, offset - width, offset);
                range.has_focus = sel.has_focus;
                range
            }
        };
        let next =
            modifier::remove_range(&state, &range, RemovalDirection::Backward)
                .with_selection_before(sel);
        self.history.record(next, ChangeKind::RemoveRange);
    }

    /// Delete forward: the selected range if any, else one grapheme
    /// cluster after the cursor; at a block end, merge the next block
    /// in. A cursor at the document end is a no-op.
    pub fn delete_forward(&mut self) {
        let state = self.state().clone();
        let sel = state.selection_after().clone();
        let range = if !sel.is_collapsed() {
            sel.clone()
        } else {
            let key = sel.start_key().clone();
            let offset = sel.start_offset();
            let block = state.block(&key);
            if offset == block.len() {
                let Some(next) = state.block_map().block_after(&key)
                else {
                    return;
                };
                SelectionState {
                    anchor_key: key,
                    anchor_offset: offset,
                    focus_key: next.key().clone(),
                    focus_offset: 0,
                    is_backward: false,
                    has_focus: sel.has_focus,
                }
            } else {
                let width = grapheme_width_after(block, offset);
                let mut range =
                    SelectionState::range_in(key, offset, offset + width);
                range.has_focus = sel.has_focus;
                range
            }
        };
        let next =
            modifier::remove_range(&state, &range, RemovalDirection::Forward)
                .with_selection_before(sel);
        self.history.record(next, ChangeKind::RemoveRange);
    }

    /// Split the current block at the cursor, deleting the selected
    /// range first if any.
    pub fn enter(&mut self) {
        let state = self.state().clone();
        let sel = state.selection_after().clone();
        let next = if sel.is_collapsed() {
            modifier::split_block(&state, &sel)
        } else {
            let removed = modifier::remove_range(
                &state,
                &sel,
                RemovalDirection::Backward,
            );
            let cursor = removed.selection_after().clone();
            modifier::split_block(&removed, &cursor)
                .with_selection_before(sel)
        };
        self.history.record(next, ChangeKind::SplitBlock);
    }

    // ── Inline styles ───────────────────────────────────────────────────

    /// Toggle `style` over the selected range: removed when every
    /// selected character carries it, applied otherwise. Collapsed
    /// selections are a no-op (there is no pending-style override).
    pub fn toggle_inline_style(&mut self, style: &str) {
        let state = self.state().clone();
        let sel = state.selection_after().clone();
        if sel.is_collapsed() {
            return;
        }
        let next = if range_fully_styled(&state, &sel, style) {
            modifier::remove_inline_style(&state, &sel, style)
        } else {
            modifier::apply_inline_style(&state, &sel, style)
        };
        self.history.record(next, ChangeKind::ChangeInlineStyle);
    }

    pub fn apply_inline_style(&mut self, style: &str) {
        let state = self.state().clone();
        let sel = state.selection_after().clone();
        let next = modifier::apply_inline_style(&state, &sel, style);
        self.history.record(next, ChangeKind::ChangeInlineStyle);
    }

    pub fn remove_inline_style(&mut self, style: &str) {
        let state = self.state().clone();
        let sel = state.selection_after().clone();
        let next = modifier::remove_inline_style(&state, &sel, style);
        self.history.record(next, ChangeKind::ChangeInlineStyle);
    }

    // ── Entities ────────────────────────────────────────────────────────

    /// Register a new entity and stamp it over the selected range in
    /// one recorded step. Returns the assigned key.
    pub fn apply_new_entity(
        &mut self,
        instance: EntityInstance,
    ) -> EntityKey {
        let state = self.state().clone();
        let sel = state.selection_after().clone();
        let (state, key) = state.create_entity(instance);
        let next = modifier::apply_entity(&state, &sel, Some(key));
        self.history.record(next, ChangeKind::ApplyEntity);
        key
    }

    /// Stamp an existing entity (or `None` to clear) over the selected
    /// range.
    pub fn apply_entity(&mut self, entity: Option<EntityKey>) {
        let state = self.state().clone();
        let sel = state.selection_after().clone();
        let next = modifier::apply_entity(&state, &sel, entity);
        self.history.record(next, ChangeKind::ApplyEntity);
    }

    pub fn merge_entity_data(&mut self, key: EntityKey, patch: &EntityData) {
        let next = self.state().merge_entity_data(key, patch);
        self.history.record(next, ChangeKind::ApplyEntity);
    }

    pub fn replace_entity_data(&mut self, key: EntityKey, data: EntityData) {
        let next = self.state().replace_entity_data(key, data);
        self.history.record(next, ChangeKind::ApplyEntity);
    }

    // ── Block metadata ──────────────────────────────────────────────────

    pub fn set_block_type(&mut self, block_type: BlockType) {
        let state = self.state().clone();
        let sel = state.selection_after().clone();
        let next = modifier::set_block_type(&state, &sel, block_type);
        self.history.record(next, ChangeKind::ChangeBlockType);
    }

    pub fn set_block_data(&mut self, data: &BlockData) {
        let state = self.state().clone();
        let sel = state.selection_after().clone();
        let next = modifier::set_block_data(&state, &sel, data);
        self.history.record(next, ChangeKind::ChangeBlockData);
    }

    pub fn merge_block_data(&mut self, patch: &BlockData) {
        let state = self.state().clone();
        let sel = state.selection_after().clone();
        let next = modifier::merge_block_data(&state, &sel, patch);
        self.history.record(next, ChangeKind::ChangeBlockData);
    }

    // ── Fragments ───────────────────────────────────────────────────────

    /// Copy the selected span out as a standalone fragment.
    pub fn selected_fragment(&self) -> BlockMap<B> {
        modifier::extract_fragment(self.state(), self.selection())
    }

    /// Paste a fragment over the selected range.
    pub fn paste_fragment(
        &mut self,
        fragment: &BlockMap<B>,
        data_merge: BlockDataMerge,
    ) {
        let state = self.state().clone();
        let sel = state.selection_after().clone();
        let next =
            modifier::replace_with_fragment(&state, &sel, fragment, data_merge);
        self.history.record(next, ChangeKind::InsertFragment);
    }

    /// Move the selected span to a collapsed target point.
    pub fn move_selected_text(&mut self, target: &SelectionState) {
        let state = self.state().clone();
        let sel = state.selection_after().clone();
        let next = modifier::move_text(&state, &sel, target);
        self.history.record(next, ChangeKind::MoveText);
    }

    // ── History ─────────────────────────────────────────────────────────

    pub fn undo(&mut self) -> bool {
        self.history.undo().is_some()
    }

    pub fn redo(&mut self) -> bool {
        self.history.redo().is_some()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn begin_composition(&mut self) {
        self.history.begin_composition();
    }

    pub fn end_composition(&mut self) {
        self.history.end_composition();
    }

    // ── Decorations ─────────────────────────────────────────────────────

    /// The decoration leaves for one block, or a single undecorated
    /// pass when no decorator is installed.
    pub fn decoration_leaves(&self, key: &BlockKey) -> Vec<DecorationLeaf> {
        let block = self.state().block(key);
        match &self.decorator {
            Some(decorator) => decorator.leaves(block),
            None => CompositeDecorator::new(Vec::new()).leaves(block),
        }
    }

    // ── Debug output ────────────────────────────────────────────────────

    /// The document text with the selection marked: `|` for a cursor,
    /// `{…}|` for a forward range, `|{…}` for a backward one.
    pub fn to_marked_text(&self) -> String {
        let state = self.state();
        let sel = state.selection_after();
        let mut out = String::new();
        for (i, block) in state.block_map().iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            let mut text = block.text().to_string();
            let mut inserts: Vec<(usize, &str)> = Vec::new();
            if sel.is_collapsed() {
                if block.key() == sel.start_key() {
                    inserts.push((sel.start_offset(), "|"));
                }
            } else {
                if block.key() == sel.end_key() {
                    let marker = if sel.is_backward { "}" } else { "}|" };
                    inserts.push((sel.end_offset(), marker));
                }
                if block.key() == sel.start_key() {
                    let marker = if sel.is_backward { "|{" } else { "{" };
                    inserts.push((sel.start_offset(), marker));
                }
            }
            // End before start, so earlier offsets stay valid.
            for (offset, marker) in inserts {
                let byte = byte_of_code_unit(&text, offset);
                text.insert_str(byte, marker);
            }
            out.push_str(&text);
        }
        out
    }

    /// An indented dump of the block structure for debugging.
    pub fn to_tree(&self) -> String {
        let state = self.state();
        let mut out = String::new();
        for block in state.block_map().iter() {
            let indent = "  ".repeat(block.depth() as usize);
            out.push_str(&format!(
                "{}├── {} ({}) \"{}\"\n",
                indent,
                block.key(),
                block.block_type(),
                block.text().to_string(),
            ));
            block.find_entity_ranges(
                |entity| entity.is_some(),
                |start, end| {
                    let key = block
                        .entity_at(start)
                        .expect("filtered on presence");
                    out.push_str(&format!(
                        "{}│     entity {} at {}..{}\n",
                        indent, key, start, end,
                    ));
                },
            );
        }
        out
    }
}

/// Width in code units of the grapheme cluster ending at `offset`.
fn grapheme_width_before<B: TextBlock>(block: &B, offset: usize) -> usize {
    let text = block.text().to_string();
    let byte = byte_of_code_unit(&text, offset);
    text[..byte]
        .graphemes(true)
        .next_back()
        .map(|g| g.encode_utf16().count())
        .unwrap_or(0)
}

/// Width in code units of the grapheme cluster starting at `offset`.
fn grapheme_width_after<B: TextBlock>(block: &B, offset: usize) -> usize {
    let text = block.text().to_string();
    let byte = byte_of_code_unit(&text, offset);
    text[byte..]
        .graphemes(true)
        .next()
        .map(|g| g.encode_utf16().count())
        .unwrap_or(0)
}

/// The byte index in `text` of the UTF-16 code unit `unit`.
fn byte_of_code_unit(text: &str, unit: usize) -> usize {
    let mut units = 0;
    for (byte, ch) in text.char_indices() {
        if units >= unit {
            return byte;
        }
        units += ch.len_utf16();
    }
    text.len()
}

fn range_fully_styled<B: TextBlock>(
    state: &DocumentState<B>,
    sel: &SelectionState,
    style: &str,
) -> bool {
    let mut any = false;
    for key in state
        .block_map()
        .keys_in_range(sel.start_key(), sel.end_key())
    {
        let block = state.block(&key);
        let from = if key == *sel.start_key() {
            sel.start_offset()
        } else {
            0
        };
        let to = if key == *sel.end_key() {
            sel.end_offset()
        } else {
            block.len()
        };
        for meta in &block.chars()[from..to] {
            if !meta.has_style(style) {
                return false;
            }
            any = true;
        }
    }
    any
}
