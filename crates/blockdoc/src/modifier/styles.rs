// Copyright 2026 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Character-level annotation edits: inline styles and entity stamps
//! over a selected range.

use crate::block::TextBlock;
use crate::block_map::BlockMap;
use crate::char_meta::CharacterMetadata;
use crate::document::DocumentState;
use crate::entity::EntityKey;
use crate::entity_removal::strip_edge_entities;
use crate::selection::SelectionState;

/// Add `style` to every character in the selected range.
///
/// A collapsed selection, or a range where every character already
/// carries the style, shares all content with the input.
pub fn apply_inline_style<B: TextBlock>(
    state: &DocumentState<B>,
    sel: &SelectionState,
    style: &str,
) -> DocumentState<B> {
    map_chars_in_range(state, sel, |meta| {
        if meta.has_style(style) {
            None
        } else {
            Some(meta.apply_style(style))
        }
    })
}

/// Remove `style` from every character in the selected range.
pub fn remove_inline_style<B: TextBlock>(
    state: &DocumentState<B>,
    sel: &SelectionState,
    style: &str,
) -> DocumentState<B> {
    map_chars_in_range(state, sel, |meta| {
        if meta.has_style(style) {
            Some(meta.remove_style(style))
        } else {
            None
        }
    })
}

/// Stamp the selected range with an entity reference (or clear it with
/// `None`).
///
/// Entities straddling the range's edges are stripped first so a stamp
/// never leaves a partially re-tagged neighbour behind. Panics on a
/// dangling key.
pub fn apply_entity<B: TextBlock>(
    state: &DocumentState<B>,
    sel: &SelectionState,
    entity: Option<EntityKey>,
) -> DocumentState<B> {
    if let Some(key) = entity {
        let _ = state.entity(key); // dangling keys abort here
    }
    if sel.is_collapsed() {
        return state.unchanged();
    }
    let blocks = strip_edge_entities(state, sel);
    let (blocks, changed) =
        map_chars(&blocks, sel, |meta| {
            if meta.entity() == entity {
                None
            } else {
                Some(meta.set_entity(entity))
            }
        });
    // Stripping alone counts as a change even when every character
    // already carried the reference.
    if !changed && state.block_map().keys().eq(blocks.keys()) {
        let untouched = state
            .block_map()
            .iter()
            .zip(blocks.iter())
            .all(|(a, b)| a.chars() == b.chars());
        if untouched {
            return state.unchanged();
        }
    }
    state.with_content(blocks, sel.clone(), sel.clone())
}

fn map_chars_in_range<B: TextBlock>(
    state: &DocumentState<B>,
    sel: &SelectionState,
    edit: impl Fn(&CharacterMetadata) -> Option<CharacterMetadata>,
) -> DocumentState<B> {
    if sel.is_collapsed() {
        return state.unchanged();
    }
    let (blocks, changed) = map_chars(state.block_map(), sel, edit);
    if !changed {
        return state.unchanged();
    }
    state.with_content(blocks, sel.clone(), sel.clone())
}

/// Apply `edit` to every character the selection covers, block by
/// block. Returns the new map and whether anything changed; `edit`
/// returns `None` for characters already in the target shape.
fn map_chars<B: TextBlock>(
    blocks: &BlockMap<B>,
    sel: &SelectionState,
    edit: impl Fn(&CharacterMetadata) -> Option<CharacterMetadata>,
) -> (BlockMap<B>, bool) {
    let mut out = blocks.clone();
    let mut changed = false;
    for key in blocks.keys_in_range(sel.start_key(), sel.end_key()) {
        let block = blocks
            .get(&key)
            .unwrap_or_else(|| panic!("unknown block key: {key}"));
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
        assert!(
            from <= to && to <= block.len(),
            "selection offset out of bounds for block {key}"
        );

        let mut chars = block.chars().to_vec();
        let mut block_changed = false;
        for meta in &mut chars[from..to] {
            if let Some(edited) = edit(meta) {
                *meta = edited;
                block_changed = true;
            }
        }
        if block_changed {
            out = out.replace(
                block.with_content(block.text().to_owned(), chars),
            );
            changed = true;
        }
    }
    (out, changed)
}
