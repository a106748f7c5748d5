// Copyright 2026 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Text operations: insertion, replacement, direction-aware removal.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use widestring::{Utf16Str, Utf16String};

use crate::block::{BlockKey, TextBlock, TreeLinks};
use crate::block_map::BlockMap;
use crate::char_meta::CharacterMetadata;
use crate::document::DocumentState;
use crate::entity::EntityKey;
use crate::entity_removal::{
    resolve_removal_range, strip_edge_entities, RemovalDirection,
};
use crate::selection::SelectionState;

/// Splice `[start, end)` of `block` out, inserting `text`/`chars` in
/// its place. The workhorse behind every single-block edit.
pub(crate) fn spliced<B: TextBlock>(
    block: &B,
    start: usize,
    end: usize,
    text: &Utf16Str,
    chars: &[CharacterMetadata],
) -> B {
    assert!(
        start <= end && end <= block.len(),
        "splice range out of bounds for block {}",
        block.key()
    );
    let mut new_text = Utf16String::new();
    new_text.push_utfstr(&block.text()[..start]);
    new_text.push_utfstr(text);
    new_text.push_utfstr(&block.text()[end..]);

    let mut new_chars =
        Vec::with_capacity(block.len() - (end - start) + chars.len());
    new_chars.extend_from_slice(&block.chars()[..start]);
    new_chars.extend_from_slice(chars);
    new_chars.extend_from_slice(&block.chars()[end..]);

    block.with_content(new_text, new_chars)
}

/// Insert `text` with uniform `meta` at a collapsed point, returning
/// the new map and the cursor after the inserted text.
pub(crate) fn insert_into<B: TextBlock>(
    blocks: &BlockMap<B>,
    at: &SelectionState,
    text: &Utf16Str,
    meta: CharacterMetadata,
) -> (BlockMap<B>, SelectionState) {
    debug_assert!(at.is_collapsed());
    let key = at.start_key().clone();
    let offset = at.start_offset();
    let block = blocks
        .get(&key)
        .unwrap_or_else(|| panic!("unknown block key: {key}"));
    let chars = vec![meta; text.len()];
    let block = spliced(block, offset, offset, text, &chars);
    let blocks = blocks.replace(block);
    let mut after = SelectionState::collapsed(key, offset + text.len());
    after.has_focus = at.has_focus;
    (blocks, after)
}

/// Delete the literal span `sel` from `blocks`. Cross-block spans merge
/// the two boundary blocks into one under the starting block's key,
/// keeping its type/depth and the ending block's trailing content;
/// interior blocks are dropped. Returns the new map and the collapsed
/// cursor at the deletion point.
pub(crate) fn remove_span<B: TextBlock>(
    blocks: &BlockMap<B>,
    sel: &SelectionState,
) -> (BlockMap<B>, SelectionState) {
    let start_key = sel.start_key().clone();
    let end_key = sel.end_key().clone();
    let start_offset = sel.start_offset();
    let end_offset = sel.end_offset();

    let mut after = SelectionState::collapsed(start_key.clone(), start_offset);
    after.has_focus = sel.has_focus;

    if start_key == end_key {
        let block = blocks
            .get(&start_key)
            .unwrap_or_else(|| panic!("unknown block key: {start_key}"));
        let empty = Utf16String::new();
        let block = spliced(block, start_offset, end_offset, &empty, &[]);
        return (blocks.replace(block), after);
    }

    let start_block = blocks
        .get(&start_key)
        .unwrap_or_else(|| panic!("unknown block key: {start_key}"));
    let end_block = blocks
        .get(&end_key)
        .unwrap_or_else(|| panic!("unknown block key: {end_key}"));

    let mut text = Utf16String::new();
    text.push_utfstr(&start_block.text()[..start_offset]);
    text.push_utfstr(&end_block.text()[end_offset..]);
    let mut chars = Vec::with_capacity(text.len());
    chars.extend_from_slice(&start_block.chars()[..start_offset]);
    chars.extend_from_slice(&end_block.chars()[end_offset..]);

    let mut merged = start_block.with_content(text, chars);
    if let Some(links) = start_block.tree_links() {
        merged = merged.with_tree_links(TreeLinks {
            next_sibling: end_block.next_sibling().cloned(),
            ..links.clone()
        });
    }

    let dropped: BTreeSet<BlockKey> = blocks
        .keys_in_range(&start_key, &end_key)
        .into_iter()
        .filter(|k| *k != start_key)
        .collect();
    let mut alias = BTreeMap::new();
    alias.insert(end_key.clone(), start_key.clone());

    let merged_map =
        blocks.replace_span(&start_key, &end_key, vec![merged]);
    (scrub_tree_links(merged_map, &dropped, &alias), after)
}

/// Repair tree links after blocks were dropped: children lists lose
/// dropped keys, sibling/parent pointers follow `alias` or fall back
/// to `None`.
fn scrub_tree_links<B: TextBlock>(
    blocks: BlockMap<B>,
    dropped: &BTreeSet<BlockKey>,
    alias: &BTreeMap<BlockKey, BlockKey>,
) -> BlockMap<B> {
    let fix = |key: &Option<BlockKey>| -> Option<BlockKey> {
        match key {
            Some(k) if dropped.contains(k) => alias.get(k).cloned(),
            other => other.clone(),
        }
    };

    let mut out = blocks.clone();
    for block in blocks.iter() {
        let Some(links) = block.tree_links() else {
            continue;
        };
        let touches_dropped = links
            .children
            .iter()
            .chain(&links.parent)
            .chain(&links.prev_sibling)
            .chain(&links.next_sibling)
            .any(|k| dropped.contains(k));
        if !touches_dropped {
            continue;
        }
        out = out.replace(block.with_tree_links(TreeLinks {
            parent: fix(&links.parent),
            prev_sibling: fix(&links.prev_sibling),
            next_sibling: fix(&links.next_sibling),
            children: links
                .children
                .iter()
                .filter(|k| !dropped.contains(k))
                .map(|k| alias.get(k).unwrap_or(k).clone())
                .collect(),
        }));
    }
    out
}

/// Splice `text` with uniform style/entity metadata at a collapsed
/// selection.
///
/// Panics if `sel` is not collapsed — inserting over a range is
/// [`replace_text`]'s job. Empty `text` is a no-op.
pub fn insert_text<B: TextBlock>(
    state: &DocumentState<B>,
    sel: &SelectionState,
    text: &str,
    styles: Option<Arc<BTreeSet<String>>>,
    entity: Option<EntityKey>,
) -> DocumentState<B> {
    assert!(
        sel.is_collapsed(),
        "insert_text requires a collapsed selection"
    );
    if text.is_empty() {
        return state.unchanged();
    }
    if let Some(key) = entity {
        let _ = state.entity(key); // dangling keys abort here
    }
    let meta = CharacterMetadata::with_style_set(
        styles.unwrap_or_else(|| CharacterMetadata::new().style_set()),
        entity,
    );
    let text = Utf16String::from_str(text);
    let (blocks, after) =
        insert_into(state.block_map(), sel, &text, meta);
    state.with_content(blocks, sel.clone(), after)
}

/// Remove the selected range, consulting the entity-aware resolver.
///
/// A range fully inside one entity resolves through the mutability
/// policy (whole-span for `IMMUTABLE`, segment-wise for `SEGMENTED`);
/// any other range strips the entities straddled by its two edges and
/// deletes the literal span. A collapsed selection is a no-op.
pub fn remove_range<B: TextBlock>(
    state: &DocumentState<B>,
    sel: &SelectionState,
    direction: RemovalDirection,
) -> DocumentState<B> {
    if sel.is_collapsed() {
        return state.unchanged();
    }

    let start_entity =
        state.block(sel.start_key()).entity_at(sel.start_offset());
    let end_entity = if sel.end_offset() > 0 {
        state.block(sel.end_key()).entity_at(sel.end_offset() - 1)
    } else {
        None
    };
    let inside_one_entity = sel.is_single_block()
        && start_entity.is_some()
        && start_entity == end_entity;

    let effective = resolve_removal_range(state, sel, direction);
    let blocks = if inside_one_entity {
        // The resolver already chose exactly what to delete; stripping
        // edges here would untag the entity text that survives.
        state.block_map().clone()
    } else {
        strip_edge_entities(state, &effective)
    };
    let (blocks, after) = remove_span(&blocks, &effective);
    state.with_content(blocks, sel.clone(), after)
}

/// Replace the selected range with `text`: strip edge entities, delete
/// the range, insert — fused so the cursor lands after the inserted
/// text.
pub fn replace_text<B: TextBlock>(
    state: &DocumentState<B>,
    sel: &SelectionState,
    text: &str,
    styles: Option<Arc<BTreeSet<String>>>,
    entity: Option<EntityKey>,
) -> DocumentState<B> {
    if sel.is_collapsed() {
        return insert_text(state, sel, text, styles, entity);
    }
    if let Some(key) = entity {
        let _ = state.entity(key);
    }
    let blocks = strip_edge_entities(state, sel);
    let (blocks, cursor) = remove_span(&blocks, sel);
    if text.is_empty() {
        return state.with_content(blocks, sel.clone(), cursor);
    }
    let meta = CharacterMetadata::with_style_set(
        styles.unwrap_or_else(|| CharacterMetadata::new().style_set()),
        entity,
    );
    let text = Utf16String::from_str(text);
    let (blocks, after) = insert_into(&blocks, &cursor, &text, meta);
    state.with_content(blocks, sel.clone(), after)
}
