// Copyright 2026 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Fragments: extracting a selected span as standalone blocks and
//! splicing such blocks back in (copy, paste, drag-and-drop moves).

use crate::block::{BlockKey, TextBlock, TreeLinks};
use crate::block_map::BlockMap;
use crate::document::DocumentState;
use crate::entity_removal::strip_edge_entities;
use crate::modifier::{remove_span, spliced};
use crate::selection::SelectionState;

/// What happens to the block a fragment lands in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockDataMerge {
    /// The landing block takes the fragment's type, depth and data.
    Replace,
    /// The landing block keeps its own type, depth and data.
    Retain,
}

/// Copy the selected span out as a standalone block map.
///
/// The boundary blocks are sliced to the selection offsets; interior
/// blocks are copied whole. Every key is regenerated so the fragment
/// can be re-inserted anywhere without collisions (tree links are
/// remapped alongside; links pointing outside the span are dropped).
/// A collapsed selection yields an empty map.
pub fn extract_fragment<B: TextBlock>(
    state: &DocumentState<B>,
    sel: &SelectionState,
) -> BlockMap<B> {
    if sel.is_collapsed() {
        return BlockMap::new();
    }

    let slice = |block: &B, from: usize, to: usize| -> B {
        block.with_content(
            block.text()[from..to].to_owned(),
            block.chars()[from..to].to_vec(),
        )
    };

    let mut blocks = Vec::new();
    if sel.is_single_block() {
        let block = state.block(sel.start_key());
        blocks.push(slice(block, sel.start_offset(), sel.end_offset()));
    } else {
        for key in state
            .block_map()
            .keys_in_range(sel.start_key(), sel.end_key())
        {
            let block = state.block(&key);
            if key == *sel.start_key() {
                blocks.push(slice(block, sel.start_offset(), block.len()));
            } else if key == *sel.end_key() {
                blocks.push(slice(block, 0, sel.end_offset()));
            } else {
                blocks.push(block.clone());
            }
        }
    }
    let (fragment, _) =
        BlockMap::from_blocks(blocks).with_regenerated_keys();
    fragment
}

/// Replace the selected range with a fragment of blocks.
///
/// The fragment's first block merges its text into the landing block
/// (type/depth/data per `data_merge`); its last block absorbs the
/// landing block's trailing text under the fragment block's key;
/// interior blocks are inserted verbatim. The fragment's keys are
/// regenerated on every call so the same fragment can be pasted
/// repeatedly. An empty fragment is a no-op. The cursor lands at the
/// end of the inserted content.
pub fn replace_with_fragment<B: TextBlock>(
    state: &DocumentState<B>,
    sel: &SelectionState,
    fragment: &BlockMap<B>,
    data_merge: BlockDataMerge,
) -> DocumentState<B> {
    if fragment.is_empty() {
        return state.unchanged();
    }

    let (blocks, cursor) = if sel.is_collapsed() {
        (state.block_map().clone(), sel.clone())
    } else {
        let stripped = strip_edge_entities(state, sel);
        remove_span(&stripped, sel)
    };

    let (fragment, _) = fragment.with_regenerated_keys();

    let target_key = cursor.start_key().clone();
    let offset = cursor.start_offset();
    let target = blocks
        .get(&target_key)
        .unwrap_or_else(|| panic!("unknown block key: {target_key}"))
        .clone();

    if fragment.len() == 1 {
        let frag = fragment.first().expect("non-empty fragment");
        let mut merged =
            spliced(&target, offset, offset, frag.text(), frag.chars());
        if data_merge == BlockDataMerge::Replace {
            merged = merged
                .with_type(frag.block_type())
                .with_depth(frag.depth())
                .with_data(frag.data().clone());
        }
        let blocks = blocks.replace(merged);
        let mut after =
            SelectionState::collapsed(target_key, offset + frag.len());
        after.has_focus = sel.has_focus;
        return state.with_content(blocks, sel.clone(), after);
    }

    let first = fragment.first().expect("non-empty fragment");
    let last = fragment.last().expect("non-empty fragment");

    // Head: landing block's prefix + the first fragment block's text,
    // under the landing block's key.
    let mut head_text = target.text()[..offset].to_owned();
    head_text.push_utfstr(first.text());
    let mut head_chars = target.chars()[..offset].to_vec();
    head_chars.extend_from_slice(first.chars());
    let mut head = target.with_content(head_text, head_chars);
    if data_merge == BlockDataMerge::Replace {
        head = head
            .with_type(first.block_type())
            .with_depth(first.depth())
            .with_data(first.data().clone());
    }

    // Tail: the last fragment block + the landing block's suffix, under
    // the fragment block's key and identity.
    let cursor_offset = last.len();
    let mut tail_text = last.text().to_owned();
    tail_text.push_utfstr(&target.text()[offset..]);
    let mut tail_chars = last.chars().to_vec();
    tail_chars.extend_from_slice(&target.chars()[offset..]);
    let tail = last.with_content(tail_text, tail_chars);
    let tail_key = tail.key().clone();

    let mut inserted = vec![head];
    for block in fragment.iter().skip(1) {
        if block.key() == last.key() {
            inserted.push(tail.clone());
        } else {
            inserted.push(block.clone());
        }
    }

    // For tree documents, chain the fragment's root blocks as siblings
    // of the landing block; nested subtrees keep their remapped links.
    let old_next = target.next_sibling().cloned();
    let mut last_root_key = tail_key.clone();
    let mut root_keys: Vec<BlockKey> = Vec::new();
    if target.tree_links().is_some() {
        let roots: Vec<usize> = inserted
            .iter()
            .enumerate()
            .filter(|(i, b)| *i == 0 || b.parent().is_none())
            .map(|(i, _)| i)
            .collect();
        for (pos, &i) in roots.iter().enumerate() {
            let prev = if pos == 0 {
                target.prev_sibling().cloned()
            } else {
                Some(inserted[roots[pos - 1]].key().clone())
            };
            let next = roots
                .get(pos + 1)
                .map(|&j| inserted[j].key().clone())
                .or_else(|| old_next.clone());
            let children = inserted[i]
                .tree_links()
                .map(|l| l.children.clone())
                .unwrap_or_default();
            let relinked = inserted[i].with_tree_links(TreeLinks {
                parent: target.parent().cloned(),
                prev_sibling: prev,
                next_sibling: next,
                children,
            });
            inserted[i] = relinked;
        }
        last_root_key =
            inserted[*roots.last().expect("head is a root")].key().clone();
        root_keys = roots
            .iter()
            .skip(1)
            .map(|&i| inserted[i].key().clone())
            .collect();
    }

    let mut blocks = blocks.replace_span(&target_key, &target_key, inserted);

    if target.tree_links().is_some() {
        if let Some(next_key) = old_next {
            let next = blocks
                .get(&next_key)
                .unwrap_or_else(|| {
                    panic!("dangling next sibling: {next_key}")
                })
                .clone();
            if let Some(links) = next.tree_links() {
                blocks = blocks.replace(next.with_tree_links(TreeLinks {
                    prev_sibling: Some(last_root_key),
                    ..links.clone()
                }));
            }
        }
        if let Some(parent_key) = target.parent().cloned() {
            let parent = blocks
                .get(&parent_key)
                .unwrap_or_else(|| panic!("dangling parent: {parent_key}"))
                .clone();
            if let Some(links) = parent.tree_links() {
                let mut children = links.children.clone();
                let at = children
                    .iter()
                    .position(|k| *k == target_key)
                    .expect("landing block missing from its parent's children");
                for (n, key) in root_keys.into_iter().enumerate() {
                    children.insert(at + 1 + n, key);
                }
                blocks = blocks.replace(parent.with_tree_links(TreeLinks {
                    children,
                    ..links.clone()
                }));
            }
        }
    }

    let mut after = SelectionState::collapsed(tail_key, cursor_offset);
    after.has_focus = sel.has_focus;
    state.with_content(blocks, sel.clone(), after)
}

/// Move the selected span to a collapsed target point.
///
/// Equivalent to extract + literal removal + fragment insertion, fused
/// so the target offsets are re-anchored after the removal and the
/// recorded pre-edit selection stays the moved range.
///
/// Panics if `target` is not collapsed or lies strictly inside the
/// moved span. A collapsed source selection is a no-op.
pub fn move_text<B: TextBlock>(
    state: &DocumentState<B>,
    sel: &SelectionState,
    target: &SelectionState,
) -> DocumentState<B> {
    assert!(
        target.is_collapsed(),
        "move_text requires a collapsed target"
    );
    if sel.is_collapsed() {
        return state.unchanged();
    }

    let span_keys = state
        .block_map()
        .keys_in_range(sel.start_key(), sel.end_key());
    let inside = span_keys.contains(target.start_key()) && {
        let key = target.start_key();
        let offset = target.start_offset();
        if sel.is_single_block() {
            offset > sel.start_offset() && offset < sel.end_offset()
        } else if key == sel.start_key() {
            offset > sel.start_offset()
        } else if key == sel.end_key() {
            offset < sel.end_offset()
        } else {
            true
        }
    };
    assert!(!inside, "move_text target lies inside the moved span");

    let fragment = extract_fragment(state, sel);

    // Literal removal: the moved span is exactly what was extracted, so
    // the entity-aware resolver must not widen it.
    let stripped = strip_edge_entities(state, sel);
    let (blocks, cursor) = remove_span(&stripped, sel);
    let removed = state.with_content(blocks, sel.clone(), cursor);

    // Re-anchor the target: everything at or past the span's end now
    // lives in the starting block, shifted by the removed length.
    let adjusted = if target.start_key() == sel.end_key()
        && target.start_offset() >= sel.end_offset()
    {
        let mut adjusted = SelectionState::collapsed(
            sel.start_key().clone(),
            sel.start_offset()
                + (target.start_offset() - sel.end_offset()),
        );
        adjusted.has_focus = target.has_focus;
        adjusted
    } else {
        target.clone()
    };

    replace_with_fragment(
        &removed,
        &adjusted,
        &fragment,
        BlockDataMerge::Retain,
    )
    .with_selection_before(sel.clone())
}

#[cfg(test)]
mod tests {
    use super::{
        extract_fragment, move_text, replace_with_fragment, BlockDataMerge,
    };
    use crate::block::{BlockType, ContentBlock, TextBlock};
    use crate::document::DocumentState;
    use crate::selection::SelectionState;

    fn doc(text: &str) -> DocumentState<ContentBlock> {
        DocumentState::from_text(text)
    }

    fn key_at(
        doc: &DocumentState<ContentBlock>,
        index: usize,
    ) -> crate::block::BlockKey {
        doc.block_map().at(index).unwrap().key().clone()
    }

    fn span(
        doc: &DocumentState<ContentBlock>,
        start: (usize, usize),
        end: (usize, usize),
    ) -> SelectionState {
        SelectionState {
            anchor_key: key_at(doc, start.0),
            anchor_offset: start.1,
            focus_key: key_at(doc, end.0),
            focus_offset: end.1,
            is_backward: false,
            has_focus: false,
        }
    }

    // ===================================================================
    // extract_fragment
    // ===================================================================

    #[test]
    fn extracting_within_one_block_slices_the_text() {
        let doc = doc("hello world");
        let sel = SelectionState::range_in(key_at(&doc, 0), 0, 5);
        let fragment = extract_fragment(&doc, &sel);
        assert_eq!(fragment.len(), 1);
        assert_eq!(
            fragment.first().unwrap().text().to_string(),
            "hello"
        );
    }

    #[test]
    fn extracting_across_blocks_slices_the_boundaries() {
        let doc = doc("one\ntwo\nthree");
        let sel = span(&doc, (0, 1), (2, 2));
        let fragment = extract_fragment(&doc, &sel);
        let texts: Vec<String> =
            fragment.iter().map(|b| b.text().to_string()).collect();
        assert_eq!(texts, vec!["ne", "two", "th"]);
    }

    #[test]
    fn extracted_fragments_carry_fresh_keys() {
        let doc = doc("one\ntwo");
        let sel = span(&doc, (0, 0), (1, 3));
        let fragment = extract_fragment(&doc, &sel);
        for key in doc.block_map().keys() {
            assert!(!fragment.contains_key(key));
        }
    }

    #[test]
    fn extracting_a_collapsed_selection_yields_nothing() {
        let doc = doc("abc");
        let sel = SelectionState::collapsed(key_at(&doc, 0), 1);
        assert!(extract_fragment(&doc, &sel).is_empty());
    }

    // ===================================================================
    // replace_with_fragment
    // ===================================================================

    #[test]
    fn a_single_block_fragment_splices_into_the_landing_block() {
        let source = doc("XYZ");
        let all = SelectionState::range_in(key_at(&source, 0), 0, 3);
        let fragment = extract_fragment(&source, &all);

        let doc = doc("ab");
        let at = SelectionState::collapsed(key_at(&doc, 0), 1);
        let next = replace_with_fragment(
            &doc,
            &at,
            &fragment,
            BlockDataMerge::Retain,
        );
        assert_eq!(next.plain_text(), "aXYZb");
        assert_eq!(next.selection_after().anchor_offset, 4);
    }

    #[test]
    fn a_multi_block_fragment_splits_the_landing_block() {
        let source = doc("XX\nYY");
        let all = span(&source, (0, 0), (1, 2));
        let fragment = extract_fragment(&source, &all);

        let doc = doc("ab");
        let at = SelectionState::collapsed(key_at(&doc, 0), 1);
        let next = replace_with_fragment(
            &doc,
            &at,
            &fragment,
            BlockDataMerge::Retain,
        );
        assert_eq!(next.plain_text(), "aXX\nYYb");
        assert_eq!(next.block_map().len(), 2);
        // The head keeps the landing block's key; the tail gets the
        // fragment's.
        assert_eq!(next.block_map().at(0).unwrap().key(), &key_at(&doc, 0));
        assert_eq!(
            next.selection_after().anchor_key,
            *next.block_map().at(1).unwrap().key()
        );
        assert_eq!(next.selection_after().anchor_offset, 2);
    }

    #[test]
    fn replacing_a_range_deletes_it_first() {
        let source = doc("Z");
        let all = SelectionState::range_in(key_at(&source, 0), 0, 1);
        let fragment = extract_fragment(&source, &all);

        let doc = doc("abcdef");
        let sel = SelectionState::range_in(key_at(&doc, 0), 1, 4);
        let next = replace_with_fragment(
            &doc,
            &sel,
            &fragment,
            BlockDataMerge::Retain,
        );
        assert_eq!(next.plain_text(), "aZef");
    }

    #[test]
    fn an_empty_fragment_is_a_referential_noop() {
        let doc = doc("abc");
        let sel = SelectionState::collapsed(key_at(&doc, 0), 1);
        let next = replace_with_fragment(
            &doc,
            &sel,
            &crate::block_map::BlockMap::new(),
            BlockDataMerge::Retain,
        );
        assert!(doc.shares_content_with(&next));
    }

    #[test]
    fn replace_merge_takes_the_fragment_block_type() {
        let source = doc("quoted");
        let styled = source
            .block_map()
            .first()
            .unwrap()
            .with_type(BlockType::Blockquote);
        let blocks = source.block_map().replace(styled);
        let source = source.with_content(
            blocks,
            source.selection_before().clone(),
            source.selection_after().clone(),
        );
        let all = SelectionState::range_in(key_at(&source, 0), 0, 6);
        let fragment = extract_fragment(&source, &all);

        let doc = doc("ab");
        let at = SelectionState::collapsed(key_at(&doc, 0), 1);
        let retained = replace_with_fragment(
            &doc,
            &at,
            &fragment,
            BlockDataMerge::Retain,
        );
        let replaced = replace_with_fragment(
            &doc,
            &at,
            &fragment,
            BlockDataMerge::Replace,
        );
        assert_eq!(
            retained.block_map().first().unwrap().block_type(),
            BlockType::Unstyled
        );
        assert_eq!(
            replaced.block_map().first().unwrap().block_type(),
            BlockType::Blockquote
        );
    }

    #[test]
    fn the_same_fragment_can_be_pasted_twice() {
        let source = doc("XX\nYY");
        let all = span(&source, (0, 0), (1, 2));
        let fragment = extract_fragment(&source, &all);

        let doc = doc("ab");
        let at = SelectionState::collapsed(key_at(&doc, 0), 1);
        let once = replace_with_fragment(
            &doc,
            &at,
            &fragment,
            BlockDataMerge::Retain,
        );
        let again = replace_with_fragment(
            &once,
            once.selection_after(),
            &fragment,
            BlockDataMerge::Retain,
        );
        assert_eq!(again.plain_text(), "aXX\nYYXX\nYYb");
    }

    // ===================================================================
    // move_text
    // ===================================================================

    #[test]
    fn moving_text_forward_within_a_block() {
        let doc = doc("abcdef");
        let sel = SelectionState::range_in(key_at(&doc, 0), 0, 2);
        let target = SelectionState::collapsed(key_at(&doc, 0), 4);
        let next = move_text(&doc, &sel, &target);
        assert_eq!(next.plain_text(), "cdabef");
    }

    #[test]
    fn moving_text_backward_within_a_block() {
        let doc = doc("abcdef");
        let sel = SelectionState::range_in(key_at(&doc, 0), 4, 6);
        let target = SelectionState::collapsed(key_at(&doc, 0), 1);
        let next = move_text(&doc, &sel, &target);
        assert_eq!(next.plain_text(), "aefbcd");
    }

    #[test]
    fn moving_text_across_blocks() {
        let doc = doc("one\ntwo");
        let sel = SelectionState::range_in(key_at(&doc, 1), 0, 3);
        let target = SelectionState::collapsed(key_at(&doc, 0), 0);
        let next = move_text(&doc, &sel, &target);
        assert_eq!(next.plain_text(), "twoone\n");
    }

    #[test]
    fn moving_records_the_moved_span_as_the_pre_edit_selection() {
        let doc = doc("abcdef");
        let sel = SelectionState::range_in(key_at(&doc, 0), 0, 2);
        let target = SelectionState::collapsed(key_at(&doc, 0), 4);
        let next = move_text(&doc, &sel, &target);
        assert_eq!(next.selection_before(), &sel);
    }

    #[test]
    #[should_panic(expected = "inside the moved span")]
    fn moving_onto_the_span_itself_panics() {
        let doc = doc("abcdef");
        let sel = SelectionState::range_in(key_at(&doc, 0), 1, 5);
        let target = SelectionState::collapsed(key_at(&doc, 0), 3);
        let _ = move_text(&doc, &sel, &target);
    }

    #[test]
    #[should_panic(expected = "collapsed target")]
    fn a_range_target_panics() {
        let doc = doc("abcdef");
        let sel = SelectionState::range_in(key_at(&doc, 0), 0, 2);
        let target = SelectionState::range_in(key_at(&doc, 0), 4, 5);
        let _ = move_text(&doc, &sel, &target);
    }
}
