// Copyright 2026 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Block splitting (the enter key, at the model level).

use crate::block::{BlockKey, BlockType, TextBlock, TreeLinks};
use crate::document::DocumentState;
use crate::entity_removal::strip_edge_entities;
use crate::selection::SelectionState;

/// Divide the block under a collapsed selection in two at the offset.
///
/// The first half keeps the original key; the second half gets a fresh
/// key and inherits type, depth and data. The split point is
/// entity-stripped first so no annotation straddles the new boundary.
/// For tree blocks, sibling/parent links on both halves and their
/// former neighbours are relinked.
///
/// Splitting an *empty list item* does not split at all: the block is
/// demoted to an unstyled block at depth 0, mirroring "press enter on
/// an empty list item to exit the list".
///
/// Panics if `sel` is not collapsed.
pub fn split_block<B: TextBlock>(
    state: &DocumentState<B>,
    sel: &SelectionState,
) -> DocumentState<B> {
    assert!(
        sel.is_collapsed(),
        "split_block requires a collapsed selection"
    );
    let key = sel.start_key().clone();
    let offset = sel.start_offset();
    let block = state.block(&key);
    assert!(
        offset <= block.len(),
        "split offset out of bounds for block {key}"
    );

    if block.is_empty() && block.block_type().is_list_item() {
        let demoted =
            block.with_type(BlockType::Unstyled).with_depth(0);
        let blocks = state.block_map().replace(demoted);
        let mut after = SelectionState::collapsed(key, 0);
        after.has_focus = sel.has_focus;
        return state.with_content(blocks, sel.clone(), after);
    }

    let blocks = strip_edge_entities(state, sel);
    let block = blocks
        .get(&key)
        .unwrap_or_else(|| panic!("unknown block key: {key}"))
        .clone();

    let second_key = BlockKey::generate();
    let mut first = block.with_content(
        block.text()[..offset].to_owned(),
        block.chars()[..offset].to_vec(),
    );
    let mut second = block.with_key(second_key.clone()).with_content(
        block.text()[offset..].to_owned(),
        block.chars()[offset..].to_vec(),
    );

    let old_next = block.next_sibling().cloned();
    if let Some(links) = block.tree_links() {
        first = first.with_tree_links(TreeLinks {
            next_sibling: Some(second_key.clone()),
            ..links.clone()
        });
        second = second.with_tree_links(TreeLinks {
            parent: links.parent.clone(),
            prev_sibling: Some(key.clone()),
            next_sibling: links.next_sibling.clone(),
            children: Vec::new(),
        });
    }

    let mut blocks = blocks.replace(first).insert_after(&key, second);

    // Former neighbours: the old next sibling now follows the second
    // half, and the parent gains the second half right after the first.
    if let Some(next_key) = old_next {
        let next = blocks
            .get(&next_key)
            .unwrap_or_else(|| panic!("dangling next sibling: {next_key}"))
            .clone();
        if let Some(links) = next.tree_links() {
            blocks = blocks.replace(next.with_tree_links(TreeLinks {
                prev_sibling: Some(second_key.clone()),
                ..links.clone()
            }));
        }
    }
    if let Some(parent_key) = block.parent().cloned() {
        let parent = blocks
            .get(&parent_key)
            .unwrap_or_else(|| panic!("dangling parent: {parent_key}"))
            .clone();
        if let Some(links) = parent.tree_links() {
            let mut children = links.children.clone();
            let at = children
                .iter()
                .position(|k| *k == key)
                .expect("split block missing from its parent's children");
            children.insert(at + 1, second_key.clone());
            blocks = blocks.replace(parent.with_tree_links(TreeLinks {
                children,
                ..links.clone()
            }));
        }
    }

    let mut after = SelectionState::collapsed(second_key, 0);
    after.has_focus = sel.has_focus;
    state.with_content(blocks, sel.clone(), after)
}

#[cfg(test)]
mod tests {
    use super::split_block;
    use crate::block::{
        BlockType, ContentBlock, TextBlock, TreeBlock, TreeLinks,
    };
    use crate::document::DocumentState;
    use crate::selection::SelectionState;

    fn doc(text: &str) -> DocumentState<ContentBlock> {
        DocumentState::from_text(text)
    }

    fn first_key(
        doc: &DocumentState<ContentBlock>,
    ) -> crate::block::BlockKey {
        doc.block_map().first().unwrap().key().clone()
    }

    #[test]
    fn splitting_divides_text_at_the_offset() {
        let doc = doc("hello world");
        let sel = SelectionState::collapsed(first_key(&doc), 5);
        let next = split_block(&doc, &sel);
        assert_eq!(next.plain_text(), "hello\n world");
        assert_eq!(next.block_map().len(), 2);
    }

    #[test]
    fn first_half_keeps_the_key_second_gets_a_fresh_one() {
        let doc = doc("ab");
        let key = first_key(&doc);
        let sel = SelectionState::collapsed(key.clone(), 1);
        let next = split_block(&doc, &sel);
        assert_eq!(next.block_map().at(0).unwrap().key(), &key);
        assert_ne!(next.block_map().at(1).unwrap().key(), &key);
    }

    #[test]
    fn the_second_half_inherits_type_depth_and_data() {
        let doc = doc("ab");
        let block = doc
            .block_map()
            .first()
            .unwrap()
            .with_type(BlockType::UnorderedListItem)
            .with_depth(2);
        let blocks = doc.block_map().replace(block);
        let doc = doc.with_content(
            blocks,
            doc.selection_before().clone(),
            doc.selection_after().clone(),
        );

        let sel = SelectionState::collapsed(first_key(&doc), 1);
        let next = split_block(&doc, &sel);
        let second = next.block_map().at(1).unwrap();
        assert_eq!(second.block_type(), BlockType::UnorderedListItem);
        assert_eq!(second.depth(), 2);
    }

    #[test]
    fn the_cursor_lands_at_the_start_of_the_second_half() {
        let doc = doc("abcd");
        let sel = SelectionState::collapsed(first_key(&doc), 2);
        let next = split_block(&doc, &sel);
        let second_key = next.block_map().at(1).unwrap().key().clone();
        assert_eq!(next.selection_after().anchor_key, second_key);
        assert_eq!(next.selection_after().anchor_offset, 0);
    }

    #[test]
    fn splitting_an_empty_list_item_demotes_it() {
        let doc = doc("");
        let block = doc
            .block_map()
            .first()
            .unwrap()
            .with_type(BlockType::OrderedListItem)
            .with_depth(1);
        let blocks = doc.block_map().replace(block);
        let doc = doc.with_content(
            blocks,
            doc.selection_before().clone(),
            doc.selection_after().clone(),
        );

        let sel = SelectionState::collapsed(first_key(&doc), 0);
        let next = split_block(&doc, &sel);
        assert_eq!(next.block_map().len(), 1);
        let block = next.block_map().first().unwrap();
        assert_eq!(block.block_type(), BlockType::Unstyled);
        assert_eq!(block.depth(), 0);
    }

    #[test]
    fn splitting_an_empty_unstyled_block_still_splits() {
        let doc = doc("");
        let sel = SelectionState::collapsed(first_key(&doc), 0);
        let next = split_block(&doc, &sel);
        assert_eq!(next.block_map().len(), 2);
    }

    #[test]
    fn tree_blocks_relink_their_siblings() {
        let a = TreeBlock::of_text("aa");
        let b = TreeBlock::of_text("bb");
        let a_key = a.key().clone();
        let b_key = b.key().clone();
        let a = a.with_tree_links(TreeLinks {
            next_sibling: Some(b_key.clone()),
            ..TreeLinks::default()
        });
        let b = b.with_tree_links(TreeLinks {
            prev_sibling: Some(a_key.clone()),
            ..TreeLinks::default()
        });
        let doc = DocumentState::from_blocks([a, b]);

        let sel = SelectionState::collapsed(a_key, 1);
        let next = split_block(&doc, &sel);
        assert_eq!(next.block_map().len(), 3);
        assert!(next.block_map().validate_tree_links().is_ok());

        let second = next.block_map().at(1).unwrap();
        assert_eq!(second.text().to_string(), "a");
        assert_eq!(second.next_sibling(), Some(&b_key));
        let b = next.block_map().at(2).unwrap();
        assert_eq!(b.prev_sibling(), Some(second.key()));
    }

    #[test]
    #[should_panic(expected = "collapsed selection")]
    fn splitting_over_a_range_panics() {
        let doc = doc("abc");
        let sel = SelectionState::range_in(first_key(&doc), 0, 2);
        let _ = split_block(&doc, &sel);
    }
}
