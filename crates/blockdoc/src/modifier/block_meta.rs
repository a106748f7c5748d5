// Copyright 2026 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Block-level metadata edits: type, depth-independent data.

use crate::block::{BlockData, BlockType, TextBlock};
use crate::document::DocumentState;
use crate::selection::SelectionState;

/// Set the type of every block the selection touches.
///
/// Blocks already carrying the type are left alone; if that covers the
/// whole range the result shares all content with the input.
pub fn set_block_type<B: TextBlock>(
    state: &DocumentState<B>,
    sel: &SelectionState,
    block_type: BlockType,
) -> DocumentState<B> {
    map_touched_blocks(state, sel, |block| {
        if block.block_type() == block_type {
            None
        } else {
            Some(block.with_type(block_type))
        }
    })
}

/// Replace the data map of every block the selection touches.
pub fn set_block_data<B: TextBlock>(
    state: &DocumentState<B>,
    sel: &SelectionState,
    data: &BlockData,
) -> DocumentState<B> {
    map_touched_blocks(state, sel, |block| {
        if block.data() == data {
            None
        } else {
            Some(block.with_data(data.clone()))
        }
    })
}

/// Merge `patch` into the data map of every block the selection
/// touches; existing keys are overwritten, others kept.
pub fn merge_block_data<B: TextBlock>(
    state: &DocumentState<B>,
    sel: &SelectionState,
    patch: &BlockData,
) -> DocumentState<B> {
    map_touched_blocks(state, sel, |block| {
        let mut data = block.data().clone();
        let mut changed = false;
        for (key, value) in patch {
            if data.get(key) != Some(value) {
                data.insert(key.clone(), value.clone());
                changed = true;
            }
        }
        changed.then(|| block.with_data(data))
    })
}

/// Apply `edit` to each block from the selection's start to its end.
/// `edit` returns `None` for blocks already in the target shape; if
/// every block does, the input state is returned unchanged.
fn map_touched_blocks<B: TextBlock>(
    state: &DocumentState<B>,
    sel: &SelectionState,
    edit: impl Fn(&B) -> Option<B>,
) -> DocumentState<B> {
    let mut blocks = state.block_map().clone();
    let mut changed = false;
    for key in state
        .block_map()
        .keys_in_range(sel.start_key(), sel.end_key())
    {
        let block = state.block(&key);
        if let Some(edited) = edit(block) {
            blocks = blocks.replace(edited);
            changed = true;
        }
    }
    if !changed {
        return state.unchanged();
    }
    state.with_content(blocks, sel.clone(), sel.clone())
}
