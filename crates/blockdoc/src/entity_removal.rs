// Copyright 2026 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Entity-aware removal resolution.
//!
//! Translates a *requested* removal range that overlaps one or two
//! entities into the *effective* range that must actually be deleted,
//! honouring each entity's mutability policy:
//!
//! | Mutability  | Effective range                                        |
//! |-------------|--------------------------------------------------------|
//! | `MUTABLE`   | the requested range, verbatim                          |
//! | `IMMUTABLE` | expanded to the whole contiguous entity span           |
//! | `SEGMENTED` | expanded to the space-delimited segment(s) overlapped  |
//!
//! Segmented expansion also consumes one separator so that deleting a
//! segment never leaves a dangling double space. When the range spans
//! two different entities, each side resolves independently and the
//! results merge into one outer range.

use std::collections::BTreeSet;

use crate::block::TextBlock;
use crate::document::DocumentState;
use crate::entity::{EntityKey, EntityMutability};
use crate::selection::SelectionState;

const SEPARATOR: u16 = 0x20; // ' '

/// Which way the deletion is travelling (backspace vs. delete key).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemovalDirection {
    Forward,
    Backward,
}

/// The contiguous run of characters around `offset` that reference
/// `key`. `offset` itself must reference `key`.
pub(crate) fn entity_span_at<B: TextBlock>(
    block: &B,
    offset: usize,
    key: EntityKey,
) -> (usize, usize) {
    debug_assert_eq!(block.entity_at(offset), Some(key));
    let chars = block.chars();
    let mut start = offset;
    while start > 0 && chars[start - 1].entity() == Some(key) {
        start -= 1;
    }
    let mut end = offset + 1;
    while end < chars.len() && chars[end].entity() == Some(key) {
        end += 1;
    }
    (start, end)
}

/// Compute the effective removal range for `sel`, expanding either edge
/// per the mutability of the entity it touches. Ranges that touch no
/// non-trivial entity come back unchanged.
///
/// Panics (via the entity table) if a touched entity key is dangling.
pub fn resolve_removal_range<B: TextBlock>(
    state: &DocumentState<B>,
    sel: &SelectionState,
    direction: RemovalDirection,
) -> SelectionState {
    let start_key = sel.start_key().clone();
    let end_key = sel.end_key().clone();
    let start_offset = sel.start_offset();
    let end_offset = sel.end_offset();

    let start_block = state.block(&start_key);
    let end_block = state.block(&end_key);

    let start_entity = start_block.entity_at(start_offset);
    let end_entity = if end_offset > 0 {
        end_block.entity_at(end_offset - 1)
    } else {
        None
    };

    if start_entity.is_none() && end_entity.is_none() {
        return sel.clone();
    }

    if start_key == end_key
        && start_entity.is_some()
        && start_entity == end_entity
    {
        // The whole range sits inside one entity.
        let (s, e) = resolved_bounds(
            state,
            start_block,
            start_entity.expect("checked above"),
            start_offset,
            end_offset,
            direction,
        );
        let mut resolved = SelectionState::range_in(start_key, s, e);
        resolved.has_focus = sel.has_focus;
        return resolved;
    }

    // Two independent sides; each resolves within its own block and the
    // opposite bound stays clamped to the literal selection edge.
    let resolved_start = match start_entity {
        Some(key) => {
            let side_end = if start_key == end_key {
                end_offset
            } else {
                start_block.len()
            };
            resolved_bounds(
                state,
                start_block,
                key,
                start_offset,
                side_end,
                direction,
            )
            .0
        }
        None => start_offset,
    };
    let resolved_end = match end_entity {
        Some(key) => {
            let side_start = if start_key == end_key {
                start_offset
            } else {
                0
            };
            resolved_bounds(
                state,
                end_block,
                key,
                side_start,
                end_offset,
                direction,
            )
            .1
        }
        None => end_offset,
    };

    SelectionState {
        anchor_key: start_key,
        anchor_offset: resolved_start,
        focus_key: end_key,
        focus_offset: resolved_end,
        is_backward: false,
        has_focus: sel.has_focus,
    }
}

/// Resolve `[req_start, req_end)` against the entity `key` within one
/// block, per the entity's mutability.
fn resolved_bounds<B: TextBlock>(
    state: &DocumentState<B>,
    block: &B,
    key: EntityKey,
    req_start: usize,
    req_end: usize,
    direction: RemovalDirection,
) -> (usize, usize) {
    match state.entity(key).mutability() {
        EntityMutability::Mutable => (req_start, req_end),
        EntityMutability::Immutable => {
            let anchor = req_start.min(block.len().saturating_sub(1));
            let (span_start, span_end) = entity_span_at(
                block,
                anchor_inside(block, key, anchor, req_end),
                key,
            );
            (span_start.min(req_start), span_end.max(req_end))
        }
        EntityMutability::Segmented => {
            let anchor = req_start.min(block.len().saturating_sub(1));
            let span = entity_span_at(
                block,
                anchor_inside(block, key, anchor, req_end),
                key,
            );
            segmented_bounds(
                block.text().as_slice(),
                span,
                (req_start, req_end),
                direction,
            )
        }
    }
}

/// Pick a character index inside `[req_start, req_end)`-ish that
/// actually references `key`, for span scanning. One of the edges is
/// guaranteed to, since the caller saw the entity there.
fn anchor_inside<B: TextBlock>(
    block: &B,
    key: EntityKey,
    req_start: usize,
    req_end: usize,
) -> usize {
    if block.entity_at(req_start) == Some(key) {
        req_start
    } else {
        debug_assert!(req_end > 0);
        debug_assert_eq!(block.entity_at(req_end - 1), Some(key));
        req_end - 1
    }
}

/// Expand `[req_start, req_end)` to the boundaries of the
/// space-delimited segments it overlaps within the entity span, then
/// consume one separator in the removal direction (falling back to the
/// other side when the directional one is unavailable) so no double
/// space is left behind.
fn segmented_bounds(
    text: &[u16],
    (span_start, span_end): (usize, usize),
    (req_start, req_end): (usize, usize),
    direction: RemovalDirection,
) -> (usize, usize) {
    let mut segments: Vec<(usize, usize)> = Vec::new();
    let mut seg_start = None;
    for i in span_start..span_end {
        if text[i] == SEPARATOR {
            if let Some(s) = seg_start.take() {
                segments.push((s, i));
            }
        } else if seg_start.is_none() {
            seg_start = Some(i);
        }
    }
    if let Some(s) = seg_start {
        segments.push((s, span_end));
    }

    let covered: Vec<&(usize, usize)> = segments
        .iter()
        .filter(|(s, e)| *s < req_end && *e > req_start)
        .collect();

    let (mut start, mut end) = match (covered.first(), covered.last()) {
        (Some((first, _)), Some((_, last))) => {
            ((*first).min(req_start), (*last).max(req_end))
        }
        // Only separators were requested; nothing to expand.
        _ => (req_start, req_end),
    };

    let can_forward = end < span_end && text[end] == SEPARATOR;
    let can_backward = start > span_start && text[start - 1] == SEPARATOR;
    match direction {
        RemovalDirection::Forward if can_forward => end += 1,
        RemovalDirection::Backward if can_backward => start -= 1,
        _ if can_forward => end += 1,
        _ if can_backward => start -= 1,
        _ => {}
    }
    (start, end)
}

/// Strip the entity reference at each edge of `sel` where the cut
/// falls strictly inside a non-`MUTABLE` entity, clearing the whole
/// contiguous span so no half-annotated remnant survives the edit.
pub fn strip_edge_entities<B: TextBlock>(
    state: &DocumentState<B>,
    sel: &SelectionState,
) -> crate::block_map::BlockMap<B> {
    let mut blocks = state.block_map().clone();
    let edges = [
        (sel.start_key().clone(), sel.start_offset()),
        (sel.end_key().clone(), sel.end_offset()),
    ];
    let mut done: BTreeSet<(crate::block::BlockKey, usize)> =
        BTreeSet::new();
    for (key, offset) in edges {
        if !done.insert((key.clone(), offset)) {
            continue;
        }
        // Read from the working map so two strips in one block compose.
        let block = blocks
            .get(&key)
            .unwrap_or_else(|| panic!("unknown block key: {key}"))
            .clone();
        let block = &block;
        let before = if offset > 0 {
            block.entity_at(offset - 1)
        } else {
            None
        };
        let after = block.entity_at(offset);
        let (Some(b), Some(a)) = (before, after) else {
            continue;
        };
        if b != a {
            continue;
        }
        if state.entity(a).mutability() == EntityMutability::Mutable {
            continue;
        }
        let (span_start, span_end) = entity_span_at(block, offset, a);
        let chars = block
            .chars()
            .iter()
            .enumerate()
            .map(|(i, c)| {
                if (span_start..span_end).contains(&i) {
                    c.set_entity(None)
                } else {
                    c.clone()
                }
            })
            .collect();
        blocks = blocks
            .replace(block.with_content(block.text().to_owned(), chars));
    }
    blocks
}
