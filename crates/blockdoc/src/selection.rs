// Copyright 2026 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Selection state: anchor/focus block-key + offset pairs.
//!
//! Purely a value — the only behaviour is deriving start/end from the
//! backward flag, mirroring how the composer normalises its raw
//! selection with `sel_start`/`sel_end`. Offsets are UTF-16 code units
//! into the owning block's text, not code points or grapheme clusters.

use crate::block::BlockKey;

/// Anchor/focus selection over one or more blocks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionState {
    pub anchor_key: BlockKey,
    pub anchor_offset: usize,
    pub focus_key: BlockKey,
    pub focus_offset: usize,
    /// Whether the focus precedes the anchor in document order.
    pub is_backward: bool,
    /// Whether the owning editor surface currently has focus.
    pub has_focus: bool,
}

impl SelectionState {
    /// A collapsed selection (cursor) at `offset` within `key`.
    pub fn collapsed(key: BlockKey, offset: usize) -> Self {
        Self {
            anchor_key: key.clone(),
            anchor_offset: offset,
            focus_key: key,
            focus_offset: offset,
            is_backward: false,
            has_focus: false,
        }
    }

    /// A forward range selection within a single block.
    pub fn range_in(key: BlockKey, start: usize, end: usize) -> Self {
        assert!(start <= end, "range start must not exceed its end");
        Self {
            anchor_key: key.clone(),
            anchor_offset: start,
            focus_key: key,
            focus_offset: end,
            is_backward: false,
            has_focus: false,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor_key == self.focus_key
            && self.anchor_offset == self.focus_offset
    }

    pub fn start_key(&self) -> &BlockKey {
        if self.is_backward {
            &self.focus_key
        } else {
            &self.anchor_key
        }
    }

    pub fn start_offset(&self) -> usize {
        if self.is_backward {
            self.focus_offset
        } else {
            self.anchor_offset
        }
    }

    pub fn end_key(&self) -> &BlockKey {
        if self.is_backward {
            &self.anchor_key
        } else {
            &self.focus_key
        }
    }

    pub fn end_offset(&self) -> usize {
        if self.is_backward {
            self.anchor_offset
        } else {
            self.focus_offset
        }
    }

    /// Whether start and end live in the same block.
    pub fn is_single_block(&self) -> bool {
        self.anchor_key == self.focus_key
    }

    /// Whether either selection edge falls within `start..=end` of the
    /// block at `key`.
    pub fn has_edge_within(
        &self,
        key: &BlockKey,
        start: usize,
        end: usize,
    ) -> bool {
        let anchor_within = self.anchor_key == *key
            && (start..=end).contains(&self.anchor_offset);
        let focus_within = self.focus_key == *key
            && (start..=end).contains(&self.focus_offset);
        anchor_within || focus_within
    }

    pub fn with_focus(&self, has_focus: bool) -> Self {
        let mut next = self.clone();
        next.has_focus = has_focus;
        next
    }
}
