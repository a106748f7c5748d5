// Copyright 2026 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Bounded undo/redo over document versions.
//!
//! Because [`DocumentState`] versions share their content, an undo
//! stack is a list of cheap handles, not copies. The stack coalesces
//! bursts of typing (contiguous character insertions land in one undo
//! unit) and everything recorded inside a composition session; moving
//! the selection never consumes an undo slot.

use std::collections::VecDeque;

use strum_macros::Display;

use crate::block::TextBlock;
use crate::document::DocumentState;

/// How many undo units are retained before the oldest is dropped.
pub const DEFAULT_UNDO_DEPTH: usize = 32;

/// What kind of edit produced a recorded version. Drives coalescing:
/// only contiguous `InsertCharacters` bursts merge.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
#[strum(serialize_all = "kebab-case")]
pub enum ChangeKind {
    InsertCharacters,
    RemoveRange,
    SplitBlock,
    ChangeInlineStyle,
    ApplyEntity,
    ChangeBlockType,
    ChangeBlockData,
    InsertFragment,
    MoveText,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    /// Inside an IME composition session; `pushed` records whether the
    /// session has claimed its undo unit yet.
    Composing { pushed: bool },
}

/// Undo/redo stacks around the current document version.
#[derive(Debug)]
pub struct History<B: TextBlock> {
    undo: VecDeque<DocumentState<B>>,
    redo: Vec<DocumentState<B>>,
    current: DocumentState<B>,
    last_change: Option<ChangeKind>,
    phase: Phase,
    max_depth: usize,
}

impl<B: TextBlock> History<B> {
    pub fn new(initial: DocumentState<B>) -> Self {
        Self::with_depth(initial, DEFAULT_UNDO_DEPTH)
    }

    pub fn with_depth(initial: DocumentState<B>, max_depth: usize) -> Self {
        assert!(max_depth > 0, "history depth must be at least 1");
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            current: initial,
            last_change: None,
            phase: Phase::Idle,
            max_depth,
        }
    }

    pub fn current(&self) -> &DocumentState<B> {
        &self.current
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Make `next` the current version, recording the old one as an
    /// undo unit unless the change coalesces.
    ///
    /// A version sharing all content with the current one is a
    /// selection-only move: it replaces the current version in place,
    /// costs no undo slot and breaks any typing burst.
    pub fn record(&mut self, next: DocumentState<B>, change: ChangeKind) {
        if next.shares_content_with(&self.current) {
            self.current = next;
            self.last_change = None;
            return;
        }

        let coalesce = match self.phase {
            Phase::Composing { pushed } => {
                if !pushed {
                    self.phase = Phase::Composing { pushed: true };
                }
                pushed
            }
            Phase::Idle => {
                change == ChangeKind::InsertCharacters
                    && self.last_change
                        == Some(ChangeKind::InsertCharacters)
                    && next.selection_before()
                        == self.current.selection_after()
            }
        };

        if !coalesce {
            self.undo.push_back(self.current.clone());
            if self.undo.len() > self.max_depth {
                self.undo.pop_front();
                log::debug!("history full, dropping the oldest undo unit");
            }
        }
        if !self.redo.is_empty() {
            log::debug!(
                "new edit invalidates {} redo unit(s)",
                self.redo.len()
            );
            self.redo.clear();
        }
        self.current = next;
        self.last_change = Some(change);
    }

    /// Replace the current version with a selection-only move. Costs
    /// no undo slot and breaks any typing burst.
    pub fn move_selection(&mut self, next: DocumentState<B>) {
        debug_assert!(next.shares_content_with(&self.current));
        self.current = next;
        self.last_change = None;
    }

    /// Step back one unit. The restored version carries the selection
    /// it had when it was current. Returns `None` at the bottom.
    pub fn undo(&mut self) -> Option<&DocumentState<B>> {
        let restored = self.undo.pop_back()?;
        self.redo.push(std::mem::replace(&mut self.current, restored));
        self.last_change = None;
        log::debug!("undo ({} unit(s) left)", self.undo.len());
        Some(&self.current)
    }

    /// Step forward one unit. Returns `None` when nothing was undone.
    pub fn redo(&mut self) -> Option<&DocumentState<B>> {
        let restored = self.redo.pop()?;
        self.undo
            .push_back(std::mem::replace(&mut self.current, restored));
        self.last_change = None;
        log::debug!("redo ({} unit(s) left)", self.redo.len());
        Some(&self.current)
    }

    /// Open a composition session: every edit recorded until
    /// [`History::end_composition`] shares a single undo unit.
    pub fn begin_composition(&mut self) {
        self.phase = Phase::Composing { pushed: false };
    }

    pub fn end_composition(&mut self) {
        self.phase = Phase::Idle;
        self.last_change = None;
    }

    pub fn is_composing(&self) -> bool {
        matches!(self.phase, Phase::Composing { .. })
    }
}
