// Copyright 2026 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! An immutable, block-based rich-text document model.
//!
//! The document is a persistent value: every edit produces a new
//! [`DocumentState`] sharing untouched blocks and entities with its
//! predecessor, which makes undo history, snapshots and no-op
//! detection cheap. All offsets throughout the crate are UTF-16 code
//! units.
//!
//! Layers, bottom up:
//!
//! - [`CharacterMetadata`] / [`ContentBlock`] / [`TreeBlock`] — styled
//!   text with per-code-unit annotations;
//! - [`EntityTable`] — out-of-band annotations (links, mentions) with
//!   a removal-mutability policy;
//! - [`modifier`] — pure range-based transactions over a state;
//! - [`History`] / [`Editor`] — an editing session with bounded
//!   undo/redo and key-level operations;
//! - [`CompositeDecorator`] — ephemeral render-time span detection;
//! - [`raw`] — the camelCase JSON interchange format.

pub mod modifier;
pub mod raw;

mod block;
mod block_map;
mod char_meta;
mod decorator;
mod document;
mod editor;
mod entity;
mod entity_removal;
mod error;
mod history;
mod ranges;
mod selection;

pub use crate::block::{
    BlockData, BlockKey, BlockType, ContentBlock, TextBlock, TreeBlock,
    TreeLinks,
};
pub use crate::block_map::BlockMap;
pub use crate::char_meta::{inline_style, CharacterMetadata};
pub use crate::decorator::{
    CompositeDecorator, DecorationLeaf, Decorator, RegexDecorator,
};
pub use crate::document::DocumentState;
pub use crate::editor::Editor;
pub use crate::entity::{
    EntityData, EntityInstance, EntityKey, EntityMutability, EntityTable,
};
pub use crate::entity_removal::{
    resolve_removal_range, strip_edge_entities, RemovalDirection,
};
pub use crate::error::RawDocumentError;
pub use crate::history::{ChangeKind, History, DEFAULT_UNDO_DEPTH};
pub use crate::ranges::find_ranges;
pub use crate::selection::SelectionState;
