// Copyright 2026 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! The transaction engine: range-based edit operations over
//! [`DocumentState`](crate::document::DocumentState).
//!
//! Every operation is a pure function `&DocumentState × &SelectionState
//! × args → DocumentState`. Operations never mutate their input; a
//! structural no-op returns a state sharing all content with the input
//! (see `DocumentState::shares_content_with`). Precondition violations
//! such as an out-of-bounds offset or a dangling entity key panic
//! rather than coerce.

mod block_meta;
mod fragment;
mod split;
mod styles;
mod text;

pub use block_meta::{merge_block_data, set_block_data, set_block_type};
pub use fragment::{
    extract_fragment, move_text, replace_with_fragment, BlockDataMerge,
};
pub use split::split_block;
pub use styles::{apply_entity, apply_inline_style, remove_inline_style};
pub use text::{insert_text, remove_range, replace_text};

pub(crate) use text::{remove_span, spliced};
