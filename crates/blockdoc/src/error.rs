// Copyright 2026 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use thiserror::Error;

/// Everything that can be wrong with an incoming raw document.
///
/// Internal consistency violations panic; these errors cover untrusted
/// input only, so callers can surface them instead of crashing.
#[derive(Debug, Error)]
pub enum RawDocumentError {
    #[error("document holds no blocks")]
    EmptyDocument,

    #[error("duplicate block key: {0}")]
    DuplicateBlockKey(String),

    #[error("unknown block type: {0}")]
    UnknownBlockType(String),

    #[error("unknown entity mutability: {0}")]
    UnknownMutability(String),

    #[error(
        "block {block}: style range {offset}+{length} exceeds text length {len}"
    )]
    StyleRangeOutOfBounds {
        block: String,
        offset: usize,
        length: usize,
        len: usize,
    },

    #[error(
        "block {block}: entity range {offset}+{length} exceeds text length {len}"
    )]
    EntityRangeOutOfBounds {
        block: String,
        offset: usize,
        length: usize,
        len: usize,
    },

    #[error("block {block}: entity range references unknown key {key}")]
    UnknownEntityKey { block: String, key: u64 },

    #[error("malformed document JSON: {0}")]
    Json(#[from] serde_json::Error),
}
