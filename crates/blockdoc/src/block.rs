// Copyright 2026 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Blocks: paragraph-level units of the document.
//!
//! A block holds its type, depth and opaque data plus the text and the
//! per-character [`CharacterMetadata`] sequence, one entry per UTF-16
//! code unit of text. Two interchangeable variants exist behind the
//! [`TextBlock`] capability trait:
//!
//! - [`ContentBlock`] — the flat variant used by ordinary documents;
//! - [`TreeBlock`] — additionally carries parent/sibling/children keys
//!   for nested structures.
//!
//! The model is generic over `B: TextBlock` the same way the composer
//! is generic over its string type; everything downstream works with
//! either variant.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;
use strum_macros::{Display, EnumString};
use widestring::{Utf16Str, Utf16String};

use crate::char_meta::CharacterMetadata;
use crate::entity::EntityKey;
use crate::ranges::find_ranges;

/// Opaque block-level payload (alignment, checked state, …).
pub type BlockData = BTreeMap<String, Value>;

// ─── Keys ────────────────────────────────────────────────────────────────────

static NEXT_BLOCK_KEY: AtomicU64 = AtomicU64::new(1);

/// Unique block address within one document lineage.
///
/// Operations that fork content (fragment extraction, paste) regenerate
/// keys so a fragment can be re-inserted anywhere without collisions.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockKey(String);

impl BlockKey {
    /// A fresh key, unique for the lifetime of the process.
    pub fn generate() -> Self {
        let n = NEXT_BLOCK_KEY.fetch_add(1, Ordering::Relaxed);
        Self(format!("b{}", to_base36(n)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for BlockKey {
    fn from(raw: &str) -> Self {
        Self(raw.to_owned())
    }
}

impl From<String> for BlockKey {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut out = Vec::new();
    loop {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
        if n == 0 {
            break;
        }
    }
    out.reverse();
    String::from_utf8(out).expect("base36 digits are ASCII")
}

// ─── Block type ──────────────────────────────────────────────────────────────

/// The block-level semantic type, serialized in kebab-case
/// (`unordered-list-item`, `header-one`, …).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Display, EnumString,
)]
#[strum(serialize_all = "kebab-case")]
pub enum BlockType {
    Unstyled,
    Paragraph,
    HeaderOne,
    HeaderTwo,
    HeaderThree,
    Blockquote,
    CodeBlock,
    UnorderedListItem,
    OrderedListItem,
    Atomic,
}

impl BlockType {
    pub fn is_list_item(&self) -> bool {
        matches!(
            self,
            BlockType::UnorderedListItem | BlockType::OrderedListItem
        )
    }
}

// ─── Capability trait ────────────────────────────────────────────────────────

/// Sibling/parent/children links carried by the tree variant.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TreeLinks {
    pub parent: Option<BlockKey>,
    pub prev_sibling: Option<BlockKey>,
    pub next_sibling: Option<BlockKey>,
    pub children: Vec<BlockKey>,
}

/// Shared accessors over both block variants, plus copy-on-write
/// builders. Tree navigation defaults to "not a tree block".
pub trait TextBlock: Clone + fmt::Debug {
    /// Build a block from its parts.
    ///
    /// Panics unless `chars.len() == text.len()` — the per-character
    /// metadata must stay aligned with the UTF-16 code units.
    fn new_block(
        key: BlockKey,
        block_type: BlockType,
        depth: u32,
        data: BlockData,
        text: Utf16String,
        chars: Vec<CharacterMetadata>,
    ) -> Self;

    fn key(&self) -> &BlockKey;
    fn block_type(&self) -> BlockType;
    fn depth(&self) -> u32;
    fn data(&self) -> &BlockData;
    fn text(&self) -> &Utf16Str;
    fn chars(&self) -> &[CharacterMetadata];

    /// Text length in UTF-16 code units.
    fn len(&self) -> usize {
        self.text().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn char_at(&self, offset: usize) -> Option<&CharacterMetadata> {
        self.chars().get(offset)
    }

    /// The style set at `offset`, or the empty set past the end.
    fn style_at(&self, offset: usize) -> std::sync::Arc<BTreeSet<String>> {
        self.char_at(offset)
            .map(|c| c.style_set())
            .unwrap_or_else(|| CharacterMetadata::new().style_set())
    }

    fn entity_at(&self, offset: usize) -> Option<EntityKey> {
        self.char_at(offset).and_then(|c| c.entity())
    }

    /// Report maximal runs of identical style sets passing `filter`.
    fn find_style_ranges(
        &self,
        filter: impl Fn(&BTreeSet<String>) -> bool,
        found: impl FnMut(usize, usize),
    ) where
        Self: Sized,
    {
        find_ranges(
            self.chars(),
            |a, b| a.styles() == b.styles(),
            |c| filter(c.styles()),
            found,
        );
    }

    /// Report maximal runs of identical entity references passing `filter`.
    fn find_entity_ranges(
        &self,
        filter: impl Fn(Option<EntityKey>) -> bool,
        found: impl FnMut(usize, usize),
    ) where
        Self: Sized,
    {
        find_ranges(
            self.chars(),
            |a, b| a.entity() == b.entity(),
            |c| filter(c.entity()),
            found,
        );
    }

    // Copy-on-write builders.

    fn with_key(&self, key: BlockKey) -> Self;
    fn with_type(&self, block_type: BlockType) -> Self;
    fn with_depth(&self, depth: u32) -> Self;
    fn with_data(&self, data: BlockData) -> Self;
    fn with_content(
        &self,
        text: Utf16String,
        chars: Vec<CharacterMetadata>,
    ) -> Self;

    // Tree navigation; meaningful for the tree variant only.

    fn tree_links(&self) -> Option<&TreeLinks> {
        None
    }

    fn with_tree_links(&self, _links: TreeLinks) -> Self {
        self.clone()
    }

    fn parent(&self) -> Option<&BlockKey> {
        self.tree_links().and_then(|l| l.parent.as_ref())
    }

    fn prev_sibling(&self) -> Option<&BlockKey> {
        self.tree_links().and_then(|l| l.prev_sibling.as_ref())
    }

    fn next_sibling(&self) -> Option<&BlockKey> {
        self.tree_links().and_then(|l| l.next_sibling.as_ref())
    }

    fn children(&self) -> &[BlockKey] {
        self.tree_links().map(|l| l.children.as_slice()).unwrap_or(&[])
    }
}

// ─── Shared core ─────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq)]
struct BlockCore {
    key: BlockKey,
    block_type: BlockType,
    depth: u32,
    data: BlockData,
    text: Utf16String,
    chars: Vec<CharacterMetadata>,
}

impl BlockCore {
    fn new(
        key: BlockKey,
        block_type: BlockType,
        depth: u32,
        data: BlockData,
        text: Utf16String,
        chars: Vec<CharacterMetadata>,
    ) -> Self {
        assert_eq!(
            chars.len(),
            text.len(),
            "character metadata must be aligned with the block text"
        );
        Self {
            key,
            block_type,
            depth,
            data,
            text,
            chars,
        }
    }
}

// ─── Flat variant ────────────────────────────────────────────────────────────

/// The flat block variant: no structural links.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentBlock {
    core: BlockCore,
}

impl ContentBlock {
    /// An empty unstyled block under a fresh key.
    pub fn empty() -> Self {
        Self::of_text("")
    }

    /// An unstyled block holding `text` with empty metadata.
    pub fn of_text(text: &str) -> Self {
        let text = Utf16String::from_str(text);
        let chars = vec![CharacterMetadata::new(); text.len()];
        TextBlock::new_block(
            BlockKey::generate(),
            BlockType::Unstyled,
            0,
            BlockData::new(),
            text,
            chars,
        )
    }
}

impl TextBlock for ContentBlock {
    fn new_block(
        key: BlockKey,
        block_type: BlockType,
        depth: u32,
        data: BlockData,
        text: Utf16String,
        chars: Vec<CharacterMetadata>,
    ) -> Self {
        Self {
            core: BlockCore::new(key, block_type, depth, data, text, chars),
        }
    }

    fn key(&self) -> &BlockKey {
        &self.core.key
    }

    fn block_type(&self) -> BlockType {
        self.core.block_type
    }

    fn depth(&self) -> u32 {
        self.core.depth
    }

    fn data(&self) -> &BlockData {
        &self.core.data
    }

    fn text(&self) -> &Utf16Str {
        &self.core.text
    }

    fn chars(&self) -> &[CharacterMetadata] {
        &self.core.chars
    }

    fn with_key(&self, key: BlockKey) -> Self {
        let mut core = self.core.clone();
        core.key = key;
        Self { core }
    }

    fn with_type(&self, block_type: BlockType) -> Self {
        let mut core = self.core.clone();
        core.block_type = block_type;
        Self { core }
    }

    fn with_depth(&self, depth: u32) -> Self {
        let mut core = self.core.clone();
        core.depth = depth;
        Self { core }
    }

    fn with_data(&self, data: BlockData) -> Self {
        let mut core = self.core.clone();
        core.data = data;
        Self { core }
    }

    fn with_content(
        &self,
        text: Utf16String,
        chars: Vec<CharacterMetadata>,
    ) -> Self {
        Self {
            core: BlockCore::new(
                self.core.key.clone(),
                self.core.block_type,
                self.core.depth,
                self.core.data.clone(),
                text,
                chars,
            ),
        }
    }
}

// ─── Tree variant ────────────────────────────────────────────────────────────

/// The tree-linked block variant for nested structures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeBlock {
    core: BlockCore,
    links: TreeLinks,
}

impl TreeBlock {
    /// An unstyled tree block holding `text`, with no links.
    pub fn of_text(text: &str) -> Self {
        let text = Utf16String::from_str(text);
        let chars = vec![CharacterMetadata::new(); text.len()];
        TextBlock::new_block(
            BlockKey::generate(),
            BlockType::Unstyled,
            0,
            BlockData::new(),
            text,
            chars,
        )
    }
}

impl TextBlock for TreeBlock {
    fn new_block(
        key: BlockKey,
        block_type: BlockType,
        depth: u32,
        data: BlockData,
        text: Utf16String,
        chars: Vec<CharacterMetadata>,
    ) -> Self {
        Self {
            core: BlockCore::new(key, block_type, depth, data, text, chars),
            links: TreeLinks::default(),
        }
    }

    fn key(&self) -> &BlockKey {
        &self.core.key
    }

    fn block_type(&self) -> BlockType {
        self.core.block_type
    }

    fn depth(&self) -> u32 {
        self.core.depth
    }

    fn data(&self) -> &BlockData {
        &self.core.data
    }

    fn text(&self) -> &Utf16Str {
        &self.core.text
    }

    fn chars(&self) -> &[CharacterMetadata] {
        &self.core.chars
    }

    fn with_key(&self, key: BlockKey) -> Self {
        let mut next = self.clone();
        next.core.key = key;
        next
    }

    fn with_type(&self, block_type: BlockType) -> Self {
        let mut next = self.clone();
        next.core.block_type = block_type;
        next
    }

    fn with_depth(&self, depth: u32) -> Self {
        let mut next = self.clone();
        next.core.depth = depth;
        next
    }

    fn with_data(&self, data: BlockData) -> Self {
        let mut next = self.clone();
        next.core.data = data;
        next
    }

    fn with_content(
        &self,
        text: Utf16String,
        chars: Vec<CharacterMetadata>,
    ) -> Self {
        Self {
            core: BlockCore::new(
                self.core.key.clone(),
                self.core.block_type,
                self.core.depth,
                self.core.data.clone(),
                text,
                chars,
            ),
            links: self.links.clone(),
        }
    }

    fn tree_links(&self) -> Option<&TreeLinks> {
        Some(&self.links)
    }

    fn with_tree_links(&self, links: TreeLinks) -> Self {
        let mut next = self.clone();
        next.links = links;
        next
    }
}
