// Copyright 2026 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Per-character metadata: the set of inline styles plus an optional
//! entity reference.
//!
//! A [`CharacterMetadata`] is a value: two instances are equal iff their
//! style sets and entity references are equal. "Changing" a character
//! always produces a new value; the style set is shared behind an `Arc`
//! so that long runs of identically-styled characters clone cheaply.

use std::collections::BTreeSet;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::entity::EntityKey;

/// Well-known inline style names.
///
/// The style set is open — any string is a valid style — but these are
/// the names the toolbar layer uses.
pub mod inline_style {
    pub const BOLD: &str = "bold";
    pub const ITALIC: &str = "italic";
    pub const UNDERLINE: &str = "underline";
    pub const STRIKE_THROUGH: &str = "strikethrough";
    pub const INLINE_CODE: &str = "inline_code";
}

/// The shared empty style set, so unstyled characters allocate nothing.
static EMPTY_STYLES: Lazy<Arc<BTreeSet<String>>> =
    Lazy::new(|| Arc::new(BTreeSet::new()));

/// Immutable style-set + entity-reference value attached to one UTF-16
/// code unit of block text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CharacterMetadata {
    styles: Arc<BTreeSet<String>>,
    entity: Option<EntityKey>,
}

impl CharacterMetadata {
    /// Metadata with no styles and no entity.
    pub fn new() -> Self {
        Self {
            styles: EMPTY_STYLES.clone(),
            entity: None,
        }
    }

    /// Metadata with the given style set and entity reference.
    pub fn with_style_set(
        styles: Arc<BTreeSet<String>>,
        entity: Option<EntityKey>,
    ) -> Self {
        Self { styles, entity }
    }

    /// Metadata carrying a single style.
    pub fn with_style(style: &str) -> Self {
        let mut set = BTreeSet::new();
        set.insert(style.to_owned());
        Self {
            styles: Arc::new(set),
            entity: None,
        }
    }

    pub fn styles(&self) -> &BTreeSet<String> {
        &self.styles
    }

    /// The shared handle to the style set, for cheap re-use on
    /// neighbouring characters.
    pub fn style_set(&self) -> Arc<BTreeSet<String>> {
        self.styles.clone()
    }

    pub fn has_style(&self, style: &str) -> bool {
        self.styles.contains(style)
    }

    pub fn entity(&self) -> Option<EntityKey> {
        self.entity
    }

    /// A copy with `style` added to the set.
    pub fn apply_style(&self, style: &str) -> Self {
        if self.has_style(style) {
            return self.clone();
        }
        let mut set = (*self.styles).clone();
        set.insert(style.to_owned());
        Self {
            styles: Arc::new(set),
            entity: self.entity,
        }
    }

    /// A copy with `style` removed from the set.
    pub fn remove_style(&self, style: &str) -> Self {
        if !self.has_style(style) {
            return self.clone();
        }
        let mut set = (*self.styles).clone();
        set.remove(style);
        Self {
            styles: Arc::new(set),
            entity: self.entity,
        }
    }

    /// A copy referencing `entity` (or no entity for `None`).
    pub fn set_entity(&self, entity: Option<EntityKey>) -> Self {
        Self {
            styles: self.styles.clone(),
            entity,
        }
    }
}

impl Default for CharacterMetadata {
    fn default() -> Self {
        Self::new()
    }
}
