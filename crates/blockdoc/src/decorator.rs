// Copyright 2026 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Decorations: ephemeral, pattern-driven spans layered over block
//! text at render time (link detection, mention highlighting, …).
//!
//! Decorations never touch the stored document. A
//! [`CompositeDecorator`] runs its decorators in priority order over
//! one block and flattens the claims plus the block's own style runs
//! into a list of non-overlapping [`DecorationLeaf`] ranges covering
//! the text exactly once.

use std::collections::BTreeSet;
use std::sync::Arc;

use regex::Regex;
use widestring::Utf16Str;

use crate::block::TextBlock;
use crate::ranges::find_ranges;

/// A source of decorated spans over one block's text.
pub trait Decorator {
    /// Report each decorated span as a half-open `[start, end)` range
    /// of UTF-16 code units.
    fn find_spans(
        &self,
        text: &Utf16Str,
        found: &mut dyn FnMut(usize, usize),
    );
}

/// A [`Decorator`] backed by a regular expression.
pub struct RegexDecorator {
    regex: Regex,
}

impl RegexDecorator {
    pub fn new(regex: Regex) -> Self {
        Self { regex }
    }
}

impl Decorator for RegexDecorator {
    fn find_spans(
        &self,
        text: &Utf16Str,
        found: &mut dyn FnMut(usize, usize),
    ) {
        let text = text.to_string();
        // Matches arrive in order, so the byte→code-unit conversion
        // walks the text once.
        let mut byte_pos = 0;
        let mut unit_pos = 0;
        let mut to_units = |byte: usize| {
            unit_pos += text[byte_pos..byte].encode_utf16().count();
            byte_pos = byte;
            unit_pos
        };
        for found_match in self.regex.find_iter(&text) {
            let start = to_units(found_match.start());
            let end = to_units(found_match.end());
            found(start, end);
        }
    }
}

/// One flattened render range: at most one decorator, one style set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecorationLeaf {
    /// Index into the composite's decorator list, or `None` for
    /// undecorated text.
    pub decorator: Option<usize>,
    pub start: usize,
    pub end: usize,
    pub styles: Arc<BTreeSet<String>>,
}

/// An ordered set of decorators sharing one claims pass per block.
pub struct CompositeDecorator {
    decorators: Vec<Box<dyn Decorator>>,
}

impl CompositeDecorator {
    pub fn new(decorators: Vec<Box<dyn Decorator>>) -> Self {
        Self { decorators }
    }

    pub fn is_empty(&self) -> bool {
        self.decorators.is_empty()
    }

    /// Which decorator, if any, claims each code unit of `block`.
    ///
    /// Decorators claim in list order; a span that overlaps any
    /// already-claimed unit is discarded whole, so a lower-priority
    /// decorator never renders half a match.
    pub fn claims<B: TextBlock>(&self, block: &B) -> Vec<Option<usize>> {
        let mut claims = vec![None; block.len()];
        for (index, decorator) in self.decorators.iter().enumerate() {
            decorator.find_spans(block.text(), &mut |start, end| {
                assert!(
                    start <= end && end <= claims.len(),
                    "decorator span out of bounds for block {}",
                    block.key()
                );
                if claims[start..end].iter().all(Option::is_none) {
                    claims[start..end].fill(Some(index));
                }
            });
        }
        claims
    }

    /// Flatten `block` into leaves: maximal runs over which both the
    /// claiming decorator and the style set are constant. The leaves
    /// are disjoint, ordered, and cover the text exactly.
    pub fn leaves<B: TextBlock>(&self, block: &B) -> Vec<DecorationLeaf> {
        let claims = self.claims(block);
        let units: Vec<(Option<usize>, &crate::char_meta::CharacterMetadata)> =
            claims.iter().copied().zip(block.chars()).collect();

        let mut leaves = Vec::new();
        find_ranges(
            &units,
            |a, b| a.0 == b.0 && a.1.styles() == b.1.styles(),
            |_| true,
            |start, end| {
                leaves.push(DecorationLeaf {
                    decorator: units[start].0,
                    start,
                    end,
                    styles: units[start].1.style_set(),
                });
            },
        );
        leaves
    }
}
