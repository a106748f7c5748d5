// Copyright 2026 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! The shared range-partition primitive.
//!
//! Finds maximal runs of adjacent items that agree under an equality
//! predicate, reporting only the runs whose items pass a filter. Style
//! encoding, entity encoding and the decoration engine are all built on
//! this one function.

/// Call `found(start, end)` for every maximal half-open run of `items`
/// within which `are_equal` holds for each adjacent pair, skipping runs
/// whose representative item fails `filter`.
pub fn find_ranges<T>(
    items: &[T],
    are_equal: impl Fn(&T, &T) -> bool,
    filter: impl Fn(&T) -> bool,
    mut found: impl FnMut(usize, usize),
) {
    if items.is_empty() {
        return;
    }
    let mut run_start = 0;
    for i in 1..items.len() {
        if !are_equal(&items[i - 1], &items[i]) {
            if filter(&items[run_start]) {
                found(run_start, i);
            }
            run_start = i;
        }
    }
    if filter(&items[run_start]) {
        found(run_start, items.len());
    }
}
