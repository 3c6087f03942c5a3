// Copyright 2026 the Rhythmite Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Child iteration over the clock tree.

use super::id::{ClockId, INVALID};
use super::store::ClockStore;

/// An iterator over the direct children of a clock, in timeline document
/// order.
///
/// Created by [`TimeManager::children`](crate::manager::TimeManager::children).
#[derive(Debug)]
pub struct Children<'a> {
    store: &'a ClockStore,
    current: u32,
}

impl<'a> Children<'a> {
    pub(crate) fn new(store: &'a ClockStore, first: u32) -> Self {
        Self {
            store,
            current: first,
        }
    }
}

impl Iterator for Children<'_> {
    type Item = ClockId;

    fn next(&mut self) -> Option<ClockId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.store.next_sibling[idx as usize];
        Some(ClockId {
            idx,
            generation: self.store.generation[idx as usize],
        })
    }
}
