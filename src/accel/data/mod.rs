// This file is part of trackrec.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

//! Data management: identifiers, masks, and input preparation.
pub mod augment;
pub mod index;
mod rc_set;

pub use augment::augment_with_interactions;
pub use index::{EntityId, IdIndex, IdMapping};
pub use rc_set::RowColumnSet;

/// The ID mappings for the full user and item universes of a data set.
///
/// Row `u` of an interaction matrix belongs to `users.get_id(u)`, and column
/// `i` of interaction and content matrices belongs to `items.get_id(i)`.
#[derive(Clone, Debug)]
pub struct Universe<U, I> {
    pub users: IdIndex<U>,
    pub items: IdIndex<I>,
}

impl<U: EntityId, I: EntityId> Universe<U, I> {
    pub fn new(users: IdIndex<U>, items: IdIndex<I>) -> Self {
        Universe { users, items }
    }

    pub fn n_users(&self) -> usize {
        self.users.len()
    }

    pub fn n_items(&self) -> usize {
        self.items.len()
    }
}
