// This file is part of trackrec.
// Licensed under the MIT license, see LICENSE.md for details.
// SPDX-License-Identifier: MIT

//! Bijective ID indexes.

use std::fmt::Debug;
use std::hash::{Hash, Hasher};

use hashbrown::{hash_table::Entry, HashTable};
use rustc_hash::FxHasher;

use crate::errors::{RecError, Result};

/// Trait bound for external entity identifiers.
pub trait EntityId: Hash + Eq + Clone + Debug + Send + Sync {}

impl<T: Hash + Eq + Clone + Debug + Send + Sync> EntityId for T {}

/// Mapping between external identifiers and dense indices.
pub trait IdMapping<K> {
    /// Look up the index of an identifier.
    fn index_of(&self, id: &K) -> Option<usize>;
    /// Look up the identifier at an index.
    fn id_of(&self, index: usize) -> Option<&K>;
    /// Number of identifiers in the mapping.
    fn len(&self) -> usize;
}

/// An ordered list of unique identifiers with its induced index mapping.
///
/// The position of an ID in the list is its index.  The hash table stores
/// positions only, hashing through to the ID list, so each ID is stored once.
#[derive(Clone, Debug)]
pub struct IdIndex<K> {
    ids: Vec<K>,
    table: HashTable<u32>,
}

fn hash_id<K: Hash>(id: &K) -> u64 {
    let mut hash = FxHasher::default();
    id.hash(&mut hash);
    hash.finish()
}

impl<K: EntityId> IdIndex<K> {
    /// Create an empty ID index.
    pub fn empty() -> Self {
        IdIndex {
            ids: Vec::new(),
            table: HashTable::new(),
        }
    }

    /// Create an index from a list of IDs, which **must** be unique.
    pub fn new(ids: Vec<K>) -> Result<Self> {
        Self::from_ids(ids, "entity")
    }

    /// Create an index from a list of unique IDs.
    ///
    /// `kind` names the entity type in the error for a repeated ID.
    pub fn from_ids(ids: Vec<K>, kind: &'static str) -> Result<Self> {
        if ids.len() > u32::MAX as usize {
            return Err(RecError::InvalidConfig(format!(
                "{} identifiers exceed the index capacity",
                ids.len()
            )));
        }
        let mut table = HashTable::with_capacity(ids.len());
        for (i, id) in ids.iter().enumerate() {
            let e = table.entry(
                hash_id(id),
                |jr: &u32| ids[*jr as usize] == *id,
                |jr: &u32| hash_id(&ids[*jr as usize]),
            );
            if let Entry::Occupied(_) = &e {
                return Err(RecError::DuplicateId {
                    kind,
                    index: i as u32,
                });
            }
            e.insert(i as u32);
        }

        Ok(IdIndex { ids, table })
    }

    /// Get the ID list.
    pub fn ids(&self) -> &[K] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Look up a single index by ID.
    pub fn get_index(&self, id: &K) -> Option<usize> {
        self.table
            .find(hash_id(id), |jr| self.ids[*jr as usize] == *id)
            .map(|jr| *jr as usize)
    }

    /// Look up the ID at an index.
    pub fn get_id(&self, index: usize) -> Option<&K> {
        self.ids.get(index)
    }

    /// Look up the indexes of many IDs, failing on the first unknown one.
    ///
    /// `kind` names the entity type in the error message.
    pub fn get_indexes(&self, ids: &[K], kind: &'static str) -> Result<Vec<usize>> {
        ids.iter()
            .map(|id| {
                self.get_index(id).ok_or_else(|| RecError::UnknownId {
                    kind,
                    id: format!("{:?}", id),
                })
            })
            .collect()
    }
}

impl<K: EntityId> IdMapping<K> for IdIndex<K> {
    fn index_of(&self, id: &K) -> Option<usize> {
        self.get_index(id)
    }

    fn id_of(&self, index: usize) -> Option<&K> {
        self.get_id(index)
    }

    fn len(&self) -> usize {
        self.ids.len()
    }
}

#[test]
fn test_lookup_strings() {
    let idx = IdIndex::new(vec!["a".to_string(), "b".into(), "c".into()]).unwrap();
    assert_eq!(idx.len(), 3);
    assert_eq!(idx.get_index(&"b".to_string()), Some(1));
    assert_eq!(idx.get_index(&"z".to_string()), None);
    assert_eq!(idx.get_id(2).map(String::as_str), Some("c"));
    assert_eq!(idx.get_id(3), None);
}

#[test]
fn test_lookup_ints() {
    let idx = IdIndex::new(vec![40u64, 10, 30]).unwrap();
    assert_eq!(idx.get_indexes(&[30, 40], "item").unwrap(), vec![2, 0]);
    assert_eq!(IdMapping::index_of(&idx, &10), Some(1));
    assert_eq!(IdMapping::id_of(&idx, 0), Some(&40));
}

#[test]
fn test_unknown_id() {
    let idx = IdIndex::new(vec![1i32, 2]).unwrap();
    match idx.get_indexes(&[2, 7], "user") {
        Err(RecError::UnknownId { kind, id }) => {
            assert_eq!(kind, "user");
            assert_eq!(id, "7");
        }
        r => panic!("unexpected result {:?}", r),
    }
}

#[test]
fn test_duplicate_id() {
    let res = IdIndex::new(vec![5i32, 6, 5]);
    assert!(matches!(
        res,
        Err(RecError::DuplicateId {
            kind: "entity",
            index: 2
        })
    ));
    let res = IdIndex::from_ids(vec!["a", "a"], "user");
    assert!(matches!(
        res,
        Err(RecError::DuplicateId {
            kind: "user",
            index: 1
        })
    ));
}

#[test]
fn test_empty() {
    let idx = IdIndex::<i32>::empty();
    assert!(idx.is_empty());
    assert_eq!(idx.get_index(&0), None);
}
