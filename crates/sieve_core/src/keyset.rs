use std::collections::{BTreeMap, HashSet};
use std::hash::Hash;

use crate::page::{PageRequest, PageResult};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeySet<T> {
    keys: Vec<T>,
}

impl<T> Default for KeySet<T> {
    fn default() -> Self {
        Self { keys: Vec::new() }
    }
}

impl<T: Eq + Hash + Clone> KeySet<T> {
    pub fn collect(keys: impl IntoIterator<Item = T>) -> Self {
        let mut seen = HashSet::new();
        let keys = keys
            .into_iter()
            .filter(|key| seen.insert(key.clone()))
            .collect();
        Self { keys }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn keys(&self) -> &[T] {
        &self.keys
    }

    pub fn chunks(&self, size: usize) -> impl Iterator<Item = KeySet<T>> + '_ {
        self.keys.chunks(size.max(1)).map(|chunk| KeySet {
            keys: chunk.to_vec(),
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Multiset {
    counts: BTreeMap<i64, u64>,
}

impl Multiset {
    pub fn from_occurrences(ids: impl IntoIterator<Item = i64>) -> Self {
        let mut counts = BTreeMap::new();
        for id in ids {
            *counts.entry(id).or_insert(0) += 1;
        }
        Self { counts }
    }

    pub fn distinct(&self) -> KeySet<i64> {
        KeySet {
            keys: self.counts.keys().copied().collect(),
        }
    }

    pub fn count(&self, id: i64) -> u64 {
        self.counts.get(&id).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn expand<T: Clone>(&self, rows: Vec<T>, key: impl Fn(&T) -> i64) -> Vec<T> {
        let mut expanded = Vec::new();
        for row in rows {
            let count = self.count(key(&row));
            for _ in 0..count {
                expanded.push(row.clone());
            }
        }
        expanded
    }
}

pub fn paginate_multiset<T: Clone>(
    rows: Vec<T>,
    key: impl Fn(&T) -> i64,
    multiset: &Multiset,
    page: &PageRequest,
) -> PageResult<T> {
    let expanded = multiset.expand(rows, key);
    let total = expanded.len() as u64;
    let size = page.size.unwrap_or(total.max(1));
    let max_page = total.saturating_sub(1) / size;
    let actual_page = page.number.min(max_page);
    let start = (actual_page * size).min(total) as usize;
    let end = (start as u64 + size).min(total) as usize;
    let content = expanded[start..end].to_vec();
    let mut effective = page.clone();
    effective.number = actual_page;
    effective.size = Some(size);
    PageResult::new(content, total, &effective)
}
