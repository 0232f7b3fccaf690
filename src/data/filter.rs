//! Filtering index proxy over an externally owned, ordered collection.
//!
//! [`FilteredIndex`] keeps a cached map from visible rows to indices in the
//! owning collection. Visibility is the conjunction of zero or more named
//! predicates. The collection itself is never copied: every operation that
//! needs it takes a [`ModelSource`] so the proxy stays valid across session
//! reloads.
//!
//! The map is only as fresh as the last recompute. Mutations the proxy cannot
//! observe (flag edits, re-ordering, rows added by the session) require an
//! explicit [`FilteredIndex::reindex`].

use std::collections::BTreeMap;
use std::sync::mpsc::{channel, Receiver, Sender};

use crate::data::session::ModelSource;
use crate::error::{Error, Result};

/// A pure visibility test for one record.
pub type Predicate<T> = Box<dyn Fn(&T) -> bool>;

/// Broadcast to subscribers whenever the index map is recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexMapChanged {
    pub revision: u64,
    /// Number of visible rows after the recompute.
    pub visible: usize,
    /// Size of the owning collection (0 when unavailable).
    pub total: usize,
}

pub struct FilteredIndex<T> {
    // BTreeMap keeps evaluation order stable (by name).
    predicates: BTreeMap<String, Predicate<T>>,
    lookup: Vec<usize>,
    total: usize,
    revision: u64,
    listeners: Vec<Sender<IndexMapChanged>>,
}

impl<T> Default for FilteredIndex<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for FilteredIndex<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilteredIndex")
            .field("predicates", &self.predicates.keys().collect::<Vec<_>>())
            .field("lookup", &self.lookup)
            .field("total", &self.total)
            .field("revision", &self.revision)
            .finish()
    }
}

impl<T> FilteredIndex<T> {
    pub fn new() -> Self {
        Self {
            predicates: BTreeMap::new(),
            lookup: Vec::new(),
            total: 0,
            revision: 0,
            listeners: Vec::new(),
        }
    }

    /// Register (or replace) the predicate `name` and recompute.
    pub fn add_predicate<S, F>(&mut self, name: impl Into<String>, predicate: F, source: &S)
    where
        S: ModelSource<T> + ?Sized,
        F: Fn(&T) -> bool + 'static,
    {
        let name = name.into();
        log::debug!("filter '{}' registered", name);
        self.predicates.insert(name, Box::new(predicate));
        self.reindex(source);
    }

    /// Remove the predicate `name` and recompute. Unknown names are an error.
    pub fn remove_predicate<S>(&mut self, name: &str, source: &S) -> Result<()>
    where
        S: ModelSource<T> + ?Sized,
    {
        if self.predicates.remove(name).is_none() {
            return Err(Error::PredicateNotFound(name.to_string()));
        }
        log::debug!("filter '{}' removed", name);
        self.reindex(source);
        Ok(())
    }

    /// Drop every predicate; all rows become visible.
    pub fn clear_predicates<S>(&mut self, source: &S)
    where
        S: ModelSource<T> + ?Sized,
    {
        self.predicates.clear();
        self.reindex(source);
    }

    pub fn has_predicate(&self, name: &str) -> bool {
        self.predicates.contains_key(name)
    }

    pub fn predicate_names(&self) -> impl Iterator<Item = &str> {
        self.predicates.keys().map(String::as_str)
    }

    fn accepts(&self, record: &T) -> bool {
        self.predicates.values().all(|p| p(record))
    }

    /// Recompute the index map against the current state of `source`.
    ///
    /// An unavailable source yields an empty map.
    pub fn reindex<S>(&mut self, source: &S)
    where
        S: ModelSource<T> + ?Sized,
    {
        let records = source.records().unwrap_or(&[]);
        self.lookup = records
            .iter()
            .enumerate()
            .filter(|(_, r)| self.accepts(r))
            .map(|(i, _)| i)
            .collect();
        self.total = records.len();
        self.revision += 1;
        log::debug!(
            "reindexed: {} of {} rows visible (revision {})",
            self.lookup.len(),
            self.total,
            self.revision
        );
        self.notify();
    }

    fn notify(&mut self) {
        let event = IndexMapChanged {
            revision: self.revision,
            visible: self.lookup.len(),
            total: self.total,
        };
        // Dropped receivers are pruned here.
        self.listeners.retain(|tx| tx.send(event).is_ok());
    }

    /// Subscribe to index map changes.
    pub fn subscribe(&mut self) -> Receiver<IndexMapChanged> {
        let (tx, rx) = channel();
        self.listeners.push(tx);
        rx
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn visible_count(&self) -> usize {
        self.lookup.len()
    }

    /// Owning-collection indices of all visible rows, increasing.
    pub fn indices(&self) -> &[usize] {
        &self.lookup
    }

    /// Map a visible row to its owning-collection index.
    pub fn to_underlying(&self, visible_row: usize) -> Result<usize> {
        self.lookup
            .get(visible_row)
            .copied()
            .ok_or(Error::OutOfRange {
                row: visible_row,
                len: self.lookup.len(),
            })
    }

    /// Map an owning-collection index to its visible row, or `None` when it is
    /// filtered out (or missing from a stale map).
    pub fn to_visible(&self, underlying_index: usize) -> Option<usize> {
        self.lookup.binary_search(&underlying_index).ok()
    }

    /// Evaluate the predicates directly against `source`, bypassing the cache.
    pub fn row_is_visible<S>(&self, underlying_index: usize, source: &S) -> bool
    where
        S: ModelSource<T> + ?Sized,
    {
        source
            .records()
            .and_then(|r| r.get(underlying_index))
            .is_some_and(|record| self.accepts(record))
    }

    /// Sorted, de-duplicated owning-collection indices for a visible-row selection.
    /// Rows outside the current map are ignored.
    pub fn map_selection(&self, visible_rows: &[usize]) -> Vec<usize> {
        let mut out: Vec<usize> = visible_rows
            .iter()
            .filter_map(|r| self.lookup.get(*r).copied())
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Check the cached map against `source`: strictly increasing, in bounds,
    /// and exactly the records accepted by every predicate.
    pub fn is_consistent<S>(&self, source: &S) -> bool
    where
        S: ModelSource<T> + ?Sized,
    {
        let records = source.records().unwrap_or(&[]);
        if self.lookup.windows(2).any(|w| w[0] >= w[1]) {
            return false;
        }
        let mut expected = records
            .iter()
            .enumerate()
            .filter(|(_, r)| self.accepts(r))
            .map(|(i, _)| i);
        self.lookup.iter().all(|i| expected.next() == Some(*i)) && expected.next().is_none()
    }
}
