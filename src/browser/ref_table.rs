use crate::core::BrowserTrait;
use crate::dom::ElementCandidate;
use crate::errors::MAX_LISTED_REFS;
use crate::utils::selector::marker_selector;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Ref → live element handle for one session's latest snapshot.
///
/// Only ever replaced wholesale: a new snapshot clears it and fills it
/// again, so a ref from an older snapshot can never silently point at a
/// different element.
#[derive(Debug, Clone)]
pub struct RefTable<E> {
    handles: HashMap<String, E>,
    order: Vec<String>,
}

impl<E> Default for RefTable<E> {
    fn default() -> Self {
        Self {
            handles: HashMap::new(),
            order: Vec::new(),
        }
    }
}

impl<E> RefTable<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, ref_id: &str) -> Option<&E> {
        self.handles.get(ref_id)
    }

    pub fn contains(&self, ref_id: &str) -> bool {
        self.handles.contains_key(ref_id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Refs in snapshot order.
    pub fn refs(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// The first few valid refs, for error messages.
    pub fn sample_refs(&self) -> Vec<String> {
        self.order.iter().take(MAX_LISTED_REFS).cloned().collect()
    }

    pub fn clear(&mut self) {
        self.handles.clear();
        self.order.clear();
    }

    /// Swaps in the table from a newer snapshot.
    pub fn replace(&mut self, newer: RefTable<E>) {
        self.clear();
        *self = newer;
    }

    fn insert(&mut self, ref_id: String, handle: E) {
        if self.handles.insert(ref_id.clone(), handle).is_none() {
            self.order.push(ref_id);
        }
    }
}

/// Re-queries every stamped element and binds its ref to a live handle.
///
/// An element that vanished between stamping and binding, or a lookup
/// that errors, is logged and left out; binding never fails the snapshot.
pub async fn bind_refs<B: BrowserTrait>(
    browser: &B,
    tab: &B::TabHandle,
    candidates: &[ElementCandidate],
    marker_attribute: &str,
    timeout: Duration,
) -> RefTable<B::ElementHandle> {
    let mut table = RefTable::new();

    for candidate in candidates {
        let selector = marker_selector(marker_attribute, &candidate.ref_id);
        match browser.query(tab, &selector, timeout).await {
            Ok(Some(handle)) => table.insert(candidate.ref_id.clone(), handle),
            Ok(None) => {
                warn!(ref_id = %candidate.ref_id, "stamped element disappeared before binding");
            }
            Err(e) => {
                warn!(ref_id = %candidate.ref_id, error = %e, "failed to bind ref");
            }
        }
    }

    debug!(
        bound = table.len(),
        classified = candidates.len(),
        "bound refs to live handles"
    );
    table
}
