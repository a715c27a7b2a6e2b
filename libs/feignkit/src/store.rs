//! Scoped store of configuration fragments.
//!
//! - One optional fragment per scope (the default scope plus one per client context id).
//! - Fragments are append-once: a scope cannot be registered twice.
//! - Once a scope has been read by the resolver it is sealed; later puts fail.
//! - No merging happens here; see [`crate::ConfigurationResolver`].

use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::FeignError;
use crate::fragment::{ConfigFragment, Scope};

#[derive(Default)]
struct StoreState {
    fragments: HashMap<Scope, Arc<ConfigFragment>>,
    sealed: HashSet<Scope>,
    next_sequence_no: u64,
}

/// Holds the configuration fragments of every scope.
pub struct ConfigurationStore {
    state: RwLock<StoreState>,
    empty: Arc<ConfigFragment>,
}

impl ConfigurationStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            empty: Arc::new(ConfigFragment::default()),
        }
    }
}

impl Default for ConfigurationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigurationStore {
    /// Register the fragment of `scope`.
    ///
    /// Customizer entries are stamped with a store-wide registration sequence number,
    /// which breaks ties between entries of equal order.
    ///
    /// # Errors
    /// - `FeignError::FragmentAlreadyResolved` if the scope was already read by the resolver
    /// - `FeignError::DuplicateScope` if the scope already holds a fragment
    pub fn put(&self, scope: Scope, fragment: ConfigFragment) -> Result<(), FeignError> {
        let mut w = self.state.write();
        if w.sealed.contains(&scope) {
            return Err(FeignError::FragmentAlreadyResolved {
                scope: scope.to_string(),
            });
        }
        if w.fragments.contains_key(&scope) {
            return Err(FeignError::DuplicateScope {
                scope: scope.to_string(),
            });
        }

        let mut fragment = fragment;
        let mut next = w.next_sequence_no;
        fragment.customizers = stamp(fragment.customizers, &mut next);
        fragment.async_customizers = stamp(fragment.async_customizers, &mut next);
        w.next_sequence_no = next;

        tracing::debug!(scope = %scope, "Registered configuration fragment");
        w.fragments.insert(scope, Arc::new(fragment));
        Ok(())
    }

    /// Fragment of `scope`, or an empty fragment if none was registered.
    #[must_use]
    pub fn get(&self, scope: &Scope) -> Arc<ConfigFragment> {
        self.state
            .read()
            .fragments
            .get(scope)
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.empty))
    }

    /// Whether a fragment was registered for `scope`.
    #[must_use]
    pub fn contains(&self, scope: &Scope) -> bool {
        self.state.read().fragments.contains_key(scope)
    }

    /// Read `scope` for resolution and forbid any later put on it.
    pub(super) fn seal(&self, scope: &Scope) -> Arc<ConfigFragment> {
        let mut w = self.state.write();
        w.sealed.insert(scope.clone());
        w.fragments
            .get(scope)
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.empty))
    }

    #[must_use]
    pub fn is_sealed(&self, scope: &Scope) -> bool {
        self.state.read().sealed.contains(scope)
    }

    /// Number of registered scopes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().fragments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.read().fragments.is_empty()
    }
}

fn stamp<D>(
    entries: Vec<crate::customizer::CustomizerEntry<D>>,
    next: &mut u64,
) -> Vec<crate::customizer::CustomizerEntry<D>> {
    entries
        .into_iter()
        .map(|e| {
            *next += 1;
            e.with_sequence_no(*next)
        })
        .collect()
}
