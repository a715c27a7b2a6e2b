//! Alias-keyed registry of built clients.
//!
//! - Key = alias string; value = the published client plus the context id that owns it.
//! - Value is stored as `Arc<dyn Any + Send + Sync>` and downcast on read.
//! - Publishing is all-or-nothing across the names of one client: if any name is owned
//!   by another context id nothing is written.
//! - Re-publishing from the same owner replaces its entries; `Arc`s already handed out
//!   stay valid.

use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::descriptor::Published;
use crate::error::FeignError;

struct Entry {
    owner: Arc<str>,
    client: Published,
}

/// Registry of clients keyed by alias.
pub struct ClientRegistry {
    map: RwLock<HashMap<String, Entry>>,
}

impl ClientRegistry {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            map: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientRegistry {
    /// Publish `client` under every name in `names` on behalf of `owner`.
    ///
    /// # Errors
    /// `FeignError::DuplicateAlias` if any name is already owned by a different
    /// context id; the registry is left unchanged.
    pub fn publish<'a>(
        &self,
        owner: &str,
        names: impl IntoIterator<Item = &'a str>,
        client: &Published,
    ) -> Result<(), FeignError> {
        let names: BTreeSet<&str> = names.into_iter().collect();
        let mut w = self.map.write();

        for name in &names {
            if let Some(existing) = w.get(*name)
                && &*existing.owner != owner
            {
                return Err(FeignError::DuplicateAlias {
                    alias: (*name).to_owned(),
                    owner: (*existing.owner).to_owned(),
                });
            }
        }

        // Drop names this owner published earlier but no longer uses.
        w.retain(|name, entry| &*entry.owner != owner || names.contains(name.as_str()));

        let owner: Arc<str> = Arc::from(owner);
        for name in names {
            w.insert(
                name.to_owned(),
                Entry {
                    owner: Arc::clone(&owner),
                    client: Arc::clone(client),
                },
            );
        }
        Ok(())
    }

    /// Fetch the client published under `alias` as adapter type `T`.
    ///
    /// # Errors
    /// - `FeignError::ClientNotFound` if nothing is published under `alias`
    /// - `FeignError::TypeMismatch` if the published client is not a `T`
    pub fn get<T>(&self, alias: &str) -> Result<Arc<T>, FeignError>
    where
        T: Send + Sync + 'static,
    {
        let client = self
            .map
            .read()
            .get(alias)
            .map(|e| Arc::clone(&e.client))
            .ok_or_else(|| FeignError::ClientNotFound {
                alias: alias.to_owned(),
            })?;

        client
            .downcast::<T>()
            .map_err(|_| FeignError::TypeMismatch {
                alias: alias.to_owned(),
                requested: std::any::type_name::<T>(),
            })
    }

    /// Untyped lookup.
    #[must_use]
    pub fn get_published(&self, alias: &str) -> Option<Published> {
        self.map.read().get(alias).map(|e| Arc::clone(&e.client))
    }

    /// Context id that owns `alias`.
    #[must_use]
    pub fn owner_of(&self, alias: &str) -> Option<String> {
        self.map.read().get(alias).map(|e| (*e.owner).to_owned())
    }

    #[must_use]
    pub fn contains(&self, alias: &str) -> bool {
        self.map.read().contains_key(alias)
    }

    /// All published names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.map.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Introspection: (total entries).
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }
}
