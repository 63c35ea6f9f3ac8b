// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{Config, Error, HashMap, SortedMap};
use std::{fmt::Write, sync::RwLock};

/// Kind of a registered data structure
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MapKind {
    /// [`SortedMap`]
    SortedMap,
}

impl std::fmt::Display for MapKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SortedMap => write!(f, "SortedMap"),
        }
    }
}

/// Named sorted maps
///
/// The registry has its own lock, which is independent of the locks of the
/// maps it holds: looking up a map never blocks on a write to another map.
pub struct Registry {
    sorted_maps: RwLock<HashMap<String, SortedMap>>,

    /// Used for maps created through this registry
    config: Config,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

fn check_name(name: &str) -> crate::Result<()> {
    if name.is_empty() {
        Err(Error::InvalidName)
    } else {
        Ok(())
    }
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates an empty registry whose maps use the given config.
    #[must_use]
    pub fn with_config(config: Config) -> Self {
        Self {
            sorted_maps: RwLock::new(HashMap::default()),
            config,
        }
    }

    /// Creates a new sorted map and returns a handle to it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`] if the name is empty, or
    /// [`Error::AlreadyExists`] if the name is taken.
    pub fn create_sorted_map(&self, name: &str) -> crate::Result<SortedMap> {
        check_name(name)?;

        let mut maps = self.sorted_maps.write().expect("lock is poisoned");

        if maps.contains_key(name) {
            return Err(Error::AlreadyExists(name.into()));
        }

        let map = SortedMap::with_config(self.config.clone());
        maps.insert(name.into(), map.clone());

        log::debug!("Created sorted map {name:?}");

        Ok(map)
    }

    /// Drops a sorted map.
    ///
    /// Outstanding handles (and iterators) stay usable; the map is freed
    /// once the last one is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidName`] if the name is empty, or
    /// [`Error::NotFound`] if no such map exists.
    pub fn drop_sorted_map(&self, name: &str) -> crate::Result<()> {
        check_name(name)?;

        let mut maps = self.sorted_maps.write().expect("lock is poisoned");

        let Some(map) = maps.remove(name) else {
            return Err(Error::NotFound(name.into()));
        };

        log::debug!("Dropped sorted map {name:?} with {} entries", map.len());

        Ok(())
    }

    /// Returns a handle to a sorted map.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no such map exists.
    pub fn sorted_map(&self, name: &str) -> crate::Result<SortedMap> {
        self.sorted_maps
            .read()
            .expect("lock is poisoned")
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotFound(name.into()))
    }

    /// Lists all registered maps, sorted by name.
    #[must_use]
    pub fn list(&self) -> Vec<(String, MapKind)> {
        let mut names = self
            .sorted_maps
            .read()
            .expect("lock is poisoned")
            .keys()
            .map(|name| (name.clone(), MapKind::SortedMap))
            .collect::<Vec<_>>();

        names.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        names
    }

    /// Returns a human-readable status report.
    ///
    /// ```
    /// # use lexmap::Registry;
    /// let registry = Registry::new();
    /// registry.create_sorted_map("users")?;
    ///
    /// assert_eq!("[SortedMap]\nusers : length=0\n", registry.status());
    /// # Ok::<(), lexmap::Error>(())
    /// ```
    #[must_use]
    pub fn status(&self) -> String {
        let maps = self.sorted_maps.read().expect("lock is poisoned");

        let mut names = maps.keys().collect::<Vec<_>>();
        names.sort_unstable();

        let mut out = String::from("[SortedMap]\n");

        for name in names {
            if let Some(map) = maps.get(name) {
                let _ = writeln!(out, "{name} : length={}", map.len());
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn registry_create_drop() -> crate::Result<()> {
        let registry = Registry::new();

        let map = registry.create_sorted_map("a")?;
        map.put("k", "v")?;

        assert_eq!(
            Err(Error::AlreadyExists("a".into())),
            registry.create_sorted_map("a").map(|_| ()),
        );

        assert_eq!(Some("v".into()), registry.sorted_map("a")?.get("k")?);

        registry.drop_sorted_map("a")?;
        assert_eq!(
            Err(Error::NotFound("a".into())),
            registry.drop_sorted_map("a"),
        );

        // Handle outlives the registry entry
        assert_eq!(1, map.len());

        Ok(())
    }

    #[test]
    fn registry_empty_name() {
        let registry = Registry::new();
        assert_eq!(
            Err(Error::InvalidName),
            registry.create_sorted_map("").map(|_| ()),
        );
        assert_eq!(Err(Error::InvalidName), registry.drop_sorted_map(""));
        assert!(registry.list().is_empty());
    }

    #[test]
    fn registry_status() -> crate::Result<()> {
        let registry = Registry::new();
        assert_eq!("[SortedMap]\n", registry.status());

        registry.create_sorted_map("b")?.put("x", "y")?;
        registry.create_sorted_map("a")?;

        assert_eq!("[SortedMap]\na : length=0\nb : length=1\n", registry.status());
        assert_eq!("SortedMap", MapKind::SortedMap.to_string());

        Ok(())
    }
}
