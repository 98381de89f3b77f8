// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Loaded-module cache

use super::Module;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Thread-safe module cache keyed by resolved filename
#[derive(Default)]
pub struct ModuleCache {
    cache: DashMap<PathBuf, Arc<Module>>,
}

impl ModuleCache {
    /// Create a new empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a cached module by path
    pub fn get(&self, path: &Path) -> Option<Arc<Module>> {
        self.cache.get(path).map(|entry| Arc::clone(entry.value()))
    }

    /// Add a module to the cache
    pub fn set(&self, module: Arc<Module>) {
        self.cache.insert(module.filename.clone(), module);
    }

    /// Remove a module from the cache so the next load reads it again
    pub fn delete(&self, path: &Path) -> Option<Arc<Module>> {
        self.cache.remove(path).map(|(_, v)| v)
    }

    /// Get the number of cached modules
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
