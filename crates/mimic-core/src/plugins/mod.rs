// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Text-transform plugins
//!
//! A plugin is an opaque function from source text to source text. It is
//! handed a [`LoaderContext`] that mirrors what bundler loaders expect:
//!
//! - `cacheable()` - accepted and ignored
//! - `loaders()` / `loader_index()` - the whole resolved chain and the
//!   plugin's position in it
//! - `options()` - the bundler configuration the chain came from
//! - `callback()` - completion hook; when used, its text wins over the
//!   plugin's return value
//! - `async_callback()` - unsupported, warns and hands back an inert hook
//!
//! Named plugins are looked up in a [`PluginRegistry`], by exact name first
//! and then with the conventional [`LOADER_SUFFIX`].

pub mod builtin;

use crate::chain::ChainEntry;
use crate::config::BundlerConfig;
use crate::diagnostics::{Diagnostics, Warning};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Suffix appended to a plugin name when the bare name does not resolve
pub const LOADER_SUFFIX: &str = "-loader";

/// Signature of every transform function
pub type TransformFn =
    dyn Fn(&mut LoaderContext<'_>, &str) -> anyhow::Result<String> + Send + Sync;

/// A named, cheaply clonable handle to a transform function
#[derive(Clone)]
pub struct Plugin {
    name: Arc<str>,
    func: Arc<TransformFn>,
}

impl Plugin {
    /// Create a named plugin
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&mut LoaderContext<'_>, &str) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name.into()),
            func: Arc::new(func),
        }
    }

    /// Create a plugin with no registry name
    pub fn from_fn<F>(func: F) -> Self
    where
        F: Fn(&mut LoaderContext<'_>, &str) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        Self::new("<anonymous>", func)
    }

    /// The plugin's name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the transform function
    pub fn call(&self, ctx: &mut LoaderContext<'_>, source: &str) -> anyhow::Result<String> {
        (self.func)(ctx, source)
    }

    /// Whether two handles point at the same function
    pub fn ptr_eq(&self, other: &Plugin) -> bool {
        Arc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Plugin").field(&self.name).finish()
    }
}

/// How a plugin delivered its output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The plugin returned its text
    Direct(String),
    /// The plugin called the completion hook; its return value was dropped
    ViaCallback(String),
}

impl Completion {
    /// The effective text passed to the next plugin
    pub fn into_text(self) -> String {
        match self {
            Completion::Direct(text) | Completion::ViaCallback(text) => text,
        }
    }
}

/// Inert completion handle returned by [`LoaderContext::async_callback`]
pub type AsyncCallback = Box<dyn FnMut(Option<anyhow::Error>, String) + Send>;

/// Execution context handed to a plugin for one invocation
pub struct LoaderContext<'a> {
    chain: &'a [ChainEntry],
    options: Option<&'a BundlerConfig>,
    loader_index: usize,
    resource_path: Option<&'a Path>,
    diagnostics: &'a Diagnostics,
    completion: Option<anyhow::Result<String>>,
}

impl<'a> LoaderContext<'a> {
    pub(crate) fn new(
        chain: &'a [ChainEntry],
        options: Option<&'a BundlerConfig>,
        loader_index: usize,
        resource_path: Option<&'a Path>,
        diagnostics: &'a Diagnostics,
    ) -> Self {
        Self {
            chain,
            options,
            loader_index,
            resource_path,
            diagnostics,
            completion: None,
        }
    }

    /// Cache control; results are never cached here
    pub fn cacheable(&mut self, _flag: bool) {}

    /// The full resolved chain
    pub fn loaders(&self) -> &'a [ChainEntry] {
        self.chain
    }

    /// Position of the running plugin in [`Self::loaders`]
    pub fn loader_index(&self) -> usize {
        self.loader_index
    }

    /// Bundler configuration the chain was normalized from
    pub fn options(&self) -> Option<&'a BundlerConfig> {
        self.options
    }

    /// Query suffix of the running chain entry (`name?query`)
    pub fn query(&self) -> Option<&'a str> {
        self.chain
            .get(self.loader_index)
            .and_then(|entry| entry.query())
    }

    /// File being transformed, when the transform runs for a module load
    pub fn resource_path(&self) -> Option<&'a Path> {
        self.resource_path
    }

    /// Request asynchronous completion.
    ///
    /// Not supported: logs a warning and returns a hook that does nothing.
    pub fn async_callback(&mut self) -> AsyncCallback {
        let plugin = self
            .chain
            .get(self.loader_index)
            .map(|entry| entry.name().to_string())
            .unwrap_or_default();
        self.diagnostics.warn(Warning::AsyncUnsupported { plugin });
        Box::new(|_, _| {})
    }

    /// Complete with `text`, or fail with `err`.
    ///
    /// Always returns an empty string so a plugin can end with
    /// `ctx.callback(None, text)`; that return value is discarded.
    pub fn callback(
        &mut self,
        err: Option<anyhow::Error>,
        text: impl Into<String>,
    ) -> anyhow::Result<String> {
        self.completion = Some(match err {
            Some(err) => Err(err),
            None => Ok(text.into()),
        });
        Ok(String::new())
    }

    /// Decide the tagged result of an invocation
    pub(crate) fn finish(self, returned: anyhow::Result<String>) -> anyhow::Result<Completion> {
        match self.completion {
            Some(done) => done.map(Completion::ViaCallback),
            None => returned.map(Completion::Direct),
        }
    }
}

/// Name-to-plugin lookup table
#[derive(Clone, Default)]
pub struct PluginRegistry {
    plugins: HashMap<String, Plugin>,
}

impl PluginRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the stock plugins from [`builtin`]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for plugin in builtin::all() {
            registry.insert(plugin);
        }
        registry
    }

    /// Register a transform function under `name`
    pub fn register<F>(&mut self, name: impl Into<String>, func: F) -> &mut Self
    where
        F: Fn(&mut LoaderContext<'_>, &str) -> anyhow::Result<String> + Send + Sync + 'static,
    {
        self.insert(Plugin::new(name, func));
        self
    }

    /// Register a plugin under its own name
    pub fn insert(&mut self, plugin: Plugin) {
        self.plugins.insert(plugin.name().to_string(), plugin);
    }

    /// Exact-name lookup
    pub fn get(&self, name: &str) -> Option<&Plugin> {
        self.plugins.get(name)
    }

    /// Check if an exact name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    /// Effective name for a reference: the bare name if registered,
    /// otherwise the name with [`LOADER_SUFFIX`] appended
    pub fn effective_name(&self, name: &str) -> String {
        if self.contains(name) {
            name.to_string()
        } else {
            format!("{name}{LOADER_SUFFIX}")
        }
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.plugins.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}
