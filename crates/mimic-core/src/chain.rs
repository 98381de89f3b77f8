// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Plugin chain normalization
//!
//! Turns a [`LoaderSpec`] into one [`ComposedTransform`]. Chains run right to
//! left: for `"a!b"` the raw text goes to `b` and `b`'s output goes to `a`.

use crate::config::{BundlerConfig, LoaderOptions, LoaderSpec};
use crate::diagnostics::Diagnostics;
use crate::error::{MimicError, Result};
use crate::plugins::builtin::{identity_plugin, null_plugin};
use crate::plugins::{LOADER_SUFFIX, LoaderContext, Plugin, PluginRegistry};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Separates plugin references in a named chain
pub const CHAIN_DELIMITER: char = '!';

/// Separates a plugin reference from its query
pub const QUERY_DELIMITER: char = '?';

/// One resolved link of a chain
#[derive(Debug, Clone)]
pub struct ChainEntry {
    name: String,
    query: Option<String>,
    plugin: Plugin,
}

impl ChainEntry {
    fn from_plugin(plugin: Plugin) -> Self {
        Self {
            name: plugin.name().to_string(),
            query: None,
            plugin,
        }
    }

    /// Effective name the entry was resolved under
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Query suffix, without the `?`
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// The transform function that runs for this entry
    pub fn plugin(&self) -> &Plugin {
        &self.plugin
    }
}

/// Normalizes loader rule chains against a registry and the use/identity lists
pub struct ChainNormalizer<'a> {
    registry: &'a PluginRegistry,
    lists: &'a LoaderOptions,
    options: Option<Arc<BundlerConfig>>,
    diagnostics: Diagnostics,
}

impl<'a> ChainNormalizer<'a> {
    /// Create a normalizer
    pub fn new(
        registry: &'a PluginRegistry,
        lists: &'a LoaderOptions,
        options: Option<Arc<BundlerConfig>>,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            registry,
            lists,
            options,
            diagnostics,
        }
    }

    /// Compose the chain described by `spec`
    pub fn normalize(&self, spec: &LoaderSpec) -> Result<ComposedTransform> {
        let chain = match spec {
            LoaderSpec::Single(plugin) => vec![ChainEntry::from_plugin(plugin.clone())],
            LoaderSpec::Many(plugins) => plugins.iter().cloned().map(ChainEntry::from_plugin).collect(),
            LoaderSpec::Named(names) => names
                .split(CHAIN_DELIMITER)
                .map(|reference| self.resolve_reference(reference))
                .collect::<Result<Vec<_>>>()?,
        };

        debug!(
            chain = ?chain.iter().map(ChainEntry::name).collect::<Vec<_>>(),
            "Normalized loader chain"
        );

        Ok(ComposedTransform {
            chain: chain.into(),
            options: self.options.clone(),
            diagnostics: self.diagnostics.clone(),
        })
    }

    /// Resolve `name?query` to a chain entry
    fn resolve_reference(&self, reference: &str) -> Result<ChainEntry> {
        let (bare, query) = match reference.split_once(QUERY_DELIMITER) {
            Some((bare, query)) => (bare, Some(query.to_string())),
            None => (reference, None),
        };
        let name = self.registry.effective_name(bare);

        let plugin = if self.lists.identity.contains(&name) {
            identity_plugin()
        } else if self
            .lists
            .use_list
            .as_ref()
            .is_some_and(|allowed| !allowed.contains(&name))
        {
            null_plugin()
        } else {
            self.registry
                .get(&name)
                .cloned()
                .ok_or_else(|| MimicError::PluginNotFound {
                    name: bare.to_string(),
                    fallback: format!("{bare}{LOADER_SUFFIX}"),
                })?
        };

        Ok(ChainEntry {
            name,
            query,
            plugin,
        })
    }
}

/// A whole chain folded into one text-to-text function
#[derive(Debug, Clone)]
pub struct ComposedTransform {
    chain: Arc<[ChainEntry]>,
    options: Option<Arc<BundlerConfig>>,
    diagnostics: Diagnostics,
}

impl ComposedTransform {
    /// Transform text outside of any module load
    pub fn apply(&self, source: &str) -> Result<String> {
        self.apply_to(source, None)
    }

    /// Transform the text of `resource`
    pub fn apply_to(&self, source: &str, resource: Option<&Path>) -> Result<String> {
        self.chain
            .iter()
            .enumerate()
            .rev()
            .try_fold(source.to_string(), |text, (index, entry)| {
                let mut ctx = LoaderContext::new(
                    &self.chain,
                    self.options.as_deref(),
                    index,
                    resource,
                    &self.diagnostics,
                );
                let returned = entry.plugin.call(&mut ctx, &text);
                ctx.finish(returned)
                    .map(|completion| completion.into_text())
                    .map_err(|err| MimicError::plugin(&entry.name, &err))
            })
    }

    /// The resolved chain, leftmost first
    pub fn chain(&self) -> &[ChainEntry] {
        &self.chain
    }
}
