// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Instance and bundler configuration
//!
//! Both structures deserialize from the JSON shape bundler users already
//! write:
//!
//! ```json
//! {
//!   "loaders": { "use": ["raw-loader"], "identity": [] },
//!   "domSupport": false,
//!   "webpackConfig": {
//!     "resolve": { "alias": { "app": "src/app" }, "extensions": [".jsx"] },
//!     "module": { "loaders": [{ "test": "\\.txt$", "loader": "raw" }] }
//!   }
//! }
//! ```

use crate::error::{MimicError, Result};
use crate::plugins::Plugin;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Options for one shim instance
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MimicOptions {
    /// Use/identity lists
    pub loaders: LoaderOptions,
    /// Install DOM emulation globals on install
    pub dom_support: bool,
    /// Alias, extension and loader rule configuration
    #[serde(alias = "webpackConfig")]
    pub bundler_config: Option<BundlerConfig>,
}

/// Which named plugins run, are suppressed or pass text through
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoaderOptions {
    /// Allow-list; when set, names absent from it are suppressed
    #[serde(rename = "use")]
    pub use_list: Option<Vec<String>>,
    /// Names forced to passthrough
    pub identity: Vec<String>,
}

impl MimicOptions {
    /// Parse options from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load options from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Overlay `MIMIC_*` environment variables
    pub fn apply_env(&mut self) {
        self.apply_vars(std::env::vars());
    }

    /// Overlay `MIMIC_*` pairs from any source
    pub fn apply_vars(&mut self, vars: impl IntoIterator<Item = (String, String)>) {
        for (key, value) in vars {
            match key.as_str() {
                "MIMIC_DOM_SUPPORT" => self.dom_support = matches!(value.as_str(), "1" | "true"),
                "MIMIC_LOADERS_USE" => self.loaders.use_list = Some(split_list(&value)),
                "MIMIC_LOADERS_IDENTITY" => self.loaders.identity = split_list(&value),
                _ => {}
            }
        }
    }

    /// Restrict running plugins to `names`
    pub fn with_use<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.loaders.use_list = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Force `names` to passthrough
    pub fn with_identity<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.loaders.identity = names.into_iter().map(Into::into).collect();
        self
    }

    /// Toggle DOM emulation
    pub fn with_dom_support(mut self, enabled: bool) -> Self {
        self.dom_support = enabled;
        self
    }

    /// Attach a bundler configuration
    pub fn with_bundler_config(mut self, config: BundlerConfig) -> Self {
        self.bundler_config = Some(config);
        self
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// The parts of a bundler configuration the shim understands
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BundlerConfig {
    /// `resolve` section
    pub resolve: ResolveConfig,
    /// `module` section
    pub module: ModuleConfig,
}

/// `resolve.alias` and `resolve.extensions`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResolveConfig {
    /// First path segment -> replacement path or module name
    pub alias: HashMap<String, String>,
    /// Additional script-like extensions, with leading dot
    pub extensions: Vec<String>,
}

/// `module.loaders`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModuleConfig {
    /// Rules in priority order; the first match wins
    pub loaders: Vec<LoaderRule>,
}

impl BundlerConfig {
    /// Create an empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an alias
    pub fn with_alias(mut self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.resolve.alias.insert(name.into(), target.into());
        self
    }

    /// Add a script-like extension
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.resolve.extensions.push(extension.into());
        self
    }

    /// Append a loader rule
    pub fn with_rule(mut self, rule: LoaderRule) -> Self {
        self.module.loaders.push(rule);
        self
    }
}

/// A matcher paired with a plugin chain
#[derive(Debug, Clone, Deserialize)]
pub struct LoaderRule {
    /// Pattern tested against the file path
    pub test: Matcher,
    /// Plugin chain applied to matching files
    pub loader: LoaderSpec,
}

impl LoaderRule {
    /// Create a rule
    pub fn new(test: Matcher, loader: impl Into<LoaderSpec>) -> Self {
        Self {
            test,
            loader: loader.into(),
        }
    }
}

/// Regular expression searched for anywhere in a file path
#[derive(Clone)]
pub struct Matcher(Regex);

impl Matcher {
    /// Compile a pattern
    pub fn new(pattern: &str) -> Result<Self> {
        Regex::new(pattern)
            .map(Matcher)
            .map_err(|source| MimicError::InvalidMatcher {
                pattern: pattern.to_string(),
                source,
            })
    }

    /// Test a file path
    pub fn is_match(&self, path: &Path) -> bool {
        self.0.is_match(&path.to_string_lossy())
    }

    /// Pattern text
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/", self.0.as_str())
    }
}

impl<'de> Deserialize<'de> for Matcher {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let pattern = String::deserialize(deserializer)?;
        Matcher::new(&pattern).map_err(serde::de::Error::custom)
    }
}

/// A raw plugin chain before normalization
#[derive(Debug, Clone)]
pub enum LoaderSpec {
    /// One transform function
    Single(Plugin),
    /// Transform functions, applied last to first
    Many(Vec<Plugin>),
    /// `!`-delimited plugin names, each optionally `name?query`
    Named(String),
}

impl From<Plugin> for LoaderSpec {
    fn from(plugin: Plugin) -> Self {
        LoaderSpec::Single(plugin)
    }
}

impl From<Vec<Plugin>> for LoaderSpec {
    fn from(plugins: Vec<Plugin>) -> Self {
        LoaderSpec::Many(plugins)
    }
}

impl From<&str> for LoaderSpec {
    fn from(names: &str) -> Self {
        LoaderSpec::Named(names.to_string())
    }
}

impl From<String> for LoaderSpec {
    fn from(names: String) -> Self {
        LoaderSpec::Named(names)
    }
}

impl<'de> Deserialize<'de> for LoaderSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        String::deserialize(deserializer).map(LoaderSpec::Named)
    }
}
