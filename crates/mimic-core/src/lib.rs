// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # mimic-core
//!
//! Runs modules written against a bundler's conventions directly on a
//! script host's module loader. Nothing is bundled: the bundler
//! configuration is translated into overrides of the host's loader.
//!
//! - `resolve.alias` rewrites the first segment of every requested specifier
//! - `resolve.extensions` registers extra script-like extensions
//! - `module.loaders` rules route matching files through a plugin chain
//!   before the host compiles them
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use mimic_core::{BundlerConfig, LoaderRule, Matcher, Mimic, MimicOptions};
//!
//! let config = BundlerConfig::new()
//!     .with_alias("app", "src/app")
//!     .with_extension(".txt")
//!     .with_rule(LoaderRule::new(Matcher::new(r"\.txt$")?, "raw"));
//!
//! let mimic = Mimic::new(MimicOptions::default().with_bundler_config(config))?;
//! mimic.install();
//! let notes = mimic.host().require(Path::new("main.js"), "./notes")?;
//! mimic.uninstall();
//! ```
//!
//! ## Plugin chains
//!
//! A rule's `loader` is a single plugin, a list of plugins, or a
//! `"a!b?query"` string of registry names. Chains run right to left, and a
//! name that is not registered is retried with a `-loader` suffix.
//! `loaders.identity` forces names to passthrough and `loaders.use` suppresses
//! everything it does not list.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod alias;
pub mod chain;
pub mod config;
pub mod diagnostics;
pub mod dom;
pub mod error;
pub mod host;
pub mod interceptor;
pub mod plugins;

// Re-exports
pub use alias::AliasResolver;
pub use chain::{CHAIN_DELIMITER, ChainEntry, ChainNormalizer, ComposedTransform};
pub use config::{BundlerConfig, LoaderOptions, LoaderRule, LoaderSpec, Matcher, MimicOptions};
pub use diagnostics::Warning;
pub use error::{MimicError, Result};
pub use host::{ExtensionHandler, LoadEntry, Module, ModuleHost, ScriptCompiler};
pub use interceptor::{Mimic, MimicBuilder};
pub use plugins::{Completion, LoaderContext, Plugin, PluginRegistry};

/// Version of mimic-core
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
