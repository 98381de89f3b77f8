// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Load interception
//!
//! [`Mimic::install`] layers two overrides onto a [`ModuleHost`]:
//!
//! - the load entry point, wrapped so every specifier is alias-rewritten
//!   before the previous entry point sees it
//! - the `.js` handler and one handler per configured extension, routing files
//!   matched by a loader rule through that rule's composed transform
//!
//! [`Mimic::uninstall`] puts back exactly what install replaced. Instances
//! must be uninstalled in reverse install order; a violation is warned about
//! and the stale snapshot is restored anyway.

use crate::alias::AliasResolver;
use crate::chain::{ChainNormalizer, ComposedTransform};
use crate::config::{BundlerConfig, LoaderOptions, LoaderSpec, Matcher, MimicOptions};
use crate::diagnostics::{Diagnostics, Warning};
use crate::dom;
use crate::error::{MimicError, Result};
use crate::host::{DEFAULT_EXTENSION, ExtensionHandler, LoadEntry, Module, ModuleHost};
use crate::plugins::PluginRegistry;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// A loader rule with its chain already composed
#[derive(Debug, Clone)]
pub struct CompiledRule {
    /// File path matcher
    pub test: Matcher,
    /// Composed chain for matching files
    pub transform: ComposedTransform,
}

/// What install replaced
struct Snapshot {
    previous_load: LoadEntry,
    previous_default: Option<ExtensionHandler>,
    previous_handlers: Vec<(String, Option<ExtensionHandler>)>,
    /// Entry point this instance put in place; `None` once uninstalled.
    /// It owns the instance, so it must not outlive the install.
    installed_load: Option<LoadEntry>,
}

impl Snapshot {
    /// Installed and still the host's active entry point
    fn is_active(&self, host: &ModuleHost) -> bool {
        self.installed_load
            .as_ref()
            .is_some_and(|load| host.load_entry().same(load))
    }
}

struct Inner {
    host: Arc<ModuleHost>,
    registry: PluginRegistry,
    lists: LoaderOptions,
    dom_support: bool,
    bundler_config: Option<Arc<BundlerConfig>>,
    aliases: AliasResolver,
    extensions: Vec<String>,
    rules: Vec<CompiledRule>,
    diagnostics: Diagnostics,
    snapshot: Mutex<Option<Snapshot>>,
}

/// Builder for [`Mimic`]
pub struct MimicBuilder {
    options: MimicOptions,
    registry: PluginRegistry,
    host: Option<Arc<ModuleHost>>,
}

impl MimicBuilder {
    /// Use a plugin registry instead of the stock one
    pub fn registry(mut self, registry: PluginRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Install onto `host` instead of the process-wide host
    pub fn host(mut self, host: Arc<ModuleHost>) -> Self {
        self.host = Some(host);
        self
    }

    /// Normalize every loader rule and create the instance
    pub fn build(self) -> Result<Mimic> {
        let MimicOptions {
            loaders: lists,
            dom_support,
            bundler_config,
        } = self.options;
        let bundler_config = bundler_config.map(Arc::new);
        let diagnostics = Diagnostics::new();

        let (aliases, extensions, rules) = match &bundler_config {
            Some(config) => {
                let normalizer = ChainNormalizer::new(
                    &self.registry,
                    &lists,
                    Some(Arc::clone(config)),
                    diagnostics.clone(),
                );
                let rules = config
                    .module
                    .loaders
                    .iter()
                    .map(|rule| {
                        Ok(CompiledRule {
                            test: rule.test.clone(),
                            transform: normalizer.normalize(&rule.loader)?,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                let extensions = config
                    .resolve
                    .extensions
                    .iter()
                    .filter(|ext| !ext.is_empty())
                    .cloned()
                    .collect();
                (AliasResolver::new(config.resolve.alias.clone()), extensions, rules)
            }
            None => (AliasResolver::default(), Vec::new(), Vec::new()),
        };

        debug!(
            rules = rules.len(),
            extensions = ?extensions,
            aliased = !aliases.is_empty(),
            "Created mimic instance"
        );

        Ok(Mimic {
            inner: Arc::new(Inner {
                host: self.host.unwrap_or_else(ModuleHost::global),
                registry: self.registry,
                lists,
                dom_support,
                bundler_config,
                aliases,
                extensions,
                rules,
                diagnostics,
                snapshot: Mutex::new(None),
            }),
        })
    }
}

/// Runs bundler-configured modules on a host's native loader
#[derive(Clone)]
pub struct Mimic {
    inner: Arc<Inner>,
}

impl Mimic {
    /// Create an instance on the process-wide host with the stock registry
    pub fn new(options: MimicOptions) -> Result<Self> {
        Self::builder(options).build()
    }

    /// Start configuring an instance
    pub fn builder(options: MimicOptions) -> MimicBuilder {
        MimicBuilder {
            options,
            registry: PluginRegistry::with_builtins(),
            host: None,
        }
    }

    /// Put the process-wide host back to its startup state, discarding
    /// whatever any instance layered on top
    pub fn restore() {
        ModuleHost::global().restore();
    }

    /// Compose a loader chain the way rules are composed at construction
    pub fn normalize_loaders(&self, spec: &LoaderSpec) -> Result<ComposedTransform> {
        ChainNormalizer::new(
            &self.inner.registry,
            &self.inner.lists,
            self.inner.bundler_config.clone(),
            self.inner.diagnostics.clone(),
        )
        .normalize(spec)
    }

    /// Override the host's entry point and extension handlers
    pub fn install(&self) -> &Self {
        let inner = &self.inner;
        let host = &inner.host;
        let mut snapshot = inner.snapshot.lock();
        if snapshot.as_ref().is_some_and(|s| s.is_active(host)) {
            inner.diagnostics.warn(Warning::AlreadyInstalled);
            return self;
        }

        let installed_load = {
            let inner = Arc::clone(inner);
            LoadEntry::new(move |host, parent, specifier| {
                inner.require_with_context(host, parent, specifier)
            })
        };
        let hook = {
            let inner = Arc::clone(inner);
            ExtensionHandler::new(move |host, module| inner.handle_with_loaders(host, module))
        };

        let previous_load = host.set_load_entry(installed_load.clone());
        let previous_default = host.set_extension_handler(DEFAULT_EXTENSION, hook.clone());
        let mut previous_handlers = vec![(DEFAULT_EXTENSION.to_string(), previous_default.clone())];

        if inner.dom_support {
            dom::install_globals(host);
        }

        // loaders are assumed to always produce script text
        for extension in &inner.extensions {
            let previous = host.set_extension_handler(extension, hook.clone());
            if !previous_handlers.iter().any(|(ext, _)| ext == extension) {
                previous_handlers.push((extension.clone(), previous));
            }
        }

        debug!(extensions = ?inner.extensions, "Installed mimic");
        *snapshot = Some(Snapshot {
            previous_load,
            previous_default,
            previous_handlers,
            installed_load: Some(installed_load),
        });
        self
    }

    /// Restore what [`Self::install`] replaced
    pub fn uninstall(&self) -> &Self {
        let inner = &self.inner;
        let host = &inner.host;
        let mut guard = inner.snapshot.lock();
        let Some(snapshot) = guard.as_mut().filter(|s| s.installed_load.is_some()) else {
            inner.diagnostics.warn(Warning::NeverInstalled);
            return self;
        };

        if !snapshot.is_active(host) {
            inner.diagnostics.warn(Warning::ForeignEntryPoint);
        }

        host.set_load_entry(snapshot.previous_load.clone());
        for (extension, previous) in &snapshot.previous_handlers {
            match previous {
                Some(handler) => {
                    host.set_extension_handler(extension, handler.clone());
                }
                None => {
                    host.remove_extension_handler(extension);
                }
            }
        }
        snapshot.installed_load = None;

        debug!("Uninstalled mimic");
        self
    }

    /// Load `specifier` on behalf of `parent` through the alias resolver and
    /// the entry point that was active before install
    pub fn require_with_context(&self, parent: &Path, specifier: &str) -> Result<Arc<Module>> {
        self.inner
            .require_with_context(&self.inner.host, parent, specifier)
    }

    /// Whether the overrides are currently in place
    pub fn is_installed(&self) -> bool {
        self.inner
            .snapshot
            .lock()
            .as_ref()
            .is_some_and(|s| s.installed_load.is_some())
    }

    /// The host this instance installs onto
    pub fn host(&self) -> &Arc<ModuleHost> {
        &self.inner.host
    }

    /// Rules composed at construction
    pub fn rules(&self) -> &[CompiledRule] {
        &self.inner.rules
    }

    /// First rule whose matcher accepts `file`, tested against the absolute
    /// path the way module loads are
    pub fn rule_for(&self, file: &Path) -> Result<Option<&CompiledRule>> {
        let file = std::path::absolute(file)?;
        Ok(self.inner.rule_for(&file))
    }

    /// Warnings raised so far
    pub fn warnings(&self) -> Vec<Warning> {
        self.inner.diagnostics.warnings()
    }

    /// Drain warnings raised so far
    pub fn take_warnings(&self) -> Vec<Warning> {
        self.inner.diagnostics.take()
    }
}

impl Inner {
    fn rule_for(&self, file: &Path) -> Option<&CompiledRule> {
        self.rules.iter().find(|rule| rule.test.is_match(file))
    }

    fn require_with_context(
        &self,
        host: &ModuleHost,
        parent: &Path,
        specifier: &str,
    ) -> Result<Arc<Module>> {
        let original = self
            .snapshot
            .lock()
            .as_ref()
            .map(|s| s.previous_load.clone())
            .ok_or(MimicError::NotInstalled)?;

        let specifier = self.aliases.resolve(specifier);
        original.call(host, parent, &specifier)
    }

    fn handle_with_loaders(&self, host: &ModuleHost, module: &mut Module) -> Result<()> {
        let Some(rule) = self.rule_for(&module.filename) else {
            let fallback = self
                .snapshot
                .lock()
                .as_ref()
                .and_then(|s| s.previous_default.clone())
                .ok_or_else(|| MimicError::NoHandler(module.filename.clone()))?;
            return fallback.call(host, module);
        };

        debug!(file = %module.filename.display(), test = rule.test.as_str(), "Applying loaders");
        let source = std::fs::read_to_string(&module.filename)?;
        let transformed = rule.transform.apply_to(&source, Some(&module.filename))?;
        host.compile(module, transformed)
    }
}

impl std::fmt::Debug for Mimic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mimic")
            .field("rules", &self.inner.rules.len())
            .field("extensions", &self.inner.extensions)
            .field("installed", &self.is_installed())
            .finish()
    }
}
