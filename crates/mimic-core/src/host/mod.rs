// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The script host's module loader
//!
//! Mirrors the CommonJS loader surface the shim layers itself onto:
//!
//! - a load entry point (`require`), replaceable and comparable by identity
//! - an ordered extension -> handler table (`require.extensions`)
//! - a module cache (`require.cache`)
//! - a native compile step for module source text
//! - a table of global names
//!
//! The entry point and handler table are captured at construction as the
//! host's baseline, which [`ModuleHost::restore`] puts back.

mod cache;
mod resolver;

pub use cache::ModuleCache;
pub use resolver::FileResolver;

use crate::dom::DomWindow;
use crate::error::{MimicError, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use tracing::debug;

/// Extension every unrecognised file falls back to
pub const DEFAULT_EXTENSION: &str = ".js";

/// Signature of a load entry point: `(host, requesting file, specifier)`
pub type LoadFn = dyn Fn(&ModuleHost, &Path, &str) -> Result<Arc<Module>> + Send + Sync;

/// Signature of an extension handler
pub type HandlerFn = dyn Fn(&ModuleHost, &mut Module) -> Result<()> + Send + Sync;

/// A load entry point, compared by identity
#[derive(Clone)]
pub struct LoadEntry(Arc<LoadFn>);

impl LoadEntry {
    /// Wrap a function as an entry point
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&ModuleHost, &Path, &str) -> Result<Arc<Module>> + Send + Sync + 'static,
    {
        Self(Arc::new(func))
    }

    /// Invoke the entry point
    pub fn call(&self, host: &ModuleHost, parent: &Path, specifier: &str) -> Result<Arc<Module>> {
        (self.0)(host, parent, specifier)
    }

    /// Whether both are the same installed function
    pub fn same(&self, other: &LoadEntry) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for LoadEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LoadEntry({:p})", Arc::as_ptr(&self.0))
    }
}

/// An extension handler, compared by identity
#[derive(Clone)]
pub struct ExtensionHandler(Arc<HandlerFn>);

impl ExtensionHandler {
    /// Wrap a function as a handler
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&ModuleHost, &mut Module) -> Result<()> + Send + Sync + 'static,
    {
        Self(Arc::new(func))
    }

    /// Invoke the handler
    pub fn call(&self, host: &ModuleHost, module: &mut Module) -> Result<()> {
        (self.0)(host, module)
    }

    /// Whether both are the same registered function
    pub fn same(&self, other: &ExtensionHandler) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ExtensionHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExtensionHandler({:p})", Arc::as_ptr(&self.0))
    }
}

/// A loaded (or loading) module
#[derive(Debug, Clone)]
pub struct Module {
    /// Resolved filename
    pub filename: PathBuf,
    /// File that requested this module
    pub parent: Option<PathBuf>,
    /// Source text handed to the compile step
    pub source: Option<String>,
    /// Exported value
    pub exports: serde_json::Value,
    /// Whether the module has finished loading
    pub loaded: bool,
}

impl Module {
    /// Create an unloaded module with empty exports
    pub fn new(filename: impl Into<PathBuf>, parent: Option<&Path>) -> Self {
        Self {
            filename: filename.into(),
            parent: parent.map(Path::to_path_buf),
            source: None,
            exports: serde_json::Value::Object(Default::default()),
            loaded: false,
        }
    }
}

/// The host's native compile step
pub trait ScriptCompiler: Send + Sync {
    /// Compile `source` as the body of `module`
    fn compile(&self, module: &mut Module, source: String) -> Result<()>;
}

/// Compile step that keeps the text on the module without evaluating it
#[derive(Debug, Default)]
pub struct SourceCompiler;

impl ScriptCompiler for SourceCompiler {
    fn compile(&self, module: &mut Module, source: String) -> Result<()> {
        module.source = Some(source);
        Ok(())
    }
}

/// Value bound to a host global name
#[derive(Debug, Clone)]
pub enum HostGlobal {
    /// The emulated window
    Window(Arc<DomWindow>),
    /// The emulated window's document
    Document(Arc<DomWindow>),
    /// A DOM interface constructor exposed by the window
    Interface {
        /// Owning window
        window: Arc<DomWindow>,
        /// Interface name
        name: String,
    },
}

struct Tables {
    load: LoadEntry,
    extensions: Vec<(String, ExtensionHandler)>,
    globals: HashMap<String, HostGlobal>,
}

/// A module-loading host
pub struct ModuleHost {
    tables: RwLock<Tables>,
    baseline_load: LoadEntry,
    baseline_extensions: Vec<(String, ExtensionHandler)>,
    resolver: FileResolver,
    cache: ModuleCache,
    compiler: Box<dyn ScriptCompiler>,
}

static GLOBAL_HOST: LazyLock<Arc<ModuleHost>> = LazyLock::new(|| Arc::new(ModuleHost::new()));

impl ModuleHost {
    /// Create a host with the native loader and [`SourceCompiler`]
    pub fn new() -> Self {
        Self::with_compiler(SourceCompiler)
    }

    /// Create a host with a custom compile step
    pub fn with_compiler(compiler: impl ScriptCompiler + 'static) -> Self {
        let baseline_load = LoadEntry::new(native_load);
        let baseline_extensions = vec![
            (DEFAULT_EXTENSION.to_string(), ExtensionHandler::new(load_script)),
            (".json".to_string(), ExtensionHandler::new(load_json)),
        ];

        Self {
            tables: RwLock::new(Tables {
                load: baseline_load.clone(),
                extensions: baseline_extensions.clone(),
                globals: HashMap::new(),
            }),
            baseline_load,
            baseline_extensions,
            resolver: FileResolver::new(),
            cache: ModuleCache::new(),
            compiler: Box::new(compiler),
        }
    }

    /// The process-wide host
    pub fn global() -> Arc<ModuleHost> {
        Arc::clone(&GLOBAL_HOST)
    }

    /// Load a module through the active entry point
    pub fn require(&self, parent: &Path, specifier: &str) -> Result<Arc<Module>> {
        let entry = self.load_entry();
        entry.call(self, parent, specifier)
    }

    /// The active load entry point
    pub fn load_entry(&self) -> LoadEntry {
        self.tables.read().load.clone()
    }

    /// Replace the load entry point, returning the previous one
    pub fn set_load_entry(&self, entry: LoadEntry) -> LoadEntry {
        std::mem::replace(&mut self.tables.write().load, entry)
    }

    /// Handler registered for `extension`
    pub fn extension_handler(&self, extension: &str) -> Option<ExtensionHandler> {
        self.tables
            .read()
            .extensions
            .iter()
            .find(|(ext, _)| ext == extension)
            .map(|(_, handler)| handler.clone())
    }

    /// Register a handler, returning the one it replaced
    pub fn set_extension_handler(
        &self,
        extension: &str,
        handler: ExtensionHandler,
    ) -> Option<ExtensionHandler> {
        let mut tables = self.tables.write();
        match tables.extensions.iter_mut().find(|(ext, _)| ext == extension) {
            Some((_, slot)) => Some(std::mem::replace(slot, handler)),
            None => {
                tables.extensions.push((extension.to_string(), handler));
                None
            }
        }
    }

    /// Remove a handler entirely
    pub fn remove_extension_handler(&self, extension: &str) -> Option<ExtensionHandler> {
        let mut tables = self.tables.write();
        let index = tables.extensions.iter().position(|(ext, _)| ext == extension)?;
        Some(tables.extensions.remove(index).1)
    }

    /// Registered extensions, in registration order
    pub fn extensions(&self) -> Vec<String> {
        self.tables
            .read()
            .extensions
            .iter()
            .map(|(ext, _)| ext.clone())
            .collect()
    }

    /// Resolve a specifier against the registered extensions
    pub fn resolve(&self, specifier: &str, parent: &Path) -> Result<PathBuf> {
        self.resolver.resolve(specifier, parent, &self.extensions())
    }

    /// Run the native compile step
    pub fn compile(&self, module: &mut Module, source: String) -> Result<()> {
        self.compiler.compile(module, source)
    }

    /// The module cache
    pub fn cache(&self) -> &ModuleCache {
        &self.cache
    }

    /// Bind a global name
    pub fn set_global(&self, name: impl Into<String>, value: HostGlobal) {
        self.tables.write().globals.insert(name.into(), value);
    }

    /// Look up a global name
    pub fn global_value(&self, name: &str) -> Option<HostGlobal> {
        self.tables.read().globals.get(name).cloned()
    }

    /// Put back the entry point and handlers captured at construction.
    ///
    /// Handlers for extensions the baseline never had are removed.
    pub fn restore(&self) {
        let mut tables = self.tables.write();
        tables.load = self.baseline_load.clone();

        let baseline = &self.baseline_extensions;
        tables.extensions.retain_mut(|(ext, handler)| {
            match baseline.iter().find(|(base, _)| base == ext) {
                Some((_, original)) => {
                    *handler = original.clone();
                    true
                }
                None => false,
            }
        });
        debug!("Restored host baseline");
    }

    /// Handler for a file: longest registered extension, else `.js`
    fn handler_for(&self, filename: &Path) -> Result<ExtensionHandler> {
        let name = filename
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        // "a.b.c" tries ".b.c" then ".c"
        let mut candidates = name
            .char_indices()
            .filter(|&(i, c)| c == '.' && i > 0)
            .map(|(i, _)| &name[i..]);

        candidates
            .find_map(|ext| self.extension_handler(ext))
            .or_else(|| self.extension_handler(DEFAULT_EXTENSION))
            .ok_or_else(|| MimicError::NoHandler(filename.to_path_buf()))
    }
}

impl Default for ModuleHost {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ModuleHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleHost")
            .field("load", &self.load_entry())
            .field("extensions", &self.extensions())
            .field("cached", &self.cache.len())
            .finish()
    }
}

/// The host's own load entry point
fn native_load(host: &ModuleHost, parent: &Path, specifier: &str) -> Result<Arc<Module>> {
    let filename = host.resolve(specifier, parent)?;

    if let Some(cached) = host.cache.get(&filename) {
        return Ok(cached);
    }

    let handler = host.handler_for(&filename)?;
    let mut module = Module::new(filename, Some(parent));
    handler.call(host, &mut module)?;
    module.loaded = true;

    let module = Arc::new(module);
    host.cache.set(Arc::clone(&module));
    Ok(module)
}

/// Native `.js` handler: read UTF-8 text and compile it unchanged
fn load_script(host: &ModuleHost, module: &mut Module) -> Result<()> {
    let source = std::fs::read_to_string(&module.filename)?;
    host.compile(module, source)
}

/// Native `.json` handler
fn load_json(_host: &ModuleHost, module: &mut Module) -> Result<()> {
    let content = std::fs::read_to_string(&module.filename)?;
    module.exports = serde_json::from_str(&content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_native_load_caches() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.js"), "module.exports = 1;").unwrap();
        fs::write(dir.path().join("b.json"), r#"{ "b": true }"#).unwrap();
        let parent = dir.path().join("main.js");
        let host = ModuleHost::new();

        let a = host.require(&parent, "./a").unwrap();
        assert_eq!(a.source.as_deref(), Some("module.exports = 1;"));
        assert!(a.loaded);
        assert!(Arc::ptr_eq(&a, &host.require(&parent, "./a.js").unwrap()));

        let b = host.require(&parent, "./b").unwrap();
        assert_eq!(b.exports, serde_json::json!({ "b": true }));
        assert_eq!(host.cache().len(), 2);
    }

    #[test]
    fn test_deleted_cache_entry_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.js");
        fs::write(&file, "module.exports = 1;").unwrap();
        let parent = dir.path().join("main.js");
        let host = ModuleHost::new();

        let first = host.require(&parent, "./a").unwrap();
        fs::write(&file, "module.exports = 2;").unwrap();
        assert!(Arc::ptr_eq(&first, &host.require(&parent, "./a").unwrap()));

        let removed = host.cache().delete(&first.filename).unwrap();
        assert!(Arc::ptr_eq(&first, &removed));
        assert!(host.cache().is_empty());

        let second = host.require(&parent, "./a").unwrap();
        assert_eq!(second.source.as_deref(), Some("module.exports = 2;"));
        assert!(host.cache().delete(&dir.path().join("missing.js")).is_none());
    }

    #[test]
    fn test_unknown_extension_uses_default_handler() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.tmpl.txt"), "hello").unwrap();
        let host = ModuleHost::new();

        let module = host
            .require(&dir.path().join("main.js"), "./notes.tmpl.txt")
            .unwrap();
        assert_eq!(module.source.as_deref(), Some("hello"));
    }

    #[test]
    fn test_restore_drops_added_handlers() {
        let host = ModuleHost::new();
        let original_js = host.extension_handler(".js").unwrap();
        let original_load = host.load_entry();

        let noop = ExtensionHandler::new(|_, _| Ok(()));
        host.set_extension_handler(".js", noop.clone());
        host.set_extension_handler(".bar", noop);
        host.set_load_entry(LoadEntry::new(|_, _, spec| {
            Err(MimicError::module_not_found(spec))
        }));

        host.restore();
        assert!(host.extension_handler(".js").unwrap().same(&original_js));
        assert!(host.extension_handler(".bar").is_none());
        assert!(host.load_entry().same(&original_load));
        assert_eq!(host.extensions(), vec![".js", ".json"]);
    }
}
