// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module path resolution (Node.js algorithm)
//!
//! The extensions tried are whatever the host has handlers for at the time
//! of the call, in registration order. Registering a handler is therefore
//! enough to make extension-less requests find new file kinds.

use crate::error::{MimicError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Resolves specifiers to files on disk
#[derive(Debug, Clone, Default)]
pub struct FileResolver;

impl FileResolver {
    /// Create a new resolver
    pub fn new() -> Self {
        Self
    }

    /// Resolve a module specifier requested from `parent_path`
    pub fn resolve(
        &self,
        specifier: &str,
        parent_path: &Path,
        extensions: &[String],
    ) -> Result<PathBuf> {
        if is_path_specifier(specifier) {
            let parent_dir = parent_path.parent().unwrap_or(Path::new("."));
            return self
                .resolve_path(&parent_dir.join(specifier), extensions)
                .ok_or_else(|| MimicError::module_not_found(specifier));
        }

        self.resolve_node_modules(specifier, parent_path, extensions)
    }

    /// Try `path` as a file, then with each extension, then as a directory
    fn resolve_path(&self, path: &Path, extensions: &[String]) -> Option<PathBuf> {
        if path.is_file() {
            return Some(normalize(path));
        }

        if let Some(found) = self.with_extensions(path, extensions) {
            return Some(found);
        }

        if path.is_dir() {
            return self.resolve_directory(path, extensions);
        }

        None
    }

    /// Append each extension to the full file name
    fn with_extensions(&self, path: &Path, extensions: &[String]) -> Option<PathBuf> {
        let filename = path.file_name()?.to_string_lossy().to_string();
        extensions.iter().find_map(|ext| {
            let candidate = path.with_file_name(format!("{filename}{ext}"));
            candidate.is_file().then(|| normalize(&candidate))
        })
    }

    /// Resolve a directory (package.json main, then index file)
    fn resolve_directory(&self, dir: &Path, extensions: &[String]) -> Option<PathBuf> {
        let package_json_path = dir.join("package.json");
        if let Ok(content) = std::fs::read_to_string(&package_json_path) {
            if let Ok(PackageJson { main: Some(main) }) = serde_json::from_str::<PackageJson>(&content) {
                let main_path = dir.join(&main);
                if main_path.is_file() {
                    return Some(normalize(&main_path));
                }
                if let Some(found) = self.with_extensions(&main_path, extensions) {
                    return Some(found);
                }
            }
        }

        self.with_extensions(&dir.join("index"), extensions)
    }

    /// Resolve a module from node_modules
    fn resolve_node_modules(
        &self,
        specifier: &str,
        parent_path: &Path,
        extensions: &[String],
    ) -> Result<PathBuf> {
        let (package_name, subpath) = parse_package_specifier(specifier);

        // Walk up directory tree looking for node_modules
        let mut current = parent_path.parent();
        while let Some(dir) = current {
            let package_dir = dir.join("node_modules").join(package_name);

            if package_dir.exists() {
                let found = match subpath {
                    Some(sub) => self.resolve_path(&package_dir.join(sub), extensions),
                    None => self.resolve_directory(&package_dir, extensions),
                };
                if let Some(found) = found {
                    return Ok(found);
                }
            }

            current = dir.parent();
        }

        Err(MimicError::module_not_found(specifier))
    }
}

fn is_path_specifier(specifier: &str) -> bool {
    specifier.starts_with("./")
        || specifier.starts_with("../")
        || specifier == "."
        || specifier == ".."
        || Path::new(specifier).is_absolute()
}

fn normalize(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Parse a package specifier into name and optional subpath
fn parse_package_specifier(specifier: &str) -> (&str, Option<&str>) {
    if specifier.starts_with('@') {
        // Scoped package: @scope/name or @scope/name/subpath
        if let Some(slash_pos) = specifier[1..].find('/') {
            let after_scope = &specifier[slash_pos + 2..];
            if let Some(subpath_pos) = after_scope.find('/') {
                let name_end = slash_pos + 2 + subpath_pos;
                return (&specifier[..name_end], Some(&specifier[name_end + 1..]));
            }
        }
        (specifier, None)
    } else {
        match specifier.split_once('/') {
            Some((name, sub)) => (name, Some(sub)),
            None => (specifier, None),
        }
    }
}

/// Minimal package.json structure for resolution
#[derive(Debug, Deserialize)]
struct PackageJson {
    main: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn exts(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_package_specifier() {
        assert_eq!(parse_package_specifier("lodash"), ("lodash", None));
        assert_eq!(parse_package_specifier("lodash/get"), ("lodash", Some("get")));
        assert_eq!(parse_package_specifier("@types/node"), ("@types/node", None));
        assert_eq!(
            parse_package_specifier("@babel/core/lib/index"),
            ("@babel/core", Some("lib/index"))
        );
    }

    #[test]
    fn test_extensions_tried_in_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("thing.bar"), "").unwrap();
        fs::write(dir.path().join("thing.baz"), "").unwrap();
        let parent = dir.path().join("main.js");
        let resolver = FileResolver::new();

        let found = resolver.resolve("./thing", &parent, &exts(&[".js", ".baz", ".bar"])).unwrap();
        assert_eq!(found.extension().unwrap(), "baz");

        let err = resolver.resolve("./thing", &parent, &exts(&[".js"])).unwrap_err();
        assert!(matches!(err, MimicError::ModuleNotFound(ref s) if s == "./thing"));
    }

    #[test]
    fn test_directory_and_node_modules() {
        let dir = tempfile::tempdir().unwrap();
        let pkg = dir.path().join("node_modules").join("pkg");
        fs::create_dir_all(pkg.join("lib")).unwrap();
        fs::write(pkg.join("package.json"), r#"{ "main": "lib/entry" }"#).unwrap();
        fs::write(pkg.join("lib").join("entry.js"), "").unwrap();
        fs::write(pkg.join("lib").join("index.js"), "").unwrap();
        let parent = dir.path().join("src").join("main.js");
        let resolver = FileResolver::new();
        let js = exts(&[".js"]);

        let main = resolver.resolve("pkg", &parent, &js).unwrap();
        assert!(main.ends_with("lib/entry.js"));

        let index = resolver.resolve("pkg/lib", &parent, &js).unwrap();
        assert!(index.ends_with("lib/index.js"));

        assert!(resolver.resolve("missing", &parent, &js).is_err());
    }
}
