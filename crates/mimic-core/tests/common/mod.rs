// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Shared fixtures for integration tests

#![allow(dead_code)]

use mimic_core::{Module, ModuleHost, PluginRegistry, Result, ScriptCompiler};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Compile step that understands `module.exports = <json>` statements.
///
/// Anything else is kept as source only, so a module whose text holds no
/// such statement exports `{}`.
pub struct ExportsCompiler;

impl ScriptCompiler for ExportsCompiler {
    fn compile(&self, module: &mut Module, source: String) -> Result<()> {
        for statement in source.split(';') {
            let Some(rest) = statement.trim().strip_prefix("module.exports") else {
                continue;
            };
            if let Some(value) = rest.trim_start().strip_prefix('=') {
                module.exports = serde_json::from_str(value.trim())?;
            }
        }
        module.source = Some(source);
        Ok(())
    }
}

/// A fresh host with [`ExportsCompiler`]
pub fn host() -> Arc<ModuleHost> {
    Arc::new(ModuleHost::with_compiler(ExportsCompiler))
}

/// Directory holding `test-modules/`
pub fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

/// The file fixture requests are made from
pub fn parent() -> PathBuf {
    fixtures().join("main.js")
}

/// Registry with the fixture plugins.
///
/// `foo-exporter` and `bar-true` are only registered under their suffixed
/// names so references to the bare names exercise the fallback.
pub fn registry() -> PluginRegistry {
    let mut registry = PluginRegistry::with_builtins();
    registry
        .register("./test-loaders/foo-exporter-loader", |_, text| {
            Ok(format!("{text};module.exports=\"foo\";"))
        })
        .register("./test-loaders/bar-append", |_, text| Ok(format!("{text}bar")))
        .register("./test-loaders/bar-true-loader", |_, _| {
            Ok("module.exports = {\"bar\": true};".to_string())
        });
    registry
}
