// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Stock plugins
//!
//! `identity` and `null` are the primitives substituted for plugins named in
//! the identity list or missing from the use list. `raw` and `json` are the
//! two most common bundler loaders and need nothing but the text.

use super::{LoaderContext, Plugin};
use std::sync::LazyLock;

/// Registry name of the passthrough primitive
pub const IDENTITY_LOADER: &str = "identity-loader";

/// Registry name of the suppress primitive
pub const NULL_LOADER: &str = "null-loader";

/// Body of a module that exports nothing
pub const EMPTY_MODULE: &str = "// empty (null-loader)";

static IDENTITY: LazyLock<Plugin> = LazyLock::new(|| Plugin::new(IDENTITY_LOADER, identity));
static NULL: LazyLock<Plugin> = LazyLock::new(|| Plugin::new(NULL_LOADER, null));

/// Passthrough primitive (shared handle)
pub fn identity_plugin() -> Plugin {
    IDENTITY.clone()
}

/// Suppress primitive (shared handle)
pub fn null_plugin() -> Plugin {
    NULL.clone()
}

/// All stock plugins
pub fn all() -> Vec<Plugin> {
    vec![
        identity_plugin(),
        null_plugin(),
        Plugin::new("raw-loader", raw),
        Plugin::new("json-loader", json),
    ]
}

fn identity(ctx: &mut LoaderContext<'_>, source: &str) -> anyhow::Result<String> {
    ctx.cacheable(true);
    Ok(source.to_string())
}

fn null(ctx: &mut LoaderContext<'_>, _source: &str) -> anyhow::Result<String> {
    ctx.cacheable(true);
    Ok(EMPTY_MODULE.to_string())
}

/// Export the text itself as a string
fn raw(ctx: &mut LoaderContext<'_>, source: &str) -> anyhow::Result<String> {
    ctx.cacheable(true);
    Ok(format!("module.exports = {};", serde_json::to_string(source)?))
}

/// Export the text parsed as JSON
fn json(ctx: &mut LoaderContext<'_>, source: &str) -> anyhow::Result<String> {
    ctx.cacheable(true);
    let value: serde_json::Value = serde_json::from_str(source)?;
    Ok(format!("module.exports = {};", value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;

    fn run(plugin: &Plugin, source: &str) -> anyhow::Result<String> {
        let diagnostics = Diagnostics::new();
        let mut ctx = LoaderContext::new(&[], None, 0, None, &diagnostics);
        plugin.call(&mut ctx, source)
    }

    #[test]
    fn test_primitives() {
        assert_eq!(run(&identity_plugin(), "a = 1;").unwrap(), "a = 1;");
        assert_eq!(run(&null_plugin(), "a = 1;").unwrap(), EMPTY_MODULE);
        assert!(identity_plugin().ptr_eq(&identity_plugin()));
    }

    #[test]
    fn test_raw_escapes_text() {
        let raw = Plugin::new("raw-loader", raw);
        assert_eq!(
            run(&raw, "say \"hi\"\n").unwrap(),
            r#"module.exports = "say \"hi\"\n";"#
        );
    }

    #[test]
    fn test_json_rejects_invalid_text() {
        let json = Plugin::new("json-loader", json);
        assert_eq!(
            run(&json, "{ \"a\": [1, 2] }").unwrap(),
            r#"module.exports = {"a":[1,2]};"#
        );
        assert!(run(&json, "{ nope").is_err());
    }
}
