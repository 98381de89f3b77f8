// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the loader shim

use std::path::PathBuf;
use thiserror::Error;

/// Result type for shim operations
pub type Result<T> = std::result::Result<T, MimicError>;

/// Errors that can occur while normalizing, installing or loading
#[derive(Debug, Error)]
pub enum MimicError {
    /// The context-dependent load operation was used before `install()`
    #[error("mimic must be installed before invoking require_with_context")]
    NotInstalled,

    /// A named plugin resolved neither by exact nor by suffixed name
    #[error("Cannot find plugin '{name}' (also tried '{fallback}')")]
    PluginNotFound {
        /// Name as written in the chain
        name: String,
        /// Name with the conventional suffix appended
        fallback: String,
    },

    /// A plugin failed while transforming
    #[error("Plugin '{plugin}' failed: {message}")]
    Plugin {
        /// Chain entry that failed
        plugin: String,
        /// Rendered error chain
        message: String,
    },

    /// Module not found by the host
    #[error("Cannot find module '{0}'")]
    ModuleNotFound(String),

    /// No handler is registered for a file
    #[error("No extension handler registered for '{0}'")]
    NoHandler(PathBuf),

    /// A loader rule matcher is not a valid pattern
    #[error("Invalid loader test pattern '{pattern}': {source}")]
    InvalidMatcher {
        /// Pattern text
        pattern: String,
        /// Underlying regex error
        #[source]
        source: regex::Error,
    },

    /// File system error
    #[error("File system error: {0}")]
    Fs(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl MimicError {
    /// Create a plugin failure from any error
    pub fn plugin(plugin: impl Into<String>, err: &anyhow::Error) -> Self {
        Self::Plugin {
            plugin: plugin.into(),
            message: format!("{err:#}"),
        }
    }

    /// Create a module not found error
    pub fn module_not_found(module: impl Into<String>) -> Self {
        Self::ModuleNotFound(module.into())
    }
}
