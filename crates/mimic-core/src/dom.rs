// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Minimal DOM emulation for modules that touch `document` or `window`

use crate::host::{HostGlobal, ModuleHost};
use std::sync::Arc;
use tracing::debug;

/// Global names bound into the host when DOM support is enabled
pub const DOM_GLOBALS: [&str; 5] = ["CustomEvent", "document", "window", "Element", "HTMLElement"];

/// Interface constructors the window exposes
const INTERFACES: [&str; 3] = ["CustomEvent", "Element", "HTMLElement"];

/// An empty document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Document URL
    pub url: String,
    /// Serialized markup
    pub markup: String,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            url: "about:blank".to_string(),
            markup: "<html><head></head><body></body></html>".to_string(),
        }
    }
}

/// The emulated window (`document.defaultView`)
#[derive(Debug, Default)]
pub struct DomWindow {
    document: Document,
}

impl DomWindow {
    /// Materialize a window over an empty document
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The window's document
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Look up a property of the window
    pub fn property(self: &Arc<Self>, name: &str) -> Option<HostGlobal> {
        match name {
            "window" => Some(HostGlobal::Window(Arc::clone(self))),
            "document" => Some(HostGlobal::Document(Arc::clone(self))),
            _ if INTERFACES.contains(&name) => Some(HostGlobal::Interface {
                window: Arc::clone(self),
                name: name.to_string(),
            }),
            _ => None,
        }
    }
}

/// Bind [`DOM_GLOBALS`] into `host`, all pointing into one new window
pub fn install_globals(host: &ModuleHost) -> Arc<DomWindow> {
    let window = DomWindow::new();
    for name in DOM_GLOBALS {
        if let Some(value) = window.property(name) {
            host.set_global(name, value);
        }
    }
    debug!("Installed DOM globals");
    window
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_globals_share_window() {
        let host = ModuleHost::new();
        let window = install_globals(&host);

        for name in DOM_GLOBALS {
            let bound = host.global_value(name).unwrap();
            let owner = match bound {
                HostGlobal::Window(w) | HostGlobal::Document(w) => w,
                HostGlobal::Interface { window, .. } => window,
            };
            assert!(Arc::ptr_eq(&owner, &window), "{name}");
        }
        assert!(matches!(host.global_value("document"), Some(HostGlobal::Document(_))));
        assert_eq!(window.document().url, "about:blank");
        assert!(window.property("navigator").is_none());
    }
}
