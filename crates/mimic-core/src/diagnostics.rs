// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Non-fatal warnings raised by an instance
//!
//! Every warning is emitted through `tracing` and also kept in the
//! instance's log so callers can assert on discipline violations.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

/// A non-fatal condition reported instead of failing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// `uninstall()` without a prior `install()`
    NeverInstalled,
    /// `install()` while already installed; ignored
    AlreadyInstalled,
    /// The active load entry point is not the one this instance installed
    ForeignEntryPoint,
    /// A plugin asked for asynchronous completion
    AsyncUnsupported {
        /// Chain entry that asked
        plugin: String,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::NeverInstalled => write!(f, "Mimic was never installed"),
            Warning::AlreadyInstalled => write!(f, "Mimic is already installed"),
            Warning::ForeignEntryPoint => write!(
                f,
                "Mimic is restoring an overridden load entry point that it did not install"
            ),
            Warning::AsyncUnsupported { plugin } => {
                write!(f, "Mimic does not support async loaders ({plugin})")
            }
        }
    }
}

/// Most warnings a log keeps; older ones are dropped first
pub const MAX_WARNINGS: usize = 256;

/// Shared warning log
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    warnings: Arc<Mutex<VecDeque<Warning>>>,
}

impl Diagnostics {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit and record a warning
    pub fn warn(&self, warning: Warning) {
        tracing::warn!("{}", warning);
        let mut warnings = self.warnings.lock();
        if warnings.len() == MAX_WARNINGS {
            warnings.pop_front();
        }
        warnings.push_back(warning);
    }

    /// Snapshot of recorded warnings
    pub fn warnings(&self) -> Vec<Warning> {
        self.warnings.lock().iter().cloned().collect()
    }

    /// Drain recorded warnings
    pub fn take(&self) -> Vec<Warning> {
        self.warnings.lock().drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_log() {
        let diagnostics = Diagnostics::new();
        let other = diagnostics.clone();
        other.warn(Warning::NeverInstalled);

        assert_eq!(diagnostics.warnings(), vec![Warning::NeverInstalled]);
        assert_eq!(diagnostics.take().len(), 1);
        assert!(other.warnings().is_empty());
    }

    #[test]
    fn test_log_keeps_newest() {
        let diagnostics = Diagnostics::new();
        for i in 0..MAX_WARNINGS + 10 {
            diagnostics.warn(Warning::AsyncUnsupported {
                plugin: i.to_string(),
            });
        }

        let warnings = diagnostics.warnings();
        assert_eq!(warnings.len(), MAX_WARNINGS);
        assert_eq!(
            warnings[0],
            Warning::AsyncUnsupported {
                plugin: "10".to_string()
            }
        );
        assert_eq!(
            warnings.last(),
            Some(&Warning::AsyncUnsupported {
                plugin: (MAX_WARNINGS + 9).to_string()
            })
        );
    }
}
