// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Alias rewriting for module specifiers
//!
//! Only the first path segment is looked up. A target with a file extension
//! replaces the whole specifier (file alias); a target without one replaces
//! the first segment and keeps the rest (directory alias).

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{MAIN_SEPARATOR, MAIN_SEPARATOR_STR, Path};
use tracing::debug;

/// Rewrites specifiers according to `resolve.alias`
#[derive(Debug, Clone, Default)]
pub struct AliasResolver {
    aliases: HashMap<String, String>,
}

impl AliasResolver {
    /// Create a resolver over an alias table
    pub fn new(aliases: HashMap<String, String>) -> Self {
        Self { aliases }
    }

    /// Check if any alias is configured
    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// The specifier to actually load
    pub fn resolve<'s>(&self, specifier: &'s str) -> Cow<'s, str> {
        let mut segments = specifier.split(MAIN_SEPARATOR);
        let first = segments.next().unwrap_or_default();

        let target = match self.aliases.get(first) {
            Some(target) if !target.is_empty() => target,
            _ => return Cow::Borrowed(specifier),
        };

        let rewritten = if Path::new(target).extension().is_some() {
            target.clone()
        } else {
            std::iter::once(target.as_str())
                .chain(segments)
                .collect::<Vec<_>>()
                .join(MAIN_SEPARATOR_STR)
        };

        debug!(from = specifier, to = %rewritten, "Applied alias");
        Cow::Owned(rewritten)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(name: &str, target: &str) -> AliasResolver {
        AliasResolver::new(HashMap::from([(name.to_string(), target.to_string())]))
    }

    fn join(parts: &[&str]) -> String {
        parts.join(MAIN_SEPARATOR_STR)
    }

    #[test]
    fn test_directory_alias_keeps_tail() {
        let resolver = resolver("foo", "bar");
        assert_eq!(resolver.resolve("foo"), "bar");
        assert_eq!(
            resolver.resolve(&join(&["foo", "test-modules", "empty-bar-module"])),
            join(&["bar", "test-modules", "empty-bar-module"])
        );
    }

    #[test]
    fn test_file_alias_replaces_everything() {
        let resolver = resolver("foo", "bar.js");
        assert_eq!(resolver.resolve("foo"), "bar.js");
        assert_eq!(resolver.resolve(&join(&["foo", "sub", "path"])), "bar.js");
    }

    #[test]
    fn test_only_first_segment_matches() {
        let resolver = resolver("foo", "bar");
        assert!(matches!(resolver.resolve("foobar"), Cow::Borrowed("foobar")));
        let nested = join(&["lib", "foo"]);
        assert_eq!(resolver.resolve(&nested), nested);
        assert_eq!(resolver.resolve("./foo"), "./foo");
    }

    #[test]
    fn test_empty_target_ignored() {
        let resolver = resolver("foo", "");
        assert_eq!(resolver.resolve("foo"), "foo");
    }
}
