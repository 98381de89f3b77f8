// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Chain normalization through a constructed instance

mod common;

use mimic_core::plugins::builtin::EMPTY_MODULE;
use mimic_core::{LoaderSpec, Mimic, MimicError, MimicOptions, Plugin, Warning};
use parking_lot::Mutex;
use std::sync::Arc;

fn mimic(options: MimicOptions) -> Mimic {
    Mimic::builder(options)
        .registry(common::registry())
        .host(common::host())
        .build()
        .unwrap()
}

#[test]
fn test_single_function() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let spy = {
        let seen = Arc::clone(&seen);
        Plugin::from_fn(move |_, text| {
            seen.lock().push(text.to_string());
            Ok("bar".to_string())
        })
    };

    let transform = mimic(MimicOptions::default())
        .normalize_loaders(&LoaderSpec::Single(spy))
        .unwrap();
    assert_eq!(transform.apply("foo").unwrap(), "bar");
    assert_eq!(*seen.lock(), vec!["foo"]);
}

#[test]
fn test_exclamation_separated_string() {
    let transform = mimic(MimicOptions::default())
        .normalize_loaders(&"./test-loaders/foo-exporter!./test-loaders/bar-append".into())
        .unwrap();
    assert_eq!(
        transform.apply("asdf").unwrap(),
        "asdfbar;module.exports=\"foo\";"
    );
}

#[test]
fn test_array_of_functions() {
    let spec = LoaderSpec::Many(vec![
        Plugin::from_fn(|_, text| Ok(format!("{text}func1"))),
        Plugin::from_fn(|_, text| Ok(format!("{text}func2"))),
    ]);
    let transform = mimic(MimicOptions::default()).normalize_loaders(&spec).unwrap();
    assert_eq!(transform.apply("asdf").unwrap(), "asdffunc2func1");
}

#[test]
fn test_callback_overrides_return_value() {
    let spec = LoaderSpec::Many(vec![
        Plugin::from_fn(|ctx, text| {
            ctx.callback(None, format!("{text}func1"))?;
            Ok("discarded".to_string())
        }),
        Plugin::from_fn(|_, text| Ok(format!("{text}func2"))),
    ]);
    let transform = mimic(MimicOptions::default()).normalize_loaders(&spec).unwrap();
    assert_eq!(transform.apply("asdf").unwrap(), "asdffunc2func1");
}

#[test]
fn test_async_request_is_inert_and_warned() {
    let spec = LoaderSpec::Single(Plugin::new("deferred", |ctx, text| {
        let mut done = ctx.async_callback();
        done(None, "never used".to_string());
        Ok(text.to_string())
    }));
    let instance = mimic(MimicOptions::default());
    let transform = instance.normalize_loaders(&spec).unwrap();

    assert_eq!(transform.apply("as is").unwrap(), "as is");
    assert_eq!(
        instance.warnings(),
        vec![Warning::AsyncUnsupported {
            plugin: "deferred".to_string()
        }]
    );
}

#[test]
fn test_use_list_suppresses_other_plugins() {
    let instance = mimic(MimicOptions::default().with_use(["./test-loaders/bar-append"]));
    let transform = instance
        .normalize_loaders(&"./test-loaders/foo-exporter!./test-loaders/bar-append".into())
        .unwrap();
    assert_eq!(transform.apply("asdf").unwrap(), EMPTY_MODULE);
}

#[test]
fn test_identity_list_passes_text_through() {
    let instance = mimic(MimicOptions::default().with_identity(["./test-loaders/bar-true-loader"]));
    let transform = instance
        .normalize_loaders(&"./test-loaders/bar-true".into())
        .unwrap();
    assert_eq!(transform.apply("unchanged").unwrap(), "unchanged");
}

#[test]
fn test_options_visible_to_plugins() {
    let config = mimic_core::BundlerConfig::new().with_extension(".nojs");
    let instance = mimic(MimicOptions::default().with_bundler_config(config));
    let spec = LoaderSpec::Single(Plugin::from_fn(|ctx, _| {
        let extensions = ctx
            .options()
            .map(|config| config.resolve.extensions.join(","))
            .unwrap_or_default();
        Ok(extensions)
    }));

    let transform = instance.normalize_loaders(&spec).unwrap();
    assert_eq!(transform.apply("").unwrap(), ".nojs");
}

#[test]
fn test_unresolvable_name_fails_construction() {
    let config = mimic_core::BundlerConfig::new().with_rule(mimic_core::LoaderRule::new(
        mimic_core::Matcher::new(r"\.css$").unwrap(),
        "style!css",
    ));
    let err = Mimic::builder(MimicOptions::default().with_bundler_config(config))
        .registry(common::registry())
        .host(common::host())
        .build()
        .unwrap_err();
    assert!(matches!(err, MimicError::PluginNotFound { ref name, .. } if name == "style"));
}
