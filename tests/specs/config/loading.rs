// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration specs
//!
//! Verify that routers built from a TOML file pick up its settings.

use crate::prelude::*;
use relay_core::{ConfigError, UnhandledPolicy};

#[test]
fn router_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("relay.toml");
    std::fs::write(
        &path,
        r#"
[router]
default_priority = 10
unhandled = "silent"

[bridge]
queue_capacity = 8
thread_name = "spec-config"
"#,
    )
    .unwrap();

    let config = RelayConfig::load(&path).unwrap();
    let router = Router::from_config(&config).unwrap();
    let trail = Trail::new();
    router.on("evt", trail.sync("default"));
    router.on("evt", trail.sync("boosted").priority(11));
    router.on("evt", trail.sync("demoted").priority(9));

    router.apply_sync("evt", Params::new()).unwrap();

    assert_eq!(router.config().unhandled, UnhandledPolicy::Silent);
    assert_eq!(trail.entries(), vec!["boosted", "default", "demoted"]);
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();

    let err = RelayConfig::load(&dir.path().join("absent.toml")).unwrap_err();

    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn zero_capacity_is_rejected() {
    let err = RelayConfig::from_toml_str("[bridge]\nqueue_capacity = 0\n").unwrap_err();

    assert!(matches!(err, ConfigError::Invalid(_)));
}
