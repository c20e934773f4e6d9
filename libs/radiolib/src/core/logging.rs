// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::sync::Once;

use tracing_subscriber::EnvFilter;

use super::config::global_config;

/// Install a stderr `tracing` subscriber once per process.
///
/// `RUST_LOG` wins over `logging.level` from the config file. If the host
/// application already installed a subscriber, that one is kept.
pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&global_config().logging.level))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();

        tracing::debug!("radiolib logging initialized");
    });
}
