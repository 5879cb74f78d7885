// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use tracing_subscriber::EnvFilter;

pub fn init(level: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}
