// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod config;
pub mod logging;
pub mod runtime;
pub mod session;

pub use config::Config;
pub use runtime::{StoreRuntime, api_client, geocoder, open_store};
pub use session::{Session, SessionEvent};
