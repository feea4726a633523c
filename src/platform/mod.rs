//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Logger setup
//! - The JS-facing engine handle (web)
//! - Cross-frame collection notices (web)

use crate::engine::CollectionNotifier;

#[cfg(target_arch = "wasm32")]
pub mod web;

/// Native logger; `RUST_LOG` overrides the default level
#[cfg(not(target_arch = "wasm32"))]
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}

/// Browser logger and panic hook (idempotent)
#[cfg(target_arch = "wasm32")]
pub fn init_logging() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
}

/// Native hosts have no outer frame; collected prizes go to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutNotifier;

impl CollectionNotifier for StdoutNotifier {
    fn collected(&self, category: &str) {
        log::info!("Collected: {}", category);
    }
}
