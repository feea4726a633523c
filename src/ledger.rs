//! Collection ledger
//!
//! Counts how many of each category every owner has collected. Persisted to
//! LocalStorage on wasm32; native builds keep it in memory.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::ClawError;

/// Receives one record per prize that lands in the chute
pub trait PersistenceSink {
    /// Upsert the owner's counter for `category`; returns the new count
    fn record(&mut self, owner: &str, category: &str) -> Result<u32, ClawError>;
}

/// Per-owner, per-category counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionLedger {
    /// owner -> category -> count
    pub owners: BTreeMap<String, BTreeMap<String, u32>>,
}

impl CollectionLedger {
    /// LocalStorage key (used only in wasm32)
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "claw_machine_collection";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, owner: &str, category: &str) -> u32 {
        self.owners
            .get(owner)
            .and_then(|c| c.get(category))
            .copied()
            .unwrap_or(0)
    }

    /// Everything one owner has collected, by category
    pub fn collection(&self, owner: &str) -> Option<&BTreeMap<String, u32>> {
        self.owners.get(owner)
    }

    pub fn total(&self, owner: &str) -> u32 {
        self.owners
            .get(owner)
            .map(|c| c.values().sum())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    pub fn to_json(&self) -> Result<String, ClawError> {
        serde_json::to_string(self).map_err(|e| ClawError::Sink(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, ClawError> {
        serde_json::from_str(json).map_err(|e| ClawError::Sink(e.to_string()))
    }

    /// Load the ledger from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match Self::from_json(&json) {
                    Ok(ledger) => {
                        log::info!("Loaded collection for {} owners", ledger.owners.len());
                        return ledger;
                    }
                    Err(e) => log::warn!("Discarding stored collection: {}", e),
                }
            }
        }

        log::info!("No stored collection, starting fresh");
        Self::new()
    }

    /// Save the ledger to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) -> Result<(), ClawError> {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()
            .ok_or_else(|| ClawError::Sink("LocalStorage unavailable".into()))?;
        storage
            .set_item(Self::STORAGE_KEY, &self.to_json()?)
            .map_err(|e| ClawError::Sink(format!("{:?}", e)))
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::new()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) -> Result<(), ClawError> {
        Ok(())
    }
}

impl PersistenceSink for CollectionLedger {
    fn record(&mut self, owner: &str, category: &str) -> Result<u32, ClawError> {
        if owner.is_empty() {
            return Err(ClawError::Sink("no owner to record against".into()));
        }
        let count = self
            .owners
            .entry(owner.to_string())
            .or_default()
            .entry(category.to_string())
            .or_insert(0);
        *count += 1;
        let count = *count;
        self.save()?;
        log::debug!("{} now has {} x {}", owner, count, category);
        Ok(count)
    }
}

/// Shared handle, so the host can read the ledger the engine writes to
impl PersistenceSink for Rc<RefCell<CollectionLedger>> {
    fn record(&mut self, owner: &str, category: &str) -> Result<u32, ClawError> {
        self.borrow_mut().record(owner, category)
    }
}
