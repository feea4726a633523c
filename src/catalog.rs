//! Prize catalog
//!
//! Maps a category key to its pixel geometry and sprite states. The host
//! ships this as JSON; an empty catalog is valid and spawns nothing.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::ClawError;
use crate::sim::ToyState;

/// Which distribution pool a category belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Group {
    Primary,
    #[default]
    Other,
}

/// Sprite references for the three visual states
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sprites {
    pub rest: String,
    #[serde(default)]
    pub grabbed: Option<String>,
    #[serde(default)]
    pub collected: Option<String>,
}

/// One prize category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub key: String,
    #[serde(default)]
    pub group: Group,
    /// Width/height in pixels
    pub size: Vec2,
    /// Sprite draw offset relative to the body
    #[serde(default)]
    pub sprite_offset: Vec2,
    pub sprites: Sprites,
}

impl Category {
    /// Sprite for a toy state; grabbed and collected fall back to rest
    pub fn sprite(&self, state: ToyState) -> &str {
        let specific = match state {
            ToyState::Grabbed => self.sprites.grabbed.as_deref(),
            ToyState::Collected => self.sprites.collected.as_deref(),
            _ => None,
        };
        specific.unwrap_or(&self.sprites.rest)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub categories: Vec<Category>,
}

impl Catalog {
    pub fn new(categories: Vec<Category>) -> Self {
        Self { categories }
    }

    pub fn from_json(json: &str) -> Result<Self, ClawError> {
        let catalog: Catalog = serde_json::from_str(json)?;
        log::info!("Loaded catalog with {} categories", catalog.categories.len());
        Ok(catalog)
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn lookup(&self, key: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.key == key)
    }

    /// Category keys split into (primary, other), in catalog order
    pub fn pools(&self) -> (Vec<&str>, Vec<&str>) {
        let mut primary = Vec::new();
        let mut other = Vec::new();
        for category in &self.categories {
            match category.group {
                Group::Primary => primary.push(category.key.as_str()),
                Group::Other => other.push(category.key.as_str()),
            }
        }
        (primary, other)
    }
}
