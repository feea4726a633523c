//! Claw Machine - a prize-grabbing mini-game engine
//!
//! Core modules:
//! - `sim`: Deterministic simulation (motion, collision, actuator state machine)
//! - `catalog`: Prize categories and their geometry/sprites
//! - `settings`: Tunable odds and timings
//! - `ledger`: Per-owner collection counters
//! - `engine`: Round lifecycle around the simulation
//! - `platform`: Browser bindings

pub mod catalog;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod platform;
pub mod settings;
pub mod sim;

pub use catalog::Catalog;
pub use engine::Engine;
pub use error::ClawError;
pub use ledger::CollectionLedger;
pub use settings::Settings;

/// Machine configuration constants
pub mod consts {
    use glam::Vec2;

    /// Maximum distance a stepped motion covers in one tick
    pub const MAX_STEP: f32 = 10.0;

    /// Vertical rail (slides horizontally, carries joint and arm)
    pub const RAIL_WIDTH: f32 = 40.0;
    /// Arm joint (slides vertically along the rail)
    pub const JOINT_SIZE: Vec2 = Vec2::new(40.0, 24.0);
    /// Arm/claw at rest; its `h` grows when extending
    pub const ARM_SIZE: Vec2 = Vec2::new(40.0, 16.0);
    /// Arm length at full extension
    pub const ARM_MAX_REACH: f32 = 56.0;

    /// Capture rectangle size at the bottom of a descent
    pub const CAPTURE_SIZE: Vec2 = Vec2::new(40.0, 40.0);

    /// Claw shadow: offset from the joint (left and below) and size
    pub const SHADOW_OFFSET: Vec2 = Vec2::new(-8.0, 40.0);
    pub const SHADOW_SIZE: Vec2 = Vec2::new(56.0, 16.0);

    /// Spawn grid
    pub const SLOT_COUNT: usize = 12;
    pub const GRID_COLUMNS: usize = 4;
    pub const GRID_ROWS: usize = 3;
    /// The cell beneath the chute never receives a toy
    pub const RESERVED_SLOT: usize = 0;
    /// Max spawn offset from a cell center, per axis
    pub const SPAWN_JITTER: f32 = 2.5;

    /// Collected-prize tray spacing (won slots line up under the machine)
    pub const TRAY_SPACING: f32 = 36.0;

    /// Draw order
    pub const Z_RAIL: i32 = 10;
    pub const Z_JOINT: i32 = 12;
    pub const Z_ARM: i32 = 11;
    pub const Z_TOY: i32 = 5;
    pub const Z_TOY_GRABBED: i32 = 20;
}

/// Normalize an angle in degrees to [0, 360)
#[inline]
pub fn normalize_degrees(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Fold an angle in [0, 360) into the signed render range [-180, 180)
#[inline]
pub fn signed_degrees(angle: f32) -> f32 {
    if angle >= 180.0 { angle - 360.0 } else { angle }
}

/// Quadratic ease-out on t in [0, 1]
#[inline]
pub fn ease_out_quad(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t) * (1.0 - t)
}
