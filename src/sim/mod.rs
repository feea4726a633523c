//! Deterministic simulation module
//!
//! All machine logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by object ID)
//! - No rendering or platform dependencies

pub mod collect;
pub mod collision;
pub mod distribution;
pub mod grab;
pub mod motion;
pub mod object;
pub mod state;
pub mod tick;
pub mod timers;

pub use collision::Rect;
pub use distribution::{distribute, fold_seed, round_rng};
pub use motion::Drive;
pub use object::{Axis, Bodies, ObjectId, PositionedObject, TransformOrigin};
pub use state::{
    ClawPhase, ClawPose, Controls, GameState, MachineGeometry, MachineLayout, RetractStage,
    RoundEvent, RoundSnapshot, Toy, ToyState,
};
pub use tick::{Control, ControlEdge, MachineEvent, TickInput, advance, tick};
pub use timers::{TimerHandle, Timers};
