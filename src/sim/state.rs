//! Game state and core simulation types
//!
//! One `GameState` per mounted machine. It owns every positioned object,
//! every pending timer and the round RNG, so dropping or tearing it down
//! leaves nothing behind.

use glam::Vec2;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::collision::Rect;
use super::distribution::{distribute, plan_spawns, round_rng};
use super::motion;
use super::object::{Bodies, ObjectId, PositionedObject, TransformOrigin};
use super::tick::MachineEvent;
use super::timers::{TimerHandle, Timers};
use crate::catalog::Catalog;
use crate::consts::*;
use crate::error::ClawError;
use crate::settings::Settings;

/// Host-measured machine layout
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MachineLayout {
    pub width: f32,
    pub height: f32,
    /// Height of the upper compartment the claw travels in
    pub top_height: f32,
    pub chute: Rect,
}

impl MachineLayout {
    /// The stock 240x480 cabinet with the chute top-left
    pub fn standard() -> Self {
        Self {
            width: 240.0,
            height: 480.0,
            top_height: 240.0,
            chute: Rect::from_xywh(0.0, 24.0, 64.0, 48.0),
        }
    }
}

/// Derived, read-only machine geometry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MachineGeometry {
    pub width: f32,
    pub height: f32,
    /// Upper compartment
    pub top: Rect,
    /// Lower compartment where toys sit
    pub floor: Rect,
    pub chute: Rect,
    /// Far horizontal travel of the rail
    pub rail_bound: f32,
    /// Lowest joint position (arm tip at the top of the lower compartment)
    pub descent_bound: f32,
}

impl MachineGeometry {
    /// Refuses zero-sized or inconsistent layouts
    pub fn measure(layout: &MachineLayout) -> Result<Self, ClawError> {
        let unmeasured = ClawError::Unmeasured {
            width: layout.width,
            height: layout.height,
        };
        if layout.width <= RAIL_WIDTH
            || layout.height <= 0.0
            || layout.top_height <= JOINT_SIZE.y + ARM_SIZE.y
            || layout.top_height >= layout.height
        {
            return Err(unmeasured);
        }

        Ok(Self {
            width: layout.width,
            height: layout.height,
            top: Rect::from_xywh(0.0, 0.0, layout.width, layout.top_height),
            floor: Rect::from_xywh(
                0.0,
                layout.top_height,
                layout.width,
                layout.height - layout.top_height,
            ),
            chute: layout.chute,
            rail_bound: layout.width - RAIL_WIDTH,
            descent_bound: layout.top_height - JOINT_SIZE.y - ARM_SIZE.y,
        })
    }

    /// Maps joint height in the upper compartment onto the floor
    pub fn floor_offset(&self) -> f32 {
        self.floor.min.y - self.top.min.y
    }

    /// Height a released prize of height `h` comes to rest at in the chute
    pub fn chute_rest_y(&self, h: f32) -> f32 {
        self.chute.max().y - h
    }

    /// Won-tray position for the n-th prize of a round
    pub fn tray_slot(&self, index: usize) -> Vec2 {
        Vec2::new(index as f32 * TRAY_SPACING, self.height)
    }
}

/// Independent states of a prize; exactly one at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToyState {
    AtRest,
    /// Chosen by acquisition, claw still opening
    Targeted,
    /// Following the claw
    Grabbed,
    /// Released mid-air or into the chute, still falling
    Falling,
    Collected,
}

/// A spawned prize
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Toy {
    pub body: ObjectId,
    pub category: String,
    pub slot: usize,
    pub state: ToyState,
    /// Grip point relative to the toy's top-left corner
    pub claw_anchor: Option<Vec2>,
    /// Sitting in the chute, waiting to be claimed
    pub selected: bool,
    pub won_slot: Option<usize>,
}

/// Actuator state machine phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClawPhase {
    /// Horizontal control enabled, nothing moving
    Idle,
    HorizontalMoving,
    /// Vertical control enabled
    HorizontalSettled,
    VerticalDescending,
    ArmExtending,
    /// Claw opening then closing at full reach
    Grabbing,
    Retracting(RetractStage),
    Dropping,
}

/// Sequential retraction stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetractStage {
    Arm,
    Rail,
    Joint,
}

/// Claw visual pose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClawPose {
    #[default]
    Closed,
    Open,
    /// Closed on nothing
    Missed,
}

/// Which controls accept input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Controls {
    pub horizontal: bool,
    pub vertical: bool,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            horizontal: true,
            vertical: false,
        }
    }
}

/// Outcomes for the host (persistence, notifications, hooks)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundEvent {
    Grabbed { category: String },
    Missed,
    Slipped { category: String },
    Collected { category: String, won_slot: usize },
    CycleFinished { caught: bool },
}

/// Complete state of one mounted machine
#[derive(Debug, Clone)]
pub struct GameState {
    /// Seed for reproducibility (None = random)
    pub seed: Option<String>,
    pub(crate) rng: Pcg32,
    /// Simulation clock
    pub clock_ms: u64,
    pub geometry: MachineGeometry,
    pub settings: Settings,
    pub bodies: Bodies,
    pub rail: ObjectId,
    pub joint: ObjectId,
    pub arm: ObjectId,
    /// Spawned prizes (sorted by slot)
    pub toys: Vec<Toy>,
    pub phase: ClawPhase,
    pub claw: ClawPose,
    pub controls: Controls,
    /// Targeted or grabbed prize; cleared by whichever release comes first
    pub target: Option<ObjectId>,
    /// Prize that made it into the chute this cycle
    pub(crate) landed: Option<ObjectId>,
    pub(crate) slip_timer: Option<TimerHandle>,
    pub timers: Timers,
    /// Prizes collected this round
    pub collected: u32,
    pub slips: u32,
    pub cycles: u32,
    /// Pending outcomes, drained by the host
    pub outcomes: Vec<RoundEvent>,
}

impl GameState {
    /// Build the machine parts and spawn the first layout
    pub fn new(
        geometry: MachineGeometry,
        settings: Settings,
        catalog: &Catalog,
        seed: Option<&str>,
    ) -> Self {
        let mut bodies = Bodies::new();
        let rail = bodies.spawn(
            Vec2::ZERO,
            Vec2::new(RAIL_WIDTH, geometry.top.size.y),
            Z_RAIL,
        );
        let joint = bodies.spawn(Vec2::ZERO, JOINT_SIZE, Z_JOINT);
        let arm = bodies.spawn(Vec2::new(0.0, JOINT_SIZE.y), ARM_SIZE, Z_ARM);
        if let Some(arm) = bodies.get_mut(arm) {
            arm.origin = TransformOrigin::TopCenter;
        }
        bodies.follow(rail, joint);
        bodies.follow(rail, arm);
        bodies.follow(joint, arm);

        let mut state = Self {
            seed: seed.map(str::to_string),
            rng: round_rng(seed),
            clock_ms: 0,
            geometry,
            settings,
            bodies,
            rail,
            joint,
            arm,
            toys: Vec::new(),
            phase: ClawPhase::Idle,
            claw: ClawPose::Closed,
            controls: Controls::default(),
            target: None,
            landed: None,
            slip_timer: None,
            timers: Timers::new(),
            collected: 0,
            slips: 0,
            cycles: 0,
            outcomes: Vec::new(),
        };
        state.spawn_toys(catalog);
        state
    }

    fn spawn_toys(&mut self, catalog: &Catalog) {
        let assignments = distribute(catalog, self.settings.primary_probability, &mut self.rng);
        let plans = plan_spawns(&assignments, &self.geometry.floor, &mut self.rng);

        for plan in plans {
            let Some(category) = catalog.lookup(&plan.category) else {
                continue;
            };
            let body = self
                .bodies
                .spawn(plan.center - category.size * 0.5, category.size, Z_TOY);
            self.toys.push(Toy {
                body,
                category: plan.category,
                slot: plan.slot,
                state: ToyState::AtRest,
                claw_anchor: None,
                selected: false,
                won_slot: None,
            });
        }

        log::info!(
            "Spawned {} toys (seed: {})",
            self.toys.len(),
            self.seed.as_deref().unwrap_or("random")
        );
    }

    fn clear_toys(&mut self) {
        if let Some(handle) = self.slip_timer.take() {
            self.timers.cancel(handle);
        }
        self.target = None;
        self.landed = None;
        for toy in self.toys.drain(..) {
            // Also unlinks it from rail/joint/arm if it was grabbed
            self.bodies.remove(toy.body);
        }
        // A prize still falling into the chute took its PrizeLanded with it
        let settling = self.timers.is_scheduled(MachineEvent::DropSettled);
        if self.phase == ClawPhase::Dropping && !settling {
            let delay = self.settings.drop_settle_ms;
            self.timers.schedule(self.clock_ms, delay, MachineEvent::DropSettled);
        }
    }

    /// Throw away every toy and regenerate the layout from `seed`
    pub fn reseed(&mut self, seed: Option<&str>, catalog: &Catalog) {
        log::info!("Reseeding round (seed: {})", seed.unwrap_or("random"));
        self.clear_toys();
        self.seed = seed.map(str::to_string);
        self.rng = round_rng(seed);
        self.collected = 0;
        self.slips = 0;
        self.spawn_toys(catalog);
    }

    /// Cancel every pending timer and motion
    pub fn teardown(&mut self) {
        let timers = self.timers.cancel_all();
        let motions = motion::halt_all(&mut self.bodies);
        self.slip_timer = None;
        log::debug!("Teardown cancelled {} timers and {} motions", timers, motions);
    }

    /// Nothing scheduled and nothing moving
    pub fn is_quiescent(&self) -> bool {
        self.timers.is_empty() && self.bodies.iter().all(|o| !o.is_moving())
    }

    pub fn toy(&self, body: ObjectId) -> Option<&Toy> {
        self.toys.iter().find(|t| t.body == body)
    }

    pub fn toy_mut(&mut self, body: ObjectId) -> Option<&mut Toy> {
        self.toys.iter_mut().find(|t| t.body == body)
    }

    pub fn body(&self, id: ObjectId) -> Option<&PositionedObject> {
        self.bodies.get(id)
    }

    /// Arm extension beyond its rest length
    pub fn reach(&self) -> f32 {
        self.bodies
            .get(self.arm)
            .map(|arm| arm.size.y - arm.rest.size.y)
            .unwrap_or(0.0)
    }

    pub fn drain_outcomes(&mut self) -> Vec<RoundEvent> {
        std::mem::take(&mut self.outcomes)
    }

    /// Serializable view for the host's render proxy
    pub fn snapshot(&self) -> RoundSnapshot {
        RoundSnapshot {
            clock_ms: self.clock_ms,
            phase: self.phase,
            claw: self.claw,
            controls: self.controls,
            collected: self.collected,
            objects: self.bodies.iter().cloned().collect(),
            toys: self.toys.clone(),
            sprites: Vec::new(),
        }
    }
}

/// Render-facing view of a round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundSnapshot {
    pub clock_ms: u64,
    pub phase: ClawPhase,
    pub claw: ClawPose,
    pub controls: Controls,
    pub collected: u32,
    pub objects: Vec<PositionedObject>,
    pub toys: Vec<Toy>,
    /// Sprite per toy, same order as `toys`; filled in by the engine
    #[serde(default)]
    pub sprites: Vec<String>,
}
