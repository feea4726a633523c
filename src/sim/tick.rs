//! Fixed timestep simulation tick
//!
//! Input edges, motion completions and timer expiries are all
//! `MachineEvent`s. Each one goes through `advance`, the single transition
//! table of the actuator; handlers may queue follow-up events, which run
//! before the tick returns.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::collect;
use super::grab;
use super::motion::{self, Drive};
use super::object::{Axis, ObjectId};
use super::state::{ClawPhase, ClawPose, GameState, RetractStage, RoundEvent};
use crate::consts::ARM_MAX_REACH;

/// Player controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Control {
    /// Moves the rail across
    Horizontal,
    /// Moves the joint down
    Vertical,
}

impl Control {
    /// Keyboard equivalent of the on-screen buttons
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "ArrowRight" | "d" | "D" => Some(Control::Horizontal),
            "ArrowDown" | "s" | "S" => Some(Control::Vertical),
            _ => None,
        }
    }
}

/// A press or release of one control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlEdge {
    pub control: Control,
    pub pressed: bool,
}

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Press/release edges in arrival order
    pub edges: Vec<ControlEdge>,
    /// Tap on the prize waiting in the chute
    pub claim: bool,
}

impl TickInput {
    pub fn press(control: Control) -> Self {
        Self {
            edges: vec![ControlEdge {
                control,
                pressed: true,
            }],
            ..Default::default()
        }
    }

    pub fn release(control: Control) -> Self {
        Self {
            edges: vec![ControlEdge {
                control,
                pressed: false,
            }],
            ..Default::default()
        }
    }
}

/// Everything the actuator reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineEvent {
    HorizontalPressed,
    HorizontalReleased,
    VerticalPressed,
    VerticalReleased,
    /// Rail stopped: reached its bound or was released
    RailSettled,
    /// Joint stopped: reached the lower compartment or was released
    DescentFinished,
    ArmExtended,
    /// Open-claw animation done at full reach
    ClawOpened,
    /// Close-claw animation done
    ClawClosed,
    ArmRetracted,
    RailReturned,
    JointReturned,
    PrizeLanded(ObjectId),
    DropSettled,
    SlipCheck(ObjectId),
    SlipLanded(ObjectId),
}

impl From<ControlEdge> for MachineEvent {
    fn from(edge: ControlEdge) -> Self {
        match (edge.control, edge.pressed) {
            (Control::Horizontal, true) => MachineEvent::HorizontalPressed,
            (Control::Horizontal, false) => MachineEvent::HorizontalReleased,
            (Control::Vertical, true) => MachineEvent::VerticalPressed,
            (Control::Vertical, false) => MachineEvent::VerticalReleased,
        }
    }
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput, dt_ms: u32) {
    let mut queue: VecDeque<MachineEvent> =
        input.edges.iter().map(|&edge| edge.into()).collect();
    if input.claim {
        collect::claim_prize(state);
    }
    drain(state, &mut queue);

    state.clock_ms += dt_ms as u64;
    let mut finished = Vec::new();
    motion::step_all(&mut state.bodies, dt_ms, state.clock_ms, &mut finished);
    queue.extend(finished);
    queue.extend(state.timers.drain_due(state.clock_ms));
    drain(state, &mut queue);
}

fn drain(state: &mut GameState, queue: &mut VecDeque<MachineEvent>) {
    while let Some(event) = queue.pop_front() {
        advance(state, event, queue);
    }
}

/// Start a stepped motion, or stop the running one and queue its continuation
fn drive(
    state: &mut GameState,
    id: ObjectId,
    axis: Axis,
    target: f32,
    on_done: MachineEvent,
    queue: &mut VecDeque<MachineEvent>,
) {
    let interval = state.settings.motion_interval_ms;
    match motion::drive(&mut state.bodies, id, axis, target, interval, Some(on_done)) {
        Drive::Cancelled(Some(event)) => queue.push_back(event),
        Drive::Cancelled(None) | Drive::Started => {}
        Drive::Missing => log::warn!("Cannot drive missing object {:?}", id),
    }
}

fn rest_value(state: &GameState, id: ObjectId, axis: Axis) -> f32 {
    state
        .body(id)
        .map(|body| body.rest_value(axis))
        .unwrap_or_default()
}

/// The actuator transition table
pub fn advance(state: &mut GameState, event: MachineEvent, queue: &mut VecDeque<MachineEvent>) {
    use MachineEvent::*;

    match (state.phase, event) {
        // === Horizontal travel ===
        (ClawPhase::Idle, HorizontalPressed) if state.controls.horizontal => {
            state.phase = ClawPhase::HorizontalMoving;
            let (rail, bound) = (state.rail, state.geometry.rail_bound);
            drive(state, rail, Axis::X, bound, RailSettled, queue);
        }
        (ClawPhase::HorizontalMoving, HorizontalReleased) => {
            // Same call again stops the rail and fires RailSettled
            let (rail, bound) = (state.rail, state.geometry.rail_bound);
            drive(state, rail, Axis::X, bound, RailSettled, queue);
        }
        (ClawPhase::HorizontalMoving, RailSettled) => {
            state.controls.horizontal = false;
            state.controls.vertical = true;
            state.phase = ClawPhase::HorizontalSettled;
        }

        // === Descent ===
        (ClawPhase::HorizontalSettled, VerticalPressed) if state.controls.vertical => {
            state.phase = ClawPhase::VerticalDescending;
            let (joint, bound) = (state.joint, state.geometry.descent_bound);
            drive(state, joint, Axis::Y, bound, DescentFinished, queue);
        }
        (ClawPhase::VerticalDescending, VerticalReleased) => {
            let (joint, bound) = (state.joint, state.geometry.descent_bound);
            drive(state, joint, Axis::Y, bound, DescentFinished, queue);
        }
        (ClawPhase::VerticalDescending, DescentFinished) => {
            state.controls.vertical = false;
            grab::acquire_target(state);
            state.claw = ClawPose::Open;
            state.phase = ClawPhase::ArmExtending;
            let arm = state.arm;
            drive(state, arm, Axis::H, ARM_MAX_REACH, ArmExtended, queue);
        }

        // === Grab ===
        (ClawPhase::ArmExtending, ArmExtended) => {
            state.phase = ClawPhase::Grabbing;
            let delay = state.settings.claw_open_ms;
            state.timers.schedule(state.clock_ms, delay, ClawOpened);
        }
        (ClawPhase::Grabbing, ClawOpened) => {
            match state.target {
                Some(toy) => {
                    state.claw = ClawPose::Closed;
                    grab::grip(state, toy);
                }
                None => {
                    state.claw = ClawPose::Missed;
                    state.outcomes.push(RoundEvent::Missed);
                }
            }
            let delay = state.settings.claw_close_ms;
            state.timers.schedule(state.clock_ms, delay, ClawClosed);
        }

        // === Retract: arm, then rail, then joint ===
        (ClawPhase::Grabbing, ClawClosed) => {
            state.phase = ClawPhase::Retracting(RetractStage::Arm);
            let arm = state.arm;
            let rest = rest_value(state, arm, Axis::H);
            drive(state, arm, Axis::H, rest, ArmRetracted, queue);
        }
        (ClawPhase::Retracting(RetractStage::Arm), ArmRetracted) => {
            state.phase = ClawPhase::Retracting(RetractStage::Rail);
            let rail = state.rail;
            let rest = rest_value(state, rail, Axis::X);
            drive(state, rail, Axis::X, rest, RailReturned, queue);
        }
        (ClawPhase::Retracting(RetractStage::Rail), RailReturned) => {
            state.phase = ClawPhase::Retracting(RetractStage::Joint);
            let joint = state.joint;
            let rest = rest_value(state, joint, Axis::Y);
            drive(state, joint, Axis::Y, rest, JointReturned, queue);
        }

        // === Drop ===
        (ClawPhase::Retracting(RetractStage::Joint), JointReturned) => {
            state.phase = ClawPhase::Dropping;
            state.claw = ClawPose::Open;
            if collect::release_to_chute(state).is_none() {
                let delay = state.settings.drop_settle_ms;
                state.timers.schedule(state.clock_ms, delay, DropSettled);
            }
        }
        (ClawPhase::Dropping, PrizeLanded(toy)) => {
            collect::land_prize(state, toy);
            let delay = state.settings.drop_settle_ms;
            state.timers.schedule(state.clock_ms, delay, DropSettled);
        }
        (ClawPhase::Dropping, DropSettled) => {
            state.claw = ClawPose::Closed;
            let caught = match state.landed.take() {
                Some(toy) => {
                    if let Some(entry) = state.toy_mut(toy) {
                        entry.selected = true;
                    }
                    true
                }
                None => false,
            };
            state.controls.horizontal = true;
            state.controls.vertical = false;
            state.phase = ClawPhase::Idle;
            state.cycles += 1;
            state.outcomes.push(RoundEvent::CycleFinished { caught });
        }

        // === Slip runs alongside retraction and drop ===
        (_, SlipCheck(toy)) => {
            grab::check_slip(state, toy);
        }
        (_, SlipLanded(toy)) => grab::slip_landed(state, toy),

        (phase, event) => log::trace!("Ignoring {:?} in {:?}", event, phase),
    }
}
