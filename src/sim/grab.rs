//! Grab outcome model
//!
//! Once the claw closes on a prize, a one-shot slip check is scheduled at a
//! random delay. If the claw's shadow is not over the chute when it fires,
//! the prize may slip and fall back to its spawn height. The check races
//! the normal chute release; whoever clears `GameState::target` first wins.

use rand::Rng;

use super::collision::{Candidate, acquire, capture_rect, claw_shadow, grip_angle};
use super::motion;
use super::object::{Axis, ObjectId, TransformOrigin};
use super::state::{GameState, RoundEvent, ToyState};
use super::tick::MachineEvent;
use crate::consts::{Z_TOY, Z_TOY_GRABBED};

/// Slip decision for one uniform roll in [0, 1)
///
/// Strict `<` so that `p = 0` never slips and `p = 1` always does.
#[inline]
pub fn slip_roll(p: f32, roll: f32, over_chute: bool) -> bool {
    !over_chute && roll < p
}

/// Find the prize under the claw at the bottom of a descent
///
/// Only resting prizes are eligible. The winner becomes `state.target`.
pub fn acquire_target(state: &mut GameState) -> Option<ObjectId> {
    let joint = state.body(state.joint)?.pos;
    let capture = capture_rect(joint, state.geometry.floor_offset());
    let candidates: Vec<Candidate> = state
        .toys
        .iter()
        .filter(|t| t.state == ToyState::AtRest)
        .filter_map(|t| {
            state.bodies.get(t.body).map(|body| Candidate {
                id: t.body,
                slot: t.slot,
                pos: body.pos,
            })
        })
        .collect();

    let Some(hit) = acquire(&capture, candidates) else {
        state.target = None;
        log::info!("Nothing under the claw");
        return None;
    };
    if let Some(toy) = state.toy_mut(hit.id) {
        toy.state = ToyState::Targeted;
        toy.claw_anchor = Some(hit.anchor);
        log::debug!("Targeted {} in slot {}", toy.category, toy.slot);
    }
    state.target = Some(hit.id);
    Some(hit.id)
}

/// Close the claw on `toy`: link it to rail, joint and arm, tilt it, and
/// schedule its slip check
pub fn grip(state: &mut GameState, toy: ObjectId) {
    let (rail, joint, arm) = (state.rail, state.joint, state.arm);
    state.bodies.follow(rail, toy);
    state.bodies.follow(joint, toy);
    state.bodies.follow(arm, toy);

    let anchor = state.toy(toy).and_then(|t| t.claw_anchor);
    if let (Some(anchor), Some(body)) = (anchor, state.bodies.get_mut(toy)) {
        body.angle = grip_angle(anchor, body.size * 0.5);
        body.origin = TransformOrigin::Point(anchor);
        body.z = Z_TOY_GRABBED;
    }

    let Some(entry) = state.toy_mut(toy) else {
        return;
    };
    entry.state = ToyState::Grabbed;
    let category = entry.category.clone();
    log::info!("Grabbed {}", category);
    state.outcomes.push(RoundEvent::Grabbed { category });

    schedule_slip_check(state, toy);
}

pub fn schedule_slip_check(state: &mut GameState, toy: ObjectId) {
    let max = state.settings.slip_delay_max_ms;
    let delay = if max == 0 {
        0
    } else {
        state.rng.random_range(0..max)
    };
    let handle = state
        .timers
        .schedule(state.clock_ms, delay, MachineEvent::SlipCheck(toy));
    state.slip_timer = Some(handle);
    log::debug!("Slip check in {} ms", delay);
}

/// Whether the claw's shadow currently covers the chute
pub fn shadow_over_chute(state: &GameState) -> bool {
    state
        .body(state.joint)
        .map(|joint| claw_shadow(joint.pos, state.reach()).overlaps(&state.geometry.chute))
        .unwrap_or(false)
}

/// Scheduled check; returns true if `toy` slipped
pub fn check_slip(state: &mut GameState, toy: ObjectId) -> bool {
    state.slip_timer = None;
    if state.target != Some(toy) {
        log::debug!("Slip check for {:?} ignored, already released", toy);
        return false;
    }
    if shadow_over_chute(state) {
        return false;
    }
    let roll: f32 = state.rng.random();
    if !slip_roll(state.settings.slip_probability, roll, false) {
        return false;
    }
    force_release(state, toy);
    true
}

/// Drop the prize mid-air; it eases back down to its spawn height
fn force_release(state: &mut GameState, toy: ObjectId) {
    state.target = None;
    state.bodies.unfollow_all(toy);

    let Some(body) = state.bodies.get_mut(toy) else {
        return;
    };
    body.angle = 0.0;
    body.origin = TransformOrigin::Center;
    body.z = Z_TOY;
    // Horizontal position stays where the claw dragged it
    body.rest.pos.x = body.pos.x;
    body.rest.angle = 0.0;
    let spawn_y = body.rest.pos.y;
    motion::ease(
        &mut state.bodies,
        toy,
        Axis::Y,
        spawn_y,
        state.clock_ms,
        state.settings.slip_fall_ms,
        Some(MachineEvent::SlipLanded(toy)),
    );

    state.slips += 1;
    if let Some(entry) = state.toy_mut(toy) {
        entry.state = ToyState::Falling;
        entry.claw_anchor = None;
        let category = entry.category.clone();
        log::info!("{} slipped from the claw", category);
        state.outcomes.push(RoundEvent::Slipped { category });
    }
}

/// The slipped prize is back on the floor
pub fn slip_landed(state: &mut GameState, toy: ObjectId) {
    if let Some(body) = state.bodies.get_mut(toy) {
        body.settle_here();
    }
    if let Some(entry) = state.toy_mut(toy) {
        if entry.state == ToyState::Falling {
            entry.state = ToyState::AtRest;
        }
    }
}
