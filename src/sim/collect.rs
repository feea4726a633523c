//! Collection sink
//!
//! The normal end of a successful grab: the claw opens over the chute, the
//! prize falls in, gets a won slot and is reported to the host. A later
//! claim moves it out of the chute into the tray.

use super::motion;
use super::object::{Axis, ObjectId, TransformOrigin};
use super::state::{GameState, RoundEvent, ToyState};
use super::tick::MachineEvent;
use crate::consts::Z_TOY;

/// Let go of the held prize over the chute
///
/// Returns None when there is nothing to release (a miss, or the prize
/// already slipped).
pub fn release_to_chute(state: &mut GameState) -> Option<ObjectId> {
    let toy = state.target.take()?;
    if let Some(handle) = state.slip_timer.take() {
        state.timers.cancel(handle);
    }
    state.bodies.unfollow_all(toy);

    let rest_y = {
        let body = state.bodies.get_mut(toy)?;
        body.angle = 0.0;
        body.origin = TransformOrigin::Center;
        state.geometry.chute_rest_y(body.size.y)
    };
    motion::ease(
        &mut state.bodies,
        toy,
        Axis::Y,
        rest_y,
        state.clock_ms,
        state.settings.drop_fall_ms,
        Some(MachineEvent::PrizeLanded(toy)),
    );
    if let Some(entry) = state.toy_mut(toy) {
        entry.state = ToyState::Falling;
        entry.claw_anchor = None;
    }
    Some(toy)
}

/// The prize reached the chute: assign its won slot and report it
pub fn land_prize(state: &mut GameState, toy: ObjectId) {
    let won_slot = state.collected as usize;
    let Some(entry) = state.toy_mut(toy) else {
        return;
    };
    entry.state = ToyState::Collected;
    entry.won_slot = Some(won_slot);
    let category = entry.category.clone();

    state.collected += 1;
    state.landed = Some(toy);
    if let Some(body) = state.bodies.get_mut(toy) {
        body.settle_here();
    }
    log::info!("Collected {} (#{})", category, won_slot + 1);
    state
        .outcomes
        .push(RoundEvent::Collected { category, won_slot });
}

/// Move the selected prize from the chute into its tray slot
pub fn claim_prize(state: &mut GameState) -> Option<ObjectId> {
    let toy = state.toys.iter_mut().find(|t| t.selected)?;
    toy.selected = false;
    let (body_id, won_slot) = (toy.body, toy.won_slot.unwrap_or(0));

    let tray = state.geometry.tray_slot(won_slot);
    if let Some(body) = state.bodies.get_mut(body_id) {
        body.pos = tray;
        body.z = Z_TOY;
        body.settle_here();
    }
    log::debug!("Prize {:?} moved to tray slot {}", body_id, won_slot);
    Some(body_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::collision::Rect;
    use crate::sim::grab::{check_slip, grip};
    use crate::sim::state::tests::test_state;
    use glam::Vec2;

    fn holding() -> (GameState, ObjectId) {
        let mut state = test_state("collect");
        state.settings.slip_probability = 1.0;
        state.geometry.chute = Rect::from_xywh(1000.0, 1000.0, 10.0, 10.0);
        let toy = state.toys[0].body;
        state.toy_mut(toy).unwrap().claw_anchor = Some(Vec2::new(15.0, 0.0));
        state.target = Some(toy);
        grip(&mut state, toy);
        (state, toy)
    }

    #[test]
    fn test_release_then_land() {
        let (mut state, toy) = holding();
        assert_eq!(release_to_chute(&mut state), Some(toy));
        assert!(state.target.is_none());
        assert!(state.slip_timer.is_none());
        assert!(state.timers.is_empty());
        assert!(!state.body(state.arm).unwrap().followers.contains(&toy));
        assert_eq!(state.toy(toy).unwrap().state, ToyState::Falling);

        land_prize(&mut state, toy);
        assert_eq!(state.collected, 1);
        assert_eq!(state.toy(toy).unwrap().state, ToyState::Collected);
        assert_eq!(state.toy(toy).unwrap().won_slot, Some(0));
        assert!(matches!(
            state.outcomes.last(),
            Some(RoundEvent::Collected { won_slot: 0, .. })
        ));
    }

    #[test]
    fn test_release_wins_race_against_slip() {
        let (mut state, toy) = holding();
        release_to_chute(&mut state);
        let before = state.outcomes.len();
        assert!(!check_slip(&mut state, toy));
        assert_eq!(state.outcomes.len(), before);
        assert_eq!(state.slips, 0);
    }

    #[test]
    fn test_slip_wins_race_against_release() {
        let (mut state, toy) = holding();
        assert!(check_slip(&mut state, toy));
        assert_eq!(release_to_chute(&mut state), None);
        assert_eq!(state.slips, 1);
        assert_eq!(state.toy(toy).unwrap().state, ToyState::Falling);
        assert!(state.toy(toy).unwrap().won_slot.is_none());
    }

    #[test]
    fn test_claim_moves_to_tray() {
        let (mut state, toy) = holding();
        release_to_chute(&mut state);
        land_prize(&mut state, toy);
        assert_eq!(claim_prize(&mut state), None);

        state.toy_mut(toy).unwrap().selected = true;
        assert_eq!(claim_prize(&mut state), Some(toy));
        assert!(!state.toy(toy).unwrap().selected);
        assert_eq!(state.body(toy).unwrap().pos, state.geometry.tray_slot(0));
        assert_eq!(claim_prize(&mut state), None);
    }
}
