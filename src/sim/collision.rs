//! Rectangle tests and target acquisition
//!
//! The claw picks its prize by a point-in-rect test against a capture box
//! hung below the arm joint. Ties go to the highest slot index so the same
//! layout always yields the same prize.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::object::ObjectId;
use crate::consts::{CAPTURE_SIZE, JOINT_SIZE, SHADOW_OFFSET, SHADOW_SIZE};
use crate::{normalize_degrees, signed_degrees};

/// Axis-aligned rectangle, `min` is the top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub min: Vec2,
    pub size: Vec2,
}

impl Rect {
    pub const fn new(min: Vec2, size: Vec2) -> Self {
        Self { min, size }
    }

    pub fn from_xywh(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self::new(Vec2::new(x, y), Vec2::new(w, h))
    }

    #[inline]
    pub fn max(&self) -> Vec2 {
        self.min + self.size
    }

    pub fn center(&self) -> Vec2 {
        self.min + self.size * 0.5
    }

    /// Half-open test: `min <= p < max` on both axes
    #[inline]
    pub fn contains_point(&self, p: Vec2) -> bool {
        let max = self.max();
        p.x >= self.min.x && p.x < max.x && p.y >= self.min.y && p.y < max.y
    }

    /// Interior overlap on both axes (touching edges do not count)
    #[inline]
    pub fn overlaps(&self, other: &Rect) -> bool {
        let (a_max, b_max) = (self.max(), other.max());
        self.min.x < b_max.x
            && other.min.x < a_max.x
            && self.min.y < b_max.y
            && other.min.y < a_max.y
    }
}

/// A toy eligible for acquisition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub id: ObjectId,
    pub slot: usize,
    /// Top-left corner of the toy body
    pub pos: Vec2,
}

/// Result of a successful acquisition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Acquisition {
    pub id: ObjectId,
    /// Where the claw grips, relative to the toy's top-left corner
    pub anchor: Vec2,
}

/// Capture box at the bottom of a descent
///
/// `floor_offset` maps the joint's height in the upper compartment onto the
/// floor of the lower compartment.
pub fn capture_rect(joint_pos: Vec2, floor_offset: f32) -> Rect {
    Rect::new(
        joint_pos + Vec2::new(0.0, JOINT_SIZE.y + floor_offset),
        CAPTURE_SIZE,
    )
}

/// Pick the overlapping candidate with the highest slot index
pub fn pick_target<I>(capture: &Rect, candidates: I) -> Option<Candidate>
where
    I: IntoIterator<Item = Candidate>,
{
    candidates
        .into_iter()
        .filter(|c| capture.contains_point(c.pos))
        .max_by_key(|c| (c.slot, c.id))
}

/// Run acquisition and record the grip anchor for the winner
pub fn acquire<I>(capture: &Rect, candidates: I) -> Option<Acquisition>
where
    I: IntoIterator<Item = Candidate>,
{
    pick_target(capture, candidates).map(|c| Acquisition {
        id: c.id,
        anchor: capture.center() - c.pos,
    })
}

/// Rotation (degrees) of a prize hanging from `anchor`
///
/// Angle from the anchor to the prize center, less 90 so a prize hanging
/// straight down is upright, folded into [-180, 180).
pub fn grip_angle(anchor: Vec2, center: Vec2) -> f32 {
    let d = center - anchor;
    let degrees = d.y.atan2(d.x).to_degrees() - 90.0;
    signed_degrees(normalize_degrees(degrees))
}

/// The claw's shadow on the floor
pub fn claw_shadow(joint_pos: Vec2, reach: f32) -> Rect {
    Rect::new(joint_pos + SHADOW_OFFSET + Vec2::new(0.0, reach), SHADOW_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn candidate(id: u32, slot: usize, x: f32, y: f32) -> Candidate {
        Candidate {
            id: ObjectId(id),
            slot,
            pos: Vec2::new(x, y),
        }
    }

    #[test]
    fn test_contains_point_half_open() {
        let r = Rect::from_xywh(10.0, 10.0, 20.0, 20.0);
        assert!(r.contains_point(Vec2::new(10.0, 10.0)));
        assert!(r.contains_point(Vec2::new(29.9, 29.9)));
        assert!(!r.contains_point(Vec2::new(30.0, 15.0)));
        assert!(!r.contains_point(Vec2::new(15.0, 30.0)));
        assert!(!r.contains_point(Vec2::new(9.9, 15.0)));
    }

    #[test]
    fn test_overlaps() {
        let a = Rect::from_xywh(0.0, 0.0, 10.0, 10.0);
        assert!(a.overlaps(&Rect::from_xywh(5.0, 5.0, 10.0, 10.0)));
        // Touching edge only
        assert!(!a.overlaps(&Rect::from_xywh(10.0, 0.0, 10.0, 10.0)));
        // Overlap on x but not y
        assert!(!a.overlaps(&Rect::from_xywh(5.0, 20.0, 10.0, 10.0)));
    }

    #[test]
    fn test_exact_overlap_is_acquired() {
        let capture = capture_rect(Vec2::new(100.0, 50.0), 200.0);
        let toy = candidate(7, 3, capture.min.x, capture.min.y);
        let hit = acquire(&capture, [toy]).unwrap();
        assert_eq!(hit.id, ObjectId(7));
        assert_eq!(hit.anchor, CAPTURE_SIZE * 0.5);
    }

    #[test]
    fn test_no_overlap_is_a_miss() {
        let capture = capture_rect(Vec2::ZERO, 200.0);
        let far = candidate(1, 5, 500.0, 500.0);
        assert!(acquire(&capture, [far]).is_none());
        assert!(acquire(&capture, []).is_none());
    }

    #[test]
    fn test_highest_slot_wins() {
        let capture = Rect::from_xywh(0.0, 0.0, 40.0, 40.0);
        let picked = pick_target(
            &capture,
            [
                candidate(1, 9, 5.0, 5.0),
                candidate(2, 11, 10.0, 10.0),
                candidate(3, 4, 20.0, 20.0),
                // Higher slot but outside
                candidate(4, 12, 45.0, 5.0),
            ],
        );
        assert_eq!(picked.map(|c| c.id), Some(ObjectId(2)));
    }

    #[test]
    fn test_grip_angle_hanging_straight_is_zero() {
        // Center directly below the anchor (y grows downward)
        assert_eq!(grip_angle(Vec2::new(10.0, 0.0), Vec2::new(10.0, 20.0)), 0.0);
        // Center to the right: swings -90
        assert!((grip_angle(Vec2::ZERO, Vec2::new(20.0, 0.0)) + 90.0).abs() < 1e-4);
        // Center to the left: 90
        assert!((grip_angle(Vec2::ZERO, Vec2::new(-20.0, 0.0)) - 90.0).abs() < 1e-4);
        // Center above: folded to -180
        assert!((grip_angle(Vec2::ZERO, Vec2::new(0.0, -20.0)) + 180.0).abs() < 1e-4);
    }

    #[test]
    fn test_shadow_moves_with_reach() {
        let rest = claw_shadow(Vec2::new(100.0, 0.0), 0.0);
        let reached = claw_shadow(Vec2::new(100.0, 0.0), 40.0);
        assert_eq!(rest.min, Vec2::new(92.0, 40.0));
        assert_eq!(reached.min.y - rest.min.y, 40.0);
    }

    proptest! {
        #[test]
        fn prop_pick_is_max_overlapping_slot(
            toys in proptest::collection::vec((0usize..12, 0.0f32..80.0, 0.0f32..80.0), 0..12)
        ) {
            let capture = Rect::from_xywh(20.0, 20.0, 40.0, 40.0);
            let candidates: Vec<Candidate> = toys
                .iter()
                .enumerate()
                .map(|(i, &(slot, x, y))| candidate(i as u32, slot, x, y))
                .collect();

            let picked = pick_target(&capture, candidates.iter().copied());
            let again = pick_target(&capture, candidates.iter().copied());
            prop_assert_eq!(picked, again);

            let best = candidates
                .iter()
                .filter(|c| capture.contains_point(c.pos))
                .map(|c| c.slot)
                .max();
            prop_assert_eq!(picked.map(|c| c.slot), best);
        }

        #[test]
        fn prop_grip_angle_in_render_range(
            ax in -100.0f32..100.0, ay in -100.0f32..100.0,
            cx in -100.0f32..100.0, cy in -100.0f32..100.0,
        ) {
            let a = grip_angle(Vec2::new(ax, ay), Vec2::new(cx, cy));
            prop_assert!((-180.0..180.0).contains(&a));
            prop_assert_eq!(a, grip_angle(Vec2::new(ax, ay), Vec2::new(cx, cy)));
        }
    }
}
