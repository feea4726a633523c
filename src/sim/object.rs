//! Positioned objects and follower links
//!
//! Every moving thing in the machine (rail, joint, arm, toys) is a
//! `PositionedObject` owned by a single `Bodies` arena. Followers are stored
//! as ids, never references, so a leader can be stepped while its followers
//! are mutated through the same arena.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::Rect;
use super::motion::Motion;

/// Stable handle into `Bodies`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u32);

/// A drivable coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    /// Height; the arm extends by growing this
    H,
}

impl Axis {
    /// Axis followers are displaced on when this axis is driven
    pub fn follower_axis(self) -> Axis {
        match self {
            Axis::H => Axis::Y,
            other => other,
        }
    }
}

/// Pivot used when rendering `angle`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum TransformOrigin {
    #[default]
    Center,
    TopCenter,
    /// Offset from the object's top-left corner
    Point(Vec2),
}

/// Snapshot of where an object sits when nothing is moving it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RestPose {
    pub pos: Vec2,
    pub size: Vec2,
    pub angle: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionedObject {
    pub id: ObjectId,
    /// Top-left corner
    pub pos: Vec2,
    /// Draw order
    pub z: i32,
    /// Width/height
    pub size: Vec2,
    /// Rotation in degrees
    pub angle: f32,
    pub origin: TransformOrigin,
    pub rest: RestPose,
    /// Objects that copy this object's per-tick displacement
    pub followers: Vec<ObjectId>,
    /// Active motion handle (at most one)
    #[serde(skip)]
    pub(crate) motion: Option<Motion>,
}

impl PositionedObject {
    pub fn new(id: ObjectId, pos: Vec2, size: Vec2, z: i32) -> Self {
        Self {
            id,
            pos,
            z,
            size,
            angle: 0.0,
            origin: TransformOrigin::default(),
            rest: RestPose {
                pos,
                size,
                angle: 0.0,
            },
            followers: Vec::new(),
            motion: None,
        }
    }

    #[inline]
    pub fn value(&self, axis: Axis) -> f32 {
        match axis {
            Axis::X => self.pos.x,
            Axis::Y => self.pos.y,
            Axis::H => self.size.y,
        }
    }

    #[inline]
    pub fn set_value(&mut self, axis: Axis, value: f32) {
        match axis {
            Axis::X => self.pos.x = value,
            Axis::Y => self.pos.y = value,
            Axis::H => self.size.y = value,
        }
    }

    #[inline]
    pub fn shift(&mut self, axis: Axis, delta: f32) {
        let value = self.value(axis);
        self.set_value(axis, value + delta);
    }

    /// Rest value of an axis
    pub fn rest_value(&self, axis: Axis) -> f32 {
        match axis {
            Axis::X => self.rest.pos.x,
            Axis::Y => self.rest.pos.y,
            Axis::H => self.rest.size.y,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.pos, self.size)
    }

    pub fn center(&self) -> Vec2 {
        self.pos + self.size * 0.5
    }

    pub fn is_moving(&self) -> bool {
        self.motion.is_some()
    }

    /// Make the current pose the new rest pose
    pub fn settle_here(&mut self) {
        self.rest = RestPose {
            pos: self.pos,
            size: self.size,
            angle: self.angle,
        };
    }
}

/// Arena owning every positioned object of one round
#[derive(Debug, Clone, Default)]
pub struct Bodies {
    /// Sorted by id (insertion order)
    objects: Vec<PositionedObject>,
    next_id: u32,
}

impl Bodies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, pos: Vec2, size: Vec2, z: i32) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        self.objects.push(PositionedObject::new(id, pos, size, z));
        id
    }

    pub fn get(&self, id: ObjectId) -> Option<&PositionedObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut PositionedObject> {
        self.objects.iter_mut().find(|o| o.id == id)
    }

    /// Remove an object and every follower link pointing at it
    pub fn remove(&mut self, id: ObjectId) -> Option<PositionedObject> {
        self.unfollow_all(id);
        let index = self.objects.iter().position(|o| o.id == id)?;
        Some(self.objects.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &PositionedObject> {
        self.objects.iter()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub(crate) fn objects_mut(&mut self) -> &mut [PositionedObject] {
        &mut self.objects
    }

    /// Link `follower` to `leader`. Pair every call with `unfollow`.
    pub fn follow(&mut self, leader: ObjectId, follower: ObjectId) {
        if leader == follower {
            return;
        }
        if let Some(obj) = self.get_mut(leader) {
            if !obj.followers.contains(&follower) {
                obj.followers.push(follower);
            }
        }
    }

    pub fn unfollow(&mut self, leader: ObjectId, follower: ObjectId) {
        if let Some(obj) = self.get_mut(leader) {
            obj.followers.retain(|&f| f != follower);
        }
    }

    /// Detach `follower` from every leader
    pub fn unfollow_all(&mut self, follower: ObjectId) {
        for obj in &mut self.objects {
            obj.followers.retain(|&f| f != follower);
        }
    }

    /// Apply a displacement to each listed follower
    pub(crate) fn displace(&mut self, followers: &[ObjectId], axis: Axis, delta: f32) {
        for &id in followers {
            if let Some(obj) = self.get_mut(id) {
                obj.shift(axis, delta);
            }
        }
    }
}
