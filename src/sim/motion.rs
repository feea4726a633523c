//! Motion scheduler
//!
//! Drives one axis of one object toward a target. Two flavours:
//! - stepped: fixed interval, at most `MAX_STEP` per tick (machine parts)
//! - eased: time-based quadratic ease-out (falling prizes)
//!
//! A motion's continuation is a `MachineEvent` that the caller feeds back
//! into the state machine, so chained stages never nest callbacks.

use super::object::{Axis, Bodies, ObjectId};
use super::tick::MachineEvent;
use crate::consts::MAX_STEP;
use crate::ease_out_quad;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum MotionKind {
    Stepped { interval_ms: u32, elapsed_ms: u32 },
    Eased { from: f32, started_ms: u64, duration_ms: u32 },
}

/// Active motion handle stored on the driven object
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Motion {
    pub axis: Axis,
    pub target: f32,
    pub(crate) kind: MotionKind,
    pub on_done: Option<MachineEvent>,
}

/// Outcome of `drive`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Drive {
    /// A new motion is running
    Started,
    /// A motion was already running; it was stopped and this is its continuation
    Cancelled(Option<MachineEvent>),
    /// No such object
    Missing,
}

/// Start a stepped motion, or stop the one already running (toggle)
///
/// When the object is already moving, the in-flight motion is cancelled and
/// its continuation is handed back to fire. The new target and continuation
/// are discarded.
pub fn drive(
    bodies: &mut Bodies,
    id: ObjectId,
    axis: Axis,
    target: f32,
    interval_ms: u32,
    on_done: Option<MachineEvent>,
) -> Drive {
    let Some(obj) = bodies.get_mut(id) else {
        return Drive::Missing;
    };
    if let Some(active) = obj.motion.take() {
        return Drive::Cancelled(active.on_done);
    }
    obj.motion = Some(Motion {
        axis,
        target,
        kind: MotionKind::Stepped {
            interval_ms: interval_ms.max(1),
            elapsed_ms: 0,
        },
        on_done,
    });
    Drive::Started
}

/// Start an eased motion, replacing anything in flight without firing it
pub fn ease(
    bodies: &mut Bodies,
    id: ObjectId,
    axis: Axis,
    target: f32,
    now_ms: u64,
    duration_ms: u32,
    on_done: Option<MachineEvent>,
) {
    if let Some(obj) = bodies.get_mut(id) {
        let from = obj.value(axis);
        obj.motion = Some(Motion {
            axis,
            target,
            kind: MotionKind::Eased {
                from,
                started_ms: now_ms,
                duration_ms,
            },
            on_done,
        });
    }
}

/// Stop every motion without firing continuations (teardown)
pub fn halt_all(bodies: &mut Bodies) -> usize {
    let mut halted = 0;
    for obj in bodies.objects_mut() {
        if obj.motion.take().is_some() {
            halted += 1;
        }
    }
    halted
}

/// Advance all motions by `dt_ms`; `now_ms` is the clock after advancing
///
/// Finished motions push their continuation to `done`, in object order.
pub fn step_all(bodies: &mut Bodies, dt_ms: u32, now_ms: u64, done: &mut Vec<MachineEvent>) {
    for index in 0..bodies.len() {
        let (followers, axis, delta, completion) = {
            let obj = &mut bodies.objects_mut()[index];
            let Some(mut motion) = obj.motion else {
                continue;
            };
            let before = obj.value(motion.axis);
            let mut value = before;
            let mut finished = false;

            match &mut motion.kind {
                MotionKind::Stepped {
                    interval_ms,
                    elapsed_ms,
                } => {
                    *elapsed_ms += dt_ms;
                    while *elapsed_ms >= *interval_ms {
                        *elapsed_ms -= *interval_ms;
                        let remaining = motion.target - value;
                        if remaining.abs() <= MAX_STEP {
                            value = motion.target;
                            finished = true;
                            break;
                        }
                        value += MAX_STEP.copysign(remaining);
                    }
                }
                MotionKind::Eased {
                    from,
                    started_ms,
                    duration_ms,
                } => {
                    let elapsed = now_ms.saturating_sub(*started_ms) as f32;
                    let t = if *duration_ms == 0 {
                        1.0
                    } else {
                        elapsed / *duration_ms as f32
                    };
                    if t >= 1.0 {
                        value = motion.target;
                        finished = true;
                    } else {
                        value = *from + (motion.target - *from) * ease_out_quad(t);
                    }
                }
            }

            obj.set_value(motion.axis, value);
            if finished {
                obj.motion = None;
            } else {
                obj.motion = Some(motion);
            }
            let on_done = if finished { Some(motion.on_done) } else { None };
            (
                obj.followers.clone(),
                motion.axis.follower_axis(),
                value - before,
                on_done,
            )
        };

        if delta != 0.0 {
            bodies.displace(&followers, axis, delta);
        }
        if let Some(Some(event)) = completion {
            done.push(event);
        }
    }
}
