//! Local player locomotion.
//!
//! Input arrives as an [`InputSnapshot`] each tick rather than being read from
//! global key state, so the controller is a pure function of its inputs.

use crate::entity::Entity;
use crate::types::{lerp_angle, yaw_of, ClientConfig, Vec3};

/// Squared displacement below which a tick counts as standing still.
const MOVE_EPSILON_SQ: f32 = 0.00001;

/// Held movement keys plus the camera's view direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputSnapshot {
    pub forward: bool,
    pub back: bool,
    pub left: bool,
    pub right: bool,
    /// Direction the camera looks; only its ground-plane part is used.
    pub view_direction: Vec3,
}

impl Default for InputSnapshot {
    fn default() -> Self {
        Self {
            forward: false,
            back: false,
            left: false,
            right: false,
            view_direction: Vec3::new(0.0, 0.0, -1.0),
        }
    }
}

impl InputSnapshot {
    /// Camera looking along `yaw` (radians from +Z toward +X).
    pub fn facing_yaw(yaw: f32) -> Self {
        Self {
            view_direction: Vec3::new(yaw.sin(), 0.0, yaw.cos()),
            ..Default::default()
        }
    }

    pub fn is_idle(&self) -> bool {
        !(self.forward || self.back || self.left || self.right)
    }

    /// Unscaled intent on the ground plane. Opposite keys cancel.
    pub fn intent(&self) -> Vec3 {
        let forward = Vec3::new(self.view_direction.x, 0.0, self.view_direction.z).normalized();
        // forward x up
        let side = Vec3::new(-forward.z, 0.0, forward.x);

        let mut intent = Vec3::zero();
        if self.forward {
            intent = intent.add(forward);
        }
        if self.back {
            intent = intent.sub(forward);
        }
        if self.left {
            intent = intent.sub(side);
        }
        if self.right {
            intent = intent.add(side);
        }
        intent
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionOutcome {
    pub moved: bool,
    pub delta: Vec3,
}

#[derive(Debug, Clone)]
pub struct LocalMotionController {
    config: ClientConfig,
}

impl LocalMotionController {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Advances `entity` by one tick of `input`.
    pub fn step(&self, entity: &mut Entity, input: &InputSnapshot, dt: f32) -> MotionOutcome {
        let frozen =
            self.config.freeze_motion_during_actions && !entity.animator.can_accept_motion_transition();
        let start = entity.position;

        if !frozen {
            let scale = self.config.move_speed * self.config.tick_scale(dt);
            let limit = self.config.world_limit;
            let candidate = start.add(input.intent().scale(scale));
            entity.position = Vec3::new(
                candidate.x.clamp(-limit, limit),
                start.y,
                candidate.z.clamp(-limit, limit),
            );
        }

        let delta = entity.position.sub(start);
        let moved = delta.length_squared() > MOVE_EPSILON_SQ;

        if entity.animator.can_accept_motion_transition() {
            if moved {
                let blend = self.config.blend_for(dt);
                entity.facing = lerp_angle(entity.facing, yaw_of(delta), blend);
            }
            entity.apply_locomotion(moved, &self.config);
        }

        MotionOutcome { moved, delta }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::AnimationState;
    use crate::entity::ControlSource;

    fn setup() -> (LocalMotionController, Entity) {
        let config = ClientConfig::default();
        let entity = Entity::new("me", ControlSource::Local, &config);
        (LocalMotionController::new(config), entity)
    }

    #[test]
    fn forward_follows_view_direction() {
        let (ctl, mut e) = setup();
        let input = InputSnapshot {
            forward: true,
            ..InputSnapshot::facing_yaw(0.0)
        };
        let out = ctl.step(&mut e, &input, 1.0 / 60.0);
        assert!(out.moved);
        assert!((e.position.z - 0.04).abs() < 1e-6);
        assert!(e.position.x.abs() < 1e-6);
        assert_eq!(e.animator.active_state(), Some(AnimationState::Walk));
    }

    #[test]
    fn opposite_keys_cancel() {
        let (ctl, mut e) = setup();
        let input = InputSnapshot {
            forward: true,
            back: true,
            ..Default::default()
        };
        let out = ctl.step(&mut e, &input, 1.0 / 60.0);
        assert!(!out.moved);
        assert_eq!(e.position, Vec3::zero());
        assert_eq!(e.animator.active_state(), Some(AnimationState::Idle));
    }

    #[test]
    fn strafe_right_is_perpendicular() {
        let (ctl, mut e) = setup();
        let input = InputSnapshot {
            right: true,
            ..InputSnapshot::facing_yaw(0.0)
        };
        ctl.step(&mut e, &input, 1.0 / 60.0);
        // Looking along +Z, right is -X.
        assert!((e.position.x + 0.04).abs() < 1e-6);
    }

    #[test]
    fn clamps_to_world_limit() {
        let (ctl, mut e) = setup();
        e.position = Vec3::new(18.49, 0.0, -18.49);
        let input = InputSnapshot {
            forward: true,
            right: true,
            ..InputSnapshot::facing_yaw(std::f32::consts::FRAC_PI_2)
        };
        for _ in 0..10 {
            ctl.step(&mut e, &input, 1.0 / 60.0);
        }
        assert!(e.position.x <= 18.5 && e.position.z >= -18.5);
    }

    #[test]
    fn facing_turns_gradually() {
        let (ctl, mut e) = setup();
        let input = InputSnapshot {
            forward: true,
            ..InputSnapshot::facing_yaw(1.0)
        };
        ctl.step(&mut e, &input, 1.0 / 60.0);
        assert!((e.facing - 0.15).abs() < 1e-4);
    }

    #[test]
    fn locked_entity_does_not_move() {
        let (ctl, mut e) = setup();
        e.animator.play_once(AnimationState::Jump);
        let input = InputSnapshot {
            forward: true,
            ..Default::default()
        };
        let out = ctl.step(&mut e, &input, 1.0 / 60.0);
        assert!(!out.moved);
        assert_eq!(e.animator.active_state(), Some(AnimationState::Jump));
    }
}
