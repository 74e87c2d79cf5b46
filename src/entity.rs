//! The avatar record shared by the local player and every remote player.

use crate::animation::{AnimationState, Animator, ClipLibrary};
use crate::overlay::SpeechBubble;
use crate::types::{ClientConfig, Vec3};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSource {
    Local,
    Remote,
}

/// Last authoritative transform received for a remote entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Target {
    pub position: Vec3,
    pub facing: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: String,
    pub control: ControlSource,
    pub position: Vec3,
    /// Yaw in radians.
    pub facing: f32,
    pub animator: Animator,
    /// Remote only; `None` until the first positioned update arrives.
    pub target: Option<Target>,
    pub bubble: SpeechBubble,
}

impl Entity {
    pub fn new(id: impl Into<String>, control: ControlSource, config: &ClientConfig) -> Self {
        Self::with_clips(id, control, config, ClipLibrary::standard())
    }

    pub fn with_clips(
        id: impl Into<String>,
        control: ControlSource,
        config: &ClientConfig,
        clips: ClipLibrary,
    ) -> Self {
        Self {
            id: id.into(),
            control,
            position: Vec3::zero(),
            facing: 0.0,
            animator: Animator::with_clips(clips, config.idle_fade),
            target: None,
            bubble: SpeechBubble::new(config.bubble_fade_delay, config.bubble_detach_delay),
        }
    }

    pub fn is_local(&self) -> bool {
        self.control == ControlSource::Local
    }

    /// Walk while moving, idle otherwise, unless a one-shot holds the lock.
    pub fn apply_locomotion(&mut self, moving: bool, config: &ClientConfig) {
        if !self.animator.can_accept_motion_transition() {
            return;
        }
        if moving {
            self.animator.fade_to(AnimationState::Walk, config.motion_fade);
        } else {
            self.animator.fade_to(AnimationState::Idle, config.idle_fade);
        }
    }

    /// Applies a named action from the network or the local player.
    ///
    /// Unknown names are ignored; one-shots go through `play_once`.
    pub fn apply_action(&mut self, name: &str, config: &ClientConfig) {
        let Ok(state) = name.parse::<AnimationState>() else {
            log::debug!("[entity] {} ignoring unknown action '{}'", self.id, name);
            return;
        };
        if state.is_one_shot() {
            self.animator.play_once(state);
        } else if self.animator.can_accept_motion_transition() {
            let duration = if state == AnimationState::Idle {
                config.idle_fade
            } else {
                config.motion_fade
            };
            self.animator.fade_to(state, duration);
        }
    }
}
