//! Per-entity animation state machine.
//!
//! Looping states (`idle`, `walk`) crossfade into each other freely. One-shot
//! states (`jump`, `praying`) lock the machine until their clip completes,
//! then return to idle.
//!
//! The machine never touches a renderer directly. Every visual change is
//! queued as an [`AnimationCommand`] for the animation driver to drain, and the
//! driver reports one-shot completion back through [`Animator::finish`] with
//! the [`PlaybackId`] it was handed. Completions for any other invocation are
//! ignored, so a late or duplicated signal can never unlock a newer action.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// States
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationState {
    Idle,
    Walk,
    Jump,
    Praying,
}

impl AnimationState {
    pub const ALL: [AnimationState; 4] = [
        AnimationState::Idle,
        AnimationState::Walk,
        AnimationState::Jump,
        AnimationState::Praying,
    ];

    /// Plays once to completion and excludes all other transitions meanwhile.
    pub fn is_one_shot(self) -> bool {
        matches!(self, AnimationState::Jump | AnimationState::Praying)
    }

    pub fn name(self) -> &'static str {
        match self {
            AnimationState::Idle => "idle",
            AnimationState::Walk => "walk",
            AnimationState::Jump => "jump",
            AnimationState::Praying => "praying",
        }
    }
}

impl fmt::Display for AnimationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAnimation(pub String);

impl FromStr for AnimationState {
    type Err = UnknownAnimation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(AnimationState::Idle),
            "walk" => Ok(AnimationState::Walk),
            "jump" => Ok(AnimationState::Jump),
            "praying" => Ok(AnimationState::Praying),
            other => Err(UnknownAnimation(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Clips
// ---------------------------------------------------------------------------

/// Loaded clips and their lengths in seconds.
///
/// A state with no clip is "not loaded yet"; every request for it is a silent
/// no-op. A length of `None` means the driver owns completion timing.
#[derive(Debug, Clone, Default)]
pub struct ClipLibrary {
    clips: HashMap<AnimationState, Option<f32>>,
}

impl ClipLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// All four states registered with the reference clip lengths.
    pub fn standard() -> Self {
        let mut lib = Self::new();
        lib.insert(AnimationState::Idle, None);
        lib.insert(AnimationState::Walk, None);
        lib.insert(AnimationState::Jump, Some(1.0));
        lib.insert(AnimationState::Praying, Some(3.0));
        lib
    }

    pub fn insert(&mut self, state: AnimationState, seconds: Option<f32>) {
        self.clips.insert(state, seconds);
    }

    pub fn contains(&self, state: AnimationState) -> bool {
        self.clips.contains_key(&state)
    }

    pub fn length(&self, state: AnimationState) -> Option<f32> {
        self.clips.get(&state).copied().flatten()
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Identity of a single `play_once` invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaybackId(u64);

/// Visual work for the animation driver.
#[derive(Debug, Clone, PartialEq)]
pub enum AnimationCommand {
    /// Fade `from` out and `to` in over `duration` seconds.
    CrossFade {
        from: Option<AnimationState>,
        to: AnimationState,
        duration: f32,
    },
    /// Stop every running clip and play `state` exactly once, holding the
    /// last frame. Report completion with `playback`.
    PlayOnce {
        state: AnimationState,
        playback: PlaybackId,
    },
    /// Stop everything; the entity is going away.
    StopAll,
}

#[derive(Debug, Clone, Copy)]
struct OneShot {
    playback: PlaybackId,
    remaining: Option<f32>,
}

// ---------------------------------------------------------------------------
// Animator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Animator {
    clips: ClipLibrary,
    active: Option<AnimationState>,
    one_shot: Option<OneShot>,
    next_playback: u64,
    idle_fade: f32,
    commands: VecDeque<AnimationCommand>,
}

impl Animator {
    pub fn new(idle_fade: f32) -> Self {
        Self {
            clips: ClipLibrary::new(),
            active: None,
            one_shot: None,
            next_playback: 0,
            idle_fade,
            commands: VecDeque::new(),
        }
    }

    /// An animator with `clips` already loaded and idle playing.
    pub fn with_clips(clips: ClipLibrary, idle_fade: f32) -> Self {
        let mut animator = Self::new(idle_fade);
        let states: Vec<_> = AnimationState::ALL
            .into_iter()
            .filter(|s| clips.contains(*s))
            .map(|s| (s, clips.length(s)))
            .collect();
        for (state, seconds) in states {
            animator.register(state, seconds);
        }
        animator
    }

    /// Marks a clip as loaded. Loading idle while nothing plays starts it.
    pub fn register(&mut self, state: AnimationState, seconds: Option<f32>) {
        self.clips.insert(state, seconds);
        if state == AnimationState::Idle && self.active.is_none() {
            self.active = Some(AnimationState::Idle);
            self.commands.push_back(AnimationCommand::CrossFade {
                from: None,
                to: AnimationState::Idle,
                duration: 0.0,
            });
        }
    }

    pub fn active_state(&self) -> Option<AnimationState> {
        self.active
    }

    /// Name reported to the network; idle until a clip is playing.
    pub fn active_name(&self) -> &'static str {
        self.active.unwrap_or(AnimationState::Idle).name()
    }

    pub fn is_locked(&self) -> bool {
        self.one_shot.is_some()
    }

    pub fn can_accept_motion_transition(&self) -> bool {
        !self.is_locked()
    }

    /// Requests a crossfade to `state`. Returns whether a transition was issued.
    pub fn fade_to(&mut self, state: AnimationState, duration: f32) -> bool {
        if self.is_locked() || self.active == Some(state) || !self.clips.contains(state) {
            return false;
        }
        self.commands.push_back(AnimationCommand::CrossFade {
            from: self.active,
            to: state,
            duration,
        });
        self.active = Some(state);
        true
    }

    /// Starts a one-shot action and locks the machine until it completes.
    pub fn play_once(&mut self, state: AnimationState) -> Option<PlaybackId> {
        if !state.is_one_shot() || self.is_locked() || !self.clips.contains(state) {
            return None;
        }
        self.next_playback += 1;
        let playback = PlaybackId(self.next_playback);
        self.one_shot = Some(OneShot {
            playback,
            remaining: self.clips.length(state),
        });
        self.active = Some(state);
        self.commands
            .push_back(AnimationCommand::PlayOnce { state, playback });
        Some(playback)
    }

    /// Completion signal for `playback`. Stale or repeated signals are ignored.
    pub fn finish(&mut self, playback: PlaybackId) -> bool {
        match self.one_shot {
            Some(current) if current.playback == playback => {
                self.one_shot = None;
                self.fade_to(AnimationState::Idle, self.idle_fade);
                true
            }
            _ => false,
        }
    }

    /// Advances one-shot timing for clips with a known length.
    pub fn advance(&mut self, dt: f32) {
        let Some(shot) = self.one_shot.as_mut() else {
            return;
        };
        let Some(remaining) = shot.remaining.as_mut() else {
            return;
        };
        *remaining -= dt;
        if *remaining <= 0.0 {
            let playback = shot.playback;
            self.finish(playback);
        }
    }

    /// Drops all playback. Pending completions become stale.
    pub fn reset(&mut self) {
        self.one_shot = None;
        self.active = None;
        self.commands.clear();
        self.commands.push_back(AnimationCommand::StopAll);
    }

    pub fn drain_commands(&mut self) -> Vec<AnimationCommand> {
        self.commands.drain(..).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn animator() -> Animator {
        let mut a = Animator::with_clips(ClipLibrary::standard(), 0.5);
        a.drain_commands();
        a
    }

    #[test]
    fn registering_idle_starts_it() {
        let mut a = Animator::new(0.5);
        assert_eq!(a.active_state(), None);
        a.register(AnimationState::Idle, None);
        assert_eq!(a.active_state(), Some(AnimationState::Idle));
        assert_eq!(a.drain_commands().len(), 1);
    }

    #[test]
    fn fade_to_same_state_is_noop() {
        let mut a = animator();
        assert!(!a.fade_to(AnimationState::Idle, 0.2));
        assert!(a.drain_commands().is_empty());
    }

    #[test]
    fn fade_to_unregistered_is_noop() {
        let mut a = Animator::new(0.5);
        a.register(AnimationState::Idle, None);
        assert!(!a.fade_to(AnimationState::Walk, 0.2));
        assert_eq!(a.active_state(), Some(AnimationState::Idle));
    }

    #[test]
    fn fade_updates_state_immediately() {
        let mut a = animator();
        assert!(a.fade_to(AnimationState::Walk, 0.2));
        assert_eq!(a.active_state(), Some(AnimationState::Walk));
        assert_eq!(
            a.drain_commands(),
            vec![AnimationCommand::CrossFade {
                from: Some(AnimationState::Idle),
                to: AnimationState::Walk,
                duration: 0.2,
            }]
        );
    }

    #[test]
    fn lock_excludes_motion_transitions() {
        let mut a = animator();
        a.play_once(AnimationState::Jump).unwrap();
        assert!(a.is_locked());
        assert!(!a.can_accept_motion_transition());
        assert!(!a.fade_to(AnimationState::Walk, 0.2));
        assert!(!a.fade_to(AnimationState::Idle, 0.5));
        assert_eq!(a.active_state(), Some(AnimationState::Jump));
    }

    #[test]
    fn play_once_while_locked_is_noop() {
        let mut a = animator();
        a.play_once(AnimationState::Jump).unwrap();
        assert!(a.play_once(AnimationState::Praying).is_none());
        assert_eq!(a.active_state(), Some(AnimationState::Jump));
    }

    #[test]
    fn play_once_rejects_looping_states() {
        let mut a = animator();
        assert!(a.play_once(AnimationState::Walk).is_none());
        assert!(!a.is_locked());
    }

    #[test]
    fn completion_unlocks_and_returns_to_idle() {
        let mut a = animator();
        a.fade_to(AnimationState::Walk, 0.2);
        let id = a.play_once(AnimationState::Praying).unwrap();
        assert!(a.finish(id));
        assert!(!a.is_locked());
        assert_eq!(a.active_state(), Some(AnimationState::Idle));
    }

    #[test]
    fn duplicate_completion_is_ignored() {
        let mut a = animator();
        let first = a.play_once(AnimationState::Jump).unwrap();
        assert!(a.finish(first));
        let second = a.play_once(AnimationState::Jump).unwrap();
        // A repeated signal from the first invocation must not end the second.
        assert!(!a.finish(first));
        assert!(a.is_locked());
        assert!(a.finish(second));
        assert!(!a.finish(second));
    }

    #[test]
    fn advance_completes_timed_clip() {
        let mut a = animator();
        a.play_once(AnimationState::Jump).unwrap();
        a.advance(0.6);
        assert!(a.is_locked());
        a.advance(0.6);
        assert!(!a.is_locked());
        assert_eq!(a.active_state(), Some(AnimationState::Idle));
    }

    #[test]
    fn reset_makes_pending_completion_stale() {
        let mut a = animator();
        let id = a.play_once(AnimationState::Jump).unwrap();
        a.reset();
        assert!(!a.finish(id));
        assert_eq!(a.drain_commands(), vec![AnimationCommand::StopAll]);
    }

    #[test]
    fn parses_state_names() {
        assert_eq!("praying".parse::<AnimationState>(), Ok(AnimationState::Praying));
        assert!("dance".parse::<AnimationState>().is_err());
    }
}
