//! Core presence types shared across all modules.

use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};

// ---------------------------------------------------------------------------
// Basic math
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// A point on the ground plane.
    pub fn ground(x: f32, z: f32) -> Self {
        Self::new(x, 0.0, z)
    }

    pub fn add(self, other: Vec3) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn sub(self, other: Vec3) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn scale(self, s: f32) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }

    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    pub fn distance(self, other: Vec3) -> f32 {
        self.sub(other).length()
    }

    /// Unit vector, or zero when the input is degenerate.
    pub fn normalized(self) -> Self {
        let len = self.length();
        if len.is_finite() && len > f32::EPSILON {
            self.scale(1.0 / len)
        } else {
            Self::zero()
        }
    }

    /// Moves `self` a fraction `t` of the way toward `target`.
    pub fn lerp(self, target: Vec3, t: f32) -> Self {
        self.add(target.sub(self).scale(t))
    }
}

impl std::fmt::Display for Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// Angles
// ---------------------------------------------------------------------------

/// Wraps an angle into `(-PI, PI]`.
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

/// Signed shortest rotation from `from` to `to`, in `(-PI, PI]`.
pub fn shortest_angle_delta(from: f32, to: f32) -> f32 {
    wrap_angle(to - from)
}

/// Interpolates `from` toward `to` along the shortest arc.
///
/// Never rotates the long way around: going from `3.0` to `-3.0` crosses
/// the `±PI` seam.
pub fn lerp_angle(from: f32, to: f32, t: f32) -> f32 {
    wrap_angle(from + shortest_angle_delta(from, to) * t)
}

/// Yaw of a ground-plane direction, measured from +Z toward +X.
pub fn yaw_of(direction: Vec3) -> f32 {
    direction.x.atan2(direction.z)
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Local movement per tick (world units) at tick scale 1.
    pub move_speed: f32,
    /// Symmetric bound applied independently to x and z.
    pub world_limit: f32,
    /// Per-tick blend toward interpolation targets (position and facing).
    pub blend: f32,
    /// Residual distance above which a remote entity is considered walking.
    pub moving_threshold: f32,
    /// Outbound position change that warrants a send.
    pub position_epsilon: f32,
    /// Outbound facing change (radians) that warrants a send.
    pub facing_epsilon: f32,
    /// Crossfade duration into locomotion states (seconds).
    pub motion_fade: f32,
    /// Crossfade duration back to idle (seconds).
    pub idle_fade: f32,
    /// Delay before a chat bubble starts fading (seconds).
    pub bubble_fade_delay: f32,
    /// Delay between fade start and detach (seconds).
    pub bubble_detach_delay: f32,
    /// Maximum chat log entries kept (oldest evicted first).
    pub chat_capacity: usize,
    /// Seconds a chat log entry stays before it starts fading.
    pub chat_expiry: f32,
    /// Maximum characters accepted for an outgoing chat line.
    pub chat_max_len: usize,
    /// Local locomotion is suspended while a one-shot action plays.
    pub freeze_motion_during_actions: bool,
    /// When set, speed and blend factors are normalised to this tick rate
    /// (Hz) using the elapsed `dt`. Unset keeps per-tick behaviour.
    pub reference_rate: Option<f32>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            move_speed: 0.04,
            world_limit: 18.5,
            blend: 0.15,
            moving_threshold: 0.05,
            position_epsilon: 0.01,
            facing_epsilon: 0.01,
            motion_fade: 0.2,
            idle_fade: 0.5,
            bubble_fade_delay: 5.0,
            bubble_detach_delay: 0.5,
            chat_capacity: 50,
            chat_expiry: 8.0,
            chat_max_len: 100,
            freeze_motion_during_actions: true,
            reference_rate: None,
        }
    }
}

impl ClientConfig {
    /// Multiplier applied to per-tick quantities for a tick of `dt` seconds.
    pub fn tick_scale(&self, dt: f32) -> f32 {
        match self.reference_rate {
            Some(rate) if dt > 0.0 => dt * rate,
            _ => 1.0,
        }
    }

    /// Blend factor for a tick of `dt` seconds.
    pub fn blend_for(&self, dt: f32) -> f32 {
        match self.reference_rate {
            Some(_) => 1.0 - (1.0 - self.blend).powf(self.tick_scale(dt)),
            None => self.blend,
        }
    }
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PresenceStats {
    pub remote_entities: usize,
    pub total_ticks: u64,
    pub messages_applied: u64,
    /// Malformed frames.
    pub messages_dropped: u64,
    /// Well-formed but inapplicable: own id, chat or leave for an unknown id.
    pub messages_ignored: u64,
    pub moves_sent: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_angle_stays_in_range() {
        for a in [-10.0f32, -PI, -1.0, 0.0, 1.0, PI, 7.0] {
            let w = wrap_angle(a);
            assert!(w > -PI - 1e-5 && w <= PI + 1e-5, "{a} wrapped to {w}");
        }
    }

    #[test]
    fn shortest_delta_crosses_seam() {
        let d = shortest_angle_delta(3.0, -3.0);
        assert!((d - (TAU - 6.0)).abs() < 1e-4);
    }

    #[test]
    fn lerp_toward_same_angle_is_stable() {
        assert!((lerp_angle(1.0, 1.0, 0.15) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn normalized_zero_is_zero() {
        assert_eq!(Vec3::zero().normalized(), Vec3::zero());
    }

    #[test]
    fn per_tick_blend_ignores_dt_by_default() {
        let c = ClientConfig::default();
        assert_eq!(c.tick_scale(0.5), 1.0);
        assert_eq!(c.blend_for(0.5), 0.15);
    }

    #[test]
    fn reference_rate_normalises_blend() {
        let c = ClientConfig {
            reference_rate: Some(60.0),
            ..Default::default()
        };
        // One reference tick reproduces the per-tick blend.
        assert!((c.blend_for(1.0 / 60.0) - 0.15).abs() < 1e-5);
        // Two reference ticks compound it.
        let two = 1.0 - 0.85f32 * 0.85;
        assert!((c.blend_for(2.0 / 60.0) - two).abs() < 1e-5);
    }
}
