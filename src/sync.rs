//! Outbound synchronisation policy.
//!
//! The local entity is only published when it changed enough to matter. The
//! caller decides how often to ask ([`SendCadence`]); the [`OutboundGate`]
//! decides whether there is anything worth sending.

use crate::protocol::Message;
use crate::types::{ClientConfig, Vec3};
use std::time::{Duration, Instant};

/// What was (or would be) published for the local entity.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncSnapshot {
    pub position: Vec3,
    pub facing: f32,
    pub action: String,
}

impl Default for SyncSnapshot {
    fn default() -> Self {
        Self {
            position: Vec3::zero(),
            facing: 0.0,
            action: "idle".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutboundGate {
    position_epsilon: f32,
    facing_epsilon: f32,
    last_sent: SyncSnapshot,
}

impl OutboundGate {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            position_epsilon: config.position_epsilon,
            facing_epsilon: config.facing_epsilon,
            last_sent: SyncSnapshot::default(),
        }
    }

    pub fn last_sent(&self) -> &SyncSnapshot {
        &self.last_sent
    }

    /// True when any of position, facing or action moved past its threshold.
    pub fn has_changed(&self, current: &SyncSnapshot) -> bool {
        let moved = self.last_sent.position.distance(current.position) > self.position_epsilon;
        let turned = (self.last_sent.facing - current.facing).abs() > self.facing_epsilon;
        let acted = self.last_sent.action != current.action;
        moved || turned || acted
    }

    /// Returns the `move` to publish, recording it as sent.
    pub fn evaluate(&mut self, id: &str, current: SyncSnapshot) -> Option<Message> {
        if !self.has_changed(&current) {
            return None;
        }
        let msg = Message::movement(
            id,
            current.position.x,
            current.position.z,
            current.facing,
            &current.action,
        );
        self.last_sent = current;
        Some(msg)
    }
}

/// Caller-side rate cap for outbound evaluation.
#[derive(Debug, Clone)]
pub struct SendCadence {
    interval: Duration,
    last: Option<Instant>,
}

impl SendCadence {
    pub fn new(interval: Duration) -> Self {
        Self { interval, last: None }
    }

    pub fn from_hz(hz: f32) -> Self {
        Self::new(Duration::from_secs_f32(1.0 / hz.max(f32::EPSILON)))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// True at most once per interval.
    pub fn ready(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}
