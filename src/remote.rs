//! Remote entity store and per-tick interpolation.
//!
//! Remote entities are created lazily by inbound traffic and smoothed toward
//! the last transform received for them. The store is the only owner of
//! remote entity state.

use crate::animation::{AnimationCommand, AnimationState, ClipLibrary};
use crate::entity::{ControlSource, Entity, Target};
use crate::overlay::OverlayEvent;
use crate::types::{lerp_angle, ClientConfig, Vec3};
use std::collections::HashMap;

/// What a removal released, for the renderer to tear down.
#[derive(Debug, Clone, PartialEq)]
pub struct Released {
    pub id: String,
    pub overlay: Option<OverlayEvent>,
    pub animation: Vec<AnimationCommand>,
}

#[derive(Debug)]
pub struct RemoteEntityStore {
    local_id: String,
    config: ClientConfig,
    /// Clips every new remote entity starts with.
    clips: ClipLibrary,
    entities: HashMap<String, Entity>,
}

impl RemoteEntityStore {
    pub fn new(local_id: impl Into<String>, config: ClientConfig) -> Self {
        Self::with_clips(local_id, config, ClipLibrary::standard())
    }

    pub fn with_clips(local_id: impl Into<String>, config: ClientConfig, clips: ClipLibrary) -> Self {
        Self {
            local_id: local_id.into(),
            config,
            clips,
            entities: HashMap::new(),
        }
    }

    /// Marks a clip as loaded for every current and future remote entity.
    pub fn register_clip(&mut self, state: AnimationState, seconds: Option<f32>) {
        self.clips.insert(state, seconds);
        for entity in self.entities.values_mut() {
            entity.animator.register(state, seconds);
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Creates an entity for `id` if it is new. Returns whether one was created.
    pub fn add_remote(&mut self, id: &str) -> bool {
        if id == self.local_id || self.entities.contains_key(id) {
            return false;
        }
        log::debug!("[remote] adding {}", id);
        self.entities.insert(
            id.to_string(),
            Entity::with_clips(id, ControlSource::Remote, &self.config, self.clips.clone()),
        );
        true
    }

    /// Drops `id` and releases its bubble and animation playback.
    pub fn remove_remote(&mut self, id: &str) -> Option<Released> {
        let mut entity = self.entities.remove(id)?;
        log::debug!("[remote] removing {}", id);
        let overlay = entity.bubble.clear();
        entity.animator.reset();
        Some(Released {
            id: entity.id,
            overlay,
            animation: entity.animator.drain_commands(),
        })
    }

    /// Records the latest authoritative transform. `ry` only replaces the
    /// facing target when it was sent.
    /// Non-finite coordinates are refused.
    pub fn set_target(&mut self, id: &str, x: f32, z: f32, ry: Option<f32>) -> bool {
        if !(x.is_finite() && z.is_finite()) {
            return false;
        }
        let Some(entity) = self.entities.get_mut(id) else {
            return false;
        };
        let ry = ry.filter(|r| r.is_finite());
        let facing = ry.or(entity.target.and_then(|t| t.facing));
        entity.target = Some(Target {
            position: Vec3::ground(x, z),
            facing,
        });
        true
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// Smooths every targeted entity and advances all animators.
    pub fn interpolate(&mut self, dt: f32) {
        let blend = self.config.blend_for(dt);
        for entity in self.entities.values_mut() {
            if let Some(target) = entity.target {
                let residual = entity.position.distance(target.position);
                entity.position = entity.position.lerp(target.position, blend);
                if let Some(facing) = target.facing {
                    entity.facing = lerp_angle(entity.facing, facing, blend);
                }
                entity.apply_locomotion(residual > self.config.moving_threshold, &self.config);
            }
            entity.animator.advance(dt);
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn local_id(&self) -> &str {
        &self.local_id
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entities.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.values_mut()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Removes everything (called on disconnect).
    pub fn clear(&mut self) -> Vec<Released> {
        let ids: Vec<String> = self.entities.keys().cloned().collect();
        ids.iter().filter_map(|id| self.remove_remote(id)).collect()
    }
}
