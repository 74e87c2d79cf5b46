//! Presence session – the tick-driven root of the client.
//!
//! ## Tick order
//!
//! ```text
//! advance(dt, input)
//!   1. drain inbox          → dispatch join/move/leave/chat
//!   2. local motion         → position, facing, walk/idle
//!   3. remote interpolation → positions, facings, walk/idle
//!   4. animators, bubbles, chat log age by dt
//!   5. collect animation/overlay output into the event queue
//! ```
//!
//! Inbound frames are only ever applied in step 1, so a message that arrives
//! mid-tick is observed by the next tick. Outbound `move` snapshots are pulled
//! by the caller at its own cadence through [`PresenceSession::sync_outbound`].

use crate::animation::{AnimationCommand, AnimationState, ClipLibrary, PlaybackId};
use crate::chat::{display_name, ChatEntry, ChatLog};
use crate::entity::{ControlSource, Entity};
use crate::motion::{InputSnapshot, LocalMotionController, MotionOutcome};
use crate::overlay::OverlayEvent;
use crate::protocol::{Message, MoveUpdate};
use crate::remote::{Released, RemoteEntityStore};
use crate::sync::{OutboundGate, SyncSnapshot};
use crate::types::{ClientConfig, PresenceStats};
use serde::Serialize;
use std::collections::VecDeque;

/// Sender name the local chat log uses for this client.
pub const LOCAL_SENDER: &str = "Me";

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Everything UI and render layers need to react to.
#[derive(Debug, Clone, PartialEq)]
pub enum PresenceEvent {
    EntityAdded { id: String },
    EntityRemoved { id: String },
    ChatReceived { id: String, text: String },
    Overlay { id: String, event: OverlayEvent },
    Animation { id: String, command: AnimationCommand },
}

#[derive(Debug, Clone)]
enum Inbound {
    Frame(String),
    Message(Message),
}

/// Read-only view of an entity for logging and tools.
#[derive(Debug, Clone, Serialize)]
pub struct EntityView {
    pub id: String,
    pub x: f32,
    pub z: f32,
    pub facing: f32,
    pub action: &'static str,
    pub locked: bool,
}

impl From<&Entity> for EntityView {
    fn from(e: &Entity) -> Self {
        Self {
            id: e.id.clone(),
            x: e.position.x,
            z: e.position.z,
            facing: e.facing,
            action: e.animator.active_name(),
            locked: e.animator.is_locked(),
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

pub struct PresenceSession {
    config: ClientConfig,
    local: Entity,
    remotes: RemoteEntityStore,
    motion: LocalMotionController,
    gate: OutboundGate,
    chat: ChatLog,
    inbox: VecDeque<Inbound>,
    outbox: VecDeque<Message>,
    events: VecDeque<PresenceEvent>,
    clock: f64,
    stats: PresenceStats,
}

impl PresenceSession {
    /// A session whose entities use the standard clip lengths, so one-shots
    /// complete on their own timer.
    pub fn new(local_id: impl Into<String>, config: ClientConfig) -> Self {
        Self::with_clips(local_id, config, ClipLibrary::standard())
    }

    /// A session whose entities start with `clips`. Clips registered without
    /// a length complete only through [`PresenceSession::finish_animation`].
    pub fn with_clips(local_id: impl Into<String>, config: ClientConfig, clips: ClipLibrary) -> Self {
        let local_id = local_id.into();
        Self {
            local: Entity::with_clips(local_id.clone(), ControlSource::Local, &config, clips.clone()),
            remotes: RemoteEntityStore::with_clips(local_id, config.clone(), clips),
            motion: LocalMotionController::new(config.clone()),
            gate: OutboundGate::new(&config),
            chat: ChatLog::new(config.chat_capacity, config.chat_expiry),
            inbox: VecDeque::new(),
            outbox: VecDeque::new(),
            events: VecDeque::new(),
            clock: 0.0,
            stats: PresenceStats::default(),
            config,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn local_id(&self) -> &str {
        &self.local.id
    }

    pub fn local(&self) -> &Entity {
        &self.local
    }

    pub fn remotes(&self) -> &RemoteEntityStore {
        &self.remotes
    }

    pub fn chat_log(&self) -> impl Iterator<Item = &ChatEntry> {
        self.chat.entries()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Session time in seconds (sum of every `dt` advanced).
    pub fn clock(&self) -> f64 {
        self.clock
    }

    pub fn stats(&self) -> PresenceStats {
        PresenceStats {
            remote_entities: self.remotes.len(),
            ..self.stats.clone()
        }
    }

    pub fn views(&self) -> Vec<EntityView> {
        let mut views = vec![EntityView::from(&self.local)];
        let mut ids: Vec<&str> = self.remotes.ids().collect();
        ids.sort_unstable();
        views.extend(ids.into_iter().filter_map(|id| self.remotes.get(id)).map(EntityView::from));
        views
    }

    // ------------------------------------------------------------------
    // Inbound
    // ------------------------------------------------------------------

    /// Queues a raw text frame for the next tick.
    pub fn enqueue_frame(&mut self, frame: impl Into<String>) {
        self.inbox.push_back(Inbound::Frame(frame.into()));
    }

    /// Queues a decoded message for the next tick.
    pub fn enqueue(&mut self, msg: Message) {
        self.inbox.push_back(Inbound::Message(msg));
    }

    pub fn pending_inbound(&self) -> usize {
        self.inbox.len()
    }

    /// Decodes and applies one frame immediately. Malformed frames are logged
    /// and dropped.
    pub fn handle_frame(&mut self, frame: &str) {
        match Message::decode(frame) {
            Ok(msg) => self.handle_message(msg),
            Err(e) => {
                self.stats.messages_dropped += 1;
                log::warn!("[session] dropping malformed frame: {}", e);
            }
        }
    }

    /// Applies one message immediately.
    pub fn handle_message(&mut self, msg: Message) {
        if msg.id() == self.local.id {
            self.stats.messages_ignored += 1;
            return;
        }

        match msg {
            Message::Leave { id } => {
                let Some(released) = self.remotes.remove_remote(&id) else {
                    log::debug!("[session] leave for unknown id {}", id);
                    self.stats.messages_ignored += 1;
                    return;
                };
                self.emit_release(released);
            }
            Message::Chat { id, text } => {
                if !self.apply_chat(id, text) {
                    self.stats.messages_ignored += 1;
                    return;
                }
            }
            Message::Join(update) | Message::Move(update) => self.apply_move(update),
        }
        self.stats.messages_applied += 1;
    }

    fn apply_chat(&mut self, id: String, text: String) -> bool {
        let now = self.clock;
        let Some(entity) = self.remotes.get_mut(&id) else {
            log::debug!("[session] chat from unknown id {} dropped", id);
            return false;
        };
        let overlay = entity.bubble.show(text.clone(), now);
        for event in overlay {
            self.events.push_back(PresenceEvent::Overlay {
                id: id.clone(),
                event,
            });
        }
        self.chat.push(display_name(&id), text.clone(), now);
        self.events.push_back(PresenceEvent::ChatReceived { id, text });
        true
    }

    fn apply_move(&mut self, update: MoveUpdate) {
        if self.remotes.add_remote(&update.id) {
            self.events.push_back(PresenceEvent::EntityAdded {
                id: update.id.clone(),
            });
        }
        if let Some((x, z)) = update.position() {
            self.remotes.set_target(&update.id, x, z, update.ry);
        }
        if let Some(action) = update.action() {
            if let Some(entity) = self.remotes.get_mut(&update.id) {
                entity.apply_action(action, &self.config);
            }
        }
    }

    fn emit_release(&mut self, released: Released) {
        let Released {
            id,
            overlay,
            animation,
        } = released;
        if let Some(event) = overlay {
            self.events.push_back(PresenceEvent::Overlay {
                id: id.clone(),
                event,
            });
        }
        for command in animation {
            self.events.push_back(PresenceEvent::Animation {
                id: id.clone(),
                command,
            });
        }
        self.events.push_back(PresenceEvent::EntityRemoved { id });
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// Runs one simulation tick of `dt` seconds.
    pub fn advance(&mut self, dt: f32, input: &InputSnapshot) -> MotionOutcome {
        while let Some(inbound) = self.inbox.pop_front() {
            match inbound {
                Inbound::Frame(frame) => self.handle_frame(&frame),
                Inbound::Message(msg) => self.handle_message(msg),
            }
        }

        let outcome = self.motion.step(&mut self.local, input, dt);
        self.local.animator.advance(dt);
        self.remotes.interpolate(dt);

        self.clock += f64::from(dt);
        let now = self.clock;

        let local_overlay = self.local.bubble.advance(now);
        self.push_overlay(self.local.id.clone(), local_overlay);
        let mut remote_overlay = Vec::new();
        for entity in self.remotes.iter_mut() {
            let events = entity.bubble.advance(now);
            if !events.is_empty() {
                remote_overlay.push((entity.id.clone(), events));
            }
        }
        for (id, events) in remote_overlay {
            self.push_overlay(id, events);
        }
        self.chat.advance(now);

        self.collect_animation();
        self.stats.total_ticks += 1;
        outcome
    }

    fn push_overlay(&mut self, id: String, events: Vec<OverlayEvent>) {
        for event in events {
            self.events.push_back(PresenceEvent::Overlay {
                id: id.clone(),
                event,
            });
        }
    }

    fn collect_animation(&mut self) {
        let local_id = self.local.id.clone();
        for command in self.local.animator.drain_commands() {
            self.events.push_back(PresenceEvent::Animation {
                id: local_id.clone(),
                command,
            });
        }
        for entity in self.remotes.iter_mut() {
            for command in entity.animator.drain_commands() {
                self.events.push_back(PresenceEvent::Animation {
                    id: entity.id.clone(),
                    command,
                });
            }
        }
    }

    // ------------------------------------------------------------------
    // Animation driver
    // ------------------------------------------------------------------

    /// Marks a clip as loaded on every entity, present and future.
    pub fn register_clip(&mut self, state: AnimationState, seconds: Option<f32>) {
        self.local.animator.register(state, seconds);
        self.remotes.register_clip(state, seconds);
    }

    /// Completion signal for a `PlayOnce` handed out for entity `id`.
    /// Unknown entities and stale playbacks return `false`.
    pub fn finish_animation(&mut self, id: &str, playback: PlaybackId) -> bool {
        if id == self.local.id {
            return self.local.animator.finish(playback);
        }
        self.remotes
            .get_mut(id)
            .is_some_and(|entity| entity.animator.finish(playback))
    }

    // ------------------------------------------------------------------
    // Local actions
    // ------------------------------------------------------------------

    /// Starts a one-shot action on the local entity.
    pub fn perform(&mut self, action: AnimationState) -> bool {
        self.local.animator.play_once(action).is_some()
    }

    /// Sends a chat line and shows it locally. Empty lines are ignored.
    pub fn say(&mut self, text: &str) -> bool {
        let text: String = text.trim().chars().take(self.config.chat_max_len).collect();
        if text.is_empty() {
            return false;
        }
        self.outbox
            .push_back(Message::chat(self.local.id.clone(), text.clone()));
        self.chat.push(LOCAL_SENDER, text.clone(), self.clock);
        let events = self.local.bubble.show(text, self.clock);
        self.push_overlay(self.local.id.clone(), events);
        true
    }

    // ------------------------------------------------------------------
    // Outbound
    // ------------------------------------------------------------------

    /// Current publishable state of the local entity.
    pub fn local_snapshot(&self) -> SyncSnapshot {
        SyncSnapshot {
            position: self.local.position,
            facing: self.local.facing,
            action: self.local.animator.active_name().to_string(),
        }
    }

    /// The `move` to publish now, if the local entity changed enough.
    pub fn sync_outbound(&mut self) -> Option<Message> {
        let snapshot = self.local_snapshot();
        let msg = self.gate.evaluate(&self.local.id, snapshot)?;
        self.stats.moves_sent += 1;
        Some(msg)
    }

    /// Messages that bypass change detection (chat).
    pub fn drain_outbox(&mut self) -> Vec<Message> {
        self.outbox.drain(..).collect()
    }

    pub fn drain_events(&mut self) -> Vec<PresenceEvent> {
        self.events.drain(..).collect()
    }

    /// Forgets every remote entity (called on disconnect).
    pub fn reset_remotes(&mut self) {
        for released in self.remotes.clear() {
            self.emit_release(released);
        }
        self.inbox.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_keeps_advancing_in_long_sessions() {
        let mut s = PresenceSession::new("me", ClientConfig::default());
        // Where an f32 clock stops absorbing a 60 Hz tick.
        s.clock = 524_288.0;
        let before = s.clock();
        s.advance(1.0 / 60.0, &InputSnapshot::default());
        assert!(s.clock() > before);
    }

    #[test]
    fn bubbles_expire_late_in_a_session() {
        let mut s = PresenceSession::new("me", ClientConfig::default());
        s.clock = 524_288.0;
        assert!(s.say("hi"));
        for _ in 0..(6 * 60) {
            s.advance(1.0 / 60.0, &InputSnapshot::default());
        }
        assert_eq!(s.local().bubble.text(), None);
        let detached = s
            .drain_events()
            .into_iter()
            .filter(|e| {
                matches!(
                    e,
                    PresenceEvent::Overlay {
                        event: OverlayEvent::Detached { .. },
                        ..
                    }
                )
            })
            .count();
        assert_eq!(detached, 1);
    }
}
