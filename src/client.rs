//! `PresenceClient` – runtime loop around a [`PresenceSession`].
//!
//! ```text
//! tokio::select!
//!   tick interval   → session.advance(dt, input)
//!                     → send chat outbox, publish gated `move` at send cadence
//!                     → log presence events
//!   transport event → session.enqueue_frame(frame)   (applied next tick)
//!   ctrl-c          → send `leave`, stop
//! ```
//!
//! The session is only ever touched from this loop, so inbound frames never
//! interleave with a tick in progress.

use crate::animation::AnimationCommand;
use crate::motion::InputSnapshot;
use crate::protocol::Message;
use crate::session::{PresenceEvent, PresenceSession};
use crate::settings::RuntimeSettings;
use crate::sync::SendCadence;
use crate::transport::{self, TransportEvent, TransportHandle};
use crate::types::ClientConfig;
use anyhow::{Context, Result};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Angular speed of the wander circle (rad/s).
const WANDER_TURN_RATE: f64 = 0.5;

pub struct PresenceClient {
    settings: RuntimeSettings,
    session: PresenceSession,
}

impl PresenceClient {
    pub fn new(settings: RuntimeSettings, participant_id: String, config: ClientConfig) -> Self {
        Self {
            settings,
            session: PresenceSession::new(participant_id, config),
        }
    }

    pub fn session(&self) -> &PresenceSession {
        &self.session
    }

    /// Connects, runs until Ctrl-C or the connection closes.
    pub async fn run(mut self) -> Result<()> {
        let local_id = self.session.local_id().to_string();
        info!(
            endpoint = %self.settings.endpoint,
            id = %local_id,
            "presence client connecting"
        );

        let (transport, mut inbound) = transport::connect(&self.settings.endpoint, &local_id)
            .await
            .with_context(|| format!("failed to connect to {}", self.settings.endpoint))?;

        let tick_period = Duration::from_secs_f32(1.0 / self.settings.tick_rate_hz.max(1.0));
        let mut ticker = tokio::time::interval(tick_period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut cadence = SendCadence::from_hz(self.settings.send_rate_hz);
        let mut last_tick = Instant::now();
        let mut last_stats = Instant::now();

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = Instant::now();
                    let dt = now.duration_since(last_tick).as_secs_f32();
                    last_tick = now;
                    self.tick(dt, now, &mut cadence, &transport);

                    let every = self.settings.stats_interval_secs;
                    if every > 0 && now.duration_since(last_stats).as_secs() >= every {
                        last_stats = now;
                        let stats = self.session.stats();
                        info!(
                            remotes = stats.remote_entities,
                            ticks = stats.total_ticks,
                            applied = stats.messages_applied,
                            dropped = stats.messages_dropped,
                            sent = stats.moves_sent,
                            "presence stats"
                        );
                    }
                }
                event = inbound.recv() => match event {
                    Some(TransportEvent::Frame(frame)) => self.session.enqueue_frame(frame),
                    Some(TransportEvent::Closed { reason }) => {
                        warn!(%reason, "connection closed");
                        break;
                    }
                    None => {
                        warn!("transport event channel closed");
                        break;
                    }
                },
                _ = &mut shutdown => {
                    info!("presence client shutting down (SIGINT)");
                    transport.send(&Message::leave(local_id.clone()));
                    // Give the writer a moment to flush the leave.
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    break;
                }
            }
        }

        self.session.reset_remotes();
        self.log_events();
        Ok(())
    }

    fn tick(
        &mut self,
        dt: f32,
        now: Instant,
        cadence: &mut SendCadence,
        transport: &TransportHandle,
    ) {
        let input = if self.settings.wander {
            wander_input(self.session.clock())
        } else {
            InputSnapshot::default()
        };
        self.session.advance(dt, &input);

        for msg in self.session.drain_outbox() {
            transport.send(&msg);
        }
        if cadence.ready(now) {
            if let Some(msg) = self.session.sync_outbound() {
                transport.send(&msg);
            }
        }
        self.log_events();
    }

    fn log_events(&mut self) {
        for event in self.session.drain_events() {
            match event {
                PresenceEvent::EntityAdded { id } => info!(%id, "entity added"),
                PresenceEvent::EntityRemoved { id } => info!(%id, "entity removed"),
                PresenceEvent::ChatReceived { id, text } => info!(%id, %text, "chat"),
                PresenceEvent::Animation { id, command } => match command {
                    AnimationCommand::CrossFade { to, .. } => debug!(%id, state = %to, "crossfade"),
                    AnimationCommand::PlayOnce { state, .. } => debug!(%id, %state, "play once"),
                    AnimationCommand::StopAll => debug!(%id, "stop all"),
                },
                PresenceEvent::Overlay { id, event } => debug!(%id, ?event, "overlay"),
            }
        }
    }
}

/// Forward along a heading that turns slowly, tracing a circle.
fn wander_input(clock: f64) -> InputSnapshot {
    let yaw = (clock * WANDER_TURN_RATE).rem_euclid(std::f64::consts::TAU);
    InputSnapshot {
        forward: true,
        ..InputSnapshot::facing_yaw(yaw as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wander_moves_forward() {
        let input = wander_input(0.0);
        assert!(input.forward);
        assert!(!input.is_idle());
    }
}
