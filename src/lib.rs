//! Presence World
//!
//! Client-side presence layer for a shared 3D space: local movement,
//! smoothed remote avatars, animation state, and timed chat overlays kept in
//! sync over a broadcast relay.
//!
//! ## Architecture
//!
//! ```text
//! PresenceClient  (client.rs)          ← tick loop, ctrl-c, stats
//!   ├── transport  (transport.rs)      ← WebSocket reader / writer tasks
//!   └── PresenceSession  (session.rs)  ← tick order, event queue
//!         ├── LocalMotionController  (motion.rs)
//!         ├── RemoteEntityStore      (remote.rs)   ← interpolation
//!         ├── OutboundGate           (sync.rs)     ← change detection
//!         ├── ChatLog                (chat.rs)
//!         └── Entity                 (entity.rs)
//!               ├── Animator         (animation.rs)
//!               └── SpeechBubble     (overlay.rs)
//! ```
//!
//! Everything under `PresenceSession` is synchronous and driven by explicit
//! `dt`, so it runs the same under the tokio runtime, in a game loop, or in
//! a unit test.

// Simulation and wire types are always available.
pub mod animation;
pub mod chat;
pub mod entity;
pub mod motion;
pub mod overlay;
pub mod protocol;
pub mod remote;
pub mod session;
pub mod settings;
pub mod sync;
pub mod types;

// Networked runtime requires the `client` feature.
#[cfg(feature = "client")]
pub mod client;
#[cfg(feature = "client")]
pub mod transport;

pub use animation::{AnimationCommand, AnimationState, Animator, ClipLibrary, PlaybackId};
pub use chat::{ChatEntry, ChatLog};
pub use entity::{ControlSource, Entity};
pub use motion::{InputSnapshot, LocalMotionController, MotionOutcome};
pub use overlay::{OverlayEvent, OverlayId, SpeechBubble};
pub use protocol::{Message, MoveUpdate, ProtocolError};
pub use remote::RemoteEntityStore;
pub use session::{PresenceEvent, PresenceSession};
pub use settings::{RuntimeSettings, Settings};
pub use sync::{OutboundGate, SendCadence, SyncSnapshot};
pub use types::{ClientConfig, PresenceStats, Vec3};

#[cfg(feature = "client")]
pub use client::PresenceClient;
#[cfg(feature = "client")]
pub use transport::{TransportError, TransportEvent, TransportHandle};
