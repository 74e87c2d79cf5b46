//! presence-world-client binary
//!
//! Headless participant: joins a relay, mirrors remote entities, and
//! optionally wanders so other clients see it move.
//!
//! ## Configuration (CLI / env / TOML via `config` crate)
//!
//! | Key                          | Default                  | Description                     |
//! |------------------------------|--------------------------|---------------------------------|
//! | `PRESENCE_CONFIG`            | –                        | Optional TOML settings file     |
//! | `PRESENCE_ENDPOINT`          | `ws://localhost:3000/ws` | Relay WebSocket URL             |
//! | `PRESENCE_PARTICIPANT_ID`    | `user_<millis>`          | Identity announced in `join`    |
//! | `PRESENCE_TICK_RATE_HZ`      | `60`                     | Simulation tick rate            |
//! | `PRESENCE_SEND_RATE_HZ`      | `20`                     | Outbound `move` evaluation rate |
//! | `PRESENCE_WANDER`            | `false`                  | Walk a slow circle              |
//! | `PRESENCE_CLIENT__<FIELD>`   | see `ClientConfig`       | Motion / sync tuning            |

use anyhow::{Context, Result};
use clap::Parser;
use presence_world::{client::PresenceClient, settings::Settings};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "presence-world-client", about = "Presence World headless client", version)]
struct Args {
    /// TOML settings file
    #[arg(long, env = "PRESENCE_CONFIG")]
    config: Option<PathBuf>,

    /// Relay WebSocket URL
    #[arg(long, env = "PRESENCE_ENDPOINT")]
    endpoint: Option<String>,

    /// Participant ID
    #[arg(long, env = "PRESENCE_PARTICIPANT_ID")]
    participant_id: Option<String>,

    /// Tick rate (Hz)
    #[arg(long, env = "PRESENCE_TICK_RATE_HZ")]
    tick_rate_hz: Option<f32>,

    /// Outbound send rate (Hz)
    #[arg(long, env = "PRESENCE_SEND_RATE_HZ")]
    send_rate_hz: Option<f32>,

    /// Walk a slow circle
    #[arg(long, env = "PRESENCE_WANDER")]
    wander: bool,
}

fn generated_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("user_{}", millis % 100_000)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("presence_world=debug".parse()?),
        )
        .init();

    let args = Args::parse();
    let Settings {
        mut runtime,
        client,
    } = Settings::load(args.config.as_deref()).context("failed to load settings")?;

    if let Some(endpoint) = args.endpoint {
        runtime.endpoint = endpoint;
    }
    if let Some(id) = args.participant_id {
        runtime.participant_id = Some(id);
    }
    if let Some(hz) = args.tick_rate_hz {
        runtime.tick_rate_hz = hz;
    }
    if let Some(hz) = args.send_rate_hz {
        runtime.send_rate_hz = hz;
    }
    runtime.wander |= args.wander;

    let participant_id = runtime
        .participant_id
        .clone()
        .filter(|id| !id.is_empty())
        .unwrap_or_else(generated_id);

    log::info!(
        "Starting presence-world-client (id='{}', endpoint='{}', tick={}Hz, send={}Hz, wander={})",
        participant_id,
        runtime.endpoint,
        runtime.tick_rate_hz,
        runtime.send_rate_hz,
        runtime.wander,
    );

    PresenceClient::new(runtime, participant_id, client).run().await
}
