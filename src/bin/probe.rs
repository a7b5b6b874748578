//! voxel-compat-probe binary
//!
//! Resolves a host build signature, bootstraps the capability registry
//! against the in-memory host and prints the capability report as JSON.
//! With `--demo-path` it also walks a hidden entity on a tick loop.
//!
//! ## Configuration (env / TOML via `config` crate)
//!
//! | Key                          | Default        | Description                       |
//! |------------------------------|----------------|-----------------------------------|
//! | `COMPAT_SIGNATURE`           | (required)     | Host build signature              |
//! | `COMPAT_PROTOCOL`            | newest shipped | Client protocol the host speaks   |
//! | `COMPAT_TICK_RATE_HZ`        | `20`           | Demo tick rate, (0, 1000]         |
//! | `COMPAT_GOAL_PRIORITY`       | `2`            | Steering goal priority            |
//! | `COMPAT_ENTITY_HEALTH`       | `2.518`        | Hidden entity health              |
//! | `COMPAT_ARRIVAL_RADIUS`      | `1.0`          | Arrival distance (blocks)         |
//! | `COMPAT_HIDDEN_ENTITY_KIND`  | `pig`          | Hidden entity kind                |
//! | `COMPAT_GLOW_ENCHANTMENT_ID` | `152634`       | Numeric glow id (pre-1.13)        |
//! | `COMPAT_GLOW_NAMESPACE`      | `voxel_compat` | Glow key namespace (1.13+)        |

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Instrument;
use voxel_compat::{
    host::{HostServer, Location, Observer},
    mock::MemoryHost,
    particle::ParticleSpec,
    registry::CapabilityStatus,
    Compat, CompatConfig, PathRequest, Vec3,
};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "voxel-compat-probe",
    about = "Inspect voxel-compat capability support for a host revision",
    version
)]
struct Args {
    /// Host build signature, e.g. org.bukkit.craftbukkit.v1_16_R3
    #[arg(long, env = "COMPAT_SIGNATURE")]
    signature: String,

    /// Optional TOML file with compat settings
    #[arg(long, env = "COMPAT_CONFIG")]
    config: Option<PathBuf>,

    /// Walk a hidden entity this many blocks along +X
    #[arg(long)]
    demo_path: Option<f64>,

    /// Client protocol the host speaks; defaults to the newest shipped
    /// for the signature's revision
    #[arg(long, env = "COMPAT_PROTOCOL")]
    protocol: Option<i32>,

    /// Tick rate (Hz) for the demo
    #[arg(long, env = "COMPAT_TICK_RATE_HZ", default_value_t = 20.0, value_parser = parse_tick_rate)]
    tick_rate_hz: f32,
}

/// Ticks per second: finite, positive and at most 1000.
fn parse_tick_rate(raw: &str) -> std::result::Result<f32, String> {
    let hz: f32 = raw
        .parse()
        .map_err(|e| format!("'{}' is not a number: {}", raw, e))?;
    if !hz.is_finite() || hz <= 0.0 || hz > 1000.0 {
        return Err(format!("tick rate must be in (0, 1000], got {}", hz));
    }
    Ok(hz)
}

#[derive(Serialize)]
struct ProbeReport<'a> {
    signature: &'a str,
    version: &'a str,
    protocol: i32,
    capabilities: &'a [CapabilityStatus],
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialise logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("voxel_compat=debug".parse()?),
        )
        .init();

    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    let mut host = MemoryHost::new(args.signature.clone());
    if let Some(protocol) = args.protocol {
        host = host.with_protocol(protocol);
    }
    let host = Arc::new(host);
    let compat = Compat::bootstrap(host.clone(), config)
        .with_context(|| format!("bootstrapping for signature '{}'", args.signature))?;

    let report = ProbeReport {
        signature: &args.signature,
        version: compat.version().as_str(),
        protocol: host.protocol_version(),
        capabilities: compat.report(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    if let Some(distance) = args.demo_path {
        let span = tracing::info_span!("demo_path", version = %compat.version(), distance);
        run_demo(&compat, &host, distance, args.tick_rate_hz)
            .instrument(span)
            .await?;
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<CompatConfig> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path).required(true));
    }
    let settings = builder
        .add_source(config::Environment::with_prefix("COMPAT").try_parsing(true))
        .build()
        .context("loading compat configuration")?;
    settings
        .try_deserialize()
        .context("invalid compat configuration")
}

// ---------------------------------------------------------------------------
// Demo
// ---------------------------------------------------------------------------

async fn run_demo(
    compat: &Compat,
    host: &Arc<MemoryHost>,
    distance: f64,
    tick_hz: f32,
) -> Result<()> {
    let world = host.create_world("probe");
    let watcher = host.connect();

    let start = Vec3::new(0.0, 64.0, 0.0);
    let end = Vec3::new(distance, 64.0, 0.0);
    let (done_tx, mut done_rx) = tokio::sync::oneshot::channel();

    let session = compat.start_path(
        PathRequest::new()
            .start(Location::new(world.clone(), start))
            .end(end)
            .speed(1.0)
            .on_step(|mob| log::debug!("Entity {} at {}", mob.id(), mob.position()))
            .on_complete(move |mob| {
                let _ = done_tx.send(mob.position());
            }),
    )?;
    log::info!(
        "Demo session on entity {} ({} observer(s) online)",
        session.entity_id(),
        host.online_observers().len()
    );

    let interval = std::time::Duration::from_secs_f32(1.0 / tick_hz);
    let mut timer = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = timer.tick() => world.tick(),
            arrived = &mut done_rx => {
                let at = arrived.context("session ended without completing")?;
                log::info!("Arrived at {}", at);
                compat.play_particle(watcher.as_ref() as &dyn Observer, at, &ParticleSpec::new("HEART").count(3))?;
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("Demo interrupted (SIGINT)");
                session.cancel();
                break;
            }
        }
    }

    log::info!(
        "Demo finished in phase {:?}; observer {:?} received {} packet(s)",
        session.phase(),
        watcher.id(),
        watcher.packets().len()
    );
    Ok(())
}
