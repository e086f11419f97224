//! Supervisor daemon entry point — spec.md §4.2/§4.3.
//!
//! Boots the shared-memory fabric, mounts the Supervisor's rings over it,
//! joins the mesh as a single (initially peerless) node, and runs the
//! dispatch loop until killed. Follows `bins/obsidian`'s
//! config-load-then-`tracing_subscriber::fmt`-init shape.

use ed25519_dalek::SigningKey;
use inos_bridge::Bridge;
use inos_config::Config;
use inos_events::{JobEnvelope, UnitId};
use inos_fabric::Fabric;
use inos_mesh::{ChannelHub, MeshCoordinator};
use inos_supervisor::{dispatch::LocalExecutor, JobError, Supervisor};
use rand::rngs::OsRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Placeholder for the concrete unit-execution backend. A real deployment
/// registers units (spec.md §4.2's unit lifecycle) and wires this to
/// whatever actually executes a unit's `library`/`method` pair; nothing in
/// this daemon skeleton runs jobs locally until that's done.
struct UnwiredExecutor;

impl LocalExecutor for UnwiredExecutor {
    fn execute(&mut self, unit: &UnitId, _envelope: &JobEnvelope) -> Result<Vec<u8>, JobError> {
        Err(JobError::InvalidParams(format!(
            "unit '{}' is registered but no execution backend is wired up",
            unit.0
        )))
    }
}

fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "inos-supervisord.toml".to_string());
    let config = Config::load(&config_path).unwrap_or_else(|err| {
        eprintln!("no usable config at '{config_path}' ({err}), using defaults");
        toml::from_str("").expect("default config always parses")
    });

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .init();

    let fabric = match &config.fabric.shm_file_path {
        Some(path) => Fabric::create_file(path)?,
        None => Fabric::create_anon()?,
    };
    let bridge = Bridge::new(fabric);
    let mut supervisor = Supervisor::new(bridge, &config.supervisor);

    let local_id = inos_events::PeerId(1);
    let signing_key = SigningKey::generate(&mut OsRng);
    let mut hub = ChannelHub::new();
    let transport = hub.join(local_id);
    let mut mesh = MeshCoordinator::new(local_id, signing_key, &config.mesh, transport);

    supervisor.mark_ready()?;
    info!(config_path = %config_path, "inos-supervisord ready, dispatch loop starting");

    let mut executor = UnwiredExecutor;
    supervisor.run(&mut executor, &mut mesh, || false);

    Ok(())
}
