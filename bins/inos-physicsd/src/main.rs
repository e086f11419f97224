//! Physics compute-unit daemon entry point — spec.md §4.5.
//!
//! Joins the shared-memory fabric the Supervisor created and runs the
//! batched ping-pong integration loop at the configured tick rate, forever.
//! Follows `bins/onyx`'s reader-process shape: attach to an
//! already-initialized shared region rather than creating one.

use inos_bridge::Bridge;
use inos_config::Config;
use inos_fabric::Fabric;
use inos_physics::PhysicsUnit;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "inos-physicsd.toml".to_string());
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

    let (fabric, standalone) = match &config.fabric.shm_file_path {
        Some(path) => (Fabric::open_file(path)?, false),
        None => {
            tracing::warn!(
                "no fabric.shm_file_path configured; running against a private anonymous fabric with no supervisor"
            );
            (Fabric::create_anon()?, true)
        }
    };
    let mut bridge = Bridge::new(fabric);

    if standalone {
        bridge.atomic_store(inos_fabric::layout::slot::KERNEL_READY, 1)?;
    } else {
        while !bridge.is_ready() {
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
    }

    let unit = PhysicsUnit::new(&mut bridge, config.physics.entity_capacity, config.physics.tick_hz);
    info!(
        tick_hz = config.physics.tick_hz,
        entity_capacity = config.physics.entity_capacity,
        "inos-physicsd attached, integration loop starting"
    );

    unit.run(&bridge, || false);
    Ok(())
}
