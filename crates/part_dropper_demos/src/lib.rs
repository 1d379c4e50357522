#![forbid(unsafe_code)]

mod settle;

use std::path::{Path, PathBuf};

use anyhow::Context;
use glam::Vec3;
use part_dropper::prelude::*;
use serde::Deserialize;

pub use settle::SettleSim;

/// Routes `log` records, and `tracing` events through its `log` bridge, to stderr.
///
/// Verbosity follows `RUST_LOG` and defaults to `info`.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}

/// An asset file stand-in for the in-memory scene: a path plus the box its root reports.
#[derive(Debug, Clone, Deserialize)]
pub struct DemoAsset {
    pub path: PathBuf,
    pub min: Vec3,
    pub size: Vec3,
}

impl DemoAsset {
    pub fn bounds(&self) -> Bounds3 {
        Bounds3::from_min_size(self.min, self.size)
    }
}

/// Settings read from a demo RON file.
#[derive(Debug, Clone, Deserialize)]
pub struct DemoConfig {
    #[serde(default)]
    pub drop: DropConfig,
    pub container: DemoAsset,
    pub part: DemoAsset,
    /// Simulated time between host ticks.
    pub tick_ms: u64,
    /// Ticks after which the demo gives up.
    pub max_ticks: u64,
    /// Downward speed of falling parts, in scene units per second.
    pub fall_speed: f32,
    pub seed: u64,
    pub output: PathBuf,
}

impl DemoConfig {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("reading demo config '{}'", path.display()))?;
        let config: DemoConfig = ron::de::from_bytes(&bytes).map_err(|e| anyhow::anyhow!(e))?;
        config.drop.validate()?;
        Ok(config)
    }

    /// Loads the file named by the first CLI argument, or `default_asset` under `assets/`.
    pub fn from_args(default_asset: &str) -> anyhow::Result<Self> {
        let path = std::env::args().nth(1).map(PathBuf::from).unwrap_or_else(|| {
            PathBuf::from(format!(
                "{}/assets/{}",
                env!("CARGO_MANIFEST_DIR"),
                default_asset
            ))
        });
        Self::load(path)
    }

    /// An in-memory scene that knows the configured assets.
    pub fn scene(&self) -> MemoryScene {
        MemoryScene::new()
            .with_asset(self.container.path.clone(), self.container.bounds())
            .with_asset(self.part.path.clone(), self.part.bounds())
    }
}

/// Binds a fresh scene, authors the environment and assigns both assets.
pub fn prepare<E: EventSink>(
    dropper: &mut PartDropper<MemoryScene, E>,
    config: &DemoConfig,
) -> anyhow::Result<()> {
    dropper.set_primary_scene(config.scene());
    dropper.create_scene()?;
    dropper
        .set_container_asset(config.container.path.clone())
        .context("placing container")?;
    dropper
        .set_part_asset(config.part.path.clone())
        .context("assigning part")?;
    Ok(())
}

/// Runs a session to completion against the toy simulation.
///
/// Returns the number of parts in the container when the session ended.
pub fn run_session<E: EventSink>(
    dropper: &mut PartDropper<MemoryScene, E>,
    config: &DemoConfig,
) -> anyhow::Result<u32> {
    let container = dropper
        .container()
        .context("container must be placed before dropping")?
        .clone();
    let part = dropper
        .part()
        .context("part must be assigned before dropping")?
        .clone();
    let mut sim = SettleSim::new(&container, &part, dropper.part_scale_factor(), config);

    let mut now = 0;
    dropper.start_dropping(now)?;
    for _ in 0..config.max_ticks {
        now += config.tick_ms;
        let parts_path = dropper.config().layout.parts_path();
        if let Some(scene) = dropper.scene_mut() {
            sim.step(scene, &parts_path, config.tick_ms)?;
        }
        match dropper.update(now)? {
            UpdateResult::TargetReached { part_count } => return Ok(part_count),
            UpdateResult::Idle => return Ok(dropper.part_count()),
            UpdateResult::Dropping | UpdateResult::PartDropped { .. } => {}
        }
    }
    tracing::warn!(
        "Gave up after {} ticks with {} parts.",
        config.max_ticks,
        dropper.part_count()
    );
    dropper.stop_dropping();
    Ok(dropper.part_count())
}
