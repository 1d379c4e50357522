//! The drop controller.
use std::path::{Path, PathBuf};

use glam::Vec3;
use tracing::{debug, info, warn};

use crate::dropper::config::{validate_scale_factor, DropConfig, ReassignPolicy, SceneLayout};
use crate::dropper::events::{DropEvent, EventSink, StopReason};
use crate::dropper::export::{self, ExportSummary};
use crate::dropper::state::{DropSessionState, PartInstance, UpdateResult};
use crate::dropper::{Container, Part};
use crate::error::{Error, Result};
use crate::probe::AssetRef;
use crate::scene::{CollisionApproximation, NodeKind, NodePath, SceneAuthoring};

fn no_scene() -> Error {
    Error::invalid("no primary scene is bound")
}

/// Drops copies of a part into a container, one at a time, waiting for each to settle.
///
/// The controller is tick driven: the host binds a scene with
/// [`PartDropper::set_primary_scene`], configures assets, calls
/// [`PartDropper::start_dropping`] and then [`PartDropper::update`] once per frame.
/// Nothing blocks and nothing runs in the background; the only outside influence is the
/// host physics moving spawned parts between ticks.
pub struct PartDropper<S: SceneAuthoring, E: EventSink = ()> {
    config: DropConfig,
    scene: Option<S>,
    container: Option<Container>,
    part: Option<Part>,
    session: DropSessionState,
    sink: E,
}

impl<S: SceneAuthoring> PartDropper<S> {
    /// Creates a dropper without a bound scene.
    pub fn new(config: DropConfig) -> Self {
        debug_assert!(config.validate().is_ok(), "invalid drop configuration");
        Self {
            session: DropSessionState::new(&config),
            config,
            scene: None,
            container: None,
            part: None,
            sink: (),
        }
    }

    /// Like [`PartDropper::new`], but validates the configuration first.
    pub fn try_new(config: DropConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config))
    }
}

impl<S: SceneAuthoring, E: EventSink> PartDropper<S, E> {
    /// Replaces the event sink.
    pub fn with_event_sink<E2: EventSink>(self, sink: E2) -> PartDropper<S, E2> {
        PartDropper {
            config: self.config,
            scene: self.scene,
            container: self.container,
            part: self.part,
            session: self.session,
            sink,
        }
    }

    pub fn event_sink(&self) -> &E {
        &self.sink
    }

    pub fn event_sink_mut(&mut self) -> &mut E {
        &mut self.sink
    }

    /// Binds the primary scene and returns the previously bound one.
    ///
    /// Container, part and session belong to the scene they were set up in, so binding a
    /// scene returns the dropper to its initial configuration.
    pub fn set_primary_scene(&mut self, scene: S) -> Option<S> {
        let previous = self.scene.replace(scene);
        if previous.is_some() {
            info!("Primary scene rebound; drop setup reset.");
        }
        self.forget_setup();
        previous
    }

    /// Unbinds and returns the primary scene, resetting the dropper.
    pub fn take_scene(&mut self) -> Option<S> {
        self.forget_setup();
        self.scene.take()
    }

    pub fn scene(&self) -> Option<&S> {
        self.scene.as_ref()
    }

    /// Mutable access to the bound scene, for the host's simulation.
    pub fn scene_mut(&mut self) -> Option<&mut S> {
        self.scene.as_mut()
    }

    pub fn config(&self) -> &DropConfig {
        &self.config
    }

    pub fn session(&self) -> &DropSessionState {
        &self.session
    }

    pub fn container(&self) -> Option<&Container> {
        self.container.as_ref()
    }

    pub fn part(&self) -> Option<&Part> {
        self.part.as_ref()
    }

    pub fn has_container(&self) -> bool {
        self.container.is_some()
    }

    pub fn has_part(&self) -> bool {
        self.part.is_some()
    }

    pub fn container_size(&self) -> Option<Vec3> {
        self.container.as_ref().map(Container::size)
    }

    pub fn part_size(&self) -> Option<Vec3> {
        self.part.as_ref().map(Part::size)
    }

    pub fn part_scale_factor(&self) -> f32 {
        self.config.part_scale_factor
    }

    pub fn part_count(&self) -> u32 {
        self.session.part_count
    }

    pub fn target_part_count(&self) -> u32 {
        self.session.target_part_count
    }

    pub fn is_dropping(&self) -> bool {
        self.session.is_dropping
    }

    /// The most recently spawned instance, still being watched.
    pub fn current_instance(&self) -> Option<&PartInstance> {
        self.session.current.as_ref()
    }

    /// Authors the scene-wide setup: up axis, light, physics scene and ground plane.
    pub fn create_scene(&mut self) -> Result<()> {
        let scene = self.scene.as_mut().ok_or_else(no_scene)?;
        let setup = &self.config.setup;
        let layout = &self.config.layout;
        setup.validate()?;

        scene.set_up_axis(setup.up_axis)?;

        let light = layout.light_path();
        scene.remove_subtree(&light)?;
        scene.define_sphere_light(&light, &setup.light)?;

        scene.define_physics_scene(&layout.physics_scene_path(), &setup.physics)?;

        let ground = layout.ground_plane_path();
        scene.remove_subtree(&ground)?;
        scene.add_ground_plane(&ground, &setup.ground)?;

        info!(
            "Scene created: up axis {:?}, gravity {} along {:?}.",
            setup.up_axis, setup.physics.gravity_magnitude, setup.physics.gravity_direction
        );
        Ok(())
    }

    /// Assigns the container asset and places it in the scene.
    ///
    /// The asset is probed first; if that fails nothing changes. Existing part instances are
    /// then cleared and, if a part is configured, one is re-seeded. If the new container cannot
    /// be placed, the previous one is placed again; should that fail too, no container remains.
    pub fn set_container_asset(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        let scene = self.scene.as_ref().ok_or_else(no_scene)?;
        let asset = AssetRef::probe(scene, path)?;
        self.reseed(|this| this.replace_container(asset))
    }

    /// Assigns the part asset.
    ///
    /// Existing part instances are cleared before the new part takes effect; one is re-seeded
    /// if a container is present.
    pub fn set_part_asset(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        let scene = self.scene.as_ref().ok_or_else(no_scene)?;
        let asset = AssetRef::probe(scene, path)?;
        self.reseed(|this| {
            info!(
                "Part '{}' assigned | size: {:?}.",
                asset.path().display(),
                asset.size()
            );
            this.part = Some(Part { asset });
            Ok(())
        })
    }

    /// Sets the uniform scale of spawned parts. Clears and re-seeds instances.
    pub fn set_part_scale_factor(&mut self, value: f32) -> Result<()> {
        validate_scale_factor(value)?;
        self.reseed(|this| {
            this.config.part_scale_factor = value;
            Ok(())
        })
    }

    /// Sets the count at which a session stops by itself.
    pub fn set_target_count(&mut self, count: i64) -> Result<()> {
        let count = u32::try_from(count)
            .map_err(|_| Error::invalid(format!("target count must be >= 0, got {count}")))?;
        self.config.target_part_count = count;
        self.session.target_part_count = count;
        Ok(())
    }

    /// Clears existing instances, spawns the first part and starts watching it.
    ///
    /// `now_ms` is the host clock, the same one later passed to [`PartDropper::update`]; the
    /// first poll happens once a full drop interval has passed since the start.
    pub fn start_dropping(&mut self, now_ms: u64) -> Result<()> {
        if self.scene.is_none() {
            return Err(no_scene());
        }
        if self.container.is_none() || self.part.is_none() {
            return Err(Error::invalid(
                "container and part must be configured before dropping",
            ));
        }
        self.remove_instances()?;
        self.spawn_part_instance()?;
        self.session.is_dropping = true;
        self.session.last_drop_time_ms = now_ms;

        info!(
            "Dropping started | target: {} parts, interval: {} ms, policy: {:?}.",
            self.session.target_part_count,
            self.session.drop_interval_ms,
            self.config.settle_policy
        );
        self.sink.send(DropEvent::SessionStarted {
            target_part_count: self.session.target_part_count,
        });
        Ok(())
    }

    /// Stops the session. Spawned instances and the part count are kept.
    pub fn stop_dropping(&mut self) {
        if !self.session.is_dropping {
            return;
        }
        self.session.is_dropping = false;
        info!("Dropping stopped after {} parts.", self.session.part_count);
        self.sink.send(DropEvent::SessionStopped {
            part_count: self.session.part_count,
            reason: StopReason::Requested,
        });
    }

    /// Advances the session by one host tick.
    ///
    /// Polls the watched part at most once per drop interval. When the settle policy accepts
    /// the part, either the target is reached and the session stops, or the next part is
    /// spawned. Any adapter error stops the session before it is returned.
    pub fn update(&mut self, now_ms: u64) -> Result<UpdateResult> {
        if !self.session.is_dropping {
            return Ok(UpdateResult::Idle);
        }
        let Some(current) = self.session.current.as_ref() else {
            return Ok(UpdateResult::Idle);
        };

        let elapsed = now_ms.saturating_sub(self.session.last_drop_time_ms);
        if elapsed <= self.session.drop_interval_ms {
            return Ok(UpdateResult::Dropping);
        }

        let index = current.index;
        let last_observed = current.last_observed;
        let read = match self.scene.as_ref() {
            Some(scene) => scene.local_translation(&current.path).map(Vec3::from),
            None => Err(no_scene()),
        };
        self.session.last_drop_time_ms = now_ms;
        let translation = match read {
            Ok(t) => t,
            Err(e) => return Err(self.halt("poll", e)),
        };

        let displacement = translation.distance(last_observed);
        if let Some(current) = self.session.current.as_mut() {
            current.last_observed = translation;
        }
        let settled = self.config.settle_policy.is_settled(displacement);
        debug!(
            "Polled part {}: translation {:?}, displacement {:.3}, settled: {}.",
            index, translation, displacement, settled
        );
        self.sink.send(DropEvent::PartPolled {
            index,
            translation,
            displacement,
            settled,
        });

        if !settled {
            return Ok(UpdateResult::Dropping);
        }

        if self.session.target_reached() {
            self.session.is_dropping = false;
            let part_count = self.session.part_count;
            info!("Target reached: {} parts dropped.", part_count);
            self.sink.send(DropEvent::TargetReached { part_count });
            return Ok(UpdateResult::TargetReached { part_count });
        }

        match self.spawn_part_instance() {
            Ok(instance) => Ok(UpdateResult::PartDropped {
                index: instance.index,
            }),
            Err(e) => Err(self.halt("spawn", e)),
        }
    }

    /// Spawns the next part instance above the container and starts watching it.
    ///
    /// The part is centered horizontally on the drop axis and starts
    /// `(container height + spawn clearance) / scale` above the origin. The part count is
    /// only advanced once the adapter accepted every call.
    pub fn spawn_part_instance(&mut self) -> Result<PartInstance> {
        let scene = self.scene.as_mut().ok_or_else(no_scene)?;
        let (Some(container), Some(part)) = (self.container.as_ref(), self.part.as_ref()) else {
            return Err(Error::invalid(
                "container and part must be configured before spawning",
            ));
        };

        let index = self.session.part_count + 1;
        let scale = self.config.part_scale_factor;
        let mid = part.midpoint();
        let translation = Vec3::new(
            -mid.x,
            -mid.y,
            (container.size().z + self.config.spawn_clearance) / scale,
        );
        let parts = self.config.layout.parts_path();
        let name = SceneLayout::part_name(index);

        let path = match author_part(
            scene,
            &parts,
            &name,
            part.asset.path(),
            translation,
            scale,
            self.config.part_collision,
        ) {
            Ok(path) => path,
            Err(e) => {
                let _ = scene.remove_subtree(&self.config.layout.part_path(index));
                return Err(e);
            }
        };

        let instance = PartInstance {
            index,
            path,
            last_observed: Vec3::ZERO,
        };
        self.session.part_count = index;
        self.session.current = Some(instance.clone());

        debug!(
            "Spawned part {} at {} | translation: {:?}, scale: {}.",
            index, instance.path, translation, scale
        );
        self.sink.send(DropEvent::PartSpawned {
            index,
            path: instance.path.clone(),
            translation,
            scale,
        });
        Ok(instance)
    }

    /// Removes every part instance from the scene and resets the session.
    ///
    /// A running session is stopped. The container is not affected.
    pub fn clear_part_instances(&mut self) -> Result<()> {
        let was_dropping = self.session.is_dropping;
        let part_count = self.session.part_count;
        self.remove_instances()?;
        if was_dropping {
            info!("Dropping stopped: instances cleared.");
            self.sink.send(DropEvent::SessionStopped {
                part_count,
                reason: StopReason::Cleared,
            });
        }
        Ok(())
    }

    /// Returns the dropper to its initial state, removing its nodes from the bound scene.
    pub fn reset(&mut self) -> Result<()> {
        if let Some(scene) = self.scene.as_mut() {
            scene.remove_subtree(&self.config.layout.parts_path())?;
            scene.remove_subtree(&self.config.layout.container_path())?;
        }
        self.forget_setup();
        Ok(())
    }

    /// Writes the container and all part instances, baked to world space, into a new scene
    /// file. Returns false on failure; see [`PartDropper::try_export_flattened_scene`].
    pub fn export_flattened_scene(&mut self, output: impl AsRef<Path>) -> bool {
        match self.try_export_flattened_scene(output) {
            Ok(_) => true,
            Err(e) => {
                warn!("Flattened export failed: {}.", e);
                self.sink.send(DropEvent::Warning {
                    context: "export".into(),
                    message: e.to_string(),
                });
                false
            }
        }
    }

    /// Fallible form of [`PartDropper::export_flattened_scene`].
    ///
    /// Any existing file at the (extension-normalized) path is overwritten. Only reads the
    /// primary scene.
    pub fn try_export_flattened_scene(&mut self, output: impl AsRef<Path>) -> Result<ExportSummary> {
        let output = output.as_ref();
        if output.as_os_str().is_empty() {
            return Err(Error::invalid("export path is empty"));
        }
        let scene = self.scene.as_mut().ok_or_else(no_scene)?;
        let container = self
            .container
            .as_ref()
            .ok_or_else(|| Error::invalid("no container is configured"))?;

        let path = export::normalize_scene_path(output, &self.config.export_extension);
        let summary = export::flatten_into(
            scene,
            &self.config.layout,
            container,
            self.part.as_ref(),
            &path,
        )?;

        info!(
            "Exported flattened scene to '{}' | parts: {}.",
            summary.path.display(),
            summary.part_count
        );
        self.sink.send(DropEvent::SceneExported {
            path: summary.path.clone(),
            part_count: summary.part_count,
        });
        Ok(summary)
    }

    fn remove_instances(&mut self) -> Result<u32> {
        let scene = self.scene.as_mut().ok_or_else(no_scene)?;
        scene.remove_subtree(&self.config.layout.parts_path())?;
        let removed = self.session.part_count;
        self.session = DropSessionState::new(&self.config);
        debug!("Cleared {} part instances.", removed);
        self.sink.send(DropEvent::InstancesCleared { removed });
        Ok(removed)
    }

    /// Places `asset` as the container, falling back to the previous container on failure.
    fn replace_container(&mut self, asset: AssetRef) -> Result<()> {
        let scene = self.scene.as_mut().ok_or_else(no_scene)?;
        let err = match place_container(scene, &self.config, asset) {
            Ok(container) => {
                self.commit_container(container);
                return Ok(());
            }
            Err(e) => e,
        };

        if let Some(previous) = self.container.take() {
            match place_container(scene, &self.config, previous.asset) {
                Ok(restored) => {
                    warn!("Container placement failed: {}; previous container restored.", err);
                    self.commit_container(restored);
                }
                Err(restore) => {
                    warn!(
                        "Container placement failed: {}; previous container lost: {}.",
                        err, restore
                    );
                }
            }
        }
        Err(err)
    }

    fn commit_container(&mut self, container: Container) {
        info!(
            "Container '{}' placed at {} | size: {:?}, offset: {:?}.",
            container.asset.path().display(),
            container.node,
            container.size(),
            container.offset
        );
        self.sink.send(DropEvent::ContainerPlaced {
            path: container.node.clone(),
            offset: container.offset,
            size: container.size(),
        });
        self.container = Some(container);
    }

    /// Applies a configuration change: clears instances, runs `commit`, then seeds one
    /// instance if possible. `commit` only runs once the instances are gone.
    fn reseed(&mut self, commit: impl FnOnce(&mut Self) -> Result<()>) -> Result<()> {
        if self.scene.is_none() {
            return commit(self);
        }
        let was_dropping = self.session.is_dropping;
        let part_count = self.session.part_count;
        let last_drop_time_ms = self.session.last_drop_time_ms;
        self.remove_instances()?;

        if let Err(e) = commit(self) {
            if was_dropping {
                self.sink.send(DropEvent::SessionStopped {
                    part_count,
                    reason: StopReason::Failed,
                });
            }
            return Err(e);
        }

        if self.container.is_some() && self.part.is_some() {
            if let Err(e) = self.spawn_part_instance() {
                if was_dropping {
                    self.sink.send(DropEvent::SessionStopped {
                        part_count,
                        reason: StopReason::Failed,
                    });
                }
                return Err(e);
            }
            if was_dropping && self.config.on_reassign == ReassignPolicy::KeepDropping {
                self.session.is_dropping = true;
                self.session.last_drop_time_ms = last_drop_time_ms;
                info!("Configuration changed; dropping continues on a new instance.");
                return Ok(());
            }
        }

        if was_dropping {
            info!("Dropping stopped: configuration changed.");
            self.sink.send(DropEvent::SessionStopped {
                part_count,
                reason: StopReason::Reassigned,
            });
        }
        Ok(())
    }

    fn forget_setup(&mut self) {
        if self.session.is_dropping {
            self.sink.send(DropEvent::SessionStopped {
                part_count: self.session.part_count,
                reason: StopReason::Reassigned,
            });
        }
        self.container = None;
        self.part = None;
        self.session = DropSessionState::new(&self.config);
    }

    fn halt(&mut self, context: &str, err: Error) -> Error {
        self.session.is_dropping = false;
        warn!(
            "Dropping halted during {} after {} parts: {}.",
            context, self.session.part_count, err
        );
        self.sink.send(DropEvent::Warning {
            context: context.to_owned(),
            message: err.to_string(),
        });
        self.sink.send(DropEvent::SessionStopped {
            part_count: self.session.part_count,
            reason: StopReason::Failed,
        });
        err
    }
}

fn place_container<S: SceneAuthoring>(
    scene: &mut S,
    config: &DropConfig,
    asset: AssetRef,
) -> Result<Container> {
    let path = config.layout.container_path();
    scene.remove_subtree(&path)?;

    let offset = Container::placement_offset(&asset, config.ground_level);
    let placed = scene
        .instantiate_reference(&config.layout.root, path.name(), asset.path(), NodeKind::Xform)
        .and_then(|node| {
            scene.set_local_transform(&node, offset.into(), None)?;
            scene.apply_collision(&node, config.container_collision)?;
            Ok(node)
        });
    match placed {
        Ok(node) => Ok(Container {
            asset,
            offset,
            node,
        }),
        Err(e) => {
            let _ = scene.remove_subtree(&path);
            Err(e)
        }
    }
}

fn author_part<S: SceneAuthoring>(
    scene: &mut S,
    parent: &NodePath,
    name: &str,
    asset: &Path,
    translation: Vec3,
    scale: f32,
    collision: CollisionApproximation,
) -> Result<NodePath> {
    let node = scene.instantiate_reference(parent, name, asset, NodeKind::Xform)?;
    scene.apply_collision(&node, collision)?;
    scene.apply_rigid_body(&node)?;
    scene.set_local_transform(&node, translation.into(), Some(Vec3::splat(scale).into()))?;
    Ok(node)
}
