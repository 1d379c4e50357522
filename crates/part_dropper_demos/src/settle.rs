//! A stand-in for host physics: parts fall straight down and stack in a coarse height grid.
use std::collections::HashMap;

use glam::{IVec2, Vec2, Vec3};
use part_dropper::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::DemoConfig;

fn rand01(rng: &mut dyn Rng) -> f32 {
    (rng.next_u32() as f32) / ((u32::MAX as f32) + 1.0)
}

pub struct SettleSim {
    rng: StdRng,
    fall_speed: f32,
    /// Horizontal half extent parts may drift within.
    half_extent: Vec2,
    floor: f32,
    part_size: Vec3,
    part_min_z: f32,
    cell: f32,
    heights: HashMap<IVec2, f32>,
    resting: HashMap<NodePath, Vec3>,
}

impl SettleSim {
    pub fn new(container: &Container, part: &Part, scale: f32, config: &DemoConfig) -> Self {
        let container_size = container.size();
        let part_size = part.size() * scale;
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            fall_speed: config.fall_speed,
            half_extent: (container_size.truncate() - part_size.truncate()).max(Vec2::ZERO) * 0.5,
            floor: config.drop.ground_level,
            part_size,
            part_min_z: part.asset.bounds().min.z * scale,
            cell: part_size.x.max(part_size.y).max(f32::EPSILON),
            heights: HashMap::new(),
            resting: HashMap::new(),
        }
    }

    /// Number of parts that came to rest.
    pub fn resting_count(&self) -> usize {
        self.resting.len()
    }

    /// Moves every falling part under `parts` by one tick of `dt_ms`.
    pub fn step(
        &mut self,
        scene: &mut MemoryScene,
        parts: &NodePath,
        dt_ms: u64,
    ) -> part_dropper::error::Result<()> {
        let drop = self.fall_speed * dt_ms as f32 / 1000.0;
        for path in scene.children(parts)? {
            if self.resting.contains_key(&path) {
                continue;
            }
            let Some(node) = scene.node(&path) else {
                continue;
            };
            let mut t = node.translation;
            let drift = Vec2::new(rand01(&mut self.rng) - 0.5, rand01(&mut self.rng) - 0.5);
            let xy = (t.truncate() + drift * self.cell * 0.1)
                .clamp(-self.half_extent, self.half_extent);
            t.x = xy.x;
            t.y = xy.y;

            let key = (xy / self.cell).floor().as_ivec2();
            let support = self.heights.get(&key).copied().unwrap_or(self.floor);
            let rest_z = support - self.part_min_z;
            t.z -= drop;
            if t.z <= rest_z {
                t.z = rest_z;
                self.heights.insert(key, support + self.part_size.z);
                self.resting.insert(path.clone(), t);
            }
            scene.set_translation(&path, t)?;
        }
        Ok(())
    }
}
