//! Геометрия арены: набор solid боксов (пол, платформы, стены, балки).
//!
//! Реализует `WorldProbe` — ground_below + ray cast (slab test с нормалью).

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ai::navigation::{ProbeHit, WorldProbe};

/// Axis-aligned solid бокс
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub min: Vec3,
    pub max: Vec3,
}

impl Block {
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn contains_xz(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Slab test; None если луч не пересекает бокс в [0, max_distance]
    pub fn ray_hit(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<ProbeHit> {
        let mut t_enter = 0.0f32;
        let mut t_exit = max_distance;
        let mut normal = Vec3::ZERO;

        for axis in 0..3 {
            let o = origin[axis];
            let d = direction[axis];
            let (lo, hi) = (self.min[axis], self.max[axis]);

            if d.abs() < 1e-8 {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / d;
            let (mut t0, mut t1) = ((lo - o) * inv, (hi - o) * inv);
            let mut axis_normal = Vec3::ZERO;
            axis_normal[axis] = -d.signum();
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            if t0 > t_enter {
                t_enter = t0;
                normal = axis_normal;
            }
            t_exit = t_exit.min(t1);
            if t_enter > t_exit {
                return None;
            }
        }

        // Старт внутри бокса не считаем попаданием
        if normal == Vec3::ZERO {
            return None;
        }

        Some(ProbeHit {
            distance: t_enter,
            point: origin + direction * t_enter,
            normal,
        })
    }
}

/// Вся геометрия арены
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArenaGeometry {
    pub blocks: Vec<Block>,
}

impl ArenaGeometry {
    /// Квадратный пол [-half, half] с верхом на y = 0
    pub fn flat(half_extent: f32) -> Self {
        Self::default().with_block(
            Vec3::new(-half_extent, -1.0, -half_extent),
            Vec3::new(half_extent, 0.0, half_extent),
        )
    }

    pub fn with_block(mut self, a: Vec3, b: Vec3) -> Self {
        self.blocks.push(Block::new(a, b));
        self
    }

    /// Платформа: бокс от пола до `top`
    pub fn with_platform(self, min_xz: Vec2, max_xz: Vec2, top: f32) -> Self {
        self.with_block(Vec3::new(min_xz.x, 0.0, min_xz.y), Vec3::new(max_xz.x, top, max_xz.y))
    }
}

impl WorldProbe for ArenaGeometry {
    fn ground_below(&self, point: Vec3, max_drop: f32) -> Option<f32> {
        self.blocks
            .iter()
            .filter(|block| block.contains_xz(point))
            .map(|block| block.max.y)
            .filter(|top| *top <= point.y + 1e-4 && point.y - *top <= max_drop)
            .reduce(f32::max)
    }

    fn cast_ray(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<ProbeHit> {
        let direction = direction.try_normalize()?;
        self.blocks
            .iter()
            .filter_map(|block| block.ray_hit(origin, direction, max_distance))
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}
