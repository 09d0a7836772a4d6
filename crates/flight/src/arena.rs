//! Static arena geometry: bounds, floor, ceiling and obstacle boxes.

use std::str::FromStr;

use arcade_common::SimRng;
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::dogfight::MatchError;
use crate::spatial::ObstacleGrid;

/// Axis-aligned box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    pub fn from_center(center: Vec3, half: Vec3) -> Self {
        Self::new(center - half, center + half)
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    pub fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    pub fn closest_point(&self, p: Vec3) -> Vec3 {
        p.clamp(self.min, self.max)
    }

    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.closest_point(center).distance_squared(center) <= radius * radius
    }

    /// Fraction of the way from `from` to `to` at which a sphere of
    /// `radius` first touches the box, grown by `radius` on every face.
    pub fn sweep(&self, from: Vec3, to: Vec3, radius: f32) -> Option<f32> {
        let d = to - from;
        let lo = self.min - Vec3::splat(radius);
        let hi = self.max + Vec3::splat(radius);
        let mut enter = 0.0_f32;
        let mut exit = 1.0_f32;
        for axis in 0..3 {
            if d[axis].abs() < 1e-6 {
                if from[axis] < lo[axis] || from[axis] > hi[axis] {
                    return None;
                }
                continue;
            }
            let t1 = (lo[axis] - from[axis]) / d[axis];
            let t2 = (hi[axis] - from[axis]) / d[axis];
            enter = enter.max(t1.min(t2));
            exit = exit.min(t1.max(t2));
            if enter > exit {
                return None;
            }
        }
        Some(enter)
    }

    /// Outward surface normal nearest to `p`. Points inside the box use the
    /// face of least penetration.
    pub fn normal_at(&self, p: Vec3) -> Vec3 {
        let closest = self.closest_point(p);
        let away = p - closest;
        if away.length_squared() > 1e-8 {
            return away.normalize();
        }
        let to_min = p - self.min;
        let to_max = self.max - p;
        let faces = [
            (to_min.x, Vec3::NEG_X),
            (to_max.x, Vec3::X),
            (to_min.y, Vec3::NEG_Y),
            (to_max.y, Vec3::Y),
            (to_min.z, Vec3::NEG_Z),
            (to_max.z, Vec3::Z),
        ];
        faces
            .iter()
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map_or(Vec3::Y, |(_, n)| *n)
    }
}

/// Built-in arena layouts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArenaLayout {
    Open,
    #[default]
    Towers,
    Canyon,
}

impl FromStr for ArenaLayout {
    type Err = MatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "open" => Ok(Self::Open),
            "towers" => Ok(Self::Towers),
            "canyon" => Ok(Self::Canyon),
            _ => Err(MatchError::UnknownLayout(s.to_string())),
        }
    }
}

/// What an aircraft ran into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Surface {
    Floor,
    Ceiling,
    Wall,
    Obstacle(usize),
}

/// A contact between a sphere and the arena.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub surface: Surface,
    /// Unit normal pointing back into free space.
    pub normal: Vec3,
}

const HALF_SIZE: f32 = 2400.0;
const FLOOR: f32 = 0.0;
const CEILING: f32 = 1600.0;
const GRID_CELL: f32 = 200.0;
/// Obstacles keep this far from the spawn points.
const SPAWN_CLEARANCE: f32 = 420.0;

/// Where the two teams start, as fractions of the half size along X.
pub const SPAWN_LINE: f32 = 0.55;
pub const SPAWN_ALTITUDE: f32 = 320.0;

#[derive(Debug, Clone)]
pub struct Arena {
    half_size: f32,
    floor: f32,
    ceiling: f32,
    obstacles: Vec<Aabb>,
    grid: ObstacleGrid,
}

impl Arena {
    pub fn new(half_size: f32, floor: f32, ceiling: f32, obstacles: Vec<Aabb>) -> Result<Self, MatchError> {
        if !(half_size.is_finite() && half_size > 0.0) || !(ceiling > floor) {
            return Err(MatchError::InvalidArena {
                half_size,
                floor,
                ceiling,
            });
        }
        let grid = ObstacleGrid::new(GRID_CELL, &obstacles);
        Ok(Self {
            half_size,
            floor,
            ceiling,
            obstacles,
            grid,
        })
    }

    /// Build a layout. Obstacle placement draws from `rng`.
    pub fn generate(layout: ArenaLayout, rng: &mut SimRng) -> Self {
        let obstacles = match layout {
            ArenaLayout::Open => Vec::new(),
            ArenaLayout::Towers => towers(rng),
            ArenaLayout::Canyon => canyon(rng),
        };
        tracing::debug!(?layout, obstacles = obstacles.len(), "arena generated");
        let grid = ObstacleGrid::new(GRID_CELL, &obstacles);
        Self {
            half_size: HALF_SIZE,
            floor: FLOOR,
            ceiling: CEILING,
            obstacles,
            grid,
        }
    }

    pub fn half_size(&self) -> f32 {
        self.half_size
    }

    pub fn floor(&self) -> f32 {
        self.floor
    }

    pub fn ceiling(&self) -> f32 {
        self.ceiling
    }

    pub fn obstacles(&self) -> &[Aabb] {
        &self.obstacles
    }

    pub fn grid(&self) -> &ObstacleGrid {
        &self.grid
    }

    /// Obstacles whose cells lie within `radius` of `pos`.
    pub fn nearby(&self, pos: Vec3, radius: f32) -> impl Iterator<Item = (usize, &Aabb)> + '_ {
        self.grid
            .nearby(pos, radius)
            .into_iter()
            .map(move |i| (i, &self.obstacles[i]))
    }

    pub fn in_bounds(&self, p: Vec3) -> bool {
        p.x.abs() <= self.half_size
            && p.z.abs() <= self.half_size
            && p.y >= self.floor
            && p.y <= self.ceiling
    }

    /// First obstacle a sphere overlaps, in index order.
    pub fn obstacle_hit(&self, center: Vec3, radius: f32) -> Option<usize> {
        self.nearby(center, radius)
            .find(|(_, aabb)| aabb.intersects_sphere(center, radius))
            .map(|(i, _)| i)
    }

    /// Earliest obstacle a sphere moving from `from` to `to` touches, with
    /// the fraction of the move at which it does.
    pub fn obstacle_sweep(&self, from: Vec3, to: Vec3, radius: f32) -> Option<(usize, f32)> {
        let mid = (from + to) * 0.5;
        let reach = from.distance(to) * 0.5 + radius;
        self.nearby(mid, reach)
            .filter_map(|(i, aabb)| aabb.sweep(from, to, radius).map(|t| (i, t)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Contact for a sphere: floor and ceiling first, then walls, then
    /// obstacles.
    pub fn contact(&self, center: Vec3, radius: f32) -> Option<Contact> {
        if center.y - radius <= self.floor {
            return Some(Contact {
                surface: Surface::Floor,
                normal: Vec3::Y,
            });
        }
        if center.y + radius >= self.ceiling {
            return Some(Contact {
                surface: Surface::Ceiling,
                normal: Vec3::NEG_Y,
            });
        }
        let limit = self.half_size - radius;
        if center.x.abs() >= limit {
            return Some(Contact {
                surface: Surface::Wall,
                normal: Vec3::new(-center.x.signum(), 0.0, 0.0),
            });
        }
        if center.z.abs() >= limit {
            return Some(Contact {
                surface: Surface::Wall,
                normal: Vec3::new(0.0, 0.0, -center.z.signum()),
            });
        }
        self.obstacle_hit(center, radius).map(|i| Contact {
            surface: Surface::Obstacle(i),
            normal: self.obstacles[i].normal_at(center),
        })
    }

    /// Spawn point for slot `i` of a team; Blue starts on -X, Red on +X.
    pub fn spawn_point(&self, red: bool, slot: u32, count: u32) -> Vec3 {
        let x = self.half_size * SPAWN_LINE * if red { 1.0 } else { -1.0 };
        let spread = slot as f32 - (count.max(1) - 1) as f32 * 0.5;
        Vec3::new(x, SPAWN_ALTITUDE + slot as f32 * 30.0, spread * 160.0)
    }
}

fn clear_of_spawns(aabb: &Aabb) -> bool {
    let c = aabb.center();
    let spawn_x = HALF_SIZE * SPAWN_LINE;
    let reach = SPAWN_CLEARANCE + aabb.half_extents().x.max(aabb.half_extents().z);
    (c.x.abs() - spawn_x).abs() > reach || c.z.abs() > reach + 400.0
}

fn towers(rng: &mut SimRng) -> Vec<Aabb> {
    let span = HALF_SIZE - 300.0;
    let mut out = Vec::new();
    let mut attempts = 0;
    while out.len() < 18 && attempts < 200 {
        attempts += 1;
        let half = Vec3::new(rng.range(30.0, 60.0), 0.0, rng.range(30.0, 60.0));
        let height = rng.range(300.0, 900.0);
        let center = Vec3::new(rng.range(-span, span), height * 0.5, rng.range(-span, span));
        let aabb = Aabb::from_center(center, Vec3::new(half.x, height * 0.5, half.z));
        if clear_of_spawns(&aabb) {
            out.push(aabb);
        }
    }
    out
}

fn canyon(rng: &mut SimRng) -> Vec<Aabb> {
    let mut out = Vec::new();
    let chunks = 12;
    let chunk = HALF_SIZE * 2.0 / chunks as f32;
    for i in 0..chunks {
        let x = -HALF_SIZE + (i as f32 + 0.5) * chunk;
        for side in [-1.0, 1.0] {
            let gap = rng.range(320.0, 460.0);
            let height = rng.range(500.0, 800.0);
            let depth = 180.0;
            let center = Vec3::new(x, height * 0.5, side * (gap + depth * 0.5));
            out.push(Aabb::from_center(
                center,
                Vec3::new(chunk * 0.5, height * 0.5, depth * 0.5),
            ));
        }
        // Occasional rock pillar in the channel, away from the spawns.
        if rng.chance(0.3) {
            let pillar = Aabb::from_center(
                Vec3::new(x, 150.0, rng.range(-120.0, 120.0)),
                Vec3::new(35.0, 150.0, 35.0),
            );
            if clear_of_spawns(&pillar) {
                out.push(pillar);
            }
        }
    }
    out
}
