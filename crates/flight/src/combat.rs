use arcade_common::EntityId;
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::aircraft::{Aircraft, Team};
use crate::arena::Arena;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bullet {
    pub owner: EntityId,
    pub team: Team,
    pub position: Vec3,
    pub velocity: Vec3,
    /// Seconds left.
    pub life: f32,
}

/// Why a bullet left the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulletFate {
    Expired,
    OutOfBounds,
    Obstacle,
    Hit { target: EntityId },
}

/// Short-lived impact flash.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    pub position: Vec3,
    pub life: f32,
    pub team: Team,
}

/// Drop effects whose life ran out.
pub fn update_effects(effects: &mut Vec<Effect>, dt: f32) {
    for fx in effects.iter_mut() {
        fx.life -= dt;
    }
    effects.retain(|fx| fx.life > 0.0);
}

/// Bounded list of live bullets, scanned linearly each frame.
#[derive(Debug, Clone, PartialEq)]
pub struct BulletPool {
    bullets: Vec<Bullet>,
    capacity: usize,
}

impl BulletPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            bullets: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.bullets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bullets.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bullet> {
        self.bullets.iter()
    }

    /// Add a bullet. A full pool drops the new one and returns false.
    pub fn spawn(&mut self, bullet: Bullet) -> bool {
        if self.bullets.len() >= self.capacity {
            tracing::trace!(owner = %bullet.owner, "bullet pool full");
            return false;
        }
        self.bullets.push(bullet);
        true
    }

    /// Age and move every bullet, then remove the ones that expired, struck
    /// an obstacle, reached an enemy, or left the arena. Obstacles and
    /// aircraft are tested along the whole move, so a fast bullet cannot
    /// skip past a target between frames; the first thing touched wins.
    /// Each removed bullet is reported exactly once.
    pub fn update(
        &mut self,
        dt: f32,
        arena: &Arena,
        aircraft: &[Aircraft],
        bullet_radius: f32,
        hit_radius: f32,
    ) -> Vec<(Bullet, BulletFate)> {
        let mut removed = Vec::new();
        let reach = hit_radius + bullet_radius;
        self.bullets.retain_mut(|b| {
            let from = b.position;
            b.life -= dt;
            b.position += b.velocity * dt;
            let to = b.position;

            let fate = if b.life <= 0.0 {
                Some(BulletFate::Expired)
            } else {
                let wall = arena
                    .obstacle_sweep(from, to, bullet_radius)
                    .map(|(_, t)| (t, BulletFate::Obstacle));
                let plane = aircraft
                    .iter()
                    .filter(|a| a.alive && a.team != b.team)
                    .filter_map(|a| {
                        sweep_sphere(from, to, a.position(), reach)
                            .map(|t| (t, BulletFate::Hit { target: a.id }))
                    })
                    .min_by(|x, y| x.0.total_cmp(&y.0));
                let first = match (wall, plane) {
                    (Some(w), Some(p)) => Some(if p.0 < w.0 { p } else { w }),
                    (w, p) => w.or(p),
                };
                match first {
                    Some((t, fate)) => {
                        b.position = from.lerp(to, t);
                        Some(fate)
                    }
                    None if !arena.in_bounds(to) => Some(BulletFate::OutOfBounds),
                    None => None,
                }
            };
            match fate {
                Some(fate) => {
                    removed.push((*b, fate));
                    false
                }
                None => true,
            }
        });
        removed
    }
}

/// Fraction of the move from `from` to `to` at which a point first comes
/// within `radius` of `center`.
fn sweep_sphere(from: Vec3, to: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let d = to - from;
    let f = from - center;
    let c = f.length_squared() - radius * radius;
    if c <= 0.0 {
        return Some(0.0);
    }
    let a = d.length_squared();
    if a < 1e-12 {
        return None;
    }
    let b = f.dot(d);
    let disc = b * b - a * c;
    if b >= 0.0 || disc < 0.0 {
        return None;
    }
    let t = (-b - disc.sqrt()) / a;
    (t <= 1.0).then_some(t)
}
