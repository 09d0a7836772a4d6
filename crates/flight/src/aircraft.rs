use arcade_common::math::damp;
use arcade_common::{EntityId, Transform};
use arcade_input::FlightControls;
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::arena::{Arena, Contact};
use crate::tuning::FlightTuning;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    Blue,
    Red,
}

/// A fighter. Local +X is the nose, +Y up, +Z the right wing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aircraft {
    pub id: EntityId,
    pub team: Team,
    pub transform: Transform,
    pub velocity: Vec3,
    pub speed: f32,
    /// Smoothed control surface positions in `[-1, 1]`.
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub hp: f32,
    pub alive: bool,
    pub cooldown: f32,
    /// Rounds left; `None` is unlimited.
    pub ammo: Option<u32>,
    /// Boost energy in `[0, 1]`.
    pub boost_energy: f32,
    pub boosting: bool,
    /// Touching something this frame; damage lands once per contact.
    pub colliding: bool,
    pub target: Option<EntityId>,
}

impl Aircraft {
    pub fn new(
        id: EntityId,
        team: Team,
        position: Vec3,
        rotation: Quat,
        tuning: &FlightTuning,
        ammo: Option<u32>,
    ) -> Self {
        let transform = Transform { position, rotation };
        Self {
            id,
            team,
            velocity: transform.forward() * tuning.start_speed,
            transform,
            speed: tuning.start_speed,
            roll: 0.0,
            pitch: 0.0,
            yaw: 0.0,
            hp: tuning.hp,
            alive: true,
            cooldown: 0.0,
            ammo,
            boost_energy: 1.0,
            boosting: false,
            colliding: false,
            target: None,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.transform.position
    }

    pub fn forward(&self) -> Vec3 {
        self.transform.forward()
    }

    pub fn hp_fraction(&self, tuning: &FlightTuning) -> f32 {
        (self.hp / tuning.hp).clamp(0.0, 1.0)
    }

    /// Smooth the control surfaces toward `controls`, rotate, and set the
    /// new speed and velocity. Does not move the aircraft.
    pub fn apply_controls(&mut self, controls: &FlightControls, tuning: &FlightTuning, dt: f32) {
        let c = controls.clamped();
        self.roll = damp(self.roll, c.roll, tuning.control_response, dt);
        self.pitch = damp(self.pitch, c.pitch, tuning.control_response, dt);
        self.yaw = damp(self.yaw, c.yaw, tuning.control_response, dt);

        // Positive roll drops the right wing; positive yaw swings the nose
        // toward +Z, which is a negative turn about local Y.
        let delta = Quat::from_rotation_x(self.roll * tuning.roll_rate * dt)
            * Quat::from_rotation_z(self.pitch * tuning.pitch_rate * dt)
            * Quat::from_rotation_y(-self.yaw * tuning.yaw_rate * dt);
        self.transform.rotation = (self.transform.rotation * delta).normalize();

        let mut target = tuning.min_speed + (tuning.max_speed - tuning.min_speed) * c.throttle;
        self.boosting = c.boost && self.boost_energy > 0.0;
        if self.boosting {
            target *= tuning.boost_factor;
            self.boost_energy = (self.boost_energy - tuning.boost_drain * dt).max(0.0);
        } else {
            self.boost_energy = (self.boost_energy + tuning.boost_regen * dt).min(1.0);
        }
        self.speed = damp(self.speed, target, tuning.speed_response, dt)
            .clamp(tuning.min_speed, tuning.max_speed * tuning.boost_factor);
        self.velocity = self.forward() * self.speed;
    }

    /// Move along the velocity. On contact the move is undone, speed drops
    /// and the nose turns to the reflected heading. Returns the contact
    /// only on the frame it begins.
    pub fn integrate(&mut self, arena: &Arena, tuning: &FlightTuning, dt: f32) -> Option<Contact> {
        let prev = self.transform.position;
        self.transform.position += self.velocity * dt;

        let Some(contact) = arena.contact(self.transform.position, tuning.body_radius) else {
            self.colliding = false;
            return None;
        };
        self.transform.position = prev;
        self.speed *= tuning.collision_speed_factor;

        let n = contact.normal;
        let dir = self.velocity.normalize_or(self.forward());
        let reflected = if dir.dot(n) < 0.0 {
            (dir - 2.0 * dir.dot(n) * n).normalize_or(n)
        } else {
            dir
        };
        let turn = Quat::from_rotation_arc(self.forward(), reflected);
        self.transform.rotation = (turn * self.transform.rotation).normalize();
        self.velocity = reflected * self.speed;

        let first = !self.colliding;
        self.colliding = true;
        if first {
            self.damage(tuning.collision_damage);
            Some(contact)
        } else {
            None
        }
    }

    /// Tick the gun cooldown; never below zero.
    pub fn tick_cooldown(&mut self, dt: f32) {
        self.cooldown = (self.cooldown - dt).max(0.0);
    }

    pub fn can_fire(&self) -> bool {
        self.alive && self.cooldown <= 0.0 && self.ammo != Some(0)
    }

    /// Spend a round and start the cooldown. Returns the muzzle position and
    /// bullet velocity, or `None` when the gun is not ready.
    pub fn fire(&mut self, tuning: &FlightTuning) -> Option<(Vec3, Vec3)> {
        if !self.can_fire() {
            return None;
        }
        self.cooldown = tuning.fire_interval;
        if let Some(ammo) = &mut self.ammo {
            *ammo -= 1;
        }
        let dir = self.forward();
        let muzzle = self.transform.position + dir * tuning.muzzle_offset;
        let velocity = dir * tuning.bullet_speed + self.velocity * tuning.bullet_inherit;
        Some((muzzle, velocity))
    }

    /// Subtract hp, never below zero. Returns true when this hit destroyed
    /// the aircraft.
    pub fn damage(&mut self, amount: f32) -> bool {
        if !self.alive {
            return false;
        }
        self.hp = (self.hp - amount).max(0.0);
        if self.hp <= 0.0 {
            self.alive = false;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::{Aabb, Surface};

    const DT: f32 = 1.0 / 60.0;

    fn plane(tuning: &FlightTuning) -> Aircraft {
        Aircraft::new(
            EntityId(0),
            Team::Blue,
            Vec3::new(0.0, 400.0, 0.0),
            Quat::IDENTITY,
            tuning,
            Some(400),
        )
    }

    fn open_arena() -> Arena {
        Arena::new(2400.0, 0.0, 1600.0, Vec::new()).unwrap()
    }

    #[test]
    fn cooldown_never_negative_and_shots_spaced() {
        let tuning = FlightTuning::default();
        let mut a = plane(&tuning);
        let mut shots = Vec::new();
        let mut t = 0.0;
        for frame in 0..240 {
            let dt = if frame % 3 == 0 { 0.033 } else { DT };
            t += dt;
            a.tick_cooldown(dt);
            assert!(a.cooldown >= 0.0);
            if a.fire(&tuning).is_some() {
                shots.push(t);
            }
            assert!(a.cooldown >= 0.0);
        }
        assert!(shots.len() > 20);
        for pair in shots.windows(2) {
            assert!(pair[1] - pair[0] >= tuning.fire_interval - 1e-4);
        }
        assert_eq!(a.ammo, Some(400 - shots.len() as u32));
    }

    #[test]
    fn empty_gun_does_not_fire() {
        let tuning = FlightTuning::default();
        let mut a = plane(&tuning);
        a.ammo = Some(0);
        assert!(a.fire(&tuning).is_none());
        a.ammo = None;
        assert!(a.fire(&tuning).is_some());
        assert_eq!(a.ammo, None);
    }

    #[test]
    fn bullet_leaves_muzzle_with_inherited_velocity() {
        let tuning = FlightTuning::default();
        let mut a = plane(&tuning);
        let (muzzle, vel) = a.fire(&tuning).unwrap();
        assert!((muzzle - Vec3::new(28.0, 400.0, 0.0)).length() < 1e-3);
        assert!((vel.x - (900.0 + 220.0 * 0.4)).abs() < 1e-2);
    }

    #[test]
    fn pitch_up_climbs_and_yaw_turns_right() {
        let tuning = FlightTuning::default();
        let mut a = plane(&tuning);
        let up = FlightControls {
            pitch: 1.0,
            ..FlightControls::default()
        };
        for _ in 0..30 {
            a.apply_controls(&up, &tuning, DT);
        }
        assert!(a.forward().y > 0.1);

        let mut b = plane(&tuning);
        let right = FlightControls {
            yaw: 1.0,
            ..FlightControls::default()
        };
        for _ in 0..30 {
            b.apply_controls(&right, &tuning, DT);
        }
        assert!(b.forward().z > 0.05);
    }

    #[test]
    fn boost_drains_and_regenerates() {
        let tuning = FlightTuning::default();
        let mut a = plane(&tuning);
        let boost = FlightControls {
            throttle: 1.0,
            boost: true,
            ..FlightControls::default()
        };
        for _ in 0..120 {
            a.apply_controls(&boost, &tuning, DT);
        }
        assert!((a.boost_energy - 0.3).abs() < 1e-3);
        assert!(a.speed > tuning.max_speed);
        a.apply_controls(&FlightControls::default(), &tuning, DT);
        assert!(a.boost_energy > 0.3);
    }

    #[test]
    fn collision_reverts_and_damages_once() {
        let tuning = FlightTuning::default();
        let wall = Aabb::from_center(Vec3::new(50.0, 400.0, 0.0), Vec3::splat(30.0));
        let arena = Arena::new(2400.0, 0.0, 1600.0, vec![wall]).unwrap();
        let mut a = plane(&tuning);
        let before = a.position();

        let contact = a.integrate(&arena, &tuning, 0.05).unwrap();
        assert_eq!(contact.surface, Surface::Obstacle(0));
        assert_eq!(a.position(), before);
        assert!((a.speed - 220.0 * 0.55).abs() < 1e-3);
        assert!(a.forward().x < 0.0);
        assert_eq!(a.hp, 100.0 - tuning.collision_damage);

        // Pinned against the box: no second hit while the contact lasts.
        a.velocity = Vec3::X * 200.0;
        assert!(a.integrate(&arena, &tuning, 0.05).is_none());
        assert!(a.colliding);
        assert_eq!(a.hp, 100.0 - tuning.collision_damage);
    }

    #[test]
    fn floor_contact_bounces_up() {
        let tuning = FlightTuning::default();
        let mut a = plane(&tuning);
        a.transform.position.y = 20.0;
        a.velocity = Vec3::new(100.0, -200.0, 0.0);
        let contact = a.integrate(&open_arena(), &tuning, 0.05).unwrap();
        assert_eq!(contact.surface, Surface::Floor);
        assert!(a.velocity.y > 0.0);
        assert!(a.forward().y > 0.0);
    }

    #[test]
    fn hp_never_negative() {
        let tuning = FlightTuning::default();
        let mut a = plane(&tuning);
        assert!(!a.damage(60.0));
        assert!(a.damage(60.0));
        assert_eq!(a.hp, 0.0);
        assert!(!a.alive);
        assert!(!a.damage(10.0));
    }
}
