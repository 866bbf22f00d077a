//! Deterministic demo world for the statecast simulation.
//!
//! Ships from three factions fly, cruise and fire missiles at each other.
//! Ships use persistent ids `1..=n`; missiles draw ephemeral ids from an
//! [`EphemeralIds`] pool and give them back when they hit or expire.

mod rng;

use std::collections::HashMap;

use codec::{CruisePhase, DeltaCodec, NetId, RepAttitude};
use glam::{Quat, Vec3};
use repgraph::{
    EngineState, Gun, Health, IdAllocator, PhysicsBody, ReplicationServer, ReputationView,
    SimulatedEntity,
};
use tracing::{debug, warn};

pub use rng::Rng;

const HULL_MAX: f32 = 1000.0;
const SHIELD_MAX: f32 = 400.0;
const SHIELD_REGEN_PER_SEC: f32 = 4.0;
const MISSILE_DAMAGE: f32 = 150.0;
const MISSILE_HIT_RADIUS: f32 = 25.0;
const CRUISE_CHARGE_TICKS: u32 = 120;
const CRUISE_TICKS: u32 = 300;
const IMPULSE_SPEED: f32 = 80.0;
const CRUISE_SPEED: f32 = 300.0;

/// Ship allegiance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Faction {
    Police,
    Pirate,
    Trader,
}

impl Faction {
    const ALL: [Self; 3] = [Self::Police, Self::Pirate, Self::Trader];

    /// How a member of `self` sees a member of `other`.
    #[must_use]
    pub fn attitude_toward(self, other: Self) -> RepAttitude {
        match (self, other) {
            (a, b) if a == b => RepAttitude::Friendly,
            (Self::Pirate, _) | (_, Self::Pirate) => RepAttitude::Hostile,
            _ => RepAttitude::Neutral,
        }
    }
}

/// Source of ids for short-lived entities.
pub trait EphemeralIds {
    fn acquire(&mut self) -> Option<NetId>;

    fn release(&mut self, id: NetId);
}

impl EphemeralIds for IdAllocator {
    fn acquire(&mut self) -> Option<NetId> {
        self.try_allocate()
    }

    fn release(&mut self, id: NetId) {
        if let Err(err) = self.free(id) {
            warn!(%id, %err, "failed to release ephemeral id");
        }
    }
}

impl<C: DeltaCodec> EphemeralIds for ReplicationServer<C> {
    fn acquire(&mut self) -> Option<NetId> {
        self.try_spawn_ephemeral()
    }

    fn release(&mut self, id: NetId) {
        if let Err(err) = self.despawn(id) {
            warn!(%id, %err, "failed to despawn");
        }
    }
}

/// World generation settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldConfig {
    pub ships: u32,
    pub seed: u64,
    /// Each armed ship fires about once every this many ticks.
    pub fire_one_in: u32,
    pub missile_speed: f32,
    pub missile_lifetime: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            ships: 16,
            seed: 1,
            fire_one_in: 240,
            missile_speed: 400.0,
            missile_lifetime: 180,
        }
    }
}

/// Running totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorldStats {
    pub missiles_fired: u32,
    pub missile_hits: u32,
    pub missiles_expired: u32,
    pub ships_destroyed: u32,
}

#[derive(Debug, Clone)]
struct Ship {
    entity: SimulatedEntity,
    faction: Faction,
    turn_rate: f32,
    cruise_ticks: u32,
}

#[derive(Debug, Clone)]
struct Missile {
    entity: SimulatedEntity,
    target: NetId,
    remaining: u32,
}

/// Ships and missiles, stepped deterministically from a seed.
#[derive(Debug, Clone)]
pub struct DemoWorld {
    config: WorldConfig,
    rng: Rng,
    ships: Vec<Ship>,
    missiles: Vec<Missile>,
    factions: HashMap<NetId, Faction>,
    stats: WorldStats,
}

impl DemoWorld {
    #[must_use]
    pub fn new(config: WorldConfig) -> Self {
        let mut rng = Rng::new(config.seed);
        let mut factions = HashMap::new();
        let ships = (0..config.ships)
            .map(|index| {
                let id = NetId::new(index as i32 + 1);
                let faction = Faction::ALL[index as usize % Faction::ALL.len()];
                factions.insert(id, faction);
                spawn_ship(&mut rng, id, faction)
            })
            .collect();
        Self {
            config,
            rng,
            ships,
            missiles: Vec::new(),
            factions,
            stats: WorldStats::default(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    #[must_use]
    pub fn stats(&self) -> WorldStats {
        self.stats
    }

    /// Persistent ship ids, ascending.
    #[must_use]
    pub fn ship_ids(&self) -> Vec<NetId> {
        self.ships.iter().map(|ship| ship.entity.id).collect()
    }

    #[must_use]
    pub fn missile_count(&self) -> usize {
        self.missiles.len()
    }

    #[must_use]
    pub fn faction(&self, id: NetId) -> Option<Faction> {
        self.factions.get(&id).copied()
    }

    /// Every live entity, ships first.
    #[must_use]
    pub fn entities(&self) -> Vec<SimulatedEntity> {
        self.ships
            .iter()
            .map(|ship| ship.entity.clone())
            .chain(self.missiles.iter().map(|missile| missile.entity.clone()))
            .collect()
    }

    /// Advances the world by one fixed step.
    pub fn step(&mut self, dt: f32, ids: &mut impl EphemeralIds) {
        for ship in &mut self.ships {
            fly(ship, &mut self.rng, dt);
        }
        self.fire(ids);
        self.advance_missiles(dt, ids);
    }

    fn fire(&mut self, ids: &mut impl EphemeralIds) {
        for index in 0..self.ships.len() {
            let shooter = &self.ships[index];
            if shooter.faction == Faction::Trader || !self.rng.chance(self.config.fire_one_in) {
                continue;
            }
            let target = &self.ships[self.rng.index(self.ships.len())];
            if shooter.faction.attitude_toward(target.faction) != RepAttitude::Hostile {
                continue;
            }
            let Some(id) = ids.acquire() else {
                warn!("ephemeral ids exhausted, missile not fired");
                return;
            };
            let target_id = target.entity.id;
            let mut entity =
                SimulatedEntity::new(id, shooter.entity.position, shooter.entity.orientation);
            entity.physics = Some(PhysicsBody::default());
            self.factions.insert(id, shooter.faction);
            debug!(missile = %id, shooter = %shooter.entity.id, target = %target_id, "missile fired");
            self.missiles.push(Missile {
                entity,
                target: target_id,
                remaining: self.config.missile_lifetime,
            });
            self.stats.missiles_fired += 1;
        }
    }

    fn advance_missiles(&mut self, dt: f32, ids: &mut impl EphemeralIds) {
        let targets: HashMap<NetId, Vec3> = self
            .ships
            .iter()
            .map(|ship| (ship.entity.id, ship.entity.position))
            .collect();
        let speed = self.config.missile_speed;
        let mut hits = Vec::new();
        let mut expired = Vec::new();

        self.missiles.retain_mut(|missile| {
            missile.remaining = missile.remaining.saturating_sub(1);
            let id = missile.entity.id;
            let Some(target) = targets.get(&missile.target) else {
                expired.push(id);
                return false;
            };
            let to_target = *target - missile.entity.position;
            let distance = to_target.length();
            if distance <= MISSILE_HIT_RADIUS {
                hits.push((id, missile.target));
                return false;
            }
            if missile.remaining == 0 {
                expired.push(id);
                return false;
            }
            let direction = to_target / distance;
            let velocity = direction * speed;
            missile.entity.position += velocity * dt;
            missile.entity.orientation = Quat::from_rotation_arc(Vec3::NEG_Z, direction);
            if let Some(body) = missile.entity.physics.as_mut() {
                body.linear_velocity = velocity;
            }
            true
        });

        for id in hits.iter().map(|(missile, _)| *missile).chain(expired.iter().copied()) {
            self.factions.remove(&id);
            ids.release(id);
        }
        self.stats.missiles_expired += expired.len() as u32;

        for (missile, target) in hits {
            self.stats.missile_hits += 1;
            if let Some(ship) = self.ships.iter_mut().find(|ship| ship.entity.id == target) {
                if damage(&mut ship.entity, MISSILE_DAMAGE) {
                    self.stats.ships_destroyed += 1;
                    debug!(%missile, ship = %target, "ship destroyed and respawned");
                }
            }
        }
    }
}

impl ReputationView for DemoWorld {
    fn attitude(&self, viewer: Option<NetId>, target: NetId) -> RepAttitude {
        match (viewer.and_then(|id| self.faction(id)), self.faction(target)) {
            (Some(viewer), Some(target)) => target.attitude_toward(viewer),
            _ => RepAttitude::Neutral,
        }
    }
}

fn spawn_ship(rng: &mut Rng, id: NetId, faction: Faction) -> Ship {
    let position = Vec3::new(
        rng.range_f32(-5000.0, 5000.0),
        rng.range_f32(-500.0, 500.0),
        rng.range_f32(-5000.0, 5000.0),
    );
    let heading = Quat::from_rotation_y(rng.range_f32(-std::f32::consts::PI, std::f32::consts::PI));
    let mut entity = SimulatedEntity::new(id, position, heading);
    entity.physics = Some(PhysicsBody::default());
    entity.engine = Some(EngineState {
        throttle: rng.range_f32(0.2, 1.0),
        ..EngineState::default()
    });
    entity.health = Some(Health {
        hull: HULL_MAX,
        shield: (faction != Faction::Trader).then_some(SHIELD_MAX),
    });
    if faction != Faction::Trader {
        entity.guns = (0..2)
            .map(|hardpoint| Gun {
                hardpoint,
                pitch: 0.0,
                rot: 0.0,
            })
            .collect();
    }
    Ship {
        entity,
        faction,
        turn_rate: rng.range_f32(-0.3, 0.3),
        cruise_ticks: 0,
    }
}

fn fly(ship: &mut Ship, rng: &mut Rng, dt: f32) {
    if rng.chance(300) {
        ship.turn_rate = rng.range_f32(-0.5, 0.5);
    }
    let entity = &mut ship.entity;
    let mut engine = entity.engine.unwrap_or_default();
    if rng.chance(200) {
        engine.throttle = rng.range_f32(0.0, 1.0);
    }

    ship.cruise_ticks = ship.cruise_ticks.saturating_sub(1);
    match engine.cruise {
        CruisePhase::Off if rng.chance(600) => {
            engine.cruise = CruisePhase::Charging;
            ship.cruise_ticks = CRUISE_CHARGE_TICKS;
        }
        CruisePhase::Charging if ship.cruise_ticks == 0 => {
            engine.cruise = CruisePhase::Cruising;
            ship.cruise_ticks = CRUISE_TICKS;
        }
        CruisePhase::Cruising | CruisePhase::Disrupted if ship.cruise_ticks == 0 => {
            engine.cruise = CruisePhase::Off;
        }
        _ => {}
    }
    engine.cruise_charge_pct = match engine.cruise {
        CruisePhase::Charging => 1.0 - ship.cruise_ticks as f32 / CRUISE_CHARGE_TICKS as f32,
        CruisePhase::Cruising => 1.0,
        _ => 0.0,
    };
    engine.cruise_accel_pct = if engine.cruise == CruisePhase::Cruising {
        (engine.cruise_accel_pct + dt).min(1.0)
    } else {
        0.0
    };
    entity.engine = Some(engine);

    entity.orientation = (entity.orientation * Quat::from_rotation_y(ship.turn_rate * dt)).normalize();
    let speed = engine.throttle.mul_add(
        IMPULSE_SPEED,
        CRUISE_SPEED * engine.cruise_accel_pct,
    );
    let velocity = entity.orientation * Vec3::NEG_Z * speed;
    entity.position += velocity * dt;
    entity.physics = Some(PhysicsBody {
        linear_velocity: velocity,
        angular_velocity: Vec3::new(0.0, ship.turn_rate, 0.0),
    });

    if let Some(health) = entity.health.as_mut() {
        if let Some(shield) = health.shield.as_mut() {
            *shield = SHIELD_REGEN_PER_SEC.mul_add(dt, *shield).min(SHIELD_MAX);
        }
    }
    for gun in &mut entity.guns {
        gun.rot = (gun.rot + dt * 0.7) % std::f32::consts::TAU;
        gun.pitch = (gun.rot * 2.0).sin() * 0.4;
    }
    if ship.faction == Faction::Trader && rng.chance(900) {
        entity.tradelane = !entity.tradelane;
    }
}

/// Applies damage, shield first; returns `true` if the hull broke.
fn damage(entity: &mut SimulatedEntity, amount: f32) -> bool {
    let Some(health) = entity.health.as_mut() else {
        return false;
    };
    let mut rest = amount;
    if let Some(shield) = health.shield.as_mut() {
        let absorbed = shield.min(rest);
        *shield -= absorbed;
        rest -= absorbed;
    }
    health.hull -= rest;
    if health.hull <= 0.0 {
        health.hull = HULL_MAX;
        if let Some(shield) = health.shield.as_mut() {
            *shield = SHIELD_MAX;
        }
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn busy() -> WorldConfig {
        WorldConfig {
            ships: 12,
            seed: 7,
            fire_one_in: 10,
            ..WorldConfig::default()
        }
    }

    #[test]
    fn same_seed_same_world() {
        let mut a = DemoWorld::new(busy());
        let mut b = DemoWorld::new(busy());
        let mut ids_a = IdAllocator::new(256);
        let mut ids_b = IdAllocator::new(256);
        for _ in 0..200 {
            a.step(DT, &mut ids_a);
            b.step(DT, &mut ids_b);
        }
        assert_eq!(a.entities(), b.entities());
        assert_eq!(a.stats(), b.stats());
    }

    #[test]
    fn missiles_use_and_return_ephemeral_ids() {
        let mut world = DemoWorld::new(busy());
        let mut ids = IdAllocator::new(256);
        for _ in 0..600 {
            world.step(DT, &mut ids);
            assert_eq!(ids.live(), world.missile_count());
        }
        let stats = world.stats();
        assert!(stats.missiles_fired > 0);
        assert_eq!(
            stats.missiles_fired as usize,
            world.missile_count() + (stats.missile_hits + stats.missiles_expired) as usize
        );
        assert!(world
            .entities()
            .iter()
            .skip(12)
            .all(|entity| entity.id.is_ephemeral()));
    }

    #[test]
    fn exhausted_pool_fires_nothing() {
        let mut world = DemoWorld::new(busy());
        let mut ids = IdAllocator::new(0);
        for _ in 0..100 {
            world.step(DT, &mut ids);
        }
        assert_eq!(world.missile_count(), 0);
        assert_eq!(world.stats().missiles_fired, 0);
    }

    #[test]
    fn factions_see_each_other() {
        assert_eq!(
            Faction::Police.attitude_toward(Faction::Police),
            RepAttitude::Friendly
        );
        assert_eq!(
            Faction::Police.attitude_toward(Faction::Pirate),
            RepAttitude::Hostile
        );
        assert_eq!(
            Faction::Trader.attitude_toward(Faction::Police),
            RepAttitude::Neutral
        );

        let world = DemoWorld::new(busy());
        let police = NetId::new(1);
        let pirate = NetId::new(2);
        assert_eq!(world.attitude(Some(police), pirate), RepAttitude::Hostile);
        assert_eq!(world.attitude(None, pirate), RepAttitude::Neutral);
    }

    #[test]
    fn damage_hits_shield_first_and_respawns() {
        let mut ship = spawn_ship(&mut Rng::new(1), NetId::new(1), Faction::Police);
        assert!(!damage(&mut ship.entity, 100.0));
        let health = ship.entity.health.unwrap();
        assert_eq!(health.shield, Some(SHIELD_MAX - 100.0));
        assert_eq!(health.hull, HULL_MAX);

        assert!(damage(&mut ship.entity, SHIELD_MAX + HULL_MAX));
        assert_eq!(ship.entity.health.unwrap().hull, HULL_MAX);
    }
}
