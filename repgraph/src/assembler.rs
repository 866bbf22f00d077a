//! Per-tick snapshot assembly.

use std::borrow::Cow;

use codec::{
    quantize_position, quantize_throttle, GunOrient, NetId, ObjectUpdate, PackedQuat,
    RepAttitude, SelfState, SnapshotTick, Velocity,
};

use crate::world::{ReputationView, SimulatedEntity};

/// Every replicated entity's update for one tick, ascending by id.
#[derive(Debug, Clone, PartialEq)]
pub struct TickSnapshot {
    pub tick: SnapshotTick,
    updates: Vec<ObjectUpdate>,
}

impl TickSnapshot {
    #[must_use]
    pub fn updates(&self) -> &[ObjectUpdate] {
        &self.updates
    }

    #[must_use]
    pub fn get(&self, id: NetId) -> Option<&ObjectUpdate> {
        self.updates
            .binary_search_by_key(&id, |update| update.id)
            .ok()
            .map(|idx| &self.updates[idx])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.updates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}

/// Builds update records from simulated entities.
///
/// Component presence and every quantization step are decided here, so the
/// records handed to the packer are final.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotAssembler;

impl SnapshotAssembler {
    /// Builds the shared (viewer-neutral) record of one entity.
    #[must_use]
    pub fn build_update(entity: &SimulatedEntity) -> ObjectUpdate {
        let engine = entity.engine.unwrap_or_default();
        ObjectUpdate {
            id: entity.id,
            position: quantize_position(entity.position),
            orientation: PackedQuat::from_quat(entity.orientation),
            velocity: entity
                .physics
                .map(|body| Velocity::from_vectors(body.linear_velocity, body.angular_velocity)),
            throttle: quantize_throttle(engine.throttle),
            cruise: engine.cruise,
            engine_kill: engine.engine_kill,
            tradelane: entity.tradelane,
            hull: entity.health.map(|health| health.hull),
            shield: entity.health.and_then(|health| health.shield),
            guns: entity
                .guns
                .iter()
                .map(|gun| GunOrient::from_angles(gun.hardpoint, gun.pitch, gun.rot))
                .collect(),
            rep: RepAttitude::Neutral,
        }
    }

    /// Builds the records of every entity for `tick`.
    pub fn assemble<'a>(
        tick: SnapshotTick,
        entities: impl IntoIterator<Item = &'a SimulatedEntity>,
    ) -> TickSnapshot {
        let mut updates: Vec<ObjectUpdate> =
            entities.into_iter().map(Self::build_update).collect();
        updates.sort_by_key(|update| update.id);
        updates.dedup_by_key(|update| update.id);
        TickSnapshot { tick, updates }
    }

    /// The always-complete state of a client's own entity.
    #[must_use]
    pub fn self_state(entity: &SimulatedEntity) -> SelfState {
        let body = entity.physics.unwrap_or_default();
        let engine = entity.engine.unwrap_or_default();
        let health = entity.health;
        SelfState {
            health: health.map_or(0.0, |h| h.hull),
            shield: health.and_then(|h| h.shield).unwrap_or(0.0),
            position: entity.position,
            orientation: entity.orientation,
            linear_velocity: body.linear_velocity,
            angular_velocity: body.angular_velocity,
            cruise_accel_pct: engine.cruise_accel_pct,
            cruise_charge_pct: engine.cruise_charge_pct,
        }
    }

    /// One client's candidate list: everything except its own entity, with
    /// reputation resolved for that client.
    #[must_use]
    pub fn candidates<'s>(
        snapshot: &'s TickSnapshot,
        viewer: Option<NetId>,
        reputation: &dyn ReputationView,
    ) -> Vec<Cow<'s, ObjectUpdate>> {
        snapshot
            .updates
            .iter()
            .filter(|update| Some(update.id) != viewer)
            .map(|update| {
                let rep = reputation.attitude(viewer, update.id);
                if rep == update.rep {
                    Cow::Borrowed(update)
                } else {
                    let mut owned = update.clone();
                    owned.rep = rep;
                    Cow::Owned(owned)
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{EngineState, Gun, Health, NeutralReputation, PhysicsBody};
    use codec::CruisePhase;
    use glam::{Quat, Vec3};

    fn entity(id: i32) -> SimulatedEntity {
        SimulatedEntity::new(NetId::new(id), Vec3::new(id as f32, 0.0, 0.0), Quat::IDENTITY)
    }

    #[test]
    fn absent_components_stay_absent() {
        let update = SnapshotAssembler::build_update(&entity(4));
        assert!(update.velocity.is_none());
        assert!(update.hull.is_none());
        assert!(update.shield.is_none());
        assert!(update.guns.is_empty());
    }

    #[test]
    fn present_components_are_quantized() {
        let mut e = entity(4);
        e.position = Vec3::new(0.123_456, 0.0, 0.0);
        e.physics = Some(PhysicsBody {
            linear_velocity: Vec3::new(0.0, 0.0, 100.0),
            angular_velocity: Vec3::ZERO,
        });
        e.engine = Some(EngineState {
            throttle: 0.5,
            cruise: CruisePhase::Charging,
            ..EngineState::default()
        });
        e.health = Some(Health {
            hull: 300.0,
            shield: Some(50.0),
        });
        e.guns.push(Gun {
            hardpoint: 2,
            pitch: 0.1,
            rot: 0.2,
        });

        let update = SnapshotAssembler::build_update(&e);
        assert_eq!(update.position.x, quantize_position(e.position).x);
        assert!(update.velocity.is_some());
        assert_eq!(update.throttle, quantize_throttle(0.5));
        assert_eq!(update.cruise, CruisePhase::Charging);
        assert_eq!(update.hull, Some(300.0));
        assert_eq!(update.shield, Some(50.0));
        assert_eq!(update.guns.len(), 1);
    }

    #[test]
    fn snapshot_is_sorted_by_id() {
        let entities = [entity(5), entity(-2), entity(1)];
        let snapshot = SnapshotAssembler::assemble(SnapshotTick::new(1), &entities);
        let ids: Vec<i32> = snapshot.updates().iter().map(|u| u.id.raw()).collect();
        assert_eq!(ids, vec![-2, 1, 5]);
        assert!(snapshot.get(NetId::new(1)).is_some());
        assert!(snapshot.get(NetId::new(2)).is_none());
    }

    #[test]
    fn controlled_entity_excluded_from_candidates() {
        let entities: Vec<_> = (1..=10).map(entity).collect();
        let snapshot = SnapshotAssembler::assemble(SnapshotTick::new(1), &entities);
        let candidates =
            SnapshotAssembler::candidates(&snapshot, Some(NetId::new(7)), &NeutralReputation);
        assert_eq!(candidates.len(), 9);
        assert!(candidates.iter().all(|c| c.id != NetId::new(7)));
    }

    #[test]
    fn reputation_is_per_viewer() {
        let entities = [entity(1), entity(2)];
        let snapshot = SnapshotAssembler::assemble(SnapshotTick::new(1), &entities);
        let hostile_to_one = |viewer: Option<NetId>, _target: NetId| {
            if viewer == Some(NetId::new(1)) {
                RepAttitude::Hostile
            } else {
                RepAttitude::Neutral
            }
        };

        let for_one = SnapshotAssembler::candidates(&snapshot, Some(NetId::new(1)), &hostile_to_one);
        assert_eq!(for_one[0].rep, RepAttitude::Hostile);
        assert!(matches!(for_one[0], Cow::Owned(_)));

        let for_two = SnapshotAssembler::candidates(&snapshot, Some(NetId::new(2)), &hostile_to_one);
        assert_eq!(for_two[0].rep, RepAttitude::Neutral);
        assert!(matches!(for_two[0], Cow::Borrowed(_)));
        assert_eq!(snapshot.updates()[1].rep, RepAttitude::Neutral);
    }

    #[test]
    fn self_state_copies_raw_values() {
        let mut e = entity(3);
        e.health = Some(Health {
            hull: 80.0,
            shield: None,
        });
        e.engine = Some(EngineState {
            cruise_charge_pct: 0.4,
            ..EngineState::default()
        });
        let state = SnapshotAssembler::self_state(&e);
        assert_eq!(state.health, 80.0);
        assert_eq!(state.shield, 0.0);
        assert_eq!(state.position, e.position);
        assert_eq!(state.cruise_charge_pct, 0.4);
    }
}
