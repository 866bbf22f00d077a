//! The server-side view of a replicated entity.

use codec::{CruisePhase, NetId, RepAttitude};
use glam::{Quat, Vec3};

/// Rigid body velocities, present only for physics-driven entities.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PhysicsBody {
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
}

/// Engine and cruise state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EngineState {
    /// In `[-1, 1]`.
    pub throttle: f32,
    pub cruise: CruisePhase,
    pub cruise_accel_pct: f32,
    pub cruise_charge_pct: f32,
    pub engine_kill: bool,
}

/// Hull and shield hit points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Health {
    pub hull: f32,
    pub shield: Option<f32>,
}

/// One turret hardpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gun {
    pub hardpoint: u32,
    pub pitch: f32,
    pub rot: f32,
}

/// A simulated entity with its optional components.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedEntity {
    pub id: NetId,
    pub position: Vec3,
    pub orientation: Quat,
    pub physics: Option<PhysicsBody>,
    pub engine: Option<EngineState>,
    pub health: Option<Health>,
    pub guns: Vec<Gun>,
    pub tradelane: bool,
}

impl SimulatedEntity {
    /// An entity with a transform and no components.
    #[must_use]
    pub fn new(id: NetId, position: Vec3, orientation: Quat) -> Self {
        Self {
            id,
            position,
            orientation,
            physics: None,
            engine: None,
            health: None,
            guns: Vec::new(),
            tradelane: false,
        }
    }
}

/// Recipient-specific attitude lookup.
pub trait ReputationView {
    /// Attitude of `target` toward the entity `viewer` controls.
    fn attitude(&self, viewer: Option<NetId>, target: NetId) -> RepAttitude;
}

/// Everyone is neutral to everyone.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeutralReputation;

impl ReputationView for NeutralReputation {
    fn attitude(&self, _viewer: Option<NetId>, _target: NetId) -> RepAttitude {
        RepAttitude::Neutral
    }
}

impl<F> ReputationView for F
where
    F: Fn(Option<NetId>, NetId) -> RepAttitude,
{
    fn attitude(&self, viewer: Option<NetId>, target: NetId) -> RepAttitude {
        self(viewer, target)
    }
}
