//! Replication graph: what each client receives each tick.
//!
//! This crate sits on top of `codec`. Once per tick it turns simulated
//! entities into update records, then packs a budgeted, per-client packet
//! from them against that client's acknowledged baselines.
//!
//! # Example
//!
//! ```
//! use codec::{ClientBaselines, NetId, SnapshotTick};
//! use glam::{Quat, Vec3};
//! use repgraph::{NeutralReputation, PriorityPacker, SimulatedEntity, SnapshotAssembler};
//!
//! let ships: Vec<_> = (1..=3)
//!     .map(|id| SimulatedEntity::new(NetId::new(id), Vec3::splat(id as f32), Quat::IDENTITY))
//!     .collect();
//! let tick = SnapshotTick::new(1);
//! let snapshot = SnapshotAssembler::assemble(tick, &ships);
//!
//! let viewer = Some(NetId::new(1));
//! let candidates = SnapshotAssembler::candidates(&snapshot, viewer, &NeutralReputation);
//! let self_state = SnapshotAssembler::self_state(&ships[0]);
//!
//! let mut packer = PriorityPacker::new(1200);
//! let mut baselines = ClientBaselines::new();
//! let (packet, report) = packer.pack(tick, self_state, &candidates, &mut baselines).unwrap();
//! assert_eq!(packet.ids, vec![2, 3]);
//! assert!(report.bytes <= 1200);
//! ```

mod assembler;
mod config;
mod error;
mod ids;
mod packer;
mod server;
mod world;

pub use assembler::{SnapshotAssembler, TickSnapshot};
pub use config::ReplicationConfig;
pub use error::{ReplicationError, ReplicationResult};
pub use ids::{IdAllocator, IdError};
pub use packer::{OutboundPacket, PackPath, PackReport, PriorityPacker, PACKET_OVERHEAD};
pub use server::{ClientId, ClientOptions, LocalUpdate, ReplicationServer, TickReport, Transport};
pub use world::{
    EngineState, Gun, Health, NeutralReputation, PhysicsBody, ReputationView, SimulatedEntity,
};
