//! Packing scenarios and benchmarks for statecast replication.
//!
//! This crate provides:
//!
//! - A deterministic [`Scenario`] built on the demo world
//! - [`run_session`], which packs a scenario for one lossy client and
//!   collects size statistics
//!
//! # Design Principles
//!
//! - **Reproducible** - All scenarios are deterministic given a seed.
//! - **Measurable** - Output format suitable for CI regression tracking.

use codec::{ClientBaselines, CodecResult, NetId, ReplicaHistory, SnapshotTick};
use demo_world::{DemoWorld, WorldConfig};
use repgraph::{
    IdAllocator, PackPath, PriorityPacker, SimulatedEntity, SnapshotAssembler, TickSnapshot,
};

/// Fixed step the scenarios advance by.
pub const STEP_SECS: f32 = 1.0 / 60.0;

/// A demo world with its own ephemeral id pool.
#[derive(Debug, Clone)]
pub struct Scenario {
    world: DemoWorld,
    ids: IdAllocator,
    tick: u32,
}

impl Scenario {
    #[must_use]
    pub fn new(ships: u32, seed: u64) -> Self {
        Self {
            world: DemoWorld::new(WorldConfig {
                ships,
                seed,
                ..WorldConfig::default()
            }),
            ids: IdAllocator::new(1 << 16),
            tick: 0,
        }
    }

    #[must_use]
    pub fn world(&self) -> &DemoWorld {
        &self.world
    }

    /// Steps the world once and assembles the new tick.
    pub fn advance(&mut self) -> (TickSnapshot, Vec<SimulatedEntity>) {
        self.tick += 1;
        self.world.step(STEP_SECS, &mut self.ids);
        let entities = self.world.entities();
        let snapshot = SnapshotAssembler::assemble(SnapshotTick::new(self.tick), &entities);
        (snapshot, entities)
    }
}

/// Size statistics for one client session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub packets: u32,
    pub degraded: u32,
    pub included: u64,
    pub candidates: u64,
    /// Encoded packet sizes in send order.
    pub sizes: Vec<usize>,
}

impl SessionStats {
    #[must_use]
    pub fn p95(&self) -> usize {
        if self.sizes.is_empty() {
            return 0;
        }
        let mut sorted = self.sizes.clone();
        sorted.sort_unstable();
        let idx = ((sorted.len() as f64) * 0.95).ceil() as usize;
        sorted[idx.saturating_sub(1).min(sorted.len() - 1)]
    }

    #[must_use]
    pub fn average(&self) -> usize {
        if self.sizes.is_empty() {
            0
        } else {
            self.sizes.iter().sum::<usize>() / self.sizes.len()
        }
    }
}

/// Packs `ticks` ticks of `scenario` for one client controlling `viewer`.
///
/// Every `ack_every`th packet is acknowledged (0 never acknowledges).
pub fn run_session(
    scenario: &mut Scenario,
    viewer: NetId,
    budget: usize,
    ticks: u32,
    ack_every: u32,
) -> CodecResult<SessionStats> {
    let limits = wire::Limits {
        max_packet_bytes: budget,
        ..wire::Limits::default()
    };
    let mut packer = PriorityPacker::new(budget);
    let mut baselines = ClientBaselines::new();
    let mut history = ReplicaHistory::new();
    let mut stats = SessionStats::default();

    for index in 0..ticks {
        let (snapshot, entities) = scenario.advance();
        let candidates =
            SnapshotAssembler::candidates(&snapshot, Some(viewer), scenario.world());
        let self_state = entities
            .iter()
            .find(|entity| entity.id == viewer)
            .map(SnapshotAssembler::self_state)
            .unwrap_or_default();

        let (packet, report) = packer.pack(snapshot.tick, self_state, &candidates, &mut baselines)?;
        let bytes = packet.to_bytes(&limits)?;
        history.receive(&bytes, packer.codec(), &limits)?;
        if ack_every > 0 && index % ack_every == 0 {
            if let Some(ack) = history.ack_window() {
                baselines.acknowledge(ack);
            }
        }

        stats.packets += 1;
        stats.degraded += u32::from(report.path == PackPath::Degraded);
        stats.included += report.included as u64;
        stats.candidates += report.candidates as u64;
        stats.sizes.push(report.bytes);
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenarios_are_deterministic() {
        let mut a = Scenario::new(32, 5);
        let mut b = Scenario::new(32, 5);
        for _ in 0..50 {
            assert_eq!(a.advance().0, b.advance().0);
        }
    }

    #[test]
    fn session_stays_within_budget() {
        let mut scenario = Scenario::new(200, 3);
        let stats = run_session(&mut scenario, NetId::new(1), 1200, 120, 1).unwrap();
        assert_eq!(stats.packets, 120);
        assert!(stats.sizes.iter().all(|size| *size <= 1200));
        assert!(stats.degraded > 0);
        assert!(stats.p95() <= 1200);
    }

    #[test]
    fn acknowledged_sessions_are_smaller() {
        let acked = run_session(&mut Scenario::new(24, 9), NetId::new(1), 1200, 60, 1).unwrap();
        let silent = run_session(&mut Scenario::new(24, 9), NetId::new(1), 1200, 60, 0).unwrap();
        assert!(acked.average() < silent.average());
    }
}
