//! Per-tick replication to every connected client.

use std::collections::{BTreeMap, HashMap};

use codec::{
    AckOutcome, AckWindow, ClientBaselines, DeltaCodec, FieldDeltaCodec, NetId, ObjectUpdate,
    SelfState, SnapshotTick,
};
use tracing::{debug, trace, warn};

use crate::assembler::SnapshotAssembler;
use crate::config::ReplicationConfig;
use crate::error::{ReplicationError, ReplicationResult};
use crate::ids::IdAllocator;
use crate::packer::{PackReport, PriorityPacker};
use crate::world::{ReputationView, SimulatedEntity};

/// Client identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u32);

/// How a client is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClientOptions {
    /// Entity the client controls; it arrives as self state only.
    pub controlled: Option<NetId>,
    /// In-process client served unpacked updates.
    pub local: bool,
}

/// Unpacked update for an in-process client.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalUpdate {
    pub tick: SnapshotTick,
    pub input_sequence: u32,
    pub self_state: SelfState,
    pub updates: Vec<ObjectUpdate>,
}

/// Fire-and-forget delivery.
pub trait Transport {
    fn send_packet(&mut self, client: ClientId, bytes: &[u8]);

    fn send_local(&mut self, client: ClientId, update: LocalUpdate);
}

/// Outcome of one replicated tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub tick: SnapshotTick,
    pub entities: usize,
    /// Pack statistics for each remote client, by client id.
    pub packed: Vec<(ClientId, PackReport)>,
    pub local: usize,
    /// Remote clients that got no packet this tick.
    pub failed: Vec<(ClientId, ReplicationError)>,
}

#[derive(Debug)]
struct ClientState {
    options: ClientOptions,
    baselines: ClientBaselines,
}

/// Owns every client's baseline state and turns simulated entities into
/// per-client packets once per tick.
#[derive(Debug)]
pub struct ReplicationServer<C: DeltaCodec = FieldDeltaCodec> {
    config: ReplicationConfig,
    limits: wire::Limits,
    ids: IdAllocator,
    packer: PriorityPacker<C>,
    clients: BTreeMap<ClientId, ClientState>,
}

impl ReplicationServer<FieldDeltaCodec> {
    #[must_use]
    pub fn new(config: ReplicationConfig) -> Self {
        Self::with_codec(config, FieldDeltaCodec::default())
    }
}

impl<C: DeltaCodec> ReplicationServer<C> {
    #[must_use]
    pub fn with_codec(config: ReplicationConfig, codec: C) -> Self {
        Self {
            config,
            limits: config.wire_limits(),
            ids: IdAllocator::new(config.max_ephemeral_ids),
            packer: PriorityPacker::with_codec(codec, config.max_packet_bytes)
                .with_max_entities(config.max_entities_per_packet),
            clients: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ReplicationConfig {
        &self.config
    }

    #[must_use]
    pub fn ids(&self) -> &IdAllocator {
        &self.ids
    }

    pub fn codec(&self) -> &C {
        self.packer.codec()
    }

    /// Connects a client, replacing any previous state under the same id.
    pub fn connect(&mut self, client: ClientId, options: ClientOptions) {
        debug!(client = client.0, ?options, "client connected");
        self.clients.insert(
            client,
            ClientState {
                options,
                baselines: ClientBaselines::new(),
            },
        );
    }

    /// Returns `true` if the client was connected.
    pub fn disconnect(&mut self, client: ClientId) -> bool {
        let removed = self.clients.remove(&client).is_some();
        if removed {
            debug!(client = client.0, "client disconnected");
        }
        removed
    }

    #[must_use]
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn set_controlled(
        &mut self,
        client: ClientId,
        controlled: Option<NetId>,
    ) -> ReplicationResult<()> {
        self.client_mut(client)?.options.controlled = controlled;
        Ok(())
    }

    /// Issues an id for a server-spawned transient entity.
    pub fn spawn_ephemeral(&mut self) -> ReplicationResult<NetId> {
        Ok(self.ids.allocate()?)
    }

    /// Issues an id, or `None` when the pool is exhausted.
    pub fn try_spawn_ephemeral(&mut self) -> Option<NetId> {
        self.ids.try_allocate()
    }

    /// Removes an entity from every client's baseline state and returns an
    /// ephemeral id to the pool.
    pub fn despawn(&mut self, id: NetId) -> ReplicationResult<()> {
        if id.is_ephemeral() {
            self.ids.free(id)?;
        }
        for state in self.clients.values_mut() {
            state.baselines.forget(id);
        }
        Ok(())
    }

    pub fn handle_ack(&mut self, client: ClientId, ack: AckWindow) -> ReplicationResult<AckOutcome> {
        Ok(self.client_mut(client)?.baselines.acknowledge(ack))
    }

    pub fn record_input(&mut self, client: ClientId, sequence: u32) -> ReplicationResult<()> {
        self.client_mut(client)?.baselines.record_input(sequence);
        Ok(())
    }

    pub fn baselines(&self, client: ClientId) -> Option<&ClientBaselines> {
        self.clients.get(&client).map(|state| &state.baselines)
    }

    /// Assembles `entities` once and sends every client its update for `tick`.
    ///
    /// A client whose packet cannot be built is listed in
    /// [`TickReport::failed`]; the others are still served.
    pub fn replicate_tick(
        &mut self,
        tick: SnapshotTick,
        entities: &[SimulatedEntity],
        reputation: &dyn ReputationView,
        transport: &mut impl Transport,
    ) -> ReplicationResult<TickReport> {
        let snapshot = SnapshotAssembler::assemble(tick, entities);
        let by_id: HashMap<NetId, &SimulatedEntity> =
            entities.iter().map(|entity| (entity.id, entity)).collect();

        let mut report = TickReport {
            tick,
            entities: snapshot.len(),
            packed: Vec::with_capacity(self.clients.len()),
            local: 0,
            failed: Vec::new(),
        };

        for (client, state) in &mut self.clients {
            let controlled = state.options.controlled;
            let self_state = controlled
                .and_then(|id| by_id.get(&id))
                .map(|entity| SnapshotAssembler::self_state(entity))
                .unwrap_or_default();
            let candidates = SnapshotAssembler::candidates(&snapshot, controlled, reputation);

            if state.options.local {
                transport.send_local(
                    *client,
                    LocalUpdate {
                        tick,
                        input_sequence: state.baselines.latest_input(),
                        self_state,
                        updates: candidates.into_iter().map(|c| c.into_owned()).collect(),
                    },
                );
                report.local += 1;
                continue;
            }

            let packed = self
                .packer
                .pack(tick, self_state, &candidates, &mut state.baselines)
                .map_err(ReplicationError::from)
                .and_then(|(packet, pack_report)| {
                    let bytes = packet.to_bytes(&self.limits)?;
                    Ok((bytes, pack_report))
                });
            match packed {
                Ok((bytes, pack_report)) => {
                    trace!(client = client.0, bytes = bytes.len(), "sending update");
                    transport.send_packet(*client, &bytes);
                    report.packed.push((*client, pack_report));
                }
                Err(err) => {
                    warn!(client = client.0, tick = tick.raw(), %err, "no update sent");
                    report.failed.push((*client, err));
                }
            }
        }
        Ok(report)
    }

    fn client_mut(&mut self, client: ClientId) -> ReplicationResult<&mut ClientState> {
        self.clients
            .get_mut(&client)
            .ok_or(ReplicationError::UnknownClient(client))
    }
}
