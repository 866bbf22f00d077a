use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use codec::{FieldDeltaCodec, NetId, ReplicaHistory, SnapshotTick};
use demo_world::{DemoWorld, WorldConfig};
use repgraph::{
    ClientId, ClientOptions, LocalUpdate, PackPath, ReplicationConfig, ReplicationServer,
    SnapshotAssembler, TickReport, Transport,
};
use serde::{Deserialize, Serialize};
use tick::{Clock, ManualClock, StepContext, SystemClock, TickConfig, TickScheduler};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "demo-sim",
    version,
    about = "Replicates a deterministic demo world to lossy clients"
)]
struct Cli {
    /// Number of ships in the world.
    #[arg(long, default_value_t = 48)]
    ships: u32,
    /// Number of remote clients, each controlling one ship.
    #[arg(long, default_value_t = 4)]
    clients: u32,
    /// Number of in-process clients served unpacked updates.
    #[arg(long, default_value_t = 0)]
    local_clients: u32,
    /// Number of ticks to simulate.
    #[arg(long, default_value_t = 600)]
    ticks: u32,
    /// RNG seed for deterministic results.
    #[arg(long, default_value_t = 1)]
    seed: u64,
    /// Drop every Nth packet per client (0 disables).
    #[arg(long, default_value_t = 7)]
    drop_every: u32,
    /// Drop every Nth acknowledgement per client (0 disables).
    #[arg(long, default_value_t = 5)]
    ack_drop_every: u32,
    /// Stall the simulation every N ticks (0 disables).
    #[arg(long, default_value_t = 0)]
    stall_every: u32,
    /// Length of each stall in milliseconds.
    #[arg(long, default_value_t = 40)]
    stall_ms: u64,
    /// Run against the wall clock instead of a simulated one.
    #[arg(long)]
    realtime: bool,
    /// JSON file with `tick` and `replication` settings.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Write the summary here instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
    /// Fail if p95 packet size exceeds this value.
    #[arg(long)]
    max_p95_bytes: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SimConfig {
    tick: TickConfig,
    replication: ReplicationConfig,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => SimConfig::default(),
    };
    info!(
        ships = cli.ships,
        clients = cli.clients,
        ticks = cli.ticks,
        rate = config.tick.rate(),
        budget = config.replication.max_packet_bytes,
        "starting simulation"
    );

    let summary = if cli.realtime {
        run(&cli, &config, &SystemClock::new())?
    } else {
        run(&cli, &config, &ManualClock::new())?
    };

    summary.assert_budget(cli.max_p95_bytes)?;
    let contents = serde_json::to_string_pretty(&summary).context("serialize summary")?;
    match &cli.out {
        Some(path) => {
            fs::write(path, contents).with_context(|| format!("write {}", path.display()))?;
        }
        None => println!("{contents}"),
    }
    Ok(())
}

fn load_config(path: &Path) -> Result<SimConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))
}

struct RemoteClient {
    id: ClientId,
    controlled: NetId,
    history: ReplicaHistory,
}

#[derive(Default)]
struct Outbox {
    packets: Vec<(ClientId, Vec<u8>)>,
    local: Vec<(ClientId, LocalUpdate)>,
}

impl Transport for Outbox {
    fn send_packet(&mut self, client: ClientId, bytes: &[u8]) {
        self.packets.push((client, bytes.to_vec()));
    }

    fn send_local(&mut self, client: ClientId, update: LocalUpdate) {
        self.local.push((client, update));
    }
}

struct Simulation {
    world: DemoWorld,
    server: ReplicationServer,
    clients: Vec<RemoteClient>,
    codec: FieldDeltaCodec,
    limits: codec::WireLimits,
    drop_every: u32,
    ack_drop_every: u32,
    summary: Summary,
}

impl Simulation {
    fn new(cli: &Cli, config: &SimConfig) -> Result<Self> {
        let world = DemoWorld::new(WorldConfig {
            ships: cli.ships,
            seed: cli.seed,
            ..WorldConfig::default()
        });
        let ships = world.ship_ids();
        if (cli.clients + cli.local_clients) as usize > ships.len() {
            anyhow::bail!(
                "{} clients need at least as many ships, have {}",
                cli.clients + cli.local_clients,
                ships.len()
            );
        }

        let mut server = ReplicationServer::new(config.replication);
        let mut clients = Vec::new();
        for (index, controlled) in ships.iter().enumerate() {
            let index = index as u32;
            let id = ClientId(index + 1);
            if index < cli.clients {
                server.connect(
                    id,
                    ClientOptions {
                        controlled: Some(*controlled),
                        local: false,
                    },
                );
                clients.push(RemoteClient {
                    id,
                    controlled: *controlled,
                    history: ReplicaHistory::new(),
                });
            } else if index < cli.clients + cli.local_clients {
                server.connect(
                    id,
                    ClientOptions {
                        controlled: Some(*controlled),
                        local: true,
                    },
                );
            }
        }

        Ok(Self {
            world,
            limits: config.replication.wire_limits(),
            server,
            clients,
            codec: FieldDeltaCodec::default(),
            drop_every: cli.drop_every,
            ack_drop_every: cli.ack_drop_every,
            summary: Summary::new(cli, config),
        })
    }

    fn step(&mut self, ctx: &StepContext) -> Result<()> {
        let raw = u32::try_from(ctx.tick).context("tick counter overflow")?;
        let tick = SnapshotTick::new(raw);
        if !ctx.fixed {
            self.summary.flushed_steps += 1;
        }

        self.world.step(ctx.dt.as_secs_f32(), &mut self.server);
        let entities = self.world.entities();
        let mut outbox = Outbox::default();
        let report = self
            .server
            .replicate_tick(tick, &entities, &self.world, &mut outbox)
            .with_context(|| format!("replicate tick {raw}"))?;
        self.summary.record_tick(&report);
        self.summary.local_updates += outbox.local.len() as u64;

        let snapshot = SnapshotAssembler::assemble(tick, &entities);
        for (client_id, bytes) in outbox.packets {
            let Some(client) = self.clients.iter_mut().find(|c| c.id == client_id) else {
                continue;
            };
            self.server
                .record_input(client.id, raw)
                .context("record input")?;
            if every(self.drop_every, raw + client.id.0) {
                self.summary.packets_dropped += 1;
                continue;
            }

            let decoded = client
                .history
                .receive(&bytes, &self.codec, &self.limits)
                .with_context(|| format!("client {} decode tick {raw}", client.id.0))?;
            let expected =
                SnapshotAssembler::candidates(&snapshot, Some(client.controlled), &self.world);
            for update in &decoded.updates {
                let matches = expected
                    .iter()
                    .find(|candidate| candidate.id == update.id)
                    .is_some_and(|candidate| candidate.bit_eq(update));
                if !matches {
                    anyhow::bail!("client {} tick {raw}: {} decoded wrong", client.id.0, update.id);
                }
            }
            self.summary.entities_decoded += decoded.updates.len() as u64;

            if every(self.ack_drop_every, raw + 2 * client.id.0) {
                self.summary.acks_dropped += 1;
                continue;
            }
            if let Some(ack) = client.history.ack_window() {
                let outcome = self
                    .server
                    .handle_ack(client.id, ack)
                    .context("handle ack")?;
                debug!(client = client.id.0, ?outcome, "ack");
            }
        }
        Ok(())
    }
}

fn every(period: u32, value: u32) -> bool {
    period > 0 && value % period == 0
}

fn run<C: Clock>(cli: &Cli, config: &SimConfig, clock: &C) -> Result<Summary> {
    let mut sim = Simulation::new(cli, config)?;
    let mut scheduler = TickScheduler::with_clock(config.tick.clone(), clock);
    let stop = scheduler.stop_handle();
    let stall = Duration::from_millis(cli.stall_ms);
    let ticks = u64::from(cli.ticks);
    let mut failure = None;

    scheduler.run(|ctx| {
        if failure.is_some() || ctx.tick > ticks {
            return;
        }
        if let Err(err) = sim.step(ctx) {
            failure = Some(err);
            stop.stop();
            return;
        }
        if ctx.tick >= ticks {
            stop.stop();
        } else if every(cli.stall_every, ctx.tick as u32) {
            warn!(tick = ctx.tick, stall_ms = cli.stall_ms, "stalling");
            clock.sleep(stall);
        }
    });
    if let Some(err) = failure {
        return Err(err);
    }

    let mut summary = sim.summary;
    summary.finalize(scheduler.total(), sim.world.stats().missiles_fired);
    info!(
        packets = summary.packets_sent,
        avg_bytes = summary.avg_packet_bytes,
        degraded = summary.degraded_packets,
        "simulation finished"
    );
    Ok(summary)
}

#[derive(Debug, Serialize)]
struct Summary {
    ships: u32,
    clients: u32,
    local_clients: u32,
    ticks: u32,
    seed: u64,
    budget_bytes: usize,
    steps_run: u64,
    flushed_steps: u32,
    simulated_ms: u128,
    missiles_fired: u32,
    packets_sent: u64,
    packets_dropped: u64,
    acks_dropped: u64,
    local_updates: u64,
    fast_packets: u64,
    degraded_packets: u64,
    entities_included: u64,
    entities_skipped: u64,
    entities_decoded: u64,
    oversized_entities: u64,
    rejected_entities: u64,
    failed_packets: u64,
    bytes_total: u64,
    avg_packet_bytes: u64,
    p95_packet_bytes: u64,
    max_packet_bytes: u64,
    #[serde(skip)]
    packet_sizes: Vec<u64>,
}

impl Summary {
    fn new(cli: &Cli, config: &SimConfig) -> Self {
        Self {
            ships: cli.ships,
            clients: cli.clients,
            local_clients: cli.local_clients,
            ticks: cli.ticks,
            seed: cli.seed,
            budget_bytes: config.replication.max_packet_bytes,
            steps_run: 0,
            flushed_steps: 0,
            simulated_ms: 0,
            missiles_fired: 0,
            packets_sent: 0,
            packets_dropped: 0,
            acks_dropped: 0,
            local_updates: 0,
            fast_packets: 0,
            degraded_packets: 0,
            entities_included: 0,
            entities_skipped: 0,
            entities_decoded: 0,
            oversized_entities: 0,
            rejected_entities: 0,
            failed_packets: 0,
            bytes_total: 0,
            avg_packet_bytes: 0,
            p95_packet_bytes: 0,
            max_packet_bytes: 0,
            packet_sizes: Vec::new(),
        }
    }

    fn record_tick(&mut self, report: &TickReport) {
        self.steps_run += 1;
        self.failed_packets += report.failed.len() as u64;
        for (_, pack) in &report.packed {
            self.packets_sent += 1;
            match pack.path {
                PackPath::Fast => self.fast_packets += 1,
                PackPath::Degraded => self.degraded_packets += 1,
            }
            self.entities_included += pack.included as u64;
            self.entities_skipped += pack.skipped as u64;
            self.oversized_entities += pack.oversized.len() as u64;
            self.rejected_entities += pack.rejected.len() as u64;
            self.bytes_total += pack.bytes as u64;
            self.packet_sizes.push(pack.bytes as u64);
        }
    }

    fn finalize(&mut self, simulated: Duration, missiles_fired: u32) {
        self.simulated_ms = simulated.as_millis();
        self.missiles_fired = missiles_fired;
        if self.packets_sent > 0 {
            self.avg_packet_bytes = self.bytes_total / self.packets_sent;
            self.packet_sizes.sort_unstable();
            let idx = ((self.packet_sizes.len() as f64) * 0.95).ceil() as usize;
            let idx = idx.saturating_sub(1).min(self.packet_sizes.len() - 1);
            self.p95_packet_bytes = self.packet_sizes[idx];
            self.max_packet_bytes = self.packet_sizes.last().copied().unwrap_or(0);
        }
    }

    fn assert_budget(&self, max_p95: Option<usize>) -> Result<()> {
        if self.max_packet_bytes > self.budget_bytes as u64 {
            anyhow::bail!(
                "packet of {} bytes exceeds budget {}",
                self.max_packet_bytes,
                self.budget_bytes
            );
        }
        if let Some(max_p95) = max_p95 {
            if self.p95_packet_bytes > max_p95 as u64 {
                anyhow::bail!(
                    "p95 packet bytes {} exceeds budget {}",
                    self.p95_packet_bytes,
                    max_p95
                );
            }
        }
        Ok(())
    }
}
