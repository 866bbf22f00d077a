//! Entity update records, delta encoding and baseline tracking for statecast.
//!
//! This crate ties bitstream and wire together with the replication data
//! model: what one entity looks like at one tick, how it is encoded against
//! the state a recipient already holds, and how each side remembers those
//! states.
//!
//! # Features
//!
//! - [`ObjectUpdate`] records quantized once at assembly time
//! - A replaceable [`DeltaCodec`] with a field-level default
//! - Per-connection [`ClientBaselines`] with windowed acknowledgements
//! - Client-side [`ReplicaHistory`] and [`decode_update_packet`]
//!
//! # Design Principles
//!
//! - **Bit-exact** - Decoding against the baseline used for encoding reproduces the record.
//! - **Explicit state** - Trackers are owned values passed in by the caller.
//! - **Deterministic** - Same inputs produce same outputs.

mod baseline;
mod delta;
mod error;
mod history;
mod limits;
mod scratch;
mod self_state;
mod tracker;
mod types;
mod update;

/// Sent and received states kept per connection, in ticks.
pub const HISTORY_CAPACITY: usize = 128;

pub use baseline::{BaselineError, BaselineStore};
pub use delta::{BaselineLookup, DeltaCodec, FieldDeltaCodec};
pub use error::{CodecError, CodecResult, LimitKind};
pub use history::{decode_update_packet, DecodedPacket, ReplicaHistory};
pub use limits::CodecLimits;
pub use scratch::CodecScratch;
pub use self_state::{SelfState, SELF_STATE_SIZE};
pub use tracker::{AckOutcome, AckWindow, ClientBaselines, SentState, ACK_HISTORY_BITS};
pub use types::{CruisePhase, NetId, RepAttitude, SnapshotTick};
pub use update::{
    quantize_position, quantize_throttle, throttle_to_f32, GunOrient, ObjectUpdate, PackedQuat,
    QuantizedVec3, Velocity, ANGULAR_VELOCITY_RANGE, LINEAR_VELOCITY_RANGE, POSITION_GRID,
    THROTTLE_STEPS,
};
pub use wire::Limits as WireLimits;
