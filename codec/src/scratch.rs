//! Reusable scratch buffers for codec operations.

use bitstream::BitWriter;

use crate::delta::DeltaCodec;
use crate::error::CodecResult;
use crate::types::SnapshotTick;
use crate::update::ObjectUpdate;

/// Scratch writer for measuring and collecting per-entity deltas.
#[derive(Debug, Default)]
pub struct CodecScratch {
    writer: BitWriter,
}

impl CodecScratch {
    /// Creates a new scratch buffer with no pre-allocated capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Encodes one entity delta and appends it to `out`, returning its length.
    pub fn encode_delta<C: DeltaCodec + ?Sized>(
        &mut self,
        codec: &C,
        current: &ObjectUpdate,
        baseline: Option<(SnapshotTick, &ObjectUpdate)>,
        tick: SnapshotTick,
        out: &mut Vec<u8>,
    ) -> CodecResult<usize> {
        self.writer.clear();
        codec.write_delta(current, baseline, tick, &mut self.writer)?;
        self.writer.align_to_byte();
        let bytes = self.writer.as_bytes();
        out.extend_from_slice(bytes);
        Ok(bytes.len())
    }
}
