//! Replication server configuration.

/// Per-server replication settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ReplicationConfig {
    /// Transport ceiling per outbound packet, header included.
    pub max_packet_bytes: usize,
    /// Most entities one packet may list.
    pub max_entities_per_packet: usize,
    /// Size of the ephemeral id pool.
    pub max_ephemeral_ids: usize,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            max_packet_bytes: 1200,
            max_entities_per_packet: wire::Limits::default().max_entities,
            max_ephemeral_ids: 1 << 20,
        }
    }
}

impl ReplicationConfig {
    /// Smaller values that force the degraded path with few entities.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            max_packet_bytes: 500,
            max_entities_per_packet: wire::Limits::for_testing().max_entities,
            max_ephemeral_ids: 1024,
        }
    }

    /// Wire limits matching this configuration.
    #[must_use]
    pub fn wire_limits(&self) -> wire::Limits {
        wire::Limits {
            max_packet_bytes: self.max_packet_bytes,
            max_entities: self.max_entities_per_packet,
        }
    }
}
