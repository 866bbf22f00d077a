//! Error types for replication.

use std::fmt;

use codec::CodecError;

use crate::ids::IdError;
use crate::server::ClientId;

/// Result type for replication server operations.
pub type ReplicationResult<T> = Result<T, ReplicationError>;

/// Errors from the replication server.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReplicationError {
    /// Packing or encoding failed.
    Codec(CodecError),
    /// Ephemeral id pool error.
    Id(IdError),
    /// The client is not connected.
    UnknownClient(ClientId),
}

impl fmt::Display for ReplicationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Codec(err) => write!(f, "codec error: {err}"),
            Self::Id(err) => write!(f, "id error: {err}"),
            Self::UnknownClient(client) => write!(f, "unknown client {}", client.0),
        }
    }
}

impl std::error::Error for ReplicationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Codec(err) => Some(err),
            Self::Id(err) => Some(err),
            Self::UnknownClient(_) => None,
        }
    }
}

impl From<CodecError> for ReplicationError {
    fn from(err: CodecError) -> Self {
        Self::Codec(err)
    }
}

impl From<IdError> for ReplicationError {
    fn from(err: IdError) -> Self {
        Self::Id(err)
    }
}

impl From<wire::EncodeError> for ReplicationError {
    fn from(err: wire::EncodeError) -> Self {
        Self::Codec(err.into())
    }
}
