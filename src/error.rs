use std::io;

/// Errors surfaced by the protocol core.
///
/// Every variant is fatal for the party that observes it: the protocols keep
/// peers in lock step, so a failed exchange cannot be resumed.
#[derive(Debug, thiserror::Error)]
pub enum MpcError {
    /// Reading from or writing to a peer failed.
    #[error("transport failure with party {peer}: {source}")]
    Transport {
        peer: usize,
        #[source]
        source: io::Error,
    },

    /// The peer's send or receive loop has shut down.
    #[error("connection to party {peer} is closed")]
    Disconnected { peer: usize },

    /// Could not establish a connection during setup.
    #[error("failed to connect to party {peer} at {addr} after {attempts} attempts")]
    Connect {
        peer: usize,
        addr: String,
        attempts: usize,
    },

    /// A received frame could not be decoded.
    #[error("malformed {what}: {reason}")]
    Codec { what: &'static str, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid encryption parameters: {0}")]
    Parameters(String),

    /// A bridge operation ran before the collective keys were generated.
    #[error("multiparty keys have not been set up")]
    MissingKeys,

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl MpcError {
    pub(crate) fn codec(what: &'static str, reason: impl Into<String>) -> Self {
        MpcError::Codec { what, reason: reason.into() }
    }

    pub(crate) fn transport(peer: usize, source: io::Error) -> Self {
        MpcError::Transport { peer, source }
    }
}

pub type Result<T> = std::result::Result<T, MpcError>;
