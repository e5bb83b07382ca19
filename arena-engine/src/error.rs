//! Error taxonomies for the Arena engine
//!
//! Every error here is recoverable at the composition-root boundary; none
//! should crash the application. Malformed single stream frames are not
//! errors at all — they are dropped and logged by the consumer.

use arena_common::model::SessionPhase;
use thiserror::Error;
use uuid::Uuid;

/// Participant directory lookup errors
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Identifier absent from the directory even after a refetch
    #[error("mind not found in directory: {0}")]
    NotFound(Uuid),

    /// Directory fetch failed (network or decode)
    #[error("directory fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),
}

/// Stream connection errors.
///
/// These cover opening the connection; once open, transport failures are
/// reported in-band as a terminal `TransportError` event.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Connection attempt failed
    #[error("stream connect failed: {0}")]
    Connect(#[source] reqwest::Error),

    /// Connection attempt exceeded the configured bound
    #[error("stream connect timed out")]
    ConnectTimeout,

    /// Server refused the subscription
    #[error("stream endpoint returned HTTP {0}")]
    HttpStatus(u16),
}

/// Replay loading errors
#[derive(Debug, Error)]
pub enum ReplayError {
    /// The debate reference does not resolve
    #[error("replay not found: {0}")]
    NotFound(String),

    /// Transport failure against the replay store
    #[error("replay request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The store returned a document the read model cannot represent
    #[error("malformed replay document: {0}")]
    Malformed(String),
}

/// Vote casting errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VoteError {
    /// A vote was already cast this session; the tally is unchanged
    #[error("a vote was already cast this session")]
    AlreadyVoted,
}

/// Session controller errors
#[derive(Debug, Error)]
pub enum SessionError {
    /// Creation request was rejected by the service
    #[error("debate creation rejected: HTTP {status}: {message}")]
    CreateRejected { status: u16, message: String },

    /// Creation request failed before a response arrived
    #[error("debate creation failed: {0}")]
    CreateFailed(#[source] reqwest::Error),

    /// Creation did not acknowledge within the configured bound
    #[error("debate creation timed out")]
    CreateTimeout,

    /// A participant id did not resolve in the directory
    #[error("unknown participant: {0}")]
    MindUnknown(Uuid),

    /// Both sides of a debate must be distinct participants
    #[error("participants must be distinct")]
    MindsNotDistinct,

    /// Operation not valid in the current phase
    #[error("cannot {operation} while {phase}")]
    InvalidPhase {
        operation: &'static str,
        phase: SessionPhase,
    },

    /// Retry requested but no prior creation parameters are held
    #[error("no failed session to retry")]
    NoRetryContext,

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error(transparent)]
    Replay(#[from] ReplayError),

    #[error(transparent)]
    Vote(#[from] VoteError),
}
