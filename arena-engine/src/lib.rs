//! # Arena Debate Engine (arena-engine)
//!
//! Live debate streaming and transcript reconstruction.
//!
//! **Purpose:** Create a debate session, consume its server-push event
//! stream, reconstruct an ordered transcript from out-of-band events,
//! track a local vote tally, and expose the same read model for persisted
//! (replay) debates.
//!
//! **Architecture:** One [`session::SessionController`] per active view.
//! The controller owns the session state machine, wires the
//! [`stream::StreamConsumer`]'s typed event channel into the
//! [`transcript::TranscriptReconstructor`] inside a single control loop,
//! and broadcasts view-change events to observers. Historical debates go
//! through a [`replay::ReplayLoader`] and never touch the stream path.
//!
//! No CLI surface: the engine is a library, wired up by a UI composition
//! root.

use std::time::Duration;

use arena_common::{ArenaConfig, Error, Result};

pub mod error;
pub mod registry;
pub mod replay;
pub mod session;
pub mod stream;
pub mod transcript;
pub mod votes;

pub use error::{RegistryError, ReplayError, SessionError, StreamError, VoteError};
pub use registry::MindRegistry;
pub use replay::{FixtureReplayLoader, RemoteReplayLoader, ReplayLoader};
pub use session::{SessionController, SessionView};
pub use stream::StreamConsumer;
pub use transcript::TranscriptReconstructor;
pub use votes::VoteAggregator;

const USER_AGENT: &str = concat!("arena-engine/", env!("CARGO_PKG_VERSION"));

/// Build the shared HTTP client for all engine components.
///
/// Only a connect timeout is set here: a whole-request timeout would also
/// bound the long-lived stream connection and kill healthy debates
/// mid-stream. Plain request/response calls apply the configured request
/// timeout per request instead.
pub fn build_http_client(config: &ArenaConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .build()
        .map_err(|e| Error::Internal(format!("failed to build HTTP client: {}", e)))
}
