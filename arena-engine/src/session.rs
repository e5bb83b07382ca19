//! Session controller: the top-level debate orchestrator
//!
//! Owns the session state machine and the single control loop that feeds
//! stream events into the transcript reconstructor. All state transitions
//! are triggered by discrete events (a caller action or a stream frame)
//! and run to completion before the next event is processed; each session
//! owns exactly one consumer/reconstructor pair, so no interleaved
//! mutation of a session is possible.
//!
//! Phases: `Idle --start--> Creating --ack--> Streaming --completed-->
//! Completed`; `Streaming --transport error--> Errored` (transcript
//! retained, manual retry re-enters Creating); any phase `--exit-->
//! Idle`; `Idle --open_replay--> Replaying --ok--> Completed` /
//! `--fail--> Errored`.

use std::sync::Arc;

use arena_common::api::{CreateDebateRequest, CreateDebateResponse};
use arena_common::events::{DebateEvent, SessionBus, SessionEvent};
use arena_common::model::{
    DebateSession, Participant, ReplayMeta, Role, SessionPhase, Slot, Transcript,
    TranscriptStatus, VoteTally,
};
use arena_common::ArenaConfig;
use chrono::Utc;
use serde::Serialize;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{RegistryError, SessionError};
use crate::registry::MindRegistry;
use crate::replay::ReplayLoader;
use crate::stream::StreamConsumer;
use crate::transcript::TranscriptReconstructor;
use crate::votes::VoteAggregator;

/// Read-only projection of the session for rendering.
///
/// Live and replay debates surface through this one shape; the rendering
/// layer never needs to know which path produced it.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub phase: SessionPhase,
    /// Server-assigned id (live sessions)
    pub debate_id: Option<Uuid>,
    /// Store reference (replays)
    pub debate_ref: Option<String>,
    pub topic: Option<String>,
    pub framework: Option<String>,
    /// (first slot, second slot)
    pub participants: Option<(Participant, Participant)>,
    pub transcript: Transcript,
    pub tally: VoteTally,
    /// Replay metadata, when viewing a replay
    pub replay: Option<ReplayMeta>,
}

impl SessionView {
    /// Assemble the full live-session read model, when one is active
    pub fn debate_session(&self) -> Option<DebateSession> {
        Some(DebateSession {
            id: self.debate_id?,
            topic: self.topic.clone()?,
            framework: self.framework.clone()?,
            participants: self.participants.clone()?,
            transcript: self.transcript.clone(),
        })
    }
}

/// Parameters of the last creation attempt, kept for manual retry
#[derive(Debug, Clone)]
struct CreateParams {
    topic: String,
    framework: String,
    minds: (Uuid, Uuid),
    rounds: u32,
}

/// Immutable facts about the session being viewed
#[derive(Debug, Clone)]
struct Descriptor {
    debate_id: Option<Uuid>,
    debate_ref: Option<String>,
    topic: String,
    framework: String,
    participants: (Participant, Participant),
}

/// Mutable session state behind the controller's lock
struct SessionState {
    phase: SessionPhase,
    descriptor: Option<Descriptor>,
    reconstructor: TranscriptReconstructor,
    votes: VoteAggregator,
    replay_meta: Option<ReplayMeta>,
    last_create: Option<CreateParams>,
}

/// Handle on the running control loop of a live session.
///
/// Dropping it cancels the loop and aborts the task, which closes the
/// stream connection — the backstop for every exit path.
struct LiveHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Drop for LiveHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}

/// Top-level orchestrator for one debate view.
///
/// Owns the DebateSession and VoteTally exclusively for the lifetime of
/// the view; guarantees the stream connection is released on every exit
/// path.
pub struct SessionController {
    config: ArenaConfig,
    http: reqwest::Client,
    registry: Arc<MindRegistry>,
    replays: Arc<dyn ReplayLoader>,
    bus: SessionBus,
    state: Arc<RwLock<SessionState>>,
    live: Mutex<Option<LiveHandle>>,
}

impl SessionController {
    pub fn new(
        config: ArenaConfig,
        http: reqwest::Client,
        registry: Arc<MindRegistry>,
        replays: Arc<dyn ReplayLoader>,
    ) -> Self {
        let bus = SessionBus::new(config.event_channel_capacity);
        Self {
            config,
            http,
            registry,
            replays,
            bus,
            state: Arc::new(RwLock::new(SessionState {
                phase: SessionPhase::Idle,
                descriptor: None,
                reconstructor: TranscriptReconstructor::new(),
                votes: VoteAggregator::new(),
                replay_meta: None,
                last_create: None,
            })),
            live: Mutex::new(None),
        }
    }

    /// Subscribe to session view-change events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.bus.subscribe()
    }

    /// Create a debate and start streaming it.
    ///
    /// Both participant ids must resolve in the directory and be
    /// distinct. On success the session is Streaming and the returned id
    /// scopes the stream subscription. A rejected or failed creation
    /// returns the session to Idle; a creation timeout or a failed stream
    /// connect leaves it Errored with [`SessionController::retry`]
    /// available.
    pub async fn start(
        &self,
        topic: &str,
        framework: &str,
        minds: (Uuid, Uuid),
        rounds: u32,
    ) -> Result<Uuid, SessionError> {
        if minds.0 == minds.1 {
            return Err(SessionError::MindsNotDistinct);
        }
        let mind_a = self.resolve_mind(minds.0).await?;
        let mind_b = self.resolve_mind(minds.1).await?;

        {
            let mut st = self.state.write().await;
            if st.phase != SessionPhase::Idle {
                return Err(SessionError::InvalidPhase {
                    operation: "start a debate",
                    phase: st.phase,
                });
            }
            transition(&mut st, &self.bus, SessionPhase::Creating);
        }

        let params = CreateParams {
            topic: topic.to_string(),
            framework: framework.to_string(),
            minds,
            rounds,
        };

        let ack = match self.create_debate(&params).await {
            Ok(ack) => ack,
            Err(e @ SessionError::CreateTimeout) => {
                self.fail_creating(params, "debate creation timed out").await;
                return Err(e);
            }
            Err(e) => {
                // Rejected or failed outright: not fatal, back to Idle
                let mut st = self.state.write().await;
                transition(&mut st, &self.bus, SessionPhase::Idle);
                return Err(e);
            }
        };

        if ack.status != "created" && ack.status != "debating" {
            info!("unexpected creation status {:?}, proceeding", ack.status);
        }

        let consumer =
            match StreamConsumer::open(&self.http, &self.config, ack.debate_id, rounds).await {
                Ok(consumer) => consumer,
                Err(e) => {
                    self.fail_creating(params, &e.to_string()).await;
                    return Err(e.into());
                }
            };

        {
            let mut st = self.state.write().await;
            st.descriptor = Some(Descriptor {
                debate_id: Some(ack.debate_id),
                debate_ref: None,
                topic: params.topic.clone(),
                framework: params.framework.clone(),
                participants: (
                    Participant::from_mind(&mind_a, Role::for_slot(Slot::First)),
                    Participant::from_mind(&mind_b, Role::for_slot(Slot::Second)),
                ),
            });
            st.reconstructor = TranscriptReconstructor::new();
            st.votes.reset();
            st.replay_meta = None;
            st.last_create = Some(params);
            transition(&mut st, &self.bus, SessionPhase::Streaming);
        }

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_loop(
            self.state.clone(),
            self.bus.clone(),
            consumer,
            cancel.clone(),
        ));
        *self.live.lock().await = Some(LiveHandle {
            cancel,
            task: Some(task),
        });

        info!("debate {} streaming", ack.debate_id);
        Ok(ack.debate_id)
    }

    /// Load a persisted debate and expose it through the same view.
    ///
    /// Records one watch action against the store; a failure to record
    /// the watch is logged, not surfaced — the view is already valid.
    pub async fn open_replay(&self, debate_ref: &str) -> Result<Transcript, SessionError> {
        {
            let mut st = self.state.write().await;
            if st.phase != SessionPhase::Idle {
                return Err(SessionError::InvalidPhase {
                    operation: "open a replay",
                    phase: st.phase,
                });
            }
            // A stale live retry after a replay attempt would be surprising
            st.last_create = None;
            transition(&mut st, &self.bus, SessionPhase::Replaying);
        }

        let record = match self.replays.load(debate_ref).await {
            Ok(record) => record,
            Err(e) => {
                let mut st = self.state.write().await;
                self.bus.emit_lossy(SessionEvent::SessionErrored {
                    reason: e.to_string(),
                    timestamp: Utc::now(),
                });
                transition(&mut st, &self.bus, SessionPhase::Errored);
                return Err(e.into());
            }
        };

        let transcript = record.transcript.clone();
        {
            let mut st = self.state.write().await;
            st.descriptor = Some(Descriptor {
                debate_id: None,
                debate_ref: Some(record.debate_ref.clone()),
                topic: record.topic.clone(),
                framework: record.framework.clone(),
                participants: record.participants.clone(),
            });
            st.reconstructor = TranscriptReconstructor::from_transcript(record.transcript);
            st.votes.reset();
            st.replay_meta = Some(record.meta);
            self.bus.emit_lossy(SessionEvent::ReplayOpened {
                debate_ref: record.debate_ref,
                timestamp: Utc::now(),
            });
            transition(&mut st, &self.bus, SessionPhase::Completed);
        }

        // One watch per explicit open, never per render
        if let Err(e) = self.replays.record_watch(debate_ref).await {
            warn!("failed to record watch for {}: {}", debate_ref, e);
        }

        Ok(transcript)
    }

    /// Tear down the active session and return to Idle.
    ///
    /// Callable from any phase and idempotent. The stream connection is
    /// deterministically closed before this returns; the transcript is
    /// retained for display until the next session starts.
    pub async fn exit(&self) {
        if let Some(mut handle) = self.live.lock().await.take() {
            handle.cancel.cancel();
            if let Some(task) = handle.task.take() {
                let _ = task.await;
            }
        }
        let mut st = self.state.write().await;
        transition(&mut st, &self.bus, SessionPhase::Idle);
    }

    /// Re-enter the creation flow after an error.
    ///
    /// Re-subscribes from scratch with the previous creation parameters;
    /// there is no resume cursor, and idempotent ingestion makes any
    /// re-delivered rounds harmless.
    pub async fn retry(&self) -> Result<Uuid, SessionError> {
        let params = {
            let st = self.state.read().await;
            if st.phase != SessionPhase::Errored {
                return Err(SessionError::InvalidPhase {
                    operation: "retry",
                    phase: st.phase,
                });
            }
            st.last_create.clone().ok_or(SessionError::NoRetryContext)?
        };

        // Release whatever is left of the failed stream
        self.live.lock().await.take();
        {
            let mut st = self.state.write().await;
            transition(&mut st, &self.bus, SessionPhase::Idle);
        }

        self.start(&params.topic, &params.framework, params.minds, params.rounds)
            .await
    }

    /// Cast the session's single vote for a slot.
    ///
    /// Valid while a live or replay session is on view; the second call
    /// is rejected locally without any network traffic.
    pub async fn cast_vote(&self, slot: Slot) -> Result<VoteTally, SessionError> {
        let mut st = self.state.write().await;
        match st.phase {
            SessionPhase::Streaming | SessionPhase::Completed | SessionPhase::Replaying => {}
            phase => {
                return Err(SessionError::InvalidPhase {
                    operation: "cast a vote",
                    phase,
                })
            }
        }
        let tally = st.votes.cast_vote(slot)?.clone();
        self.bus.emit_lossy(SessionEvent::VoteRecorded {
            slot,
            timestamp: Utc::now(),
        });
        Ok(tally)
    }

    /// Read-only snapshot for rendering
    pub async fn current_view(&self) -> SessionView {
        let st = self.state.read().await;
        let d = st.descriptor.as_ref();
        SessionView {
            phase: st.phase,
            debate_id: d.and_then(|d| d.debate_id),
            debate_ref: d.and_then(|d| d.debate_ref.clone()),
            topic: d.map(|d| d.topic.clone()),
            framework: d.map(|d| d.framework.clone()),
            participants: d.map(|d| d.participants.clone()),
            transcript: st.reconstructor.transcript().clone(),
            tally: st.votes.tally().clone(),
            replay: st.replay_meta.clone(),
        }
    }

    async fn resolve_mind(&self, id: Uuid) -> Result<arena_common::model::Mind, SessionError> {
        match self.registry.resolve(id).await {
            Ok(mind) => Ok(mind),
            Err(RegistryError::NotFound(id)) => Err(SessionError::MindUnknown(id)),
            Err(e) => Err(e.into()),
        }
    }

    async fn create_debate(
        &self,
        params: &CreateParams,
    ) -> Result<CreateDebateResponse, SessionError> {
        let request = CreateDebateRequest {
            mind1_id: params.minds.0,
            mind2_id: params.minds.1,
            topic: params.topic.clone(),
            framework: params.framework.clone(),
            rounds: params.rounds,
        };
        let url = format!("{}/api/debates/create", self.config.base_url());

        let response = tokio::time::timeout(
            self.config.create_timeout(),
            self.http.post(&url).json(&request).send(),
        )
        .await
        .map_err(|_| SessionError::CreateTimeout)?
        .map_err(SessionError::CreateFailed)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(SessionError::CreateRejected { status, message });
        }

        response.json().await.map_err(SessionError::CreateFailed)
    }

    /// Creation-path failure that leaves a retryable session behind
    async fn fail_creating(&self, params: CreateParams, reason: &str) {
        let mut st = self.state.write().await;
        st.last_create = Some(params);
        self.bus.emit_lossy(SessionEvent::SessionErrored {
            reason: reason.to_string(),
            timestamp: Utc::now(),
        });
        transition(&mut st, &self.bus, SessionPhase::Errored);
    }
}

fn transition(st: &mut SessionState, bus: &SessionBus, to: SessionPhase) {
    if st.phase == to {
        return;
    }
    let from = st.phase;
    st.phase = to;
    debug!("session phase: {} -> {}", from, to);
    bus.emit_lossy(SessionEvent::PhaseChanged {
        from,
        to,
        timestamp: Utc::now(),
    });
}

/// Control loop of one live session.
///
/// Sole consumer of the event channel and sole writer of session state
/// while it runs; each event is applied atomically under the state lock.
async fn run_loop(
    state: Arc<RwLock<SessionState>>,
    bus: SessionBus,
    mut consumer: StreamConsumer,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                consumer.close();
                break;
            }
            maybe_event = consumer.next_event() => {
                let Some(event) = maybe_event else { break };
                let terminal = apply_event(&state, &bus, &event).await;
                if terminal {
                    consumer.close();
                    break;
                }
            }
        }
    }
}

/// Fold one stream event into the session; returns whether it was terminal
async fn apply_event(
    state: &Arc<RwLock<SessionState>>,
    bus: &SessionBus,
    event: &DebateEvent,
) -> bool {
    let mut st = state.write().await;

    let before_len = st.reconstructor.transcript().len();
    let before_status = st.reconstructor.transcript().status();

    let transcript = st.reconstructor.ingest(event);
    let after_len = transcript.len();
    let after_status = transcript.status();

    if after_len > before_len {
        if let DebateEvent::NewRound { round, .. } = event {
            bus.emit_lossy(SessionEvent::RoundIngested {
                number: round.number,
                transcript_len: after_len,
                timestamp: Utc::now(),
            });
        }
    }

    if after_status != before_status {
        match after_status {
            TranscriptStatus::Completed => {
                bus.emit_lossy(SessionEvent::TranscriptCompleted {
                    rounds: after_len,
                    timestamp: Utc::now(),
                });
                transition(&mut st, bus, SessionPhase::Completed);
            }
            TranscriptStatus::Errored => {
                let reason = match event {
                    DebateEvent::TransportError { reason, .. } => reason.clone(),
                    _ => "stream errored".to_string(),
                };
                bus.emit_lossy(SessionEvent::SessionErrored {
                    reason,
                    timestamp: Utc::now(),
                });
                transition(&mut st, bus, SessionPhase::Errored);
            }
            _ => {}
        }
    }

    event.is_terminal()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::FixtureReplayLoader;

    fn controller_with_fixtures() -> (SessionController, Arc<FixtureReplayLoader>) {
        let config = ArenaConfig::default();
        let http = reqwest::Client::new();
        let registry = MindRegistry::new(http.clone(), &config);
        let fixtures = Arc::new(FixtureReplayLoader::new());
        let controller =
            SessionController::new(config, http, registry, fixtures.clone());
        (controller, fixtures)
    }

    #[tokio::test]
    async fn test_open_replay_exposes_transcript_and_records_watch() {
        let (controller, fixtures) = controller_with_fixtures();

        let transcript = controller
            .open_replay("creativity-computed")
            .await
            .expect("replay loads");
        assert_eq!(transcript.len(), 3);
        assert!(transcript.is_frozen());

        let view = controller.current_view().await;
        assert_eq!(view.phase, SessionPhase::Completed);
        assert_eq!(view.debate_ref.as_deref(), Some("creativity-computed"));
        assert_eq!(view.transcript.len(), 3);
        assert!(view.replay.is_some());
        assert!(view.debate_session().is_none()); // replays have no live id

        assert_eq!(fixtures.watch_count("creativity-computed").await, 1);
    }

    #[tokio::test]
    async fn test_open_replay_not_found_enters_errored() {
        let (controller, _fixtures) = controller_with_fixtures();

        let err = controller.open_replay("no-such-debate").await.unwrap_err();
        assert!(matches!(err, SessionError::Replay(_)));
        assert_eq!(controller.current_view().await.phase, SessionPhase::Errored);
    }

    #[tokio::test]
    async fn test_open_replay_requires_idle() {
        let (controller, _fixtures) = controller_with_fixtures();
        controller.open_replay("archives-open").await.expect("load");

        let err = controller.open_replay("archives-open").await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidPhase { .. }));
    }

    #[tokio::test]
    async fn test_vote_once_per_replay_session() {
        let (controller, _fixtures) = controller_with_fixtures();
        controller.open_replay("archives-open").await.expect("load");

        let tally = controller.cast_vote(Slot::First).await.expect("vote");
        assert_eq!(tally.count(Slot::First), 1);

        let err = controller.cast_vote(Slot::Second).await.unwrap_err();
        assert!(matches!(err, SessionError::Vote(_)));
        assert_eq!(
            controller.current_view().await.tally.count(Slot::Second),
            0
        );
    }

    #[tokio::test]
    async fn test_vote_rejected_while_idle() {
        let (controller, _fixtures) = controller_with_fixtures();
        let err = controller.cast_vote(Slot::First).await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidPhase { .. }));
    }

    #[tokio::test]
    async fn test_exit_is_idempotent_and_retains_transcript() {
        let (controller, _fixtures) = controller_with_fixtures();
        controller.open_replay("archives-open").await.expect("load");

        controller.exit().await;
        controller.exit().await; // safe from any state, any number of times

        let view = controller.current_view().await;
        assert_eq!(view.phase, SessionPhase::Idle);
        // Transcript retained for display after teardown
        assert_eq!(view.transcript.len(), 2);
    }

    #[tokio::test]
    async fn test_retry_without_context_is_rejected() {
        let (controller, _fixtures) = controller_with_fixtures();

        // Not errored: invalid phase
        let err = controller.retry().await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidPhase { .. }));

        // Errored via replay failure: no creation parameters to replay
        let _ = controller.open_replay("no-such-debate").await;
        let err = controller.retry().await.unwrap_err();
        assert!(matches!(err, SessionError::NoRetryContext));
    }

    #[tokio::test]
    async fn test_start_rejects_identical_minds() {
        let (controller, _fixtures) = controller_with_fixtures();
        let id = Uuid::new_v4();
        let err = controller
            .start("topic", "oxford", (id, id), 3)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::MindsNotDistinct));
    }
}
