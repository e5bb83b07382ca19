//! Event types for the Arena debate engine
//!
//! Two event layers share this module:
//! - [`DebateEvent`] — the typed form of one stream frame, produced by the
//!   stream consumer and folded into a transcript by the reconstructor.
//! - [`SessionEvent`] — view-change notifications broadcast by the session
//!   controller so observers need not poll the view.
//!
//! Session events are distributed via [`SessionBus`] and can be serialized
//! for transmission to a rendering layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::model::{Round, SessionPhase, Slot};

/// Stream status payload marking an in-progress debate
pub const STATUS_DEBATING: &str = "debating";
/// Stream status payload that freezes the transcript
pub const STATUS_COMPLETED: &str = "completed";

/// Typed form of one frame from the debate stream.
///
/// Events are delivered in transport arrival order; ordering correctness
/// (sorting, dedup) is the reconstructor's responsibility, not the
/// transport's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DebateEvent {
    /// Debate status changed (`status` frame)
    ///
    /// The payload comes from an application-defined vocabulary; at minimum
    /// `"debating"` and `"completed"` are produced. `"completed"` freezes
    /// the transcript.
    Status {
        /// Raw status text as delivered
        text: String,
        /// When the frame arrived
        timestamp: DateTime<Utc>,
    },

    /// A new round arrived (`new_round` frame)
    NewRound {
        /// Parsed round with slot-mapped arguments
        round: Round,
        /// When the frame arrived
        timestamp: DateTime<Utc>,
    },

    /// Terminal `end` frame; freezes the transcript
    End {
        /// When the frame arrived
        timestamp: DateTime<Utc>,
    },

    /// The stream connection itself failed. Terminal: no further events
    /// will arrive. Rounds already ingested are preserved.
    TransportError {
        /// Human-readable failure description
        reason: String,
        /// When the failure was observed
        timestamp: DateTime<Utc>,
    },
}

impl DebateEvent {
    /// Get event type as string for filtering and logging
    pub fn event_type(&self) -> &str {
        match self {
            DebateEvent::Status { .. } => "Status",
            DebateEvent::NewRound { .. } => "NewRound",
            DebateEvent::End { .. } => "End",
            DebateEvent::TransportError { .. } => "TransportError",
        }
    }

    /// True for events after which the stream delivers nothing further
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DebateEvent::End { .. } | DebateEvent::TransportError { .. }
        ) || matches!(self, DebateEvent::Status { text, .. } if text == STATUS_COMPLETED)
    }
}

/// Session view-change notifications.
///
/// Broadcast by the session controller after each state transition so a
/// rendering layer can refresh without polling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Controller phase transition
    PhaseChanged {
        /// Phase before the transition
        from: SessionPhase,
        /// Phase after the transition
        to: SessionPhase,
        /// When the transition occurred
        timestamp: DateTime<Utc>,
    },

    /// A round was ingested into the live transcript
    RoundIngested {
        /// Round number that was inserted
        number: u32,
        /// Transcript length after the insert
        transcript_len: usize,
        /// When the round was ingested
        timestamp: DateTime<Utc>,
    },

    /// The transcript reached its frozen, completed state
    TranscriptCompleted {
        /// Final number of rounds
        rounds: usize,
        /// When completion was observed
        timestamp: DateTime<Utc>,
    },

    /// The session entered the errored phase
    SessionErrored {
        /// Failure description
        reason: String,
        /// When the error was observed
        timestamp: DateTime<Utc>,
    },

    /// A vote was recorded in the local tally
    VoteRecorded {
        /// Slot the vote was cast for
        slot: Slot,
        /// When the vote was recorded
        timestamp: DateTime<Utc>,
    },

    /// A replay record was loaded and exposed through the view
    ReplayOpened {
        /// Reference of the loaded debate
        debate_ref: String,
        /// When the replay was opened
        timestamp: DateTime<Utc>,
    },
}

impl SessionEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            SessionEvent::PhaseChanged { .. } => "PhaseChanged",
            SessionEvent::RoundIngested { .. } => "RoundIngested",
            SessionEvent::TranscriptCompleted { .. } => "TranscriptCompleted",
            SessionEvent::SessionErrored { .. } => "SessionErrored",
            SessionEvent::VoteRecorded { .. } => "VoteRecorded",
            SessionEvent::ReplayOpened { .. } => "ReplayOpened",
        }
    }
}

/// Broadcast bus for session view-change events.
///
/// Uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow observers don't block the control loop)
/// - Multiple concurrent observers
/// - Automatic cleanup when observers drop
#[derive(Clone)]
pub struct SessionBus {
    tx: broadcast::Sender<SessionEvent>,
    capacity: usize,
}

impl SessionBus {
    /// Creates a new bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future session events.
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all observers.
    ///
    /// Returns `Ok(observer_count)` if at least one observer exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: SessionEvent,
    ) -> Result<usize, broadcast::error::SendError<SessionEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no observers are listening.
    ///
    /// The control loop uses this for every notification: an unobserved
    /// session is valid, and a full channel drops the oldest event rather
    /// than blocking the loop.
    pub fn emit_lossy(&self, event: SessionEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active observers
    pub fn observer_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RoundKind;

    fn sample_round() -> Round {
        Round {
            number: 1,
            kind: RoundKind::Opening,
            first_argument: "for".to_string(),
            second_argument: "against".to_string(),
        }
    }

    #[test]
    fn test_debate_event_terminality() {
        let ts = Utc::now();
        assert!(DebateEvent::End { timestamp: ts }.is_terminal());
        assert!(DebateEvent::TransportError {
            reason: "gone".to_string(),
            timestamp: ts
        }
        .is_terminal());
        assert!(DebateEvent::Status {
            text: STATUS_COMPLETED.to_string(),
            timestamp: ts
        }
        .is_terminal());
        assert!(!DebateEvent::Status {
            text: STATUS_DEBATING.to_string(),
            timestamp: ts
        }
        .is_terminal());
        assert!(!DebateEvent::NewRound {
            round: sample_round(),
            timestamp: ts
        }
        .is_terminal());
    }

    #[test]
    fn test_debate_event_serialization() {
        let event = DebateEvent::NewRound {
            round: sample_round(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&event).expect("serialize");
        assert!(json.contains("\"type\":\"new_round\""));

        let back: DebateEvent = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.event_type(), "NewRound");
    }

    #[test]
    fn test_session_bus_emit() {
        let bus = SessionBus::new(16);
        let mut rx = bus.subscribe();
        assert_eq!(bus.observer_count(), 1);

        bus.emit(SessionEvent::PhaseChanged {
            from: SessionPhase::Idle,
            to: SessionPhase::Creating,
            timestamp: Utc::now(),
        })
        .expect("emit should succeed");

        let received = rx.try_recv().expect("should receive event");
        assert_eq!(received.event_type(), "PhaseChanged");
    }

    #[test]
    fn test_session_bus_emit_lossy_without_observers() {
        let bus = SessionBus::new(4);
        // No observers: emit_lossy must not fail or panic
        bus.emit_lossy(SessionEvent::VoteRecorded {
            slot: Slot::First,
            timestamp: Utc::now(),
        });
        assert_eq!(bus.observer_count(), 0);
        assert_eq!(bus.capacity(), 4);
    }
}
