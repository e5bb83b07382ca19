//! Transcript reconstruction from the debate event sequence
//!
//! Folds [`DebateEvent`]s into an ordered, duplicate-free transcript.
//! The transport delivers events in arrival order and promises nothing
//! else; everything order- or duplicate-related is corrected here:
//! rounds read back sorted ascending by number, duplicate deliveries are
//! no-ops, and a completed transcript ignores all further rounds.

use arena_common::events::{DebateEvent, STATUS_COMPLETED};
use arena_common::model::Transcript;
use tracing::{debug, warn};

/// Folds the event sequence of one debate into its transcript.
///
/// Debates are low-frequency (seconds between rounds), so a plain ordered
/// insert per round is sufficient; there is no windowing or backpressure
/// machinery here.
#[derive(Debug, Default)]
pub struct TranscriptReconstructor {
    transcript: Transcript,
}

impl TranscriptReconstructor {
    /// Reconstructor with an empty, pending transcript (live path)
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconstructor wrapping an already-complete transcript (replay path).
    ///
    /// The transcript arrives frozen, so any stray ingest is a no-op.
    pub fn from_transcript(transcript: Transcript) -> Self {
        Self { transcript }
    }

    /// Apply one event and return the updated transcript.
    ///
    /// - `Status("completed")` and `End` freeze the transcript; rounds
    ///   arriving afterwards are ignored (no-op, not an error).
    /// - Any other `Status` moves a pending transcript to streaming.
    /// - `NewRound` inserts by number; a duplicate number is a no-op.
    /// - `TransportError` marks the transcript errored, preserving every
    ///   round ingested so far.
    pub fn ingest(&mut self, event: &DebateEvent) -> &Transcript {
        match event {
            DebateEvent::Status { text, .. } if text == STATUS_COMPLETED => {
                self.transcript.complete();
            }
            DebateEvent::Status { text, .. } => {
                debug!("debate status: {}", text);
                self.transcript.mark_streaming();
            }
            DebateEvent::NewRound { round, .. } => {
                self.transcript.mark_streaming();
                let number = round.number;
                if !self.transcript.insert_round(round.clone()) {
                    debug!("ignoring round {} (duplicate or transcript frozen)", number);
                }
            }
            DebateEvent::End { .. } => {
                self.transcript.complete();
            }
            DebateEvent::TransportError { reason, .. } => {
                warn!("stream transport failed: {}", reason);
                self.transcript.mark_errored();
            }
        }
        &self.transcript
    }

    /// Transcript reconstructed so far
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_common::events::STATUS_DEBATING;
    use arena_common::model::{Round, RoundKind, TranscriptStatus};
    use chrono::Utc;

    fn status(text: &str) -> DebateEvent {
        DebateEvent::Status {
            text: text.to_string(),
            timestamp: Utc::now(),
        }
    }

    fn new_round(number: u32) -> DebateEvent {
        DebateEvent::NewRound {
            round: Round {
                number,
                kind: RoundKind::for_position(number, 3),
                first_argument: format!("for {}", number),
                second_argument: format!("against {}", number),
            },
            timestamp: Utc::now(),
        }
    }

    fn end() -> DebateEvent {
        DebateEvent::End {
            timestamp: Utc::now(),
        }
    }

    fn transport_error() -> DebateEvent {
        DebateEvent::TransportError {
            reason: "connection reset".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_happy_path_ordered_completion() {
        let mut rec = TranscriptReconstructor::new();
        rec.ingest(&status(STATUS_DEBATING));
        assert_eq!(rec.transcript().status(), TranscriptStatus::Streaming);

        rec.ingest(&new_round(1));
        rec.ingest(&new_round(2));
        rec.ingest(&new_round(3));
        rec.ingest(&status(STATUS_COMPLETED));

        let transcript = rec.transcript();
        assert_eq!(transcript.status(), TranscriptStatus::Completed);
        let numbers: Vec<u32> = transcript.rounds().iter().map(|r| r.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn test_out_of_order_and_duplicate_delivery() {
        let mut rec = TranscriptReconstructor::new();
        rec.ingest(&new_round(2));
        rec.ingest(&new_round(1));
        rec.ingest(&new_round(2)); // duplicate delivery
        rec.ingest(&end());

        let transcript = rec.transcript();
        assert_eq!(transcript.status(), TranscriptStatus::Completed);
        assert_eq!(transcript.len(), 2);
        let numbers: Vec<u32> = transcript.rounds().iter().map(|r| r.number).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[test]
    fn test_idempotent_ingestion_of_same_event() {
        let mut rec = TranscriptReconstructor::new();
        let event = new_round(1);
        rec.ingest(&event);
        rec.ingest(&event);
        assert_eq!(rec.transcript().len(), 1);
    }

    #[test]
    fn test_freeze_on_completion_ignores_late_rounds() {
        let mut rec = TranscriptReconstructor::new();
        rec.ingest(&new_round(1));
        rec.ingest(&status(STATUS_COMPLETED));
        rec.ingest(&new_round(2)); // late frame after freeze

        assert_eq!(rec.transcript().status(), TranscriptStatus::Completed);
        assert_eq!(rec.transcript().len(), 1);
    }

    #[test]
    fn test_end_frame_freezes() {
        let mut rec = TranscriptReconstructor::new();
        rec.ingest(&end());
        rec.ingest(&new_round(1));
        assert_eq!(rec.transcript().status(), TranscriptStatus::Completed);
        assert!(rec.transcript().is_empty());
    }

    #[test]
    fn test_transport_error_preserves_rounds() {
        let mut rec = TranscriptReconstructor::new();
        rec.ingest(&new_round(1));
        rec.ingest(&transport_error());

        let transcript = rec.transcript();
        assert_eq!(transcript.status(), TranscriptStatus::Errored);
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.rounds()[0].number, 1);
    }

    #[test]
    fn test_transport_error_after_completion_keeps_completed() {
        let mut rec = TranscriptReconstructor::new();
        rec.ingest(&end());
        rec.ingest(&transport_error());
        assert_eq!(rec.transcript().status(), TranscriptStatus::Completed);
    }

    #[test]
    fn test_round_before_status_starts_streaming() {
        let mut rec = TranscriptReconstructor::new();
        rec.ingest(&new_round(1));
        assert_eq!(rec.transcript().status(), TranscriptStatus::Streaming);
    }
}
