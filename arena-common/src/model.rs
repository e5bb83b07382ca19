//! Debate data model shared across the Arena crates
//!
//! Defines the vocabulary the engine and its consumers agree on:
//! participants and their slot/role assignment, rounds, the transcript with
//! its lifecycle status, vote tallies, and the replay read model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Debate role, fixed at creation time and immutable once a debate starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Argues for the motion (first slot)
    Proposer,
    /// Argues against the motion (second slot)
    Opponent,
}

impl Role {
    /// Role conventionally assigned to a slot at creation time
    pub fn for_slot(slot: Slot) -> Self {
        match slot {
            Slot::First => Role::Proposer,
            Slot::Second => Role::Opponent,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Proposer => write!(f, "proposer"),
            Role::Opponent => write!(f, "opponent"),
        }
    }
}

/// Positional participant assignment, fixed when a debate is created.
///
/// The stream transport labels arguments positionally (`mind1_arg` /
/// `mind2_arg`), not semantically; mapping a slot back to a named
/// participant is the reconstruction layer's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    First,
    Second,
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Slot::First => write!(f, "first"),
            Slot::Second => write!(f, "second"),
        }
    }
}

/// Kind of exchange a round represents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RoundKind {
    Opening,
    Rebuttal,
    Closing,
    /// Application-defined kind outside the standard vocabulary
    Other(String),
}

impl RoundKind {
    /// Classify a round by its position within a debate of `planned` rounds.
    ///
    /// Live stream frames carry no kind field, so the kind is derived from
    /// the position: first round opens, last round closes, everything in
    /// between is a rebuttal.
    pub fn for_position(number: u32, planned: u32) -> Self {
        if number <= 1 {
            RoundKind::Opening
        } else if number >= planned {
            RoundKind::Closing
        } else {
            RoundKind::Rebuttal
        }
    }
}

impl From<String> for RoundKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Opening" => RoundKind::Opening,
            "Rebuttal" => RoundKind::Rebuttal,
            "Closing" => RoundKind::Closing,
            _ => RoundKind::Other(s),
        }
    }
}

impl From<RoundKind> for String {
    fn from(kind: RoundKind) -> Self {
        kind.to_string()
    }
}

impl std::fmt::Display for RoundKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoundKind::Opening => write!(f, "Opening"),
            RoundKind::Rebuttal => write!(f, "Rebuttal"),
            RoundKind::Closing => write!(f, "Closing"),
            RoundKind::Other(s) => write!(f, "{}", s),
        }
    }
}

/// One discrete exchange: one argument from each participant, identified by
/// a sequence number unique within its debate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    /// Sequence number, 1-based, unique within a transcript
    pub number: u32,
    /// Kind of exchange (Opening/Rebuttal/Closing)
    pub kind: RoundKind,
    /// Argument from the first-slot participant
    pub first_argument: String,
    /// Argument from the second-slot participant
    pub second_argument: String,
}

impl Round {
    /// Argument text for the given participant slot
    pub fn argument(&self, slot: Slot) -> &str {
        match slot {
            Slot::First => &self.first_argument,
            Slot::Second => &self.second_argument,
        }
    }
}

/// Transcript lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptStatus {
    /// Created, no stream activity observed yet
    Pending,
    /// Live stream is delivering rounds
    Streaming,
    /// Terminal: the round sequence is frozen
    Completed,
    /// Transport failed; rounds ingested so far are preserved
    Errored,
}

impl std::fmt::Display for TranscriptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranscriptStatus::Pending => write!(f, "pending"),
            TranscriptStatus::Streaming => write!(f, "streaming"),
            TranscriptStatus::Completed => write!(f, "completed"),
            TranscriptStatus::Errored => write!(f, "errored"),
        }
    }
}

/// Ordered, duplicate-free sequence of rounds plus a lifecycle status.
///
/// Rounds are kept sorted ascending by `number` regardless of arrival
/// order. The sequence tolerates gaps (a missing number is not an error)
/// but never holds two rounds with the same number. Once the status is
/// [`TranscriptStatus::Completed`] the sequence is frozen: no mutation is
/// accepted from any producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    rounds: Vec<Round>,
    status: TranscriptStatus,
}

impl Transcript {
    /// Empty transcript in `Pending` status
    pub fn new() -> Self {
        Self {
            rounds: Vec::new(),
            status: TranscriptStatus::Pending,
        }
    }

    /// Completed transcript from a known round set (replay path).
    ///
    /// Rounds are sorted by number; duplicates beyond the first occurrence
    /// are discarded so loads stay deterministic.
    pub fn completed(mut rounds: Vec<Round>) -> Self {
        rounds.sort_by_key(|r| r.number);
        rounds.dedup_by_key(|r| r.number);
        Self {
            rounds,
            status: TranscriptStatus::Completed,
        }
    }

    /// Current lifecycle status
    pub fn status(&self) -> TranscriptStatus {
        self.status
    }

    /// Rounds sorted ascending by number
    pub fn rounds(&self) -> &[Round] {
        &self.rounds
    }

    /// Number of rounds ingested so far
    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    /// True when no rounds have been ingested
    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    /// True once the transcript has reached a terminal completed state
    pub fn is_frozen(&self) -> bool {
        self.status == TranscriptStatus::Completed
    }

    /// Whether a round with this number is already present
    pub fn contains_round(&self, number: u32) -> bool {
        self.rounds.binary_search_by_key(&number, |r| r.number).is_ok()
    }

    /// Ordered insert by round number.
    ///
    /// Returns `true` when the round was inserted. A duplicate number or a
    /// frozen transcript is a no-op returning `false` — duplicate delivery
    /// must never duplicate a round, and nothing mutates a completed
    /// transcript.
    pub fn insert_round(&mut self, round: Round) -> bool {
        if self.is_frozen() {
            return false;
        }
        match self.rounds.binary_search_by_key(&round.number, |r| r.number) {
            Ok(_) => false,
            Err(pos) => {
                self.rounds.insert(pos, round);
                true
            }
        }
    }

    /// Transition to `Streaming` (no-op from any terminal state)
    pub fn mark_streaming(&mut self) {
        if matches!(self.status, TranscriptStatus::Pending) {
            self.status = TranscriptStatus::Streaming;
        }
    }

    /// Freeze the transcript. Idempotent.
    pub fn complete(&mut self) {
        self.status = TranscriptStatus::Completed;
    }

    /// Mark the transcript errored, preserving ingested rounds.
    ///
    /// A completed transcript stays completed: a transport failure after
    /// the terminal frame must not un-freeze the sequence.
    pub fn mark_errored(&mut self) {
        if !self.is_frozen() {
            self.status = TranscriptStatus::Errored;
        }
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}

/// Directory entry for a debate participant ("mind")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mind {
    /// Directory identifier
    pub id: Uuid,
    /// URL-safe short name
    pub slug: String,
    /// Display name
    pub name: String,
    /// One-line biography for display
    pub short_bio: String,
    /// Avatar image reference
    pub avatar: String,
    /// Directory-maintained ranking score
    pub apex_score: f64,
}

/// A participant bound to one side of a debate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    /// Directory identifier
    pub id: Uuid,
    /// Display name
    pub display_name: String,
    /// Avatar image reference
    pub avatar_ref: String,
    /// Side of the debate, immutable once the debate starts
    pub role: Role,
}

impl Participant {
    /// Bind a directory entry to a debate side
    pub fn from_mind(mind: &Mind, role: Role) -> Self {
        Self {
            id: mind.id,
            display_name: mind.name.clone(),
            avatar_ref: mind.avatar.clone(),
            role,
        }
    }
}

/// A live debate as owned by one session controller.
///
/// The connection backing the transcript is released when the session
/// exits; the transcript itself is retained for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateSession {
    /// Server-assigned debate identifier
    pub id: Uuid,
    /// Debate topic
    pub topic: String,
    /// Debate framework (rule set) identifier
    pub framework: String,
    /// (first slot, second slot) participants
    pub participants: (Participant, Participant),
    /// Transcript reconstructed so far
    pub transcript: Transcript,
}

/// Local vote tally for one session.
///
/// Mutated only by the vote aggregator; reset when a new session starts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    /// Votes for the first-slot participant
    pub first: u32,
    /// Votes for the second-slot participant
    pub second: u32,
    /// Whether a vote has been cast this session
    pub has_voted: bool,
}

impl VoteTally {
    /// Vote count for a slot
    pub fn count(&self, slot: Slot) -> u32 {
        match slot {
            Slot::First => self.first,
            Slot::Second => self.second,
        }
    }

    /// Record one vote for a slot and latch the voted flag.
    ///
    /// Callers go through the vote aggregator, which enforces the
    /// one-vote-per-session precondition before calling this.
    pub fn record(&mut self, slot: Slot) {
        match slot {
            Slot::First => self.first += 1,
            Slot::Second => self.second += 1,
        }
        self.has_voted = true;
    }
}

/// Descriptive metadata attached to a persisted debate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayMeta {
    /// View counter as last read from the store
    pub views: u64,
    /// Aggregate viewer rating
    pub rating: f64,
    /// When the debate took place
    pub date: DateTime<Utc>,
}

/// A fully-populated historical debate.
///
/// Read-only: the live reconstruction path never touches it, and the
/// `views` counter is incremented on the external store (a watch action),
/// never on this in-memory record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayRecord {
    /// Stable reference used to load the record
    pub debate_ref: String,
    /// Debate topic
    pub topic: String,
    /// Debate framework identifier
    pub framework: String,
    /// (first slot, second slot) participants
    pub participants: (Participant, Participant),
    /// Complete, frozen transcript
    pub transcript: Transcript,
    /// Descriptive metadata
    pub meta: ReplayMeta,
}

/// Session controller lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// No active session
    Idle,
    /// Creation request in flight
    Creating,
    /// Live stream connected and delivering events
    Streaming,
    /// Debate finished (live completion or loaded replay)
    Completed,
    /// Creation timed out, transport failed, or replay load failed
    Errored,
    /// Replay load in flight
    Replaying,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionPhase::Idle => write!(f, "idle"),
            SessionPhase::Creating => write!(f, "creating"),
            SessionPhase::Streaming => write!(f, "streaming"),
            SessionPhase::Completed => write!(f, "completed"),
            SessionPhase::Errored => write!(f, "errored"),
            SessionPhase::Replaying => write!(f, "replaying"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round(number: u32) -> Round {
        Round {
            number,
            kind: RoundKind::for_position(number, 3),
            first_argument: format!("first argument {}", number),
            second_argument: format!("second argument {}", number),
        }
    }

    #[test]
    fn test_insert_round_keeps_ascending_order() {
        let mut t = Transcript::new();
        assert!(t.insert_round(round(2)));
        assert!(t.insert_round(round(1)));
        assert!(t.insert_round(round(3)));

        let numbers: Vec<u32> = t.rounds().iter().map(|r| r.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn test_insert_round_rejects_duplicates() {
        let mut t = Transcript::new();
        assert!(t.insert_round(round(1)));
        assert!(!t.insert_round(round(1)));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_completed_transcript_is_frozen() {
        let mut t = Transcript::new();
        t.insert_round(round(1));
        t.complete();

        assert!(t.is_frozen());
        assert!(!t.insert_round(round(2)));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn test_errored_preserves_rounds_but_not_after_completion() {
        let mut t = Transcript::new();
        t.insert_round(round(1));
        t.mark_errored();
        assert_eq!(t.status(), TranscriptStatus::Errored);
        assert_eq!(t.len(), 1);

        let mut done = Transcript::new();
        done.complete();
        done.mark_errored();
        assert_eq!(done.status(), TranscriptStatus::Completed);
    }

    #[test]
    fn test_completed_constructor_sorts_and_dedupes() {
        let t = Transcript::completed(vec![round(3), round(1), round(3), round(2)]);
        let numbers: Vec<u32> = t.rounds().iter().map(|r| r.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert!(t.is_frozen());
    }

    #[test]
    fn test_round_kind_for_position() {
        assert_eq!(RoundKind::for_position(1, 3), RoundKind::Opening);
        assert_eq!(RoundKind::for_position(2, 3), RoundKind::Rebuttal);
        assert_eq!(RoundKind::for_position(3, 3), RoundKind::Closing);
        // single-round debate opens (first classification wins)
        assert_eq!(RoundKind::for_position(1, 1), RoundKind::Opening);
    }

    #[test]
    fn test_round_kind_string_round_trip() {
        assert_eq!(RoundKind::from("Opening".to_string()), RoundKind::Opening);
        assert_eq!(
            RoundKind::from("Lightning".to_string()),
            RoundKind::Other("Lightning".to_string())
        );
        assert_eq!(String::from(RoundKind::Closing), "Closing");
    }

    #[test]
    fn test_vote_tally_counts_per_slot() {
        let mut tally = VoteTally::default();
        tally.record(Slot::Second);
        assert_eq!(tally.count(Slot::First), 0);
        assert_eq!(tally.count(Slot::Second), 1);
        assert!(tally.has_voted);
    }

    #[test]
    fn test_transcript_serialization() {
        let mut t = Transcript::new();
        t.mark_streaming();
        t.insert_round(round(1));

        let json = serde_json::to_string(&t).expect("serialize");
        assert!(json.contains("\"status\":\"streaming\""));

        let back: Transcript = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, t);
    }
}
