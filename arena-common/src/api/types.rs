//! Wire request/response types for the debate service endpoints
//!
//! Field names follow the service's JSON conventions, which are not Rust
//! conventions: stream frames use positional snake_case fields
//! (`mind1_arg`), the replay read model uses camelCase
//! (`mind1Argument`), and the directory uses camelCase (`apexScore`).
//! Explicit renames keep the Rust side idiomatic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{
    Mind, Participant, ReplayMeta, ReplayRecord, Role, Round, RoundKind, Transcript,
};

// ========================================
// Debate creation
// ========================================

/// Body of `POST /api/debates/create`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDebateRequest {
    /// First-slot participant (proposer)
    pub mind1_id: Uuid,
    /// Second-slot participant (opponent)
    pub mind2_id: Uuid,
    /// Debate topic
    pub topic: String,
    /// Framework (rule set) identifier
    pub framework: String,
    /// Number of rounds the debate is planned to run
    pub rounds: u32,
}

/// Response of `POST /api/debates/create`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDebateResponse {
    /// Server-assigned debate identifier; scopes the stream subscription
    pub debate_id: Uuid,
    /// Server status string (informational)
    pub status: String,
}

// ========================================
// Stream frame payloads
// ========================================

/// JSON payload of a `new_round` stream frame.
///
/// Argument fields are positional to the two participants as assigned at
/// creation time, not semantically labeled; mapping slot to participant is
/// a reconstruction responsibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRoundFrame {
    /// 1-based round sequence number
    pub number: u32,
    /// Argument from the first-slot participant
    pub mind1_arg: String,
    /// Argument from the second-slot participant
    pub mind2_arg: String,
}

impl NewRoundFrame {
    /// Build the model round, classifying its kind by position within a
    /// debate planned for `planned_rounds` rounds.
    pub fn into_round(self, planned_rounds: u32) -> Round {
        Round {
            kind: RoundKind::for_position(self.number, planned_rounds),
            number: self.number,
            first_argument: self.mind1_arg,
            second_argument: self.mind2_arg,
        }
    }
}

// ========================================
// Replay read model
// ========================================

/// Participant as embedded in the replay read model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayMindDoc {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
    pub avatar: String,
}

/// Round as embedded in the replay read model (camelCase fields)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayRoundDoc {
    pub number: u32,
    /// Round kind name (e.g. "Opening")
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "mind1Argument")]
    pub mind1_argument: String,
    #[serde(rename = "mind2Argument")]
    pub mind2_argument: String,
}

/// Read model of `GET /api/debates/replay/{debate_ref}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayDebateDoc {
    /// Stable debate reference
    pub id: String,
    pub topic: String,
    pub framework: String,
    /// When the debate took place
    pub date: DateTime<Utc>,
    /// First-slot participant
    pub mind1: ReplayMindDoc,
    /// Second-slot participant
    pub mind2: ReplayMindDoc,
    pub rounds: Vec<ReplayRoundDoc>,
    pub views: u64,
    pub rating: f64,
}

impl ReplayDebateDoc {
    /// Convert the wire document into the read-only replay record.
    ///
    /// Rounds are sorted by number and deduplicated so two loads of the
    /// same reference produce byte-for-byte identical ordering regardless
    /// of document order.
    pub fn into_record(self) -> ReplayRecord {
        let rounds = self
            .rounds
            .into_iter()
            .map(|r| Round {
                number: r.number,
                kind: RoundKind::from(r.kind),
                first_argument: r.mind1_argument,
                second_argument: r.mind2_argument,
            })
            .collect();

        let participant = |doc: &ReplayMindDoc| Participant {
            id: doc.id,
            display_name: doc.name.clone(),
            avatar_ref: doc.avatar.clone(),
            role: doc.role,
        };

        ReplayRecord {
            debate_ref: self.id,
            topic: self.topic,
            framework: self.framework,
            participants: (participant(&self.mind1), participant(&self.mind2)),
            transcript: Transcript::completed(rounds),
            meta: ReplayMeta {
                views: self.views,
                rating: self.rating,
                date: self.date,
            },
        }
    }
}

// ========================================
// Participant directory
// ========================================

/// Directory entry of `GET /api/minds` (camelCase fields)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MindSummary {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    #[serde(rename = "shortBio")]
    pub short_bio: String,
    pub avatar: String,
    #[serde(rename = "apexScore")]
    pub apex_score: f64,
}

impl From<MindSummary> for Mind {
    fn from(doc: MindSummary) -> Self {
        Mind {
            id: doc.id,
            slug: doc.slug,
            name: doc.name,
            short_bio: doc.short_bio,
            avatar: doc.avatar,
            apex_score: doc.apex_score,
        }
    }
}
