//! Replay loading for persisted debates
//!
//! A replay exposes the same transcript shape as a live session, so the
//! rendering layer needs only one contract for both. Two implementations
//! stand behind [`ReplayLoader`]: the remote store and a compiled-in
//! fixture catalog. The composition root selects one at startup; they are
//! never interleaved per-call.

use std::collections::HashMap;

use arena_common::api::ReplayDebateDoc;
use arena_common::model::{
    Participant, ReplayMeta, ReplayRecord, Role, Round, RoundKind, Transcript,
};
use arena_common::ArenaConfig;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::ReplayError;

/// Loads persisted debates and records watch actions.
///
/// Loads are deterministic: the same `debate_ref` yields identical round
/// ordering and content every time. `record_watch` is a side effect on
/// the backing store — the caller invokes it once per explicit watch
/// action, never on render.
#[async_trait]
pub trait ReplayLoader: Send + Sync {
    /// Load a persisted debate by reference
    async fn load(&self, debate_ref: &str) -> Result<ReplayRecord, ReplayError>;

    /// Record one watch action against the store's view counter
    async fn record_watch(&self, debate_ref: &str) -> Result<(), ReplayError>;
}

/// Replay loader backed by the debate service's read model endpoint
pub struct RemoteReplayLoader {
    http: reqwest::Client,
    base_url: String,
    request_timeout: std::time::Duration,
}

impl RemoteReplayLoader {
    pub fn new(http: reqwest::Client, config: &ArenaConfig) -> Self {
        Self {
            http,
            base_url: config.base_url().to_string(),
            request_timeout: config.request_timeout(),
        }
    }

    fn replay_url(&self, debate_ref: &str) -> String {
        format!("{}/api/debates/replay/{}", self.base_url, debate_ref)
    }
}

#[async_trait]
impl ReplayLoader for RemoteReplayLoader {
    async fn load(&self, debate_ref: &str) -> Result<ReplayRecord, ReplayError> {
        let response = self
            .http
            .get(self.replay_url(debate_ref))
            .timeout(self.request_timeout)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ReplayError::NotFound(debate_ref.to_string()));
        }

        let doc: ReplayDebateDoc = response.error_for_status()?.json().await.map_err(|e| {
            if e.is_decode() {
                ReplayError::Malformed(e.to_string())
            } else {
                ReplayError::Http(e)
            }
        })?;

        Ok(doc.into_record())
    }

    async fn record_watch(&self, debate_ref: &str) -> Result<(), ReplayError> {
        self.http
            .post(format!("{}/watch", self.replay_url(debate_ref)))
            .timeout(self.request_timeout)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Replay loader over a compiled-in catalog of finished debates.
///
/// Used by tests and by builds running without a debate service. Watch
/// actions are tallied locally so callers observe the same at-most-once
/// contract as against the real store.
pub struct FixtureReplayLoader {
    records: HashMap<String, ReplayRecord>,
    watches: Mutex<HashMap<String, u64>>,
}

impl FixtureReplayLoader {
    /// Loader over the built-in sample catalog
    pub fn new() -> Self {
        Self::with_records(builtin_replays())
    }

    /// Loader over an explicit record set
    pub fn with_records(records: Vec<ReplayRecord>) -> Self {
        Self {
            records: records
                .into_iter()
                .map(|r| (r.debate_ref.clone(), r))
                .collect(),
            watches: Mutex::new(HashMap::new()),
        }
    }

    /// Watch actions recorded against a reference so far
    pub async fn watch_count(&self, debate_ref: &str) -> u64 {
        self.watches
            .lock()
            .await
            .get(debate_ref)
            .copied()
            .unwrap_or(0)
    }
}

impl Default for FixtureReplayLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReplayLoader for FixtureReplayLoader {
    async fn load(&self, debate_ref: &str) -> Result<ReplayRecord, ReplayError> {
        self.records
            .get(debate_ref)
            .cloned()
            .ok_or_else(|| ReplayError::NotFound(debate_ref.to_string()))
    }

    async fn record_watch(&self, debate_ref: &str) -> Result<(), ReplayError> {
        if !self.records.contains_key(debate_ref) {
            return Err(ReplayError::NotFound(debate_ref.to_string()));
        }
        *self
            .watches
            .lock()
            .await
            .entry(debate_ref.to_string())
            .or_insert(0) += 1;
        Ok(())
    }
}

/// Built-in sample debates for the fixture loader
fn builtin_replays() -> Vec<ReplayRecord> {
    let ada = Participant {
        id: Uuid::from_u128(0xa1a1_0000_0000_0000_0000_0000_0000_0001),
        display_name: "Ada".to_string(),
        avatar_ref: "avatars/ada.png".to_string(),
        role: Role::Proposer,
    };
    let turing = Participant {
        id: Uuid::from_u128(0xa1a1_0000_0000_0000_0000_0000_0000_0002),
        display_name: "Turing".to_string(),
        avatar_ref: "avatars/turing.png".to_string(),
        role: Role::Opponent,
    };
    let hypatia = Participant {
        id: Uuid::from_u128(0xa1a1_0000_0000_0000_0000_0000_0000_0003),
        display_name: "Hypatia".to_string(),
        avatar_ref: "avatars/hypatia.png".to_string(),
        role: Role::Proposer,
    };
    let erasmus = Participant {
        id: Uuid::from_u128(0xa1a1_0000_0000_0000_0000_0000_0000_0004),
        display_name: "Erasmus".to_string(),
        avatar_ref: "avatars/erasmus.png".to_string(),
        role: Role::Opponent,
    };

    vec![
        ReplayRecord {
            debate_ref: "creativity-computed".to_string(),
            topic: "Creativity can be computed".to_string(),
            framework: "oxford".to_string(),
            participants: (ada.clone(), turing.clone()),
            transcript: Transcript::completed(vec![
                Round {
                    number: 1,
                    kind: RoundKind::Opening,
                    first_argument: "Every creative act decomposes into search, \
                        recombination, and selection — all of which are computable."
                        .to_string(),
                    second_argument: "Decomposition after the fact proves nothing; \
                        the generative leap resists formalization."
                        .to_string(),
                },
                Round {
                    number: 2,
                    kind: RoundKind::Rebuttal,
                    first_argument: "Resisting formalization so far is an empirical \
                        claim about our tools, not a proof about the territory."
                        .to_string(),
                    second_argument: "And computability so far is a claim about toy \
                        domains, not about art made under mortal stakes."
                        .to_string(),
                },
                Round {
                    number: 3,
                    kind: RoundKind::Closing,
                    first_argument: "Wherever selection pressure exists, search finds \
                        form; creativity is no exception."
                        .to_string(),
                    second_argument: "A catalogue of forms is not an author. The motion \
                        fails."
                        .to_string(),
                },
            ]),
            meta: ReplayMeta {
                views: 1284,
                rating: 4.6,
                date: Utc.with_ymd_and_hms(2026, 3, 14, 19, 30, 0).unwrap(),
            },
        },
        ReplayRecord {
            debate_ref: "archives-open".to_string(),
            topic: "All public archives should be machine-readable".to_string(),
            framework: "lincoln-douglas".to_string(),
            participants: (hypatia, erasmus),
            transcript: Transcript::completed(vec![
                Round {
                    number: 1,
                    kind: RoundKind::Opening,
                    first_argument: "Knowledge locked in images of paper is knowledge \
                        taxed at every use."
                        .to_string(),
                    second_argument: "Machine readability is a subsidy to whoever owns \
                        the machines."
                        .to_string(),
                },
                Round {
                    number: 2,
                    kind: RoundKind::Closing,
                    first_argument: "The tax falls hardest on those with the least \
                        time; openness is equity."
                        .to_string(),
                    second_argument: "Equity requires stewardship, not bulk export."
                        .to_string(),
                },
            ]),
            meta: ReplayMeta {
                views: 402,
                rating: 4.1,
                date: Utc.with_ymd_and_hms(2026, 5, 2, 17, 0, 0).unwrap(),
            },
        },
    ]
}
