//! Local vote tally with at-most-one vote per session
//!
//! This is an optimistic, client-authoritative tally: no server
//! round-trip confirms the vote. The double-vote check runs locally and
//! rejects without any network call.

use arena_common::model::{Slot, VoteTally};

use crate::error::VoteError;

/// Maintains one session's vote tally and enforces the single-vote rule.
#[derive(Debug, Default)]
pub struct VoteAggregator {
    tally: VoteTally,
}

impl VoteAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cast a vote for the given slot.
    ///
    /// The first call increments that slot's count and latches the voted
    /// flag; every later call returns [`VoteError::AlreadyVoted`] and
    /// leaves the tally unchanged.
    pub fn cast_vote(&mut self, slot: Slot) -> Result<&VoteTally, VoteError> {
        if self.tally.has_voted {
            return Err(VoteError::AlreadyVoted);
        }
        self.tally.record(slot);
        Ok(&self.tally)
    }

    /// Current tally
    pub fn tally(&self) -> &VoteTally {
        &self.tally
    }

    /// Fresh tally for a new session
    pub fn reset(&mut self) {
        self.tally = VoteTally::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vote_exactly_once() {
        let mut votes = VoteAggregator::new();

        let tally = votes.cast_vote(Slot::First).expect("first vote accepted");
        assert_eq!(tally.count(Slot::First), 1);
        assert_eq!(tally.count(Slot::Second), 0);

        // Second vote rejected, counts unchanged
        assert_eq!(votes.cast_vote(Slot::Second), Err(VoteError::AlreadyVoted));
        assert_eq!(votes.tally().count(Slot::First), 1);
        assert_eq!(votes.tally().count(Slot::Second), 0);
        assert!(votes.tally().has_voted);
    }

    #[test]
    fn test_reset_allows_voting_again() {
        let mut votes = VoteAggregator::new();
        votes.cast_vote(Slot::Second).expect("vote accepted");

        votes.reset();
        assert!(!votes.tally().has_voted);
        assert_eq!(votes.tally().count(Slot::Second), 0);

        votes.cast_vote(Slot::First).expect("vote accepted after reset");
        assert_eq!(votes.tally().count(Slot::First), 1);
    }
}
