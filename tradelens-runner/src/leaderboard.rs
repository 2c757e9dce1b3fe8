//! Portfolio leaderboard — bounded, deduplicated, sorted by ranking score.
//!
//! Keeps the top N portfolio candidates found by a search. Deduplication key
//! is the member set: a candidate with the same members and a strictly better
//! score replaces the stored one, otherwise it is skipped. Equal scores keep
//! insertion order, so the first candidate seen with a given score ranks
//! ahead of later ones.

use crate::portfolio::PortfolioCandidate;
use crate::ranking::RankingKey;

/// Outcome of an insert operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult {
    /// New entry added to the leaderboard.
    Inserted,
    /// Replaced an existing entry with the same member set (better score).
    Replaced,
    /// Skipped: duplicate with worse or equal score, undefined score, or not
    /// good enough for a full board.
    Skipped,
}

/// Top N portfolio candidates ranked by one `RankingKey`.
#[derive(Debug, Clone)]
pub struct PortfolioLeaderboard {
    entries: Vec<PortfolioCandidate>,
    max_size: usize,
    ranking_key: RankingKey,
}

impl PortfolioLeaderboard {
    pub fn new(max_size: usize, ranking_key: RankingKey) -> Self {
        Self {
            entries: Vec::with_capacity(max_size.min(1024) + 1),
            max_size,
            ranking_key,
        }
    }

    /// Insert a candidate. Returns the outcome.
    ///
    /// - Rejects candidates whose score is NaN (metric undefined). Infinite
    ///   scores are valid and rank at the extremes.
    /// - Deduplicates by member set: replaces if better, skips otherwise.
    /// - Trims to `max_size` by dropping the worst entry.
    pub fn insert(&mut self, candidate: PortfolioCandidate) -> InsertResult {
        if candidate.score.is_nan() || self.max_size == 0 {
            return InsertResult::Skipped;
        }

        if let Some(idx) = self.find_by_members(&candidate) {
            if self
                .ranking_key
                .is_better(candidate.score, self.entries[idx].score)
            {
                self.entries.remove(idx);
                let pos = self.insertion_point(candidate.score);
                self.entries.insert(pos, candidate);
                return InsertResult::Replaced;
            }
            return InsertResult::Skipped;
        }

        let pos = self.insertion_point(candidate.score);
        if pos >= self.max_size {
            return InsertResult::Skipped;
        }
        self.entries.insert(pos, candidate);
        self.entries.truncate(self.max_size);
        InsertResult::Inserted
    }

    pub fn entries(&self) -> &[PortfolioCandidate] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<PortfolioCandidate> {
        self.entries
    }

    pub fn best(&self) -> Option<&PortfolioCandidate> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn ranking_key(&self) -> RankingKey {
        self.ranking_key
    }

    fn find_by_members(&self, candidate: &PortfolioCandidate) -> Option<usize> {
        self.entries.iter().position(|e| e.same_members(candidate))
    }

    /// First index whose score is strictly worse than `score`.
    ///
    /// Entries are kept best first; equal scores stay ahead of the newcomer.
    fn insertion_point(&self, score: f64) -> usize {
        self.entries
            .partition_point(|e| !self.ranking_key.is_better(score, e.score))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
