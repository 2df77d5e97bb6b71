// Ranked list - contiguous 1-based ranking over movie titles
//
// Ranks are positional: the title at index i holds rank i + 1, so the
// rank set is {1..N} by construction and never needs re-parsing.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// What a mutation does when asked for a rank that is not present.
///
/// The original app silently ignored deletes and edits of missing
/// entries; `Strict` turns those into [`AppError::NotFound`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingRankPolicy {
    /// Silent no-op on a missing rank.
    #[default]
    Ignore,
    /// Report a missing rank as an error.
    Strict,
}

/// A ranked movie as exposed to display, sharing and persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub rank: usize,
    pub title: String,
}

/// Ordered collection of titles with contiguous ranks 1..N.
///
/// Every mutation keeps the rank set exactly {1..N}: inserting shifts
/// later entries up by one, removing shifts them down. All mutations
/// are linear scans, which is fine at the few-dozen-item scale this
/// collection is built for.
#[derive(Debug, Clone, Default)]
pub struct RankedList {
    titles: Vec<String>,
    policy: MissingRankPolicy,
}

impl RankedList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: MissingRankPolicy) -> Self {
        RankedList {
            titles: Vec::new(),
            policy,
        }
    }

    /// Rebuild from titles already in rank order (rank = position + 1).
    pub fn from_titles(titles: Vec<String>, policy: MissingRankPolicy) -> Self {
        RankedList { titles, policy }
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    pub fn policy(&self) -> MissingRankPolicy {
        self.policy
    }

    /// Title at `rank`, if present.
    pub fn title_at(&self, rank: usize) -> Option<&str> {
        if rank == 0 {
            return None;
        }
        self.titles.get(rank - 1).map(String::as_str)
    }

    /// Insert `title` at `rank`, shifting every entry at `rank` and
    /// below it in the ordering up by one.
    ///
    /// `rank` must be in `1..=len() + 1`; `len() + 1` is a plain
    /// append and shifts nothing. Out-of-range ranks are rejected
    /// before anything is touched.
    pub fn insert_at(&mut self, rank: usize, title: impl Into<String>) -> AppResult<()> {
        let max = self.titles.len() + 1;
        if rank == 0 || rank > max {
            return Err(AppError::InvalidRank { rank, max });
        }
        self.titles.insert(rank - 1, title.into());
        Ok(())
    }

    /// Remove the entry at `rank`, closing the gap so ranks stay
    /// contiguous. Returns the removed title.
    ///
    /// A missing rank returns `Ok(None)` under `Ignore` and
    /// [`AppError::NotFound`] under `Strict`.
    pub fn remove_at(&mut self, rank: usize) -> AppResult<Option<String>> {
        if rank == 0 || rank > self.titles.len() {
            return match self.policy {
                MissingRankPolicy::Ignore => Ok(None),
                MissingRankPolicy::Strict => Err(AppError::NotFound(rank)),
            };
        }
        Ok(Some(self.titles.remove(rank - 1)))
    }

    /// Replace the title at `rank` without touching any rank.
    ///
    /// Duplicate titles are allowed; rank is the only unique key.
    pub fn relabel(&mut self, rank: usize, new_title: impl Into<String>) -> AppResult<()> {
        match self.titles.get_mut(rank.wrapping_sub(1)) {
            Some(slot) => {
                *slot = new_title.into();
                Ok(())
            }
            None => match self.policy {
                MissingRankPolicy::Ignore => Ok(()),
                MissingRankPolicy::Strict => Err(AppError::NotFound(rank)),
            },
        }
    }

    /// Entries sorted ascending by rank. Pure read; used for display,
    /// sharing and serialization.
    pub fn entries(&self) -> Vec<RankedEntry> {
        self.titles
            .iter()
            .enumerate()
            .map(|(i, title)| RankedEntry {
                rank: i + 1,
                title: title.clone(),
            })
            .collect()
    }

    /// Titles in rank order.
    pub fn titles(&self) -> &[String] {
        &self.titles
    }
}
