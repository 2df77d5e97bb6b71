// Promotion flow - moving a title from the watch list into the ranking
//
// Explicit state machine driven by discrete events, independent of any
// presentation code. The terminal transition is atomic: validation runs
// before either collection is touched, so a title can never end up in
// both collections (or in neither, short of a successful promotion).

use crate::error::{AppError, AppResult};
use crate::ranking::RankedList;
use crate::watchlist::WatchList;

/// Where a detail dialog currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromotionState {
    /// Detail open for a title; nothing mutated yet.
    DetailOpen,
    /// User flagged the title as watched; a rank can now be assigned.
    MarkedWatched,
    /// A valid rank has been chosen, awaiting confirmation.
    RankAssigned(usize),
    /// Terminal: title moved from the watch list into the ranked list.
    Promoted(usize),
    /// Terminal: dialog closed without change.
    Cancelled,
}

/// One in-flight promotion of a single watch-list title.
#[derive(Debug, Clone)]
pub struct Promotion {
    title: String,
    state: PromotionState,
}

impl Promotion {
    /// Open the detail view for `title`.
    pub fn open(title: impl Into<String>) -> Self {
        Promotion {
            title: title.into(),
            state: PromotionState::DetailOpen,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn state(&self) -> PromotionState {
        self.state
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            PromotionState::Promoted(_) | PromotionState::Cancelled
        )
    }

    /// Close the dialog without changing anything. Legal from any
    /// non-terminal state.
    pub fn cancel(&mut self) {
        if !self.is_terminal() {
            self.state = PromotionState::Cancelled;
        }
    }

    /// Flag the title as watched, enabling rank assignment.
    pub fn mark_watched(&mut self) {
        if self.state == PromotionState::DetailOpen {
            self.state = PromotionState::MarkedWatched;
        }
    }

    /// Choose the rank the title will take. `ranked_len` is the current
    /// size of the ranked list; the rank is bounded to `1..=ranked_len + 1`.
    ///
    /// An invalid rank is rejected and the flow stays in `MarkedWatched`.
    pub fn assign_rank(&mut self, rank: usize, ranked_len: usize) -> AppResult<()> {
        let max = ranked_len + 1;
        match self.state {
            PromotionState::MarkedWatched | PromotionState::RankAssigned(_) => {
                if rank == 0 || rank > max {
                    return Err(AppError::InvalidRank { rank, max });
                }
                self.state = PromotionState::RankAssigned(rank);
                Ok(())
            }
            _ => Err(AppError::OutOfOrder(self.title.clone())),
        }
    }

    /// The single terminal transition: remove the title from the watch
    /// list and insert it into the ranked list at the assigned rank.
    ///
    /// Both checks (title present, rank in range) happen before either
    /// collection is mutated, so failure leaves both lists untouched.
    pub fn confirm(
        &mut self,
        watch_list: &mut WatchList,
        ranked: &mut RankedList,
    ) -> AppResult<usize> {
        let rank = match self.state {
            PromotionState::RankAssigned(rank) => rank,
            _ => return Err(AppError::OutOfOrder(self.title.clone())),
        };

        let index = watch_list
            .position(&self.title)
            .ok_or_else(|| AppError::MissingTitle(self.title.clone()))?;
        let max = ranked.len() + 1;
        if rank > max {
            return Err(AppError::InvalidRank { rank, max });
        }

        let title = watch_list
            .remove_at(index)
            .expect("index came from position()");
        ranked
            .insert_at(rank, title)
            .expect("rank validated against current length");

        self.state = PromotionState::Promoted(rank);
        Ok(rank)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_promotion_moves_title_between_collections() {
        let mut watch = WatchList::from_titles(vec!["A".to_string(), "B".to_string()]);
        let mut ranked = RankedList::new();

        let mut promo = Promotion::open("A");
        promo.mark_watched();
        promo.assign_rank(1, ranked.len()).unwrap();
        let rank = promo.confirm(&mut watch, &mut ranked).unwrap();

        assert_eq!(rank, 1);
        assert_eq!(promo.state(), PromotionState::Promoted(1));
        assert_eq!(watch.titles(), &["B".to_string()]);
        assert_eq!(ranked.title_at(1), Some("A"));
        // Never in both collections
        assert!(!watch.contains("A"));
    }

    #[test]
    fn test_cancel_mutates_nothing() {
        let mut promo = Promotion::open("A");
        promo.mark_watched();
        promo.cancel();

        assert_eq!(promo.state(), PromotionState::Cancelled);
        assert!(promo.is_terminal());
    }

    #[test]
    fn test_rank_bounded_by_ranked_size_plus_one() {
        let mut ranked = RankedList::new();
        ranked.insert_at(1, "X").unwrap();

        let mut promo = Promotion::open("A");
        promo.mark_watched();

        let err = promo.assign_rank(3, ranked.len()).unwrap_err();
        assert!(matches!(err, AppError::InvalidRank { rank: 3, max: 2 }));
        assert_eq!(promo.state(), PromotionState::MarkedWatched);

        promo.assign_rank(2, ranked.len()).unwrap();
        assert_eq!(promo.state(), PromotionState::RankAssigned(2));
    }

    #[test]
    fn test_confirm_requires_title_in_watch_list() {
        let mut watch = WatchList::from_titles(vec!["B".to_string()]);
        let mut ranked = RankedList::new();

        let mut promo = Promotion::open("A");
        promo.mark_watched();
        promo.assign_rank(1, ranked.len()).unwrap();

        let err = promo.confirm(&mut watch, &mut ranked).unwrap_err();
        assert!(matches!(err, AppError::MissingTitle(_)));

        // Failed confirmation leaves both collections untouched
        assert_eq!(watch.len(), 1);
        assert!(ranked.is_empty());
        assert!(!promo.is_terminal());
    }

    #[test]
    fn test_confirm_without_assigned_rank_is_rejected() {
        let mut watch = WatchList::from_titles(vec!["A".to_string()]);
        let mut ranked = RankedList::new();

        let mut promo = Promotion::open("A");
        promo.mark_watched();

        assert!(promo.confirm(&mut watch, &mut ranked).is_err());
        assert_eq!(watch.len(), 1);
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_promote_into_existing_ranking_shifts_later_entries() {
        let mut watch = WatchList::from_titles(vec!["New".to_string()]);
        let mut ranked = RankedList::new();
        ranked.insert_at(1, "First").unwrap();
        ranked.insert_at(2, "Second").unwrap();

        let mut promo = Promotion::open("New");
        promo.mark_watched();
        promo.assign_rank(2, ranked.len()).unwrap();
        promo.confirm(&mut watch, &mut ranked).unwrap();

        assert_eq!(ranked.title_at(1), Some("First"));
        assert_eq!(ranked.title_at(2), Some("New"));
        assert_eq!(ranked.title_at(3), Some("Second"));
    }
}
