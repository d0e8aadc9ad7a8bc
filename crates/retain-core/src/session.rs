//! Review-session state machine.
//!
//! ```text
//! DeckSelection → Dashboard → Front → Back → Front (next) → … → Dashboard
//! ```
//!
//! This type owns only in-memory session state: the ordered queue, the card
//! being shown, and the tally. Scoring is delegated to [`Scheduler`]; the
//! caller persists the outcome between [`ReviewSession::prepare_rating`] and
//! [`ReviewSession::complete_rating`], so a rating only advances the queue
//! after it has been committed.

use std::collections::VecDeque;

use crate::card::CardRecord;
use crate::error::CoreError;
use crate::rating::Rating;
use crate::scheduler::{ScheduleOutcome, Scheduler};
use crate::time::elapsed_days;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    DeckSelection,
    Dashboard,
    /// Showing the front of the current card.
    Front,
    /// Showing the back of the current card plus the rating actions.
    Back,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::DeckSelection => "selecting a deck",
            Phase::Dashboard => "on the dashboard",
            Phase::Front => "showing the front",
            Phase::Back => "showing the back",
        }
    }

    pub fn is_reviewing(&self) -> bool {
        matches!(self, Phase::Front | Phase::Back)
    }
}

/// Ratings given since the last `start`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionTally {
    pub again: u32,
    pub hard: u32,
    pub good: u32,
    pub easy: u32,
}

impl SessionTally {
    pub fn record(&mut self, rating: Rating) {
        match rating {
            Rating::Again => self.again += 1,
            Rating::Hard => self.hard += 1,
            Rating::Good => self.good += 1,
            Rating::Easy => self.easy += 1,
        }
    }

    pub fn reviewed(&self) -> u32 {
        self.again + self.hard + self.good + self.easy
    }
}

/// Order due cards for review: new cards first, then by ascending due time.
/// The sort is stable, so equal keys keep their incoming order.
pub fn order_queue(mut cards: Vec<CardRecord>) -> VecDeque<CardRecord> {
    cards.sort_by_key(|c| if c.is_new() { (0u8, 0i64) } else { (1u8, c.due) });
    cards.into()
}

#[derive(Debug)]
pub struct ReviewSession {
    phase: Phase,
    deck: Option<String>,
    queue: VecDeque<CardRecord>,
    current: Option<CardRecord>,
    tally: SessionTally,
}

impl Default for ReviewSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ReviewSession {
    pub fn new() -> Self {
        Self {
            phase: Phase::DeckSelection,
            deck: None,
            queue: VecDeque::new(),
            current: None,
            tally: SessionTally::default(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Deck filter chosen at selection time; `None` means all decks.
    pub fn deck(&self) -> Option<&str> {
        self.deck.as_deref()
    }

    pub fn current(&self) -> Option<&CardRecord> {
        self.current.as_ref()
    }

    /// Cards still waiting behind the current one.
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    pub fn tally(&self) -> SessionTally {
        self.tally
    }

    fn require_phase(&self, command: &'static str, allowed: &[Phase]) -> Result<(), CoreError> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(CoreError::InvalidTransition {
                command,
                phase: self.phase.as_str(),
            })
        }
    }

    pub fn select_deck(&mut self, deck: Option<String>) -> Result<(), CoreError> {
        self.require_phase("select a deck", &[Phase::DeckSelection, Phase::Dashboard])?;
        self.deck = deck;
        self.phase = Phase::Dashboard;
        Ok(())
    }

    pub fn back_to_decks(&mut self) -> Result<(), CoreError> {
        self.require_phase("return to deck selection", &[Phase::Dashboard])?;
        self.phase = Phase::DeckSelection;
        Ok(())
    }

    /// Fails unless [`start`](Self::start) would be accepted in the current phase.
    pub fn can_start(&self) -> Result<(), CoreError> {
        self.require_phase("start reviewing", &[Phase::Dashboard])
    }

    /// Enter review with the due cards for the selected deck. Returns `false`
    /// and stays on the dashboard when there is nothing to review.
    pub fn start(&mut self, due: Vec<CardRecord>) -> Result<bool, CoreError> {
        self.can_start()?;
        self.tally = SessionTally::default();
        self.queue = order_queue(due);
        Ok(self.advance())
    }

    pub fn flip(&mut self) -> Result<(), CoreError> {
        self.require_phase("flip", &[Phase::Front])?;
        self.phase = Phase::Back;
        Ok(())
    }

    /// Score `rating` for the current card without changing session state.
    pub fn prepare_rating(
        &self,
        rating: Rating,
        scheduler: &Scheduler,
        now: i64,
    ) -> Result<ScheduleOutcome, CoreError> {
        self.require_phase("rate", &[Phase::Back])?;
        let card = self.current.as_ref().ok_or(CoreError::InvalidTransition {
            command: "rate",
            phase: "without a current card",
        })?;
        let elapsed = elapsed_days(card.last_reviewed, now);
        Ok(scheduler.schedule(card, rating, elapsed, now))
    }

    /// Record a committed rating and move to the next card, or back to the
    /// dashboard when the queue is empty.
    pub fn complete_rating(&mut self, rating: Rating) -> Result<(), CoreError> {
        self.require_phase("complete a rating", &[Phase::Back])?;
        self.tally.record(rating);
        self.advance();
        Ok(())
    }

    /// Swap in a fresher copy of the current card (e.g. after another context
    /// rated it first) and show its front again.
    pub fn replace_current(&mut self, card: CardRecord) -> Result<(), CoreError> {
        self.require_phase("replace the current card", &[Phase::Front, Phase::Back])?;
        self.current = Some(card);
        self.phase = Phase::Front;
        Ok(())
    }

    /// Drop the current card from this session without rating it.
    pub fn skip_current(&mut self) -> Result<(), CoreError> {
        self.require_phase("skip", &[Phase::Front, Phase::Back])?;
        self.advance();
        Ok(())
    }

    /// Leave review at any point. Already-committed ratings are unaffected.
    pub fn abandon(&mut self) {
        self.queue.clear();
        self.current = None;
        if self.phase.is_reviewing() {
            self.phase = Phase::Dashboard;
        }
    }

    fn advance(&mut self) -> bool {
        self.current = self.queue.pop_front();
        self.phase = if self.current.is_some() {
            Phase::Front
        } else {
            Phase::Dashboard
        };
        self.current.is_some()
    }
}
