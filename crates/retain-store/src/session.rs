//! Review session bound to a store.
//!
//! Wraps the in-memory [`ReviewSession`] with the persistence steps: due cards
//! are loaded from the store on start, and every rating is committed (record
//! plus review event, one transaction) before the session advances.

use uuid::Uuid;

use retain_core::{
    CardRecord, Phase, Rating, RatingPreview, ReviewEvent, ReviewSession, ScheduleOutcome,
    Scheduler, SessionTally, elapsed_days,
};

use crate::error::{Result, StoreError};
use crate::store::Store;

/// Counts shown when a session ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub tally: SessionTally,
    pub reviewed: u32,
    pub remaining: usize,
}

pub struct SessionManager<'a> {
    id: Uuid,
    store: &'a Store,
    scheduler: Scheduler,
    session: ReviewSession,
}

impl<'a> SessionManager<'a> {
    /// Parameters are bound once here; a later config save needs a new session.
    pub fn new(store: &'a Store, scheduler: Scheduler) -> Self {
        let id = Uuid::new_v4();
        tracing::debug!(session = %id, "session created");
        Self {
            id,
            store,
            scheduler,
            session: ReviewSession::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> Phase {
        self.session.phase()
    }

    pub fn deck(&self) -> Option<&str> {
        self.session.deck()
    }

    pub fn current(&self) -> Option<&CardRecord> {
        self.session.current()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn summary(&self) -> SessionSummary {
        let tally = self.session.tally();
        SessionSummary {
            tally,
            reviewed: tally.reviewed(),
            remaining: self.session.remaining() + usize::from(self.current().is_some()),
        }
    }

    pub fn select_deck(&mut self, deck: Option<String>) -> Result<()> {
        self.session.select_deck(deck)?;
        Ok(())
    }

    pub fn back_to_decks(&mut self) -> Result<()> {
        self.session.back_to_decks()?;
        Ok(())
    }

    /// Load the due cards for the selected deck and show the first. Returns
    /// `false` when nothing is due.
    pub fn start_review(&mut self, now: i64) -> Result<bool> {
        self.session.can_start()?;
        let due = self.store.get_due_cards(self.session.deck(), now)?;
        let count = due.len();
        let started = self.session.start(due)?;
        tracing::info!(
            session = %self.id,
            deck = self.session.deck().unwrap_or("*"),
            due = count,
            "review started"
        );
        Ok(started)
    }

    pub fn flip(&mut self) -> Result<()> {
        self.session.flip()?;
        Ok(())
    }

    /// Intervals each rating would give the current card.
    pub fn preview(&self, now: i64) -> Option<RatingPreview> {
        let card = self.session.current()?;
        let elapsed = elapsed_days(card.last_reviewed, now);
        Some(self.scheduler.preview(card, elapsed, now))
    }

    /// Schedule, persist and advance.
    ///
    /// On a version conflict the stored copy replaces the current card and is
    /// shown from the front again if it is still due; otherwise the card is
    /// skipped. The error is returned so the caller can tell the learner.
    pub fn rate(&mut self, rating: Rating, now: i64) -> Result<ScheduleOutcome> {
        let outcome = self.session.prepare_rating(rating, &self.scheduler, now)?;
        let event = ReviewEvent {
            id: None,
            card_id: outcome.card.id.clone(),
            rating,
            elapsed_days: self
                .session
                .current()
                .map(|c| elapsed_days(c.last_reviewed, now))
                .unwrap_or(0.0),
            stability: outcome.card.stability,
            difficulty: outcome.card.difficulty,
            interval: outcome.interval_days,
            timestamp: now,
        };

        match self.store.commit_review(&outcome.card, &event) {
            Ok((committed, _)) => {
                self.session.complete_rating(rating)?;
                Ok(ScheduleOutcome {
                    card: committed,
                    ..outcome
                })
            }
            Err(StoreError::VersionConflict { id, expected }) => {
                tracing::warn!(session = %self.id, card = %id, expected, "rating lost a race");
                match self.store.get(&id)? {
                    Some(fresh) if fresh.is_due(now) => self.session.replace_current(fresh)?,
                    _ => self.session.skip_current()?,
                }
                Err(StoreError::VersionConflict { id, expected })
            }
            Err(e) => Err(e),
        }
    }

    /// Drop the queue and return to the dashboard. Committed ratings stay.
    pub fn abandon(&mut self) -> SessionSummary {
        let summary = self.summary();
        self.session.abandon();
        tracing::info!(
            session = %self.id,
            reviewed = summary.reviewed,
            remaining = summary.remaining,
            "review abandoned"
        );
        summary
    }
}
