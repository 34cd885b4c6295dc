//! The two write paths exposed to the rest of an application, plus the
//! read helpers that reporting layers use.
//!
//! Every write is read, pure update, then compare-and-swap. A stale version
//! is retried from a fresh read; any other error goes straight back. A card
//! attempt's progress and its log entry land in one repository call, so an
//! error always means nothing was stored.

use crate::config::{StudyConfig, DEFAULT_MAX_WRITE_RETRIES};
use crate::filters::filter_due;
use crate::repo::{CardQuery, Repository};
use crate::scheduler::apply_attempt;
use crate::stats::{mastery_breakdown, summarize, AttemptSummary};
use crate::streak::{apply_document_upload, apply_session, SessionInput, StudySession};
use crate::{Attempt, Card, CardId, CoreError, MasteryLevel, NewCard, StudyStats, User, UserId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone, Debug, Serialize)]
pub struct UserReport {
    pub user: User,
    pub overall_accuracy: f64,
    pub mastery: BTreeMap<MasteryLevel, u32>,
    pub attempts: AttemptSummary,
    pub due_now: usize,
}

#[derive(Clone)]
pub struct StudyService {
    repo: Arc<dyn Repository>,
    config: StudyConfig,
    max_write_retries: u32,
}

impl StudyService {
    pub fn new(repo: Arc<dyn Repository>, config: StudyConfig) -> Self {
        Self {
            repo,
            config,
            max_write_retries: DEFAULT_MAX_WRITE_RETRIES,
        }
    }

    pub fn with_max_write_retries(mut self, retries: u32) -> Self {
        self.max_write_retries = retries;
        self
    }

    pub fn config(&self) -> &StudyConfig {
        &self.config
    }

    pub fn repo(&self) -> &Arc<dyn Repository> {
        &self.repo
    }

    // ===== Users =====
    pub async fn create_user(&self, email: &str, name: &str) -> Result<User, CoreError> {
        self.repo.create_user(email, name).await
    }

    pub async fn get_user(&self, id: UserId) -> Result<User, CoreError> {
        self.repo.get_user(id).await
    }

    pub async fn record_study_session(&self, user_id: UserId, input: SessionInput) -> Result<StudyStats, CoreError> {
        self.record_study_session_at(user_id, input, Utc::now()).await
    }

    pub async fn record_study_session_at(
        &self,
        user_id: UserId,
        input: SessionInput,
        now: DateTime<Utc>,
    ) -> Result<StudyStats, CoreError> {
        let session = StudySession::try_from(input)?;
        let user = self
            .update_stats_with(user_id, |stats| apply_session(stats, &session, now))
            .await?;
        debug!(
            %user_id,
            cards = session.cards_studied(),
            correct = session.correct_answers(),
            streak = user.stats.current_streak,
            "study session recorded"
        );
        Ok(user.stats)
    }

    pub async fn record_document_upload(&self, user_id: UserId) -> Result<StudyStats, CoreError> {
        let user = self
            .update_stats_with(user_id, |stats| Ok(apply_document_upload(stats)))
            .await?;
        Ok(user.stats)
    }

    pub async fn user_report(&self, user_id: UserId, now: DateTime<Utc>) -> Result<UserReport, CoreError> {
        let user = self.repo.get_user(user_id).await?;
        let cards = self.repo.list_cards(&CardQuery::for_user(user_id)).await?;
        let attempts = self.repo.list_attempts_for_user(user_id).await?;
        Ok(UserReport {
            overall_accuracy: user.stats.overall_accuracy(),
            mastery: mastery_breakdown(&cards),
            attempts: summarize(&attempts),
            due_now: filter_due(&cards, now).len(),
            user,
        })
    }

    // ===== Cards =====
    pub async fn add_card(&self, new_card: NewCard) -> Result<Card, CoreError> {
        let card = new_card.into_card(&self.config.scheduler)?;
        self.repo.add_card(&card).await
    }

    pub async fn get_card(&self, id: CardId) -> Result<Card, CoreError> {
        self.repo.get_card(id).await
    }

    pub async fn list_cards(&self, query: &CardQuery) -> Result<Vec<Card>, CoreError> {
        self.repo.list_cards(query).await
    }

    pub async fn due_cards(&self, user_id: UserId, now: DateTime<Utc>, limit: Option<usize>) -> Result<Vec<Card>, CoreError> {
        self.repo.get_user(user_id).await?;
        let cards = self.repo.list_cards(&CardQuery::for_user(user_id)).await?;
        let mut due = filter_due(&cards, now);
        if let Some(max) = limit {
            due.truncate(max);
        }
        Ok(due)
    }

    pub async fn card_attempts(&self, card_id: CardId) -> Result<Vec<Attempt>, CoreError> {
        self.repo.get_card(card_id).await?;
        self.repo.list_attempts_for_card(card_id).await
    }

    pub async fn record_card_attempt(
        &self,
        card_id: CardId,
        is_correct: bool,
        response_time_ms: u64,
    ) -> Result<Card, CoreError> {
        self.record_card_attempt_at(card_id, is_correct, response_time_ms, Utc::now())
            .await
    }

    pub async fn record_card_attempt_at(
        &self,
        card_id: CardId,
        is_correct: bool,
        response_time_ms: u64,
        now: DateTime<Utc>,
    ) -> Result<Card, CoreError> {
        let mut retries = 0;
        loop {
            let card = self.repo.get_card(card_id).await?;
            let expected = card.version;
            let out = apply_attempt(card, is_correct, response_time_ms, now, &self.config);
            match self
                .repo
                .commit_attempt(card_id, expected, &out.updated_card.progress, &out.attempt)
                .await
            {
                Ok(stored) => {
                    debug!(
                        %card_id,
                        is_correct,
                        interval = stored.progress.interval_days,
                        ease = stored.progress.ease_factor,
                        mastery = stored.progress.mastery_level.as_str(),
                        "card attempt recorded"
                    );
                    return Ok(stored);
                }
                Err(e) if e.is_conflict() && retries < self.max_write_retries => {
                    retries += 1;
                    warn!(%card_id, retries, "card progress write conflict, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn update_stats_with<F>(&self, user_id: UserId, f: F) -> Result<User, CoreError>
    where
        F: Fn(StudyStats) -> Result<StudyStats, CoreError> + Send + Sync,
    {
        let mut retries = 0;
        loop {
            let user = self.repo.get_user(user_id).await?;
            let next = f(user.stats)?;
            match self.repo.update_user_stats(user_id, user.version, &next).await {
                Ok(stored) => return Ok(stored),
                Err(e) if e.is_conflict() && retries < self.max_write_retries => {
                    retries += 1;
                    warn!(%user_id, retries, "user stats write conflict, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }
}
