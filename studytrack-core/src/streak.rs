use crate::{CoreError, StudyStats};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw session totals as they arrive from a caller.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionInput {
    pub cards_studied: i64,
    pub correct_answers: i64,
    pub study_time_minutes: i64,
}

/// Session totals that passed validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StudySession {
    cards_studied: u64,
    correct_answers: u64,
    study_time_minutes: u64,
}

impl StudySession {
    pub fn cards_studied(&self) -> u64 {
        self.cards_studied
    }

    pub fn correct_answers(&self) -> u64 {
        self.correct_answers
    }

    pub fn study_time_minutes(&self) -> u64 {
        self.study_time_minutes
    }
}

impl TryFrom<SessionInput> for StudySession {
    type Error = CoreError;

    fn try_from(input: SessionInput) -> Result<Self, Self::Error> {
        let cards_studied =
            u64::try_from(input.cards_studied).map_err(|_| CoreError::InvalidSessionData("negative cards studied"))?;
        let correct_answers = u64::try_from(input.correct_answers)
            .map_err(|_| CoreError::InvalidSessionData("negative correct answers"))?;
        let study_time_minutes = u64::try_from(input.study_time_minutes)
            .map_err(|_| CoreError::InvalidSessionData("negative study time"))?;
        if correct_answers > cards_studied {
            return Err(CoreError::InvalidSessionData("more correct answers than cards studied"));
        }
        Ok(Self {
            cards_studied,
            correct_answers,
            study_time_minutes,
        })
    }
}

/// Whole days elapsed since the previous session.
///
/// A first-ever session counts as one day so it opens a streak of 1. Clock
/// skew that puts `now` before the stored date is treated as the same day.
pub fn days_since(previous: Option<DateTime<Utc>>, now: DateTime<Utc>) -> i64 {
    match previous {
        None => 1,
        Some(prev) => (now - prev).num_days().max(0),
    }
}

/// Largest value any running total may reach. Every backend can store it
/// as a signed 64-bit integer.
pub const MAX_TOTAL: u64 = i64::MAX as u64;

fn add_total(total: u64, delta: u64, what: &'static str) -> Result<u64, CoreError> {
    total
        .checked_add(delta)
        .filter(|t| *t <= MAX_TOTAL)
        .ok_or(CoreError::InvalidSessionData(what))
}

/// Folds one finished session into a user's aggregates.
///
/// A session that would push any total past [`MAX_TOTAL`] is rejected as a
/// whole with `InvalidSessionData`.
pub fn apply_session(mut stats: StudyStats, session: &StudySession, now: DateTime<Utc>) -> Result<StudyStats, CoreError> {
    stats.total_cards_studied = add_total(
        stats.total_cards_studied,
        session.cards_studied,
        "cards studied total overflows",
    )?;
    stats.total_correct_answers = add_total(
        stats.total_correct_answers,
        session.correct_answers,
        "correct answers total overflows",
    )?;
    stats.total_study_time_minutes = add_total(
        stats.total_study_time_minutes,
        session.study_time_minutes,
        "study time total overflows",
    )?;

    // must read the stored date before it is overwritten below
    let days_diff = days_since(stats.last_study_date, now);
    match days_diff {
        0 => {}
        1 => stats.current_streak = stats.current_streak.saturating_add(1),
        _ => stats.current_streak = 1,
    }
    stats.longest_streak = stats.longest_streak.max(stats.current_streak);
    stats.last_study_date = Some(now);

    Ok(stats)
}

pub fn apply_document_upload(mut stats: StudyStats) -> StudyStats {
    stats.documents_uploaded = stats.documents_uploaded.saturating_add(1).min(MAX_TOTAL);
    stats
}

pub fn apply_flashcards_created(mut stats: StudyStats, count: u64) -> StudyStats {
    stats.flashcards_created = stats.flashcards_created.saturating_add(count).min(MAX_TOTAL);
    stats
}
