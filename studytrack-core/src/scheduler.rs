use crate::config::StudyConfig;
use crate::mastery::classify;
use crate::{Attempt, Card, CardProgress};
use chrono::{DateTime, Duration, Utc};

pub struct ScheduleOutcome {
    pub updated_card: Card,
    pub attempt: Attempt,
}

/// Folds one binary outcome into a card's progress.
///
/// Correct answers grow ease by `ease_bonus` and multiply the interval by the
/// new ease; misses cut ease by `ease_penalty` and reset the interval. The
/// mastery label is recomputed from the updated counts afterwards.
pub fn apply(mut progress: CardProgress, is_correct: bool, now: DateTime<Utc>, cfg: &StudyConfig) -> CardProgress {
    let s = &cfg.scheduler;

    let (new_ease, new_interval) = if is_correct {
        let ease = s.clamp_ease(progress.ease_factor + s.ease_bonus);
        let base = progress.interval_days.max(1) as f64;
        let interval = (base * ease).round().max(1.0) as u32;
        (ease, interval)
    } else {
        (s.clamp_ease(progress.ease_factor - s.ease_penalty), 1)
    };
    let new_interval = new_interval.min(s.max_interval_days.max(1));

    progress.times_studied = progress.times_studied.saturating_add(1);
    if is_correct {
        progress.times_correct = progress.times_correct.saturating_add(1);
    }
    progress.ease_factor = new_ease;
    progress.interval_days = new_interval;
    progress.last_studied = Some(now);
    progress.next_review = Some(now + Duration::days(new_interval as i64));
    progress.mastery_level = classify(progress.times_correct, progress.times_studied, &cfg.mastery);

    progress
}

pub fn apply_attempt(
    mut card: Card,
    is_correct: bool,
    response_time_ms: u64,
    now: DateTime<Utc>,
    cfg: &StudyConfig,
) -> ScheduleOutcome {
    card.progress = apply(card.progress, is_correct, now, cfg);
    card.updated_at = now;
    let attempt = Attempt::for_card(&card, is_correct, response_time_ms, now);
    ScheduleOutcome { updated_card: card, attempt }
}
