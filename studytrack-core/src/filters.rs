use crate::{Card, DueStatus, MasteryLevel};
use chrono::{DateTime, Utc};

pub fn filter_by_text(cards: &[Card], query: &str) -> Vec<Card> {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return cards.to_vec();
    }
    cards
        .iter()
        .filter(|c| {
            c.front.to_lowercase().contains(&q)
                || c.back.to_lowercase().contains(&q)
                || c.subject.to_lowercase().contains(&q)
                || c.tags.iter().any(|t| t.to_lowercase().contains(&q))
        })
        .cloned()
        .collect()
}

pub fn filter_by_tag(cards: &[Card], tag: &str) -> Vec<Card> {
    let q = tag.trim().to_lowercase();
    cards
        .iter()
        .filter(|c| c.tags.iter().any(|t| t.to_lowercase() == q))
        .cloned()
        .collect()
}

pub fn filter_by_mastery(cards: &[Card], level: MasteryLevel) -> Vec<Card> {
    cards
        .iter()
        .filter(|c| c.progress.mastery_level == level)
        .cloned()
        .collect()
}

/// Cards that should be shown now: never-studied cards first, then cards
/// whose review date has passed, oldest due date first.
pub fn filter_due(cards: &[Card], now: DateTime<Utc>) -> Vec<Card> {
    let mut v: Vec<Card> = cards
        .iter()
        .filter(|c| c.due_status(now) != DueStatus::Future)
        .cloned()
        .collect();
    v.sort_by_key(|c| (c.progress.next_review, c.created_at));
    v
}
