use crate::{Attempt, Card, MasteryLevel};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct Totals {
    pub attempts: u32,
    pub correct: u32,
    pub response_time_ms: u64,
}

impl Totals {
    pub fn record(&mut self, a: &Attempt) {
        self.attempts += 1;
        if a.is_correct {
            self.correct += 1;
        }
        self.response_time_ms += a.response_time_ms;
    }

    pub fn accuracy(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.correct as f64 / self.attempts as f64
        }
    }

    pub fn avg_response_ms(&self) -> u64 {
        if self.attempts == 0 {
            0
        } else {
            self.response_time_ms / self.attempts as u64
        }
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct AttemptSummary {
    pub totals: Totals,
    pub per_day: BTreeMap<NaiveDate, Totals>,
}

pub fn summarize(attempts: &[Attempt]) -> AttemptSummary {
    let mut summary = AttemptSummary::default();
    for a in attempts {
        summary.totals.record(a);
        let d = a.attempted_at.date_naive();
        summary.per_day.entry(d).or_default().record(a);
    }
    summary
}

/// Number of cards at each mastery level, every level present.
pub fn mastery_breakdown(cards: &[Card]) -> BTreeMap<MasteryLevel, u32> {
    let mut map: BTreeMap<MasteryLevel, u32> = MasteryLevel::ALL.iter().map(|l| (*l, 0)).collect();
    for c in cards {
        *map.entry(c.progress.mastery_level).or_default() += 1;
    }
    map
}
