//! Tunable constants for scheduling and classification.
//!
//! Every default lives in a named constant so the algorithms never carry
//! bare numbers. All structs deserialize with per-field defaults, so a
//! partial TOML table only overrides what it names.

use serde::{Deserialize, Serialize};

pub const DEFAULT_EASE: f64 = 2.5;
pub const MIN_EASE: f64 = 1.3;
pub const EASE_BONUS: f64 = 0.1;
pub const EASE_PENALTY: f64 = 0.2;
pub const INITIAL_INTERVAL_DAYS: u32 = 1;
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

pub const MASTERED_ACCURACY: f64 = 0.90;
pub const MASTERED_MIN_ATTEMPTS: u32 = 3;
pub const REVIEWING_ACCURACY: f64 = 0.70;
pub const LEARNING_ACCURACY: f64 = 0.50;

pub const DEFAULT_MAX_WRITE_RETRIES: u32 = 5;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulerConfig {
    pub initial_ease: f64,
    pub min_ease: f64,
    /// Upper clamp on the ease factor. `None` lets ease keep growing by
    /// `ease_bonus` on every correct answer.
    ///
    /// The default is `None`, so three correct answers from a fresh card
    /// reach ease 2.6, 2.7 and 2.8 with intervals of 3, 8 and 22 days. That
    /// breaks the usual "ease never exceeds 2.5" bound; set `Some(2.5)` to
    /// keep the bound instead, at the cost of flatter growth (3, 8, 20).
    pub max_ease: Option<f64>,
    pub ease_bonus: f64,
    pub ease_penalty: f64,
    pub initial_interval_days: u32,
    /// Keeps `next_review` representable however far ease has grown.
    pub max_interval_days: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            initial_ease: DEFAULT_EASE,
            min_ease: MIN_EASE,
            max_ease: None,
            ease_bonus: EASE_BONUS,
            ease_penalty: EASE_PENALTY,
            initial_interval_days: INITIAL_INTERVAL_DAYS,
            max_interval_days: MAX_INTERVAL_DAYS,
        }
    }
}

impl SchedulerConfig {
    pub fn clamp_ease(&self, ease: f64) -> f64 {
        let floored = ease.max(self.min_ease);
        match self.max_ease {
            Some(cap) => floored.min(cap.max(self.min_ease)),
            None => floored,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MasteryThresholds {
    pub mastered_accuracy: f64,
    pub mastered_min_attempts: u32,
    pub reviewing_accuracy: f64,
    pub learning_accuracy: f64,
}

impl Default for MasteryThresholds {
    fn default() -> Self {
        Self {
            mastered_accuracy: MASTERED_ACCURACY,
            mastered_min_attempts: MASTERED_MIN_ATTEMPTS,
            reviewing_accuracy: REVIEWING_ACCURACY,
            learning_accuracy: LEARNING_ACCURACY,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StudyConfig {
    pub scheduler: SchedulerConfig,
    pub mastery: MasteryThresholds,
}
