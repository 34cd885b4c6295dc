use crate::config::{SchedulerConfig, DEFAULT_EASE, INITIAL_INTERVAL_DAYS};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type UserId = Uuid;
pub type DocumentId = Uuid;
pub type CardId = Uuid;
pub type AttemptId = Uuid;

pub const DEFAULT_SUBJECT: &str = "General";

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum MasteryLevel {
    #[default]
    New,
    Learning,
    Reviewing,
    Mastered,
}

impl MasteryLevel {
    pub const ALL: [MasteryLevel; 4] = [
        MasteryLevel::New,
        MasteryLevel::Learning,
        MasteryLevel::Reviewing,
        MasteryLevel::Mastered,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MasteryLevel::New => "new",
            MasteryLevel::Learning => "learning",
            MasteryLevel::Reviewing => "reviewing",
            MasteryLevel::Mastered => "mastered",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "new" => Some(MasteryLevel::New),
            "learning" => Some(MasteryLevel::Learning),
            "reviewing" => Some(MasteryLevel::Reviewing),
            "mastered" => Some(MasteryLevel::Mastered),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CardKind {
    Definition,
    Question,
    Concept,
}

impl CardKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardKind::Definition => "definition",
            CardKind::Question => "question",
            CardKind::Concept => "concept",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "definition" => Some(CardKind::Definition),
            "question" => Some(CardKind::Question),
            "concept" => Some(CardKind::Concept),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "beginner" => Some(Difficulty::Beginner),
            "intermediate" => Some(Difficulty::Intermediate),
            "advanced" => Some(Difficulty::Advanced),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CardSource {
    #[default]
    AiGenerated,
    UserCreated,
    Imported,
}

impl CardSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardSource::AiGenerated => "ai_generated",
            CardSource::UserCreated => "user_created",
            CardSource::Imported => "imported",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "ai_generated" | "ai" => Some(CardSource::AiGenerated),
            "user_created" | "user" => Some(CardSource::UserCreated),
            "imported" => Some(CardSource::Imported),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DueStatus {
    New,
    Due,
    Future,
}

/// Per-card scheduling state. Mutated only by [`crate::scheduler::apply`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CardProgress {
    pub times_studied: u32,
    pub times_correct: u32,
    pub last_studied: Option<DateTime<Utc>>,
    /// Cached result of [`crate::mastery::classify`]; re-derived on every write.
    pub mastery_level: MasteryLevel,
    pub next_review: Option<DateTime<Utc>>,
    pub ease_factor: f64,
    pub interval_days: u32,
}

impl Default for CardProgress {
    fn default() -> Self {
        Self {
            times_studied: 0,
            times_correct: 0,
            last_studied: None,
            mastery_level: MasteryLevel::New,
            next_review: None,
            ease_factor: DEFAULT_EASE,
            interval_days: INITIAL_INTERVAL_DAYS,
        }
    }
}

impl CardProgress {
    pub fn with_config(cfg: &SchedulerConfig) -> Self {
        Self {
            ease_factor: cfg.initial_ease,
            interval_days: cfg.initial_interval_days.max(1),
            ..Self::default()
        }
    }

    /// Fraction of correct answers in `[0, 1]`; zero before the first attempt.
    pub fn accuracy(&self) -> f64 {
        if self.times_studied == 0 {
            0.0
        } else {
            self.times_correct as f64 / self.times_studied as f64
        }
    }

    pub fn accuracy_rate(&self) -> f64 {
        self.accuracy() * 100.0
    }

    pub fn is_new(&self) -> bool {
        self.times_studied == 0
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub user_id: UserId,
    pub document_id: DocumentId,
    pub kind: CardKind,
    pub front: String,
    pub back: String,
    pub difficulty: Difficulty,
    pub subject: String,
    pub tags: Vec<String>,
    pub source: CardSource,

    pub progress: CardProgress,
    pub version: u64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Card {
    pub fn new(
        user_id: UserId,
        document_id: DocumentId,
        kind: CardKind,
        front: impl Into<String>,
        back: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            document_id,
            kind,
            front: front.into(),
            back: back.into(),
            difficulty: Difficulty::default(),
            subject: DEFAULT_SUBJECT.to_string(),
            tags: Vec::new(),
            source: CardSource::default(),
            progress: CardProgress::default(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn due_status(&self, now: DateTime<Utc>) -> DueStatus {
        match self.progress.next_review {
            _ if self.progress.is_new() => DueStatus::New,
            Some(at) if at > now => DueStatus::Future,
            _ => DueStatus::Due,
        }
    }
}

/// Input for creating a card; validated by the repository.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewCard {
    pub user_id: UserId,
    pub document_id: DocumentId,
    pub kind: CardKind,
    pub front: String,
    pub back: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub source: CardSource,
}

impl NewCard {
    pub fn into_card(self, cfg: &SchedulerConfig) -> Result<Card, crate::CoreError> {
        let front = self.front.trim();
        let back = self.back.trim();
        if front.is_empty() {
            return Err(crate::CoreError::Invalid("card front is empty"));
        }
        if back.is_empty() {
            return Err(crate::CoreError::Invalid("card back is empty"));
        }
        let mut card = Card::new(self.user_id, self.document_id, self.kind, front, back);
        card.difficulty = self.difficulty;
        card.subject = self
            .subject
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SUBJECT.to_string());
        card.tags = self
            .tags
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        card.source = self.source;
        card.progress = CardProgress::with_config(cfg);
        Ok(card)
    }
}

/// Per-user aggregates. Mutated only by [`crate::streak::apply_session`] and
/// the counter helpers below.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StudyStats {
    pub total_study_time_minutes: u64,
    pub total_cards_studied: u64,
    pub total_correct_answers: u64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_study_date: Option<DateTime<Utc>>,
    pub documents_uploaded: u64,
    pub flashcards_created: u64,
}

impl StudyStats {
    /// Percentage of correct answers across all sessions.
    pub fn overall_accuracy(&self) -> f64 {
        if self.total_cards_studied == 0 {
            0.0
        } else {
            self.total_correct_answers as f64 / self.total_cards_studied as f64 * 100.0
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub stats: StudyStats,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: &str, name: &str) -> Result<Self, crate::CoreError> {
        let email = email.trim().to_lowercase();
        let name = name.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(crate::CoreError::Invalid("email"));
        }
        if name.is_empty() {
            return Err(crate::CoreError::Invalid("name"));
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            email,
            name: name.to_string(),
            stats: StudyStats::default(),
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Attempt {
    pub id: AttemptId,
    pub card_id: CardId,
    pub user_id: UserId,
    pub is_correct: bool,
    pub response_time_ms: u64,
    pub attempted_at: DateTime<Utc>,
    pub interval_applied: u32,
    pub ease_after: f64,
    pub mastery_after: MasteryLevel,
}

impl Attempt {
    pub fn for_card(card: &Card, is_correct: bool, response_time_ms: u64, attempted_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            card_id: card.id,
            user_id: card.user_id,
            is_correct,
            response_time_ms,
            attempted_at,
            interval_applied: card.progress.interval_days,
            ease_after: card.progress.ease_factor,
            mastery_after: card.progress.mastery_level,
        }
    }
}
