use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use studytrack_core::{Card, CardProgress, MasteryLevel, StudyStats, User};
use uuid::Uuid;

#[derive(Deserialize)]
pub struct UserIn {
    pub email: String,
    pub name: String,
}

#[derive(Serialize)]
pub struct UserOut {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub stats: StudyStats,
    pub overall_accuracy: f64,
}

impl From<User> for UserOut {
    fn from(u: User) -> Self {
        Self {
            overall_accuracy: u.stats.overall_accuracy(),
            id: u.id,
            email: u.email,
            name: u.name,
            stats: u.stats,
        }
    }
}

#[derive(Serialize)]
pub struct CardOut {
    pub id: Uuid,
    pub user_id: Uuid,
    pub document_id: Uuid,
    pub front: String,
    pub back: String,
    pub subject: String,
    pub tags: Vec<String>,
    pub mastery_level: MasteryLevel,
    pub next_review: Option<DateTime<Utc>>,
    pub accuracy_rate: f64,
    pub progress: CardProgress,
}

impl From<Card> for CardOut {
    fn from(c: Card) -> Self {
        Self {
            mastery_level: c.progress.mastery_level,
            next_review: c.progress.next_review,
            accuracy_rate: c.progress.accuracy_rate(),
            id: c.id,
            user_id: c.user_id,
            document_id: c.document_id,
            front: c.front,
            back: c.back,
            subject: c.subject,
            tags: c.tags,
            progress: c.progress,
        }
    }
}

#[derive(Deserialize)]
pub struct AttemptIn {
    pub is_correct: bool,
    #[serde(default)]
    pub response_time_ms: u64,
}

#[derive(Deserialize)]
pub struct DueQuery {
    pub max: Option<usize>,
}
