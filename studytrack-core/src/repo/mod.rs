use crate::{Attempt, Card, CardId, CardProgress, CoreError, DocumentId, StudyStats, User, UserId};
use async_trait::async_trait;

pub mod memory;

/// Selects cards by owner and/or source document.
#[derive(Clone, Debug, Default)]
pub struct CardQuery {
    pub user_id: Option<UserId>,
    pub document_id: Option<DocumentId>,
}

impl CardQuery {
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            document_id: None,
        }
    }

    pub fn matches(&self, card: &Card) -> bool {
        self.user_id.map_or(true, |u| card.user_id == u)
            && self.document_id.map_or(true, |d| card.document_id == d)
    }
}

/// Storage boundary.
///
/// Progress and stats writes are compare-and-swap on the record's `version`:
/// they fail with [`CoreError::Conflict`] when `expected_version` is stale,
/// and otherwise store the new value and bump the version by one.
#[async_trait]
pub trait Repository: Send + Sync {
    // Users
    async fn create_user(&self, email: &str, name: &str) -> Result<User, CoreError>;
    async fn get_user(&self, id: UserId) -> Result<User, CoreError>;
    async fn update_user_stats(
        &self,
        id: UserId,
        expected_version: u64,
        stats: &StudyStats,
    ) -> Result<User, CoreError>;

    // Cards
    /// Stores a fully built card and counts it in the owner's
    /// `flashcards_created`, both or neither. The owner must already exist.
    async fn add_card(&self, card: &Card) -> Result<Card, CoreError>;
    async fn get_card(&self, id: CardId) -> Result<Card, CoreError>;
    async fn list_cards(&self, query: &CardQuery) -> Result<Vec<Card>, CoreError>;
    /// Compare-and-swap of the card's progress together with appending the
    /// attempt that produced it. Either both are stored or neither is.
    async fn commit_attempt(
        &self,
        id: CardId,
        expected_version: u64,
        progress: &CardProgress,
        attempt: &Attempt,
    ) -> Result<Card, CoreError>;

    // Attempts
    async fn list_attempts_for_card(&self, card_id: CardId) -> Result<Vec<Attempt>, CoreError>;
    async fn list_attempts_for_user(&self, user_id: UserId) -> Result<Vec<Attempt>, CoreError>;
}
