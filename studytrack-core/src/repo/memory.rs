use crate::streak::apply_flashcards_created;
use crate::{Attempt, Card, CardId, CardProgress, CoreError, StudyStats, User, UserId};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;

use super::CardQuery;

#[derive(Default)]
pub struct MemoryRepo {
    users: RwLock<HashMap<UserId, User>>,
    cards: RwLock<HashMap<CardId, Card>>,
    attempts: RwLock<HashMap<CardId, Vec<Attempt>>>,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl crate::repo::Repository for MemoryRepo {
    async fn create_user(&self, email: &str, name: &str) -> Result<User, CoreError> {
        let user = User::new(email, name)?;
        let mut m = self.users.write();
        if m.values().any(|u| u.email == user.email) {
            return Err(CoreError::Conflict("email already registered"));
        }
        m.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<User, CoreError> {
        self.users
            .read()
            .get(&id)
            .cloned()
            .ok_or(CoreError::NotFound("user"))
    }

    async fn update_user_stats(
        &self,
        id: UserId,
        expected_version: u64,
        stats: &StudyStats,
    ) -> Result<User, CoreError> {
        let mut m = self.users.write();
        let Some(user) = m.get_mut(&id) else {
            return Err(CoreError::NotFound("user"));
        };
        if user.version != expected_version {
            return Err(CoreError::Conflict("user stats changed concurrently"));
        }
        user.stats = stats.clone();
        user.version += 1;
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn add_card(&self, card: &Card) -> Result<Card, CoreError> {
        // Lock order: users, then cards.
        let mut users = self.users.write();
        let Some(owner) = users.get_mut(&card.user_id) else {
            return Err(CoreError::NotFound("user"));
        };
        let mut m = self.cards.write();
        if m.contains_key(&card.id) {
            return Err(CoreError::Conflict("card id already exists"));
        }
        owner.stats = apply_flashcards_created(owner.stats.clone(), 1);
        owner.version += 1;
        owner.updated_at = Utc::now();
        m.insert(card.id, card.clone());
        Ok(card.clone())
    }

    async fn get_card(&self, id: CardId) -> Result<Card, CoreError> {
        self.cards
            .read()
            .get(&id)
            .cloned()
            .ok_or(CoreError::NotFound("card"))
    }

    async fn list_cards(&self, query: &CardQuery) -> Result<Vec<Card>, CoreError> {
        let cards = self.cards.read();
        let mut v: Vec<Card> = cards.values().filter(|c| query.matches(c)).cloned().collect();
        v.sort_by_key(|c| c.created_at);
        Ok(v)
    }

    async fn commit_attempt(
        &self,
        id: CardId,
        expected_version: u64,
        progress: &CardProgress,
        attempt: &Attempt,
    ) -> Result<Card, CoreError> {
        // Lock order: cards, then attempts.
        let mut m = self.cards.write();
        let Some(card) = m.get_mut(&id) else {
            return Err(CoreError::NotFound("card"));
        };
        if card.version != expected_version {
            return Err(CoreError::Conflict("card progress changed concurrently"));
        }
        let mut attempts = self.attempts.write();
        card.progress = progress.clone();
        card.version += 1;
        card.updated_at = Utc::now();
        attempts.entry(id).or_default().push(attempt.clone());
        Ok(card.clone())
    }

    async fn list_attempts_for_card(&self, card_id: CardId) -> Result<Vec<Attempt>, CoreError> {
        Ok(self
            .attempts
            .read()
            .get(&card_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_attempts_for_user(&self, user_id: UserId) -> Result<Vec<Attempt>, CoreError> {
        let mut v: Vec<Attempt> = self
            .attempts
            .read()
            .values()
            .flatten()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        v.sort_by_key(|a| a.attempted_at);
        Ok(v)
    }
}
