use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::ClubError;
use crate::models::MyClub;
use crate::repo::ClubRepository;

/// Domain operations exposed to the gRPC layer. Opaque handles (`lock_id`,
/// `hold_id`) make both release operations idempotent.
#[async_trait]
pub trait ClubDomain: Send + Sync {
    async fn get_my_club(&self, user_id: Uuid) -> Result<MyClub, ClubError>;
    async fn lock_card(
        &self,
        user_id: Uuid,
        user_card_id: Uuid,
        reason: &str,
    ) -> Result<Uuid, ClubError>;
    async fn release_card_lock(&self, lock_id: Uuid) -> Result<bool, ClubError>;
    async fn create_credit_hold(
        &self,
        user_id: Uuid,
        amount: i64,
        reason: &str,
    ) -> Result<Uuid, ClubError>;
    async fn release_credit_hold(&self, hold_id: Uuid) -> Result<bool, ClubError>;
}

pub struct Service<R> {
    repo: R,
}

impl<R: ClubRepository> Service<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl<R: ClubRepository> ClubDomain for Service<R> {
    async fn get_my_club(&self, user_id: Uuid) -> Result<MyClub, ClubError> {
        let club = self.repo.club_by_user_id(user_id).await?;
        // Two independent reads; a card racing in or out between them is
        // tolerated by callers.
        let cards = self.repo.cards_by_club_id(club.id).await?;
        Ok(MyClub {
            club_id: club.id,
            credits: club.credits,
            cards,
        })
    }

    async fn lock_card(
        &self,
        user_id: Uuid,
        user_card_id: Uuid,
        reason: &str,
    ) -> Result<Uuid, ClubError> {
        self.repo.lock_card(user_id, user_card_id, reason).await
    }

    async fn release_card_lock(&self, lock_id: Uuid) -> Result<bool, ClubError> {
        self.repo.release_card_lock(lock_id).await
    }

    async fn create_credit_hold(
        &self,
        user_id: Uuid,
        amount: i64,
        reason: &str,
    ) -> Result<Uuid, ClubError> {
        self.repo.create_credit_hold(user_id, amount, reason).await
    }

    async fn release_credit_hold(&self, hold_id: Uuid) -> Result<bool, ClubError> {
        self.repo.release_credit_hold(hold_id).await
    }
}
