use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::ClubError;
use crate::models::{Club, UserCard, HOLD_STATUS_HELD, HOLD_STATUS_RELEASED};

#[async_trait]
pub trait ClubRepository: Send + Sync {
    async fn club_by_user_id(&self, user_id: Uuid) -> Result<Club, ClubError>;
    async fn cards_by_club_id(&self, club_id: Uuid) -> Result<Vec<UserCard>, ClubError>;
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

pub struct PgClubRepository {
    pool: PgPool,
}

impl PgClubRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClubRepository for PgClubRepository {
    async fn club_by_user_id(&self, user_id: Uuid) -> Result<Club, ClubError> {
        let club = sqlx::query_as::<_, Club>("SELECT id, credits FROM clubs WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        club.ok_or(ClubError::ClubNotFound)
    }

    async fn cards_by_club_id(&self, club_id: Uuid) -> Result<Vec<UserCard>, ClubError> {
        let cards = sqlx::query_as::<_, UserCard>(
            "SELECT id, player_id, locked FROM user_cards WHERE club_id = $1 ORDER BY id",
        )
        .bind(club_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(cards)
    }

    async fn lock_card(
        &self,
        user_id: Uuid,
        user_card_id: Uuid,
        reason: &str,
    ) -> Result<Uuid, ClubError> {
        let mut tx = self.pool.begin().await?;

        let club_id = sqlx::query_scalar::<_, Uuid>("SELECT id FROM clubs WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(ClubError::ClubNotFound)?;

        // The row lock serialises concurrent lock attempts on the same card.
        let card = sqlx::query_as::<_, (Uuid, bool)>(
            "SELECT club_id, locked FROM user_cards WHERE id = $1 FOR UPDATE",
        )
        .bind(user_card_id)
        .fetch_optional(&mut *tx)
        .await?;
        let (owner_club_id, locked) = card.ok_or(ClubError::CardNotFound)?;
        if owner_club_id != club_id {
            return Err(ClubError::CardNotOwned);
        }
        if locked {
            return Err(ClubError::CardAlreadyLocked);
        }

        sqlx::query("UPDATE user_cards SET locked = TRUE WHERE id = $1")
            .bind(user_card_id)
            .execute(&mut *tx)
            .await?;

        let lock_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO card_locks (id, user_card_id, reason, released, created_at) \
             VALUES ($1, $2, $3, FALSE, now())",
        )
        .bind(lock_id)
        .bind(user_card_id)
        .bind(reason)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(lock_id)
    }

    async fn release_card_lock(&self, lock_id: Uuid) -> Result<bool, ClubError> {
        let mut tx = self.pool.begin().await?;

        let user_card_id = sqlx::query_scalar::<_, Uuid>(
            "UPDATE card_locks SET released = TRUE, released_at = now() \
             WHERE id = $1 AND released = FALSE RETURNING user_card_id",
        )
        .bind(lock_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(user_card_id) = user_card_id else {
            return Ok(false);
        };

        sqlx::query("UPDATE user_cards SET locked = FALSE WHERE id = $1")
            .bind(user_card_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn create_credit_hold(
        &self,
        user_id: Uuid,
        amount: i64,
        reason: &str,
    ) -> Result<Uuid, ClubError> {
        let mut tx = self.pool.begin().await?;

        // Conditional decrement is the atomic sufficient-funds check.
        let club_id = sqlx::query_scalar::<_, Uuid>(
            "UPDATE clubs SET credits = credits - $2 \
             WHERE user_id = $1 AND credits >= $2 RETURNING id",
        )
        .bind(user_id)
        .bind(amount)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(club_id) = club_id else {
            let exists = sqlx::query_scalar::<_, Uuid>("SELECT id FROM clubs WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
            return Err(if exists.is_some() {
                ClubError::InsufficientCredits
            } else {
                ClubError::ClubNotFound
            });
        };

        let hold_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO credit_holds (id, club_id, amount, reason, status, created_at) \
             VALUES ($1, $2, $3, $4, $5, now())",
        )
        .bind(hold_id)
        .bind(club_id)
        .bind(amount)
        .bind(reason)
        .bind(HOLD_STATUS_HELD)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(hold_id)
    }

    async fn release_credit_hold(&self, hold_id: Uuid) -> Result<bool, ClubError> {
        let mut tx = self.pool.begin().await?;

        let released = sqlx::query_as::<_, (Uuid, i64)>(
            "UPDATE credit_holds SET status = $2, released_at = now() \
             WHERE id = $1 AND status = $3 RETURNING club_id, amount",
        )
        .bind(hold_id)
        .bind(HOLD_STATUS_RELEASED)
        .bind(HOLD_STATUS_HELD)
        .fetch_optional(&mut *tx)
        .await?;
        let Some((club_id, amount)) = released else {
            return Ok(false);
        };

        sqlx::query("UPDATE clubs SET credits = credits + $2 WHERE id = $1")
            .bind(club_id)
            .bind(amount)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }
}
