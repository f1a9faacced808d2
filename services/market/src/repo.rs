use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::Listing;

/// Minimal persistence surface used by the market handlers.
#[async_trait]
pub trait ListingRepo: Send + Sync {
    async fn active_listing_by_card(&self, user_card_id: Uuid)
        -> Result<Option<Uuid>, sqlx::Error>;
    async fn create_listing(&self, listing: &Listing) -> Result<(), sqlx::Error>;
    async fn get_listing(&self, listing_id: Uuid) -> Result<Option<Listing>, sqlx::Error>;
    async fn insert_bid_and_update_listing(
        &self,
        listing_id: Uuid,
        bidder_club_id: &str,
        hold_id: &str,
        amount: i64,
    ) -> Result<Uuid, sqlx::Error>;
    async fn hold_id_for_bid(
        &self,
        listing_id: Uuid,
        bidder_club_id: &str,
        amount: i64,
    ) -> Result<Option<String>, sqlx::Error>;
}

pub struct PgListingRepo {
    pool: PgPool,
}

impl PgListingRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ListingRepo for PgListingRepo {
    async fn active_listing_by_card(
        &self,
        user_card_id: Uuid,
    ) -> Result<Option<Uuid>, sqlx::Error> {
        sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM listings WHERE user_card_id = $1 AND status = 'ACTIVE' LIMIT 1",
        )
        .bind(user_card_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn create_listing(&self, listing: &Listing) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO listings (id, seller_club_id, user_card_id, start_price, buy_now_price, \
             best_bid, best_bidder_club_id, status, expires_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now())",
        )
        .bind(listing.id)
        .bind(&listing.seller_club_id)
        .bind(listing.user_card_id)
        .bind(listing.start_price)
        .bind(listing.buy_now_price)
        .bind(listing.best_bid)
        .bind(&listing.best_bidder_club_id)
        .bind(&listing.status)
        .bind(listing.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_listing(&self, listing_id: Uuid) -> Result<Option<Listing>, sqlx::Error> {
        sqlx::query_as::<_, Listing>(
            "SELECT id, seller_club_id, user_card_id, start_price, buy_now_price, best_bid, \
             best_bidder_club_id, status, expires_at FROM listings WHERE id = $1",
        )
        .bind(listing_id)
        .fetch_optional(&self.pool)
        .await
    }

    // The two writes commit together; serialisation across bidders is the
    // listing lock's job, not this transaction's.
    async fn insert_bid_and_update_listing(
        &self,
        listing_id: Uuid,
        bidder_club_id: &str,
        hold_id: &str,
        amount: i64,
    ) -> Result<Uuid, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let bid_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO bids (id, listing_id, bidder_club_id, amount, hold_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, now())",
        )
        .bind(bid_id)
        .bind(listing_id)
        .bind(bidder_club_id)
        .bind(amount)
        .bind(hold_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE listings SET best_bid = $1, best_bidder_club_id = $2 WHERE id = $3")
            .bind(amount)
            .bind(bidder_club_id)
            .bind(listing_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(bid_id)
    }

    async fn hold_id_for_bid(
        &self,
        listing_id: Uuid,
        bidder_club_id: &str,
        amount: i64,
    ) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT hold_id FROM bids WHERE listing_id = $1 AND bidder_club_id = $2 \
             AND amount = $3 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(listing_id)
        .bind(bidder_club_id)
        .bind(amount)
        .fetch_optional(&self.pool)
        .await
    }
}
