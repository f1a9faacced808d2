use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

pub const LISTING_STATUS_ACTIVE: &str = "ACTIVE";

/// Row shape of the listings table. Club-side identifiers and hold handles
/// are opaque text minted by the club service; absent optional prices are
/// SQL NULL, never zero.
#[derive(Debug, Clone, FromRow)]
pub struct Listing {
    pub id: Uuid,
    pub seller_club_id: String,
    pub user_card_id: Uuid,
    pub start_price: i64,
    pub buy_now_price: Option<i64>,
    pub best_bid: Option<i64>,
    pub best_bidder_club_id: Option<String>,
    pub status: String,
    pub expires_at: DateTime<Utc>,
}
