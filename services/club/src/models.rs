use sqlx::FromRow;
use uuid::Uuid;

pub const HOLD_STATUS_HELD: &str = "HELD";
pub const HOLD_STATUS_RELEASED: &str = "RELEASED";

#[derive(Debug, Clone, FromRow)]
pub struct Club {
    pub id: Uuid,
    pub credits: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct UserCard {
    pub id: Uuid,
    pub player_id: Uuid,
    pub locked: bool,
}

/// A club together with its cards, as returned to the owning user.
#[derive(Debug, Clone)]
pub struct MyClub {
    pub club_id: Uuid,
    pub credits: i64,
    pub cards: Vec<UserCard>,
}
