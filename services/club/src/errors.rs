use thiserror::Error;

/// Domain errors; the gRPC layer owns the mapping to status codes.
#[derive(Debug, Error)]
pub enum ClubError {
    #[error("club not found")]
    ClubNotFound,
    #[error("card not found")]
    CardNotFound,
    #[error("card is not owned by user")]
    CardNotOwned,
    #[error("card is already locked")]
    CardAlreadyLocked,
    #[error("insufficient credits")]
    InsufficientCredits,
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}
