use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{error, info, warn};
use tonic::{Code, Request, Response, Status};
use uuid::Uuid;

use proto::market::v1::market_service_server::MarketService;
use proto::market::v1::{
    CreateListingRequest, CreateListingResponse, PlaceBidRequest, PlaceBidResponse,
};
use redis_lock::{LockManager, OwnedLock};

use crate::club_client::ClubApi;
use crate::models::{Listing, LISTING_STATUS_ACTIVE};
use crate::repo::ListingRepo;

const LOCK_REASON_LISTING: &str = "market_listing";
const HOLD_REASON_BID: &str = "market_bid";

pub struct MarketServer {
    repo: Arc<dyn ListingRepo>,
    club: Arc<dyn ClubApi>,
    locker: Option<Arc<dyn LockManager>>,
}

impl MarketServer {
    pub fn new(
        repo: Arc<dyn ListingRepo>,
        club: Arc<dyn ClubApi>,
        locker: Option<Arc<dyn LockManager>>,
    ) -> Self {
        Self { repo, club, locker }
    }

    /// Resolves the caller's club through GetMyClub, forwarding identity in
    /// metadata. Unauthenticated/NotFound pass through; everything else
    /// collapses to Internal.
    async fn club_id_for_user(&self, user_id: Uuid) -> Result<String, Status> {
        let summary = match self.club.get_my_club(user_id).await {
            Ok(summary) => summary,
            Err(status) => match status.code() {
                Code::Unauthenticated | Code::NotFound => return Err(status),
                _ => {
                    error!("failed to resolve club for user {user_id}: {status}");
                    return Err(Status::internal("failed to resolve club"));
                }
            },
        };
        if summary.club_id.trim().is_empty() {
            return Err(Status::internal("club_id missing"));
        }
        Ok(summary.club_id)
    }

    async fn place_bid_locked(
        &self,
        listing_id: Uuid,
        bidder_user_id: Uuid,
        bidder_club_id: &str,
        bid_amount: i64,
    ) -> Result<PlaceBidResponse, Status> {
        let listing = self.repo.get_listing(listing_id).await.map_err(|err| {
            error!("failed to load listing {listing_id}: {err}");
            Status::internal("failed to load listing")
        })?;
        let Some(listing) = listing else {
            return Err(Status::not_found("listing not found"));
        };

        if listing.status != LISTING_STATUS_ACTIVE {
            return Err(Status::failed_precondition("listing is not active"));
        }
        if listing.expires_at <= Utc::now() {
            return Err(Status::failed_precondition("listing has expired"));
        }
        match listing.best_bid {
            Some(best_bid) if bid_amount <= best_bid => {
                return Err(Status::failed_precondition(
                    "bid must be higher than best_bid",
                ));
            }
            None if bid_amount < listing.start_price => {
                return Err(Status::failed_precondition("bid must be >= start_price"));
            }
            _ => {}
        }

        let hold_id = self
            .club
            .create_credit_hold(bidder_user_id, bid_amount, HOLD_REASON_BID)
            .await
            .map_err(|status| {
                warn!(
                    "credit hold rejected by club service: code={:?} message={}",
                    status.code(),
                    status.message()
                );
                status
            })?;

        let bid_id = match self
            .repo
            .insert_bid_and_update_listing(listing.id, bidder_club_id, &hold_id, bid_amount)
            .await
        {
            Ok(bid_id) => bid_id,
            Err(err) => {
                error!("failed to insert bid on listing {listing_id}: {err}");
                if let Err(status) = self.club.release_credit_hold(&hold_id).await {
                    warn!("failed to release credit hold {hold_id}: {status}");
                }
                return Err(Status::internal("failed to place bid"));
            }
        };

        // Compensation for the outbid hold stays outside the bid transaction:
        // it must never abort the new winning bid. Failures degrade to
        // reclamation by the janitor.
        if let (Some(prev_amount), Some(prev_club_id)) =
            (listing.best_bid, listing.best_bidder_club_id.as_deref())
        {
            match self
                .repo
                .hold_id_for_bid(listing.id, prev_club_id, prev_amount)
                .await
            {
                Ok(Some(prev_hold_id)) => {
                    if let Err(status) = self.club.release_credit_hold(&prev_hold_id).await {
                        warn!("failed to release previous hold {prev_hold_id}: {status}");
                    }
                }
                Ok(None) => {
                    warn!("no hold found for previous best bid on listing {listing_id}");
                }
                Err(err) => {
                    warn!("failed to look up previous hold on listing {listing_id}: {err}");
                }
            }
        }

        info!("bid placed: listing_id={listing_id} bid_id={bid_id} amount={bid_amount}");
        Ok(PlaceBidResponse {
            best_bid: bid_amount,
            best_bidder_user_id: bidder_user_id.to_string(),
        })
    }
}

fn listing_lock_key(listing_id: Uuid) -> String {
    format!("lock:listing:{listing_id}")
}

fn parse_uuid(raw: &str, field: &str) -> Result<Uuid, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(format!("{field} is required"));
    }
    Uuid::parse_str(trimmed).map_err(|_| format!("{field} must be a valid UUID"))
}

struct NewListingInput {
    seller_user_id: Uuid,
    user_card_id: Uuid,
    start_price: i64,
    buy_now_price: Option<i64>,
    expires_at: DateTime<Utc>,
}

fn validate_create_listing(req: &CreateListingRequest) -> Result<NewListingInput, String> {
    let seller_user_id = parse_uuid(&req.seller_user_id, "seller_user_id")?;
    let user_card_id = parse_uuid(&req.user_card_id, "user_card_id")?;
    if req.start_price <= 0 {
        return Err("start_price must be positive".to_string());
    }
    if req.buy_now_price < 0 {
        return Err("buy_now_price cannot be negative".to_string());
    }
    if req.buy_now_price > 0 && req.buy_now_price < req.start_price {
        return Err("buy_now_price must be >= start_price".to_string());
    }
    let expires_at = DateTime::from_timestamp(req.expires_at_unix, 0)
        .ok_or_else(|| "expires_at_unix is out of range".to_string())?;
    if expires_at <= Utc::now() {
        return Err("expires_at must be in the future".to_string());
    }
    Ok(NewListingInput {
        seller_user_id,
        user_card_id,
        start_price: req.start_price,
        buy_now_price: (req.buy_now_price > 0).then_some(req.buy_now_price),
        expires_at,
    })
}

#[tonic::async_trait]
impl MarketService for MarketServer {
    async fn create_listing(
        &self,
        request: Request<CreateListingRequest>,
    ) -> Result<Response<CreateListingResponse>, Status> {
        let req = request.into_inner();
        let input = validate_create_listing(&req).map_err(Status::invalid_argument)?;

        // Fast rejection; the card lock below is the actual race guard.
        let existing = self
            .repo
            .active_listing_by_card(input.user_card_id)
            .await
            .map_err(|err| {
                error!(
                    "failed to check active listing for card {}: {err}",
                    input.user_card_id
                );
                Status::internal("failed to check existing listing")
            })?;
        if existing.is_some() {
            return Err(Status::already_exists(
                "active listing already exists for card",
            ));
        }

        let seller_club_id = self.club_id_for_user(input.seller_user_id).await?;

        let lock_id = self
            .club
            .lock_card(input.seller_user_id, input.user_card_id, LOCK_REASON_LISTING)
            .await
            .map_err(|status| {
                warn!(
                    "card lock rejected by club service: code={:?} message={}",
                    status.code(),
                    status.message()
                );
                status
            })?;

        let listing = Listing {
            id: Uuid::new_v4(),
            seller_club_id,
            user_card_id: input.user_card_id,
            start_price: input.start_price,
            buy_now_price: input.buy_now_price,
            best_bid: None,
            best_bidder_club_id: None,
            status: LISTING_STATUS_ACTIVE.to_string(),
            expires_at: input.expires_at,
        };

        if let Err(err) = self.repo.create_listing(&listing).await {
            error!("failed to insert listing {}: {err}", listing.id);
            // Best-effort unlock; a leaked lock is left to the janitor.
            if let Err(status) = self.club.release_card_lock(&lock_id).await {
                warn!("failed to release card lock {lock_id}: {status}");
            }
            return Err(Status::internal("failed to create listing"));
        }

        info!(
            "listing created: listing_id={} user_card_id={}",
            listing.id, input.user_card_id
        );
        Ok(Response::new(CreateListingResponse {
            listing_id: listing.id.to_string(),
        }))
    }

    // Not safe to retry from the client: a retry after a successful hold can
    // double-hold credits. No deduplication key is accepted.
    async fn place_bid(
        &self,
        request: Request<PlaceBidRequest>,
    ) -> Result<Response<PlaceBidResponse>, Status> {
        let req = request.into_inner();
        let listing_id =
            parse_uuid(&req.listing_id, "listing_id").map_err(Status::invalid_argument)?;
        let bidder_user_id =
            parse_uuid(&req.bidder_user_id, "bidder_user_id").map_err(Status::invalid_argument)?;
        if req.bid_amount <= 0 {
            return Err(Status::invalid_argument("bid_amount must be positive"));
        }
        let Some(locker) = self.locker.as_ref() else {
            return Err(Status::internal("lock manager not configured"));
        };

        let bidder_club_id = self.club_id_for_user(bidder_user_id).await?;

        // All bids on one listing serialise on this lock; the database
        // transaction below only supplies local atomicity.
        let lock_key = listing_lock_key(listing_id);
        let token = match locker.acquire(&lock_key).await {
            Ok(Some(token)) => token,
            Ok(None) => return Err(Status::failed_precondition("listing is locked")),
            Err(err) => {
                error!("failed to acquire listing lock {lock_key}: {err:?}");
                return Err(Status::internal("failed to acquire listing lock"));
            }
        };
        let lock = OwnedLock::new(Arc::clone(locker), lock_key, token);

        let result = self
            .place_bid_locked(listing_id, bidder_user_id, &bidder_club_id, req.bid_amount)
            .await;
        lock.release().await;
        result.map(Response::new)
    }
}
