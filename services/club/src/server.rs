use std::sync::Arc;

use log::{error, info};
use tonic::{Request, Response, Status};
use uuid::Uuid;

use grpc_identity::user_id_from_request;
use proto::club::v1::club_service_server::ClubService;
use proto::club::v1::{
    Card, CreateCreditHoldRequest, CreateCreditHoldResponse, GetMyClubRequest, GetMyClubResponse,
    LockCardRequest, LockCardResponse, ReleaseCardLockRequest, ReleaseCardLockResponse,
    ReleaseCreditHoldRequest, ReleaseCreditHoldResponse, SettleTradeRequest, SettleTradeResponse,
};

use crate::errors::ClubError;
use crate::service::ClubDomain;

pub struct ClubGrpcServer {
    domain: Arc<dyn ClubDomain>,
}

impl ClubGrpcServer {
    pub fn new(domain: Arc<dyn ClubDomain>) -> Self {
        Self { domain }
    }
}

fn status_from_error(err: ClubError) -> Status {
    match err {
        ClubError::ClubNotFound => Status::not_found("club not found"),
        ClubError::CardNotFound => Status::not_found("card not found"),
        ClubError::CardNotOwned => Status::failed_precondition("card is not owned by user"),
        ClubError::CardAlreadyLocked => Status::failed_precondition("card is already locked"),
        ClubError::InsufficientCredits => Status::failed_precondition("insufficient credits"),
        ClubError::Storage(err) => {
            error!("storage error: {err}");
            Status::internal("storage error")
        }
    }
}

fn parse_id(raw: &str, field: &str) -> Result<Uuid, Status> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| Status::invalid_argument(format!("{field} must be a valid UUID")))
}

#[tonic::async_trait]
impl ClubService for ClubGrpcServer {
    async fn get_my_club(
        &self,
        request: Request<GetMyClubRequest>,
    ) -> Result<Response<GetMyClubResponse>, Status> {
        let user_id = user_id_from_request(&request)?;

        let my_club = self
            .domain
            .get_my_club(user_id)
            .await
            .map_err(status_from_error)?;

        let cards = my_club
            .cards
            .into_iter()
            .map(|card| Card {
                id: card.id.to_string(),
                player_id: card.player_id.to_string(),
                locked: card.locked,
            })
            .collect();

        Ok(Response::new(GetMyClubResponse {
            club_id: my_club.club_id.to_string(),
            credits: my_club.credits,
            cards,
        }))
    }

    async fn lock_card(
        &self,
        request: Request<LockCardRequest>,
    ) -> Result<Response<LockCardResponse>, Status> {
        let req = request.into_inner();
        let user_id = parse_id(&req.user_id, "user_id")?;
        let user_card_id = parse_id(&req.user_card_id, "user_card_id")?;

        let lock_id = self
            .domain
            .lock_card(user_id, user_card_id, &req.reason)
            .await
            .map_err(status_from_error)?;

        info!("card locked: user_card_id={user_card_id} lock_id={lock_id}");
        Ok(Response::new(LockCardResponse {
            lock_id: lock_id.to_string(),
        }))
    }

    async fn release_card_lock(
        &self,
        request: Request<ReleaseCardLockRequest>,
    ) -> Result<Response<ReleaseCardLockResponse>, Status> {
        let req = request.into_inner();
        // Unknown or malformed handles count as already released.
        let Ok(lock_id) = Uuid::parse_str(req.lock_id.trim()) else {
            return Ok(Response::new(ReleaseCardLockResponse { released: false }));
        };

        let released = self
            .domain
            .release_card_lock(lock_id)
            .await
            .map_err(status_from_error)?;

        Ok(Response::new(ReleaseCardLockResponse { released }))
    }

    async fn create_credit_hold(
        &self,
        request: Request<CreateCreditHoldRequest>,
    ) -> Result<Response<CreateCreditHoldResponse>, Status> {
        let req = request.into_inner();
        let user_id = parse_id(&req.user_id, "user_id")?;
        if req.amount <= 0 {
            return Err(Status::invalid_argument("amount must be positive"));
        }

        let hold_id = self
            .domain
            .create_credit_hold(user_id, req.amount, &req.reason)
            .await
            .map_err(status_from_error)?;

        info!("credit hold created: hold_id={hold_id} amount={}", req.amount);
        Ok(Response::new(CreateCreditHoldResponse {
            hold_id: hold_id.to_string(),
        }))
    }

    async fn release_credit_hold(
        &self,
        request: Request<ReleaseCreditHoldRequest>,
    ) -> Result<Response<ReleaseCreditHoldResponse>, Status> {
        let req = request.into_inner();
        let Ok(hold_id) = Uuid::parse_str(req.hold_id.trim()) else {
            return Ok(Response::new(ReleaseCreditHoldResponse { released: false }));
        };

        let released = self
            .domain
            .release_credit_hold(hold_id)
            .await
            .map_err(status_from_error)?;

        Ok(Response::new(ReleaseCreditHoldResponse { released }))
    }

    async fn settle_trade(
        &self,
        _request: Request<SettleTradeRequest>,
    ) -> Result<Response<SettleTradeResponse>, Status> {
        Err(Status::unimplemented("trade settlement is not available"))
    }
}
