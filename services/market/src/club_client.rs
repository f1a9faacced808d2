use async_trait::async_trait;
use tonic::transport::Channel;
use tonic::{Request, Status};
use uuid::Uuid;

use grpc_identity::attach_user_id;
use proto::club::v1::club_service_client::ClubServiceClient;
use proto::club::v1::{
    CreateCreditHoldRequest, GetMyClubRequest, LockCardRequest, ReleaseCardLockRequest,
    ReleaseCreditHoldRequest,
};

/// The slice of the club service the market depends on. Narrow by design so
/// handlers can run against a test double.
#[async_trait]
pub trait ClubApi: Send + Sync {
    async fn get_my_club(&self, user_id: Uuid) -> Result<MyClubSummary, Status>;
    async fn lock_card(
        &self,
        user_id: Uuid,
        user_card_id: Uuid,
        reason: &str,
    ) -> Result<String, Status>;
    async fn release_card_lock(&self, lock_id: &str) -> Result<bool, Status>;
    async fn create_credit_hold(
        &self,
        user_id: Uuid,
        amount: i64,
        reason: &str,
    ) -> Result<String, Status>;
    async fn release_credit_hold(&self, hold_id: &str) -> Result<bool, Status>;
}

#[derive(Debug, Clone)]
pub struct MyClubSummary {
    pub club_id: String,
    pub credits: i64,
}

pub struct GrpcClubClient {
    inner: ClubServiceClient<Channel>,
}

impl GrpcClubClient {
    pub fn new(inner: ClubServiceClient<Channel>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl ClubApi for GrpcClubClient {
    async fn get_my_club(&self, user_id: Uuid) -> Result<MyClubSummary, Status> {
        let mut request = Request::new(GetMyClubRequest::default());
        attach_user_id(&mut request, &user_id);

        let response = self.inner.clone().get_my_club(request).await?.into_inner();
        Ok(MyClubSummary {
            club_id: response.club_id,
            credits: response.credits,
        })
    }

    async fn lock_card(
        &self,
        user_id: Uuid,
        user_card_id: Uuid,
        reason: &str,
    ) -> Result<String, Status> {
        let response = self
            .inner
            .clone()
            .lock_card(Request::new(LockCardRequest {
                user_id: user_id.to_string(),
                user_card_id: user_card_id.to_string(),
                reason: reason.to_string(),
            }))
            .await?
            .into_inner();
        Ok(response.lock_id)
    }

    async fn release_card_lock(&self, lock_id: &str) -> Result<bool, Status> {
        let response = self
            .inner
            .clone()
            .release_card_lock(Request::new(ReleaseCardLockRequest {
                lock_id: lock_id.to_string(),
            }))
            .await?
            .into_inner();
        Ok(response.released)
    }

    async fn create_credit_hold(
        &self,
        user_id: Uuid,
        amount: i64,
        reason: &str,
    ) -> Result<String, Status> {
        let response = self
            .inner
            .clone()
            .create_credit_hold(Request::new(CreateCreditHoldRequest {
                user_id: user_id.to_string(),
                amount,
                reason: reason.to_string(),
            }))
            .await?
            .into_inner();
        Ok(response.hold_id)
    }

    async fn release_credit_hold(&self, hold_id: &str) -> Result<bool, Status> {
        let response = self
            .inner
            .clone()
            .release_credit_hold(Request::new(ReleaseCreditHoldRequest {
                hold_id: hold_id.to_string(),
            }))
            .await?
            .into_inner();
        Ok(response.released)
    }
}
