mod club_client;
mod config;
mod db;
mod models;
mod repo;
mod server;

use std::sync::Arc;

use dotenvy::dotenv;
use fred::prelude::*;
use log::{error, info};
use tonic::transport::Server;

use proto::club::v1::club_service_client::ClubServiceClient;
use proto::market::v1::market_service_server::MarketServiceServer;
use redis_lock::{LockManager, RedisLockManager};

use crate::club_client::GrpcClubClient;
use crate::config::Config;
use crate::repo::PgListingRepo;
use crate::server::MarketServer;

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env()?;

    let pool = db::connect(&config.database_url).await?;
    info!("Connected to Postgres");

    let redis_config = RedisConfig::from_url(&config.redis_url)?;
    let redis_client = RedisClient::new(redis_config, None, None, None);
    redis_client.connect();
    redis_client.wait_for_connect().await?;
    info!("Connected to Redis");

    let club_conn = ClubServiceClient::connect(config.club_grpc_url.clone()).await?;
    info!("Connected to club service at {}", config.club_grpc_url);

    let locker: Arc<dyn LockManager> = Arc::new(RedisLockManager::new(
        redis_client,
        config.lock_ttl,
        config.lock_retries,
        config.lock_backoff,
    ));

    let server = MarketServer::new(
        Arc::new(PgListingRepo::new(pool)),
        Arc::new(GrpcClubClient::new(club_conn)),
        Some(locker),
    );

    let addr = config.grpc_addr.parse()?;
    info!("market grpc listening on {}", config.grpc_addr);
    Server::builder()
        .add_service(MarketServiceServer::new(server))
        .serve(addr)
        .await?;

    Ok(())
}

fn main() {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to build Tokio runtime");

    if let Err(err) = runtime.block_on(run()) {
        error!("market service failed: {err}");
        std::process::exit(1);
    }
}
