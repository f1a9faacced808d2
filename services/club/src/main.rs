mod config;
mod db;
mod errors;
mod models;
mod repo;
mod server;
mod service;

use std::sync::Arc;

use dotenvy::dotenv;
use log::{error, info};
use tonic::transport::Server;

use proto::club::v1::club_service_server::ClubServiceServer;

use crate::config::Config;
use crate::repo::PgClubRepository;
use crate::server::ClubGrpcServer;
use crate::service::Service;

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env()?;

    let pool = db::connect(&config.database_url).await?;
    info!("Connected to Postgres");

    let addr = config.grpc_addr.parse()?;
    let service = Service::new(PgClubRepository::new(pool));
    let grpc = ClubGrpcServer::new(Arc::new(service));

    info!("club grpc listening on {}", config.grpc_addr);
    Server::builder()
        .add_service(ClubServiceServer::new(grpc))
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
        error!("club service failed: {err}");
        std::process::exit(1);
    }
}
