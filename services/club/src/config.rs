use std::env;

pub struct Config {
    pub grpc_addr: String,
    pub database_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let grpc_addr = env::var("GRPC_ADDR").unwrap_or_else(|_| "0.0.0.0:50052".to_string());
        let database_url =
            env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;
        Ok(Self {
            grpc_addr,
            database_url,
        })
    }
}
