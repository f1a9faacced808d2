use std::env;
use std::time::Duration;

pub struct Config {
    pub grpc_addr: String,
    pub database_url: String,
    pub redis_url: String,
    pub club_grpc_url: String,
    pub lock_ttl: Duration,
    pub lock_retries: u32,
    pub lock_backoff: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let grpc_addr = env::var("GRPC_ADDR").unwrap_or_else(|_| "0.0.0.0:50053".to_string());
        let database_url =
            env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;
        let redis_url =
            env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        let club_grpc_url =
            env::var("CLUB_GRPC_URL").map_err(|_| "CLUB_GRPC_URL must be set".to_string())?;

        // The TTL backstops crashed holders; keep it well above the
        // worst-case handler duration.
        let lock_ttl = Duration::from_millis(env_u64("LOCK_TTL_MS", 5_000)?);
        let lock_retries = env_u64("LOCK_RETRIES", 3)? as u32;
        let lock_backoff = Duration::from_millis(env_u64("LOCK_BACKOFF_MS", 150)?);

        Ok(Self {
            grpc_addr,
            database_url,
            redis_url,
            club_grpc_url,
            lock_ttl,
            lock_retries,
            lock_backoff,
        })
    }
}

fn env_u64(key: &str, default: u64) -> Result<u64, String> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| format!("{key} must be an integer")),
        Err(_) => Ok(default),
    }
}
