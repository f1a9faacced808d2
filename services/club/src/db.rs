use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub async fn connect(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;
    // Fail fast when the database is unreachable.
    sqlx::query("SELECT 1").execute(&pool).await?;
    Ok(pool)
}
