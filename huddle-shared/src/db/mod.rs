/// PostgreSQL layer for Huddle
///
/// # Modules
///
/// - `pool`: connection pool lifecycle (create, health check, close)
/// - `migrations`: embedded schema migrations
/// - `postgres`: the [`crate::store::Store`] implementation over the pool
///
/// # Example
///
/// ```no_run
/// use huddle_shared::db::{migrations::run_migrations, pool::{create_pool, DatabaseConfig}, postgres::PgStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig {
///         url: std::env::var("DATABASE_URL")?,
///         ..Default::default()
///     };
///
///     let pool = create_pool(config).await?;
///     run_migrations(&pool).await?;
///     let store = PgStore::new(pool);
///     Ok(())
/// }
/// ```

pub mod migrations;
pub mod pool;
pub mod postgres;
