use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config::Config;

#[tracing::instrument(skip(config), err)]
pub async fn connect(config: &Config) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_open_conns)
        .min_connections(config.db_max_idle_conns.min(config.db_max_open_conns))
        .max_lifetime(config.db_conn_max_lifetime)
        .connect(&config.database_url)
        .await?;

    tracing::info!(
        max_connections = config.db_max_open_conns,
        "connected to postgres"
    );

    sqlx::migrate!().run(&pool).await?;
    tracing::info!("migrations applied");

    Ok(pool)
}
