use std::sync::Arc;

use anyhow::Context;
use jifunze_auth::{RevocationStore, TokenService};
use jifunze_auth::InMemoryRevocationStore;
use jifunze_cache::{CacheConfig, RedisRevocationStore};
use jifunze_config::{
    CorsConfig, DatabaseConfig, JwtConfig, RateLimitConfig, ResetConfig, RevocationBackend,
    SessionConfig,
};
use jifunze_db::{init_db_pool, run_migrations};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub tokens: TokenService,
    pub reset_config: ResetConfig,
    pub cors_config: CorsConfig,
    pub rate_limit_config: RateLimitConfig,
    pub metrics: Option<PrometheusHandle>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("reset_config", &self.reset_config)
            .field("cors_config", &self.cors_config)
            .field("rate_limit_config", &self.rate_limit_config)
            .finish_non_exhaustive()
    }
}

async fn revocation_store(session: SessionConfig) -> anyhow::Result<Arc<dyn RevocationStore>> {
    match session.revocation_backend {
        RevocationBackend::Memory => {
            warn!("Using the in-process revocation store; logouts are not shared between instances");
            Ok(Arc::new(InMemoryRevocationStore::new()))
        }
        RevocationBackend::Redis => {
            let config = CacheConfig {
                redis_url: session.redis_url,
                ..CacheConfig::from_env()
            };
            let store = RedisRevocationStore::connect(config)
                .await
                .context("Failed to connect to the Redis revocation store")?;
            info!("Using the Redis revocation store");
            Ok(Arc::new(store))
        }
    }
}

pub async fn init_app_state(metrics: Option<PrometheusHandle>) -> anyhow::Result<AppState> {
    let db_config = DatabaseConfig::from_env();
    let db = init_db_pool(&db_config)
        .await
        .context("Failed to connect to the database")?;

    if db_config.run_migrations {
        run_migrations(&db).await.context("Failed to run migrations")?;
    }

    let store = revocation_store(SessionConfig::from_env()).await?;

    Ok(AppState {
        db,
        tokens: TokenService::new(JwtConfig::from_env(), store),
        reset_config: ResetConfig::from_env(),
        cors_config: CorsConfig::from_env(),
        rate_limit_config: RateLimitConfig::from_env(),
        metrics,
    })
}
