//! Service wiring: pick a storage backend and build the domain services on it.

use std::sync::Arc;

use devtrack_auth::{Hs256TokenCodec, TokenCodec};
use devtrack_infra::{
    CommentService, DashboardService, Database, IdentityService, InMemoryDatabase, PostgresDatabase,
    ProjectService, TicketService,
};

use crate::config::{ApiConfig, StorageConfig};

/// Everything the handlers need, shared behind one `Arc`.
pub struct AppServices {
    pub identity: Arc<IdentityService>,
    pub projects: ProjectService,
    pub tickets: TicketService,
    pub comments: CommentService,
    pub dashboard: DashboardService,
}

pub async fn build_services(config: &ApiConfig) -> anyhow::Result<AppServices> {
    let db: Arc<dyn Database> = match &config.storage {
        StorageConfig::InMemory => {
            tracing::info!("using in-memory stores");
            Arc::new(InMemoryDatabase::new())
        }
        StorageConfig::Postgres {
            database_url,
            max_connections,
        } => {
            let pg = PostgresDatabase::connect(database_url, *max_connections).await?;
            pg.migrate().await?;
            tracing::info!(max_connections, "using postgres stores");
            Arc::new(pg)
        }
    };

    let tokens: Arc<dyn TokenCodec> = Arc::new(Hs256TokenCodec::new(
        config.jwt_secret.as_bytes(),
        config.token_ttl,
    ));

    Ok(AppServices {
        identity: Arc::new(IdentityService::new(db.clone(), tokens, config.bcrypt_cost)),
        projects: ProjectService::new(db.clone()),
        tickets: TicketService::new(db.clone()),
        comments: CommentService::new(db.clone()),
        dashboard: DashboardService::new(db),
    })
}
