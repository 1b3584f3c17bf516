use std::sync::Arc;

use crate::{
    config::AppConfig,
    db::{DbPool, OrmConn, create_orm_conn},
};

#[derive(Clone)]
pub struct AppState {
    pub orm: OrmConn,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn connect(config: AppConfig) -> anyhow::Result<Self> {
        let orm = create_orm_conn(&config.database_url, config.db_max_connections).await?;
        Ok(Self {
            orm,
            config: Arc::new(config),
        })
    }

    /// Raw sqlx pool behind the ORM connection, for hand-written statements.
    pub fn pool(&self) -> &DbPool {
        self.orm.get_postgres_connection_pool()
    }
}
