// src/utils/db_connect.rs
use bb8::Pool;
use bb8_postgres::PostgresConnectionManager;
use log::info;
use std::env;
use std::time::Duration;
use tokio_postgres::{Config, NoTls};

use crate::error::{ResolutionError, Result};

pub type PgPool = Pool<PostgresConnectionManager<NoTls>>;

/// Connection parameters, kept apart from the match rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
    pub max_pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5432,
            dbname: "dataplatform".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
            max_pool_size: 16,
        }
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env::var("POSTGRES_HOST").unwrap_or(defaults.host),
            port: env::var("POSTGRES_PORT")
                .ok()
                .and_then(|p| p.parse::<u16>().ok())
                .unwrap_or(defaults.port),
            dbname: env::var("POSTGRES_DB").unwrap_or(defaults.dbname),
            user: env::var("POSTGRES_USER").unwrap_or(defaults.user),
            password: env::var("POSTGRES_PASSWORD").unwrap_or_default(),
            max_pool_size: env::var("POSTGRES_POOL_SIZE")
                .ok()
                .and_then(|p| p.parse::<u32>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_pool_size),
        }
    }

    pub fn build_pg_config(&self) -> Config {
        info!(
            "DB Config: Host={}, Port={}, DB={}, User={}",
            self.host, self.port, self.dbname, self.user
        );
        let mut config = Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .dbname(&self.dbname)
            .user(&self.user)
            .password(&self.password);
        config.application_name("mdm_dedupe");
        config.connect_timeout(Duration::from_secs(10));
        config
    }
}

/// Builds the pool and checks it with a trivial query.
pub async fn connect(db: &DatabaseConfig) -> Result<PgPool> {
    info!("Connecting to PostgreSQL database...");
    let manager = PostgresConnectionManager::new(db.build_pg_config(), NoTls);

    let pool = Pool::builder()
        .max_size(db.max_pool_size)
        .min_idle(Some(1))
        .idle_timeout(Some(Duration::from_secs(180)))
        .connection_timeout(Duration::from_secs(15))
        .build(manager)
        .await
        .map_err(|e| {
            ResolutionError::Persistence(format!("failed to build connection pool: {}", e))
        })?;

    let conn = pool.get().await?;
    conn.query_one("SELECT 1", &[]).await?;
    drop(conn);
    info!("Database connection pool initialized successfully.");
    Ok(pool)
}

/// (total connections, idle connections, in use)
pub fn get_pool_status(pool: &PgPool) -> (u32, u32, u32) {
    let state = pool.state();
    (
        state.connections,
        state.idle_connections,
        state.connections.saturating_sub(state.idle_connections),
    )
}
