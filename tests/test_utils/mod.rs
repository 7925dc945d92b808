//! Test utilities for database and server testing.
//!
//! This module provides utilities for setting up in-memory SQLite databases
//! with migrations, test configurations and a served router.

use anyhow::{Context, Result};
use erp_bridge::config::AppConfig;
use erp_bridge::crypto::CryptoKey;
use erp_bridge::server::{AppState, create_app};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use std::sync::Arc;
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};

pub const TEST_CLIENT_ID: &str = "19190";
pub const TEST_CLIENT_SECRET: &str = "test-client-secret";

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;

    Migrator::up(&db, None).await?;

    db.execute(Statement::from_string(
        db.get_database_backend(),
        "PRAGMA foreign_keys = ON".to_string(),
    ))
    .await?;

    Ok(db)
}

/// Key used by every test configuration.
#[allow(dead_code)]
pub fn test_crypto_key() -> CryptoKey {
    CryptoKey::new(vec![7u8; 32]).expect("valid test key")
}

/// Test profile configuration with credentials, pointing the token
/// exchange at `token_url`.
#[allow(dead_code)]
pub fn test_config(token_url: &str) -> AppConfig {
    AppConfig {
        profile: "test".to_string(),
        crypto_key: Some(vec![7u8; 32]),
        nuvemshop_client_id: Some(TEST_CLIENT_ID.to_string()),
        nuvemshop_client_secret: Some(TEST_CLIENT_SECRET.to_string()),
        nuvemshop_token_url: token_url.to_string(),
        token_exchange_timeout_ms: 2000,
        ..AppConfig::default()
    }
}

/// Handle for a router served on an ephemeral port.
#[allow(dead_code)]
pub struct TestServerHandle {
    pub base_url: String,
    pub db: Arc<DatabaseConnection>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    join_handle: Option<JoinHandle<Result<()>>>,
}

#[allow(dead_code)]
impl TestServerHandle {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(handle) = self.join_handle.take() {
            let result = handle.await.context("server task join failed")?;
            result?;
        }

        Ok(())
    }
}

/// Builds the application state over a fresh migrated database.
#[allow(dead_code)]
pub async fn test_state(config: AppConfig) -> Result<AppState> {
    let db = setup_test_db().await?;
    AppState::new(Arc::new(config), db)
}

/// Serves the router for `state` on 127.0.0.1 with a random port.
#[allow(dead_code)]
pub async fn spawn_app(state: AppState) -> Result<TestServerHandle> {
    let db = Arc::clone(&state.db);
    let app = create_app(state);

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let (ready_tx, ready_rx) = oneshot::channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let server_task = tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        });

        let _ = ready_tx.send(());

        server.await.context("axum server error")
    });

    ready_rx.await.context("server task to signal readiness")?;

    Ok(TestServerHandle {
        base_url: format!("http://{}", addr),
        db,
        shutdown_tx: Some(shutdown_tx),
        join_handle: Some(server_task),
    })
}

/// Convenience wrapper: fresh database, test config, served router.
#[allow(dead_code)]
pub async fn spawn_test_app(token_url: &str) -> Result<TestServerHandle> {
    let state = test_state(test_config(token_url)).await?;
    spawn_app(state).await
}

/// Counts rows of `table` belonging to `store_id`.
#[allow(dead_code)]
pub async fn count_rows(db: &DatabaseConnection, table: &str, store_id: &str) -> Result<i64> {
    let stmt = Statement::from_sql_and_values(
        db.get_database_backend(),
        format!("SELECT COUNT(*) AS count FROM {table} WHERE store_id = ?"),
        [store_id.into()],
    );

    let row = db
        .query_one(stmt)
        .await?
        .context("count query returned no row")?;
    Ok(row.try_get::<i64>("", "count")?)
}
