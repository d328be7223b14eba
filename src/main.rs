//! `gatewayd`: binds a MySQL-wire listener and serves every connection
//! with a [`gateway::GatewayEngine`] atop an in-memory backend, per
//! `GatewayConfig`. Data sources aren't config-driven (the config schema
//! has no data-source-definitions key), so the demo schema and its
//! backend are wired up here directly; a real deployment would replace
//! `bootstrap_catalog` with one that loads table definitions from
//! wherever the operator keeps them.

use std::env;
use std::fs;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use binlog::ChecksumType;
use common::config::GatewayConfig;
use common::log::{LogOutput, TracingFactory};
use common::schema::{Catalog, Column, Table};
use common::value::ColumnType;
use connection::handshake::AllowAll;
use connection::QueryEngine;
use datasource::memory::MemoryDataSource;
use datasource::DataSource;
use executor::paging::PagingConfig;
use gateway::GatewayEngine;
use mvcc::{DefaultDowngrader, TransactionManager, TransactionalDataSource};
use tokio::net::TcpListener;

fn load_config() -> GatewayConfig {
    let Some(path) = env::args().nth(1) else { return GatewayConfig::default() };
    match fs::read_to_string(&path) {
        Ok(text) => GatewayConfig::from_json(&text).unwrap_or_else(|err| {
            tracing::warn!(%err, path, "failed to parse config file, falling back to defaults");
            GatewayConfig::default()
        }),
        Err(err) => {
            tracing::warn!(%err, path, "failed to read config file, falling back to defaults");
            GatewayConfig::default()
        }
    }
}

/// A tiny starter schema so a freshly started gateway has something to
/// query immediately; operators wire up their real tables the same way
/// (`Catalog::create_table` plus a matching backend `create_table`).
fn bootstrap_catalog() -> (Arc<Catalog>, MemoryDataSource) {
    let catalog = Catalog::new("main");
    let backend = MemoryDataSource::new();
    backend.connect().expect("in-memory backend always connects");

    let widgets = Table::new(
        "widgets",
        vec![
            Column::new("id", ColumnType::Int).primary().auto_increment(),
            Column::new("name", ColumnType::VarChar).not_null(),
        ],
    )
    .expect("starter schema has at most one auto-increment column");

    catalog.create_table(widgets.clone()).expect("starter schema registers cleanly");
    backend.create_table(widgets).expect("backend accepts the starter schema");

    (Arc::new(catalog), backend)
}

/// Runs the MVCC GC sweep on an interval so committed version history
/// that nothing can still see gets reclaimed, per `TransactionManager::gc`'s
/// own doc comment ("safe to call periodically from a background task").
async fn run_gc_loop(manager: Arc<TransactionManager>) {
    let mut ticker = tokio::time::interval(Duration::from_secs(30));
    loop {
        ticker.tick().await;
        manager.gc();
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let debug = env::var("GATEWAYD_DEBUG").is_ok();
    TracingFactory::init(debug, LogOutput::Stdout);

    let config = load_config();
    let (catalog, backend) = bootstrap_catalog();

    let manager = Arc::new(TransactionManager::new(config.mvcc_wrap_threshold));
    let source = Arc::new(TransactionalDataSource::new("memory", Arc::new(backend), manager.clone(), Arc::new(DefaultDowngrader)));

    let paging = PagingConfig { budget_bytes: Some(config.paging_budget_bytes as usize), ..PagingConfig::default() };
    let engine = Arc::new(GatewayEngine::new(catalog, "memory", paging));
    engine.register_backend("memory", source).expect("registering the sole backend cannot fail");

    tokio::spawn(run_gc_loop(manager));

    let listener = TcpListener::bind(config.listen_addr()).await?;
    tracing::info!(addr = %config.listen_addr(), "gatewayd listening");

    let next_session_id = Arc::new(AtomicU32::new(1));
    let server_version = Arc::new(config.server_version.clone());
    let authenticator = Arc::new(AllowAll);

    loop {
        let (stream, peer) = listener.accept().await?;
        let session_id = next_session_id.fetch_add(1, Ordering::Relaxed);
        let engine: Arc<dyn QueryEngine> = engine.clone();
        let authenticator = authenticator.clone();
        let server_version = server_version.clone();

        tokio::spawn(async move {
            tracing::info!(%peer, session_id, "connection accepted");
            if let Err(err) = connection::dispatch::serve_connection(stream, session_id, &server_version, authenticator, engine, ChecksumType::Crc32).await {
                tracing::warn!(%err, session_id, "connection ended with an error");
            }
        });
    }
}
