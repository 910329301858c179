//! `corecrmd` — the Core CRM server binary.
//!
//! Usage:
//!   corecrmd -c <context-name-or-path> [--listen <addr>]
//!
//! The context name resolves to `/etc/corecrm/<name>.toml`.
//! If a path with `/` or `.` is given, it's used directly.

mod config;
mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use corecrm_core::Module;

use config::ServerConfig;

/// Core CRM server.
#[derive(Parser, Debug)]
#[command(name = "corecrmd", about = "Core CRM server")]
struct Cli {
    /// Context name or path to config file.
    #[arg(short = 'c', long = "config", required = true)]
    config: String,

    /// Listen address (overrides the config file).
    #[arg(long = "listen")]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    // Load server configuration.
    let config_path = ServerConfig::resolve_path(&cli.config);
    info!("Loading configuration from {}", config_path.display());
    let server_config = ServerConfig::load(&config_path)?;
    server_config.verify()?;

    let listen = cli
        .listen
        .unwrap_or_else(|| server_config.listen.clone());

    // Initialize storage.
    let data_dir = PathBuf::from(&server_config.storage.data_dir);
    std::fs::create_dir_all(&data_dir)?;

    let core_config = corecrm_core::ServiceConfig {
        data_dir: Some(data_dir),
        listen: listen.clone(),
        ..Default::default()
    };

    let sql: Arc<dyn corecrm_sql::SQLStore> = Arc::new(
        corecrm_sql::SqliteStore::open(&core_config.resolve_sqlite_path())
            .map_err(|e| anyhow::anyhow!("failed to open SQL store: {e}"))?,
    );

    // The session verifier is the only thing that talks to the identity
    // provider; everything downstream sees typed users.
    let verifier: Arc<dyn corecrm_core::SessionVerifier> =
        Arc::new(users::kratos::KratosVerifier::new(&server_config.kratos.base_url));

    // ── Initialize modules ──

    let users_module = users::UsersModule::new(Arc::clone(&sql), verifier)?;
    info!("Users module initialized");

    let tickets_module = tickets::TicketsModule::new(Arc::clone(&sql))?;
    info!("Tickets module initialized");

    let kb_module = kb::KbModule::new(Arc::clone(&sql))?;
    info!("KB module initialized");

    let user_service = Arc::clone(users_module.service());

    let module_routes = vec![
        (users_module.name(), users_module.routes()),
        (tickets_module.name(), tickets_module.routes()),
        (kb_module.name(), kb_module.routes()),
    ];

    // Build router.
    let cors = routes::cors_layer(&server_config.http.cors_origin)?;
    let app = routes::build_router(user_service, module_routes, cors);

    // Start server.
    let listener = tokio::net::TcpListener::bind(&listen).await?;
    info!("Core CRM server listening on {listen}");
    axum::serve(listener, app).await?;

    Ok(())
}
