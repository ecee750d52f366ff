//! BuilderHub Server
//!
//! Serves the attested builder API, the admin API and the internal peer
//! listing on three listeners.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{Instrument, info, info_span};

use builderhub_server::auth::{AdminAuth, AdminCredentials, password};
use builderhub_server::hub::BuilderHub;
use builderhub_server::secrets::{FileSecretStore, MemorySecretStore, SecretStore};
use builderhub_server::server::{
    AppState, ServerConfig, build_admin_router, build_internal_router, build_public_router,
};
use builderhub_server::storage::HubDatabase;

#[derive(Parser, Debug)]
#[command(name = "builderhub-server")]
#[command(
    version,
    about = "BuilderHub - attestation-gated builder configuration and peer directory"
)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Address for the attested builder API.
    #[arg(long, default_value = "127.0.0.1:8080", env = "LISTEN_ADDR")]
    listen_addr: SocketAddr,

    /// Address for the admin API.
    #[arg(long, default_value = "127.0.0.1:8081", env = "ADMIN_ADDR")]
    admin_addr: SocketAddr,

    /// Address for the internal API.
    #[arg(long, default_value = "127.0.0.1:8082", env = "INTERNAL_ADDR")]
    internal_addr: SocketAddr,

    /// Path to SQLite database file.
    #[arg(long, env = "DB_PATH")]
    db_path: Option<PathBuf>,

    /// Maximum database connections.
    #[arg(long, default_value_t = 5)]
    db_max_connections: u32,

    /// Admin Basic-auth user name.
    #[arg(long, default_value = "admin", env = "ADMIN_BASIC_USER")]
    admin_user: String,

    /// Argon2 hash of the admin password (see the `hash-password` command).
    #[arg(long, env = "ADMIN_PASSWORD_HASH")]
    admin_password_hash: Option<String>,

    /// Disable admin authentication. Local development only.
    #[arg(long, env = "DISABLE_ADMIN_AUTH")]
    disable_admin_auth: bool,

    /// Directory of the file-backed secret store.
    #[arg(long, env = "SECRETS_DIR")]
    secrets_dir: Option<PathBuf>,

    /// File name prefix for stored secrets.
    #[arg(long, default_value = "builderhub", env = "SECRET_PREFIX")]
    secret_prefix: String,

    /// Keep secrets in memory only.
    #[arg(long, env = "MOCK_SECRETS")]
    mock_secrets: bool,

    /// Seconds `/drain` waits after marking the service not ready.
    #[arg(long, default_value_t = 15, env = "DRAIN_SECONDS")]
    drain_seconds: u64,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 30, env = "REQUEST_TIMEOUT")]
    request_timeout: u64,

    /// Log level for builderhub crates.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    /// Tag all log lines with a random process UUID.
    #[arg(long)]
    log_uid: bool,

    /// OpenTelemetry OTLP endpoint for traces and metrics export
    /// (e.g. `http://localhost:4317`). Requires the `metrics` feature.
    #[cfg(feature = "metrics")]
    #[arg(long, env = "OTLP_ENDPOINT")]
    otlp_endpoint: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the argon2 hash of a password for `--admin-password-hash`.
    HashPassword { plaintext: String },
}

fn default_db_path() -> anyhow::Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home.join(".builderhub").join("builderhub.db"))
}

impl Args {
    fn admin_auth(&self) -> anyhow::Result<AdminAuth> {
        if self.disable_admin_auth {
            return Ok(AdminAuth::Disabled);
        }
        let password_hash = self.admin_password_hash.clone().ok_or_else(|| {
            anyhow::anyhow!("--admin-password-hash is required unless --disable-admin-auth is set")
        })?;
        Ok(AdminAuth::Basic(AdminCredentials {
            user: self.admin_user.clone(),
            password_hash,
        }))
    }

    fn server_config(&self) -> anyhow::Result<ServerConfig> {
        Ok(ServerConfig {
            listen_addr: self.listen_addr,
            admin_addr: self.admin_addr,
            internal_addr: self.internal_addr,
            ..ServerConfig::default()
        }
        .with_request_timeout(Duration::from_secs(self.request_timeout))
        .with_drain_wait(Duration::from_secs(self.drain_seconds))
        .with_admin_auth(self.admin_auth()?))
    }

    async fn secret_store(&self) -> anyhow::Result<Arc<dyn SecretStore>> {
        if self.mock_secrets {
            info!("Using in-memory secret store");
            return Ok(Arc::new(MemorySecretStore::new()));
        }
        let dir = self
            .secrets_dir
            .clone()
            .ok_or_else(|| anyhow::anyhow!("--secrets-dir is required unless --mock-secrets is set"))?;
        let store = FileSecretStore::open(dir, self.secret_prefix.clone()).await?;
        info!(dir = %store.dir().display(), "Using file secret store");
        Ok(Arc::new(store))
    }
}

#[allow(clippy::print_stdout)]
fn print_password_hash(plaintext: &str) -> anyhow::Result<()> {
    let hash = password::hash_password(plaintext)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;
    println!("{hash}");
    Ok(())
}

async fn serve(name: &'static str, addr: SocketAddr, app: axum::Router) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(listener = name, addr = %addr, "Listening");
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if let Some(Command::HashPassword { plaintext }) = &args.command {
        return print_password_hash(plaintext);
    }

    #[cfg(feature = "metrics")]
    let otlp_endpoint = args.otlp_endpoint.as_deref();
    #[cfg(not(feature = "metrics"))]
    let otlp_endpoint: Option<&str> = None;

    let log_filter = format!(
        "builderhub_server={level},builderhub_core={level}",
        level = args.log_level
    );
    let telemetry = builderhub_core::tracing_init::init_tracing_with_metrics(
        &log_filter,
        args.log_json,
        otlp_endpoint,
    );

    let root_span = if args.log_uid {
        info_span!("builderhub", uid = %uuid::Uuid::new_v4())
    } else {
        info_span!("builderhub")
    };

    run(args).instrument(root_span).await?;

    telemetry.shutdown();
    Ok(())
}

async fn run(args: Args) -> anyhow::Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        listen = %args.listen_addr,
        admin = %args.admin_addr,
        internal = %args.internal_addr,
        "Starting builderhub-server"
    );

    let config = args.server_config()?;
    if matches!(config.admin_auth, AdminAuth::Disabled) {
        tracing::warn!("Admin authentication is disabled");
    }

    let db = if let Some(path) = &args.db_path {
        info!(path = %path.display(), "Opening database");
        HubDatabase::open(path, args.db_max_connections).await?
    } else {
        let default_path = default_db_path()?;
        info!(path = %default_path.display(), "Opening database (default path)");
        HubDatabase::open(&default_path, args.db_max_connections).await?
    };

    let hub = BuilderHub::new(db, args.secret_store().await?);
    let state = AppState::new(hub, config.admin_auth.clone(), config.drain_wait);

    let public = build_public_router(state.clone(), config.request_timeout);
    let admin = build_admin_router(state.clone(), config.request_timeout);
    let internal = build_internal_router(state, config.request_timeout);

    tokio::select! {
        result = serve("public", config.listen_addr, public) => result?,
        result = serve("admin", config.admin_addr, admin) => result?,
        result = serve("internal", config.internal_addr, internal) => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    info!("BuilderHub stopped");
    Ok(())
}
