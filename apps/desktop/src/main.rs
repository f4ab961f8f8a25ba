use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use launcher_core::{
    AuthClient, CredentialRefreshScheduler, EventBridge, GameEngine, HttpAuthClient,
    LauncherSession, LogBuffer, MissingAuthClient, MissingGameEngine, SettingsService,
};
use shared::persist::BlobStore;
use storage::Storage;
use tracing::{error, info, warn};

mod config;

use config::{load_settings, prepare_database_url};

#[derive(Parser, Debug)]
struct Args {
    /// Print the buffered orchestration log before exiting.
    #[arg(long)]
    show_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();

    let settings_cfg = load_settings();
    let database_url = prepare_database_url(&settings_cfg.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;

    let settings = SettingsService::load(Arc::new(storage) as Arc<dyn BlobStore>).await;
    let current = settings.current().await;
    info!(
        username = %current.username,
        allocated_ram = current.allocated_ram,
        auth_method = ?current.auth_method,
        "loaded launcher settings"
    );

    let auth: Arc<dyn AuthClient> = match &settings_cfg.token_endpoint {
        Some(endpoint) => Arc::new(HttpAuthClient::new(endpoint.clone())),
        None => Arc::new(MissingAuthClient),
    };
    let _scheduler = CredentialRefreshScheduler::start(settings.clone(), auth);

    // The real engine runs out of process; the stub stands in until its
    // sidecar integration lands.
    let engine: Arc<dyn GameEngine> = Arc::new(MissingGameEngine);
    let logs = Arc::new(LogBuffer::new());
    let session = LauncherSession::new(engine.clone(), settings, logs.clone());
    let bridge = EventBridge::new();
    bridge.start(&engine, &session).await;

    if let Err(error) = session.initialize().await {
        warn!(%error, "startup update check unavailable without an engine");
    }
    println!(
        "Session phase: {}",
        serde_json::to_string(&session.state().await.phase)?
    );
    println!("Engine command integration is TODO in this minimal skeleton.");

    if args.show_logs {
        for entry in logs.entries().await {
            println!("[{:?}] {}", entry.origin, entry.message);
        }
    }

    bridge.dispose_all().await;
    Ok(())
}
