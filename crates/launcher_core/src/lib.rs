use std::path::PathBuf;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::{
    domain::{LaunchProfile, MicrosoftAccount},
    protocol::{EngineChannel, EngineEvent},
};
use tokio::sync::broadcast;

pub mod auth;
pub mod bridge;
pub mod logbuf;
pub mod refresh;
pub mod session;
pub mod settings;

pub use auth::HttpAuthClient;
pub use bridge::{EventBridge, SubscriptionHandle};
pub use logbuf::LogBuffer;
pub use refresh::CredentialRefreshScheduler;
pub use session::{CommandOutcome, LauncherSession, SessionNotice, SessionState};
pub use settings::SettingsService;

/// Command boundary to the out-of-process engine that performs the actual
/// download, install, and launch work. Progress and lifecycle surface back
/// through the event channels, not through these return values.
#[async_trait]
pub trait GameEngine: Send + Sync {
    async fn check_update_needed(&self) -> Result<bool>;
    async fn apply_update(&self) -> Result<()>;
    async fn launch(&self, profile: LaunchProfile) -> Result<()>;
    async fn install_root(&self) -> Result<PathBuf>;
    async fn set_install_root(&self, path: PathBuf) -> Result<()>;
    fn subscribe(&self, channel: EngineChannel) -> broadcast::Receiver<EngineEvent>;
}

pub struct MissingGameEngine;

#[async_trait]
impl GameEngine for MissingGameEngine {
    async fn check_update_needed(&self) -> Result<bool> {
        Err(anyhow!("game engine is unavailable"))
    }

    async fn apply_update(&self) -> Result<()> {
        Err(anyhow!("game engine is unavailable"))
    }

    async fn launch(&self, _profile: LaunchProfile) -> Result<()> {
        Err(anyhow!("game engine is unavailable"))
    }

    async fn install_root(&self) -> Result<PathBuf> {
        Err(anyhow!("game engine is unavailable"))
    }

    async fn set_install_root(&self, _path: PathBuf) -> Result<()> {
        Err(anyhow!("game engine is unavailable"))
    }

    fn subscribe(&self, _channel: EngineChannel) -> broadcast::Receiver<EngineEvent> {
        let (sender, receiver) = broadcast::channel(1);
        drop(sender);
        receiver
    }
}

/// Token-refresh boundary to the external authentication collaborator.
#[async_trait]
pub trait AuthClient: Send + Sync {
    async fn refresh_credential(&self, refresh_token: &str) -> Result<MicrosoftAccount>;
}

pub struct MissingAuthClient;

#[async_trait]
impl AuthClient for MissingAuthClient {
    async fn refresh_credential(&self, _refresh_token: &str) -> Result<MicrosoftAccount> {
        Err(anyhow!("auth client is unavailable"))
    }
}
