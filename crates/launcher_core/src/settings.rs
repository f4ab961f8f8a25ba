use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use shared::{
    domain::{AuthMethod, UserSettings, UserSettingsPatch},
    persist::BlobStore,
};
use tokio::sync::{watch, Mutex};
use tracing::{info, warn};
use uuid::Uuid;

/// Fixed key under which the settings blob lives in the store.
pub const SETTINGS_BLOB_KEY: &str = "launcher_settings";

const CLIENT_TOKEN_BYTES: usize = 24;

/// Owner of the persisted [`UserSettings`]. All mutation goes through the
/// single merge-and-persist path; readers get immutable snapshots and can
/// watch for replacements.
pub struct SettingsService {
    store: Arc<dyn BlobStore>,
    current: Mutex<UserSettings>,
    changes: watch::Sender<UserSettings>,
}

impl SettingsService {
    /// Loads persisted settings merged over defaults and guarantees a client
    /// token is present. Never fails outward: storage or parse errors degrade
    /// to defaults plus a fresh token, persisted best-effort.
    pub async fn load(store: Arc<dyn BlobStore>) -> Arc<Self> {
        let mut settings = match store.load_blob(SETTINGS_BLOB_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str::<UserSettings>(&raw) {
                Ok(parsed) => parsed,
                Err(error) => {
                    warn!(%error, "malformed settings blob, falling back to defaults");
                    UserSettings::default()
                }
            },
            Ok(None) => UserSettings::default(),
            Err(error) => {
                warn!(%error, "failed to read settings blob, falling back to defaults");
                UserSettings::default()
            }
        };

        if settings.client_token.is_none() {
            settings.client_token = Some(generate_client_token());
            persist(store.as_ref(), &settings).await;
            info!("generated client token for this install");
        }

        let (changes, _) = watch::channel(settings.clone());
        Arc::new(Self {
            store,
            current: Mutex::new(settings),
            changes,
        })
    }

    pub async fn current(&self) -> UserSettings {
        self.current.lock().await.clone()
    }

    /// Receiver observing every settings replacement, seeded with the value
    /// current at subscription time.
    pub fn watch(&self) -> watch::Receiver<UserSettings> {
        self.changes.subscribe()
    }

    /// Shallow-merges `patch` over the last known settings, persists the full
    /// result, and returns it. Persistence failure is swallowed: the merged
    /// value still becomes the in-memory source of truth.
    pub async fn save(&self, patch: UserSettingsPatch) -> UserSettings {
        let mut guard = self.current.lock().await;
        let merged = guard.merged(&patch);
        persist(self.store.as_ref(), &merged).await;
        *guard = merged.clone();
        drop(guard);
        let _ = self.changes.send(merged.clone());
        merged
    }

    /// Drops the Microsoft credential and returns to the offline identity.
    pub async fn logout(&self) -> UserSettings {
        info!("logging out, clearing microsoft account");
        self.save(UserSettingsPatch {
            username: Some(UserSettings::default().username),
            auth_method: Some(AuthMethod::Offline),
            microsoft_account: Some(None),
            ..Default::default()
        })
        .await
    }
}

async fn persist(store: &dyn BlobStore, settings: &UserSettings) {
    let raw = match serde_json::to_string(settings) {
        Ok(raw) => raw,
        Err(error) => {
            warn!(%error, "failed to serialize settings");
            return;
        }
    };
    if let Err(error) = store.save_blob(SETTINGS_BLOB_KEY, &raw).await {
        warn!(%error, "failed to persist settings");
    }
}

/// URL-safe random token, generated once per install and never rotated.
fn generate_client_token() -> String {
    let mut bytes = [0u8; CLIENT_TOKEN_BYTES];
    bytes[..16].copy_from_slice(Uuid::new_v4().as_bytes());
    bytes[16..].copy_from_slice(&Uuid::new_v4().as_bytes()[..CLIENT_TOKEN_BYTES - 16]);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
