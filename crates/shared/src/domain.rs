use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lower bound for the per-launch memory allocation, in GB.
pub const MIN_ALLOCATED_RAM_GB: f32 = 1.0;
/// Upper bound for the per-launch memory allocation, in GB.
pub const MAX_ALLOCATED_RAM_GB: f32 = 64.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMethod {
    #[default]
    Offline,
    MicrosoftAccount,
}

/// Token bundle for a Microsoft-authenticated player. Replaced wholesale on
/// every refresh; never mutated field by field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MicrosoftAccount {
    pub xuid: String,
    /// Access token expiry as epoch seconds.
    pub exp: u64,
    pub uuid: String,
    pub username: String,
    pub access_token: String,
    pub refresh_token: String,
    pub client_id: String,
}

/// Persisted user configuration. The on-disk JSON uses camelCase keys for
/// compatibility with settings blobs written by earlier launcher builds.
///
/// Fields absent from the persisted blob deserialize to their defaults, which
/// gives merge-over-defaults semantics for free.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserSettings {
    pub username: String,
    /// Memory handed to the launched process, in GB.
    pub allocated_ram: f32,
    pub auth_method: AuthMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub microsoft_account: Option<MicrosoftAccount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_token: Option<String>,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            username: "DefaultPlayer".into(),
            allocated_ram: 4.0,
            auth_method: AuthMethod::Offline,
            microsoft_account: None,
            client_token: None,
        }
    }
}

/// Shallow patch applied over the last known [`UserSettings`]. `None` leaves
/// the field untouched; `microsoft_account` uses a nested `Option` so a patch
/// can clear the account on logout.
#[derive(Debug, Clone, Default)]
pub struct UserSettingsPatch {
    pub username: Option<String>,
    pub allocated_ram: Option<f32>,
    pub auth_method: Option<AuthMethod>,
    pub microsoft_account: Option<Option<MicrosoftAccount>>,
    pub client_token: Option<String>,
}

impl UserSettings {
    pub fn merged(&self, patch: &UserSettingsPatch) -> UserSettings {
        let mut next = self.clone();
        if let Some(username) = &patch.username {
            next.username = username.clone();
        }
        if let Some(allocated_ram) = patch.allocated_ram {
            next.allocated_ram = allocated_ram.clamp(MIN_ALLOCATED_RAM_GB, MAX_ALLOCATED_RAM_GB);
        }
        if let Some(auth_method) = patch.auth_method {
            next.auth_method = auth_method;
        }
        if let Some(microsoft_account) = &patch.microsoft_account {
            next.microsoft_account = microsoft_account.clone();
        }
        if let Some(client_token) = &patch.client_token {
            next.client_token = Some(client_token.clone());
        }
        next
    }
}

/// Single authoritative stage of the update/launch lifecycle. Cyclic: every
/// completed or aborted run re-enters `ReadyToLaunch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionPhase {
    CheckingUpdate,
    NeedsUpdate,
    ReadyToLaunch,
    Launching,
    Downloading,
    Installing,
    Launched,
}

/// Current progress reading. Overwritten wholesale on each progress event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub message: String,
    /// Derived percentage in `0..=100`.
    pub percent: u8,
    pub current: u64,
    pub total: u64,
}

/// Settings snapshot handed to the engine's launch command. Account and
/// client token pass through verbatim, or stay `None` for offline play.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchProfile {
    pub username: String,
    pub allocated_ram: f32,
    pub auth_method: AuthMethod,
    pub microsoft_account: Option<MicrosoftAccount>,
    pub client_token: Option<String>,
}

impl From<&UserSettings> for LaunchProfile {
    fn from(settings: &UserSettings) -> Self {
        Self {
            username: settings.username.clone(),
            allocated_ram: settings.allocated_ram,
            auth_method: settings.auth_method,
            microsoft_account: settings.microsoft_account.clone(),
            client_token: settings.client_token.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogOrigin {
    Engine,
    Orchestrator,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub message: String,
    pub origin: LogOrigin,
    pub at: DateTime<Utc>,
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
