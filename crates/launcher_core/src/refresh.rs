use std::{
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use shared::domain::{AuthMethod, MicrosoftAccount, UserSettings, UserSettingsPatch};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{error, info, warn};

use crate::{settings::SettingsService, AuthClient};

/// Safety margin subtracted from the token expiry when arming the timer.
pub const REFRESH_BUFFER: Duration = Duration::from_secs(120);

/// Bounded retry for a failed refresh; after the last attempt the credential
/// is left untouched until the next settings change re-arms the cycle.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(30),
        }
    }
}

/// Keeps the held Microsoft credential from expiring while the app runs.
///
/// One task selects between "settings changed" and "armed deadline fired", so
/// cancelling and re-arming is atomic: there is never a window with two live
/// timers for the same account.
pub struct CredentialRefreshScheduler {
    task: JoinHandle<()>,
}

impl CredentialRefreshScheduler {
    pub fn start(settings: Arc<SettingsService>, auth: Arc<dyn AuthClient>) -> Self {
        Self::start_with(settings, auth, REFRESH_BUFFER, RetryPolicy::default())
    }

    pub fn start_with(
        settings: Arc<SettingsService>,
        auth: Arc<dyn AuthClient>,
        buffer: Duration,
        retry: RetryPolicy,
    ) -> Self {
        let task = tokio::spawn(run(settings, auth, buffer, retry));
        Self { task }
    }

    /// Cancels the pending timer; nothing fires after this returns.
    pub fn shutdown(&self) {
        self.task.abort();
    }
}

impl Drop for CredentialRefreshScheduler {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(
    settings: Arc<SettingsService>,
    auth: Arc<dyn AuthClient>,
    buffer: Duration,
    retry: RetryPolicy,
) {
    let mut changes = settings.watch();
    loop {
        let snapshot = changes.borrow_and_update().clone();
        let Some((delay, account)) = arm_for(&snapshot, buffer) else {
            // Not Microsoft-authenticated: nothing to arm until settings change.
            if changes.changed().await.is_err() {
                return;
            }
            continue;
        };

        if delay.is_zero() {
            // Already inside the buffer window: refresh now as well as arming
            // the zero-delay timer. A near-simultaneous second call is
            // tolerated by the refresh endpoint.
            info!("credential already inside refresh buffer, refreshing immediately");
            refresh_with_retry(&settings, auth.as_ref(), &account, retry).await;
        }

        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    return;
                }
            }
            _ = tokio::time::sleep(delay) => {
                refresh_with_retry(&settings, auth.as_ref(), &account, retry).await;
                // Re-arm only on the next settings replacement; a successful
                // refresh produces one through the save path.
                if changes.changed().await.is_err() {
                    return;
                }
            }
        }
    }
}

/// Delay until the renewal should fire, or `None` when no Microsoft account
/// is held.
fn arm_for(settings: &UserSettings, buffer: Duration) -> Option<(Duration, MicrosoftAccount)> {
    if settings.auth_method != AuthMethod::MicrosoftAccount {
        return None;
    }
    let account = settings.microsoft_account.clone()?;
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let delay_secs = account
        .exp
        .saturating_sub(now)
        .saturating_sub(buffer.as_secs());
    Some((Duration::from_secs(delay_secs), account))
}

async fn refresh_with_retry(
    settings: &SettingsService,
    auth: &dyn AuthClient,
    account: &MicrosoftAccount,
    retry: RetryPolicy,
) {
    for attempt in 1..=retry.attempts.max(1) {
        match auth.refresh_credential(&account.refresh_token).await {
            Ok(renewed) => {
                info!(username = %renewed.username, "credential refreshed");
                apply_renewed_credential(settings, renewed).await;
                return;
            }
            Err(err) => {
                warn!(error = %err, attempt, "credential refresh attempt failed");
                if attempt < retry.attempts {
                    tokio::time::sleep(retry.delay).await;
                }
            }
        }
    }
    error!("credential refresh attempts exhausted, keeping existing credential");
}

/// Replaces the whole account plus the display name through the settings
/// merge path. Used for both timer-driven and out-of-band renewals; the
/// resulting settings change re-arms the scheduler.
pub async fn apply_renewed_credential(
    settings: &SettingsService,
    account: MicrosoftAccount,
) -> UserSettings {
    settings
        .save(UserSettingsPatch {
            username: Some(account.username.clone()),
            auth_method: Some(AuthMethod::MicrosoftAccount),
            microsoft_account: Some(Some(account)),
            ..Default::default()
        })
        .await
}

#[cfg(test)]
#[path = "tests/refresh_tests.rs"]
mod tests;
