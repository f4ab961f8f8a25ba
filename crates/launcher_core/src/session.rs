use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use shared::{
    domain::{LaunchProfile, LogOrigin, ProgressSnapshot, SessionPhase},
    protocol::{EngineEvent, ProgressPayload},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

use crate::{logbuf::LogBuffer, refresh, settings::SettingsService, GameEngine};

const NOTICE_CHANNEL_CAPACITY: usize = 256;

/// Immutable view of the session: current phase plus progress snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub progress: ProgressSnapshot,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: SessionPhase::CheckingUpdate,
            progress: ProgressSnapshot::default(),
        }
    }
}

/// Notifications broadcast to state observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    StateChanged(SessionState),
    CommandRejected {
        command: &'static str,
        phase: SessionPhase,
    },
    CommandFailed {
        command: &'static str,
        error: String,
    },
}

/// Phase-gated commands either run or are dropped; a rejection is a no-op
/// visible to the caller, never an error and never a queue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Accepted,
    Rejected,
}

/// Maps an engine component tag to the phase it implies. Total and
/// order-independent over inputs; ambiguity is resolved by a strict priority:
/// exact `done`, then exact `launch`, then the `downloading` substring, then
/// the `installing` substring. Unrecognized tags imply no phase change.
pub fn phase_for_component(tag: &str) -> Option<SessionPhase> {
    match tag {
        "done" => Some(SessionPhase::Launched),
        "launch" => Some(SessionPhase::ReadyToLaunch),
        _ if tag.contains("downloading") => Some(SessionPhase::Downloading),
        _ if tag.contains("installing") => Some(SessionPhase::Installing),
        _ => None,
    }
}

/// The session state machine: single authoritative phase, wholesale-replaced
/// progress snapshot, and the command gate in front of the external engine.
pub struct LauncherSession {
    engine: Arc<dyn GameEngine>,
    settings: Arc<SettingsService>,
    logs: Arc<LogBuffer>,
    inner: Mutex<SessionState>,
    notices: broadcast::Sender<SessionNotice>,
}

impl LauncherSession {
    pub fn new(
        engine: Arc<dyn GameEngine>,
        settings: Arc<SettingsService>,
        logs: Arc<LogBuffer>,
    ) -> Arc<Self> {
        let (notices, _) = broadcast::channel(NOTICE_CHANNEL_CAPACITY);
        Arc::new(Self {
            engine,
            settings,
            logs,
            inner: Mutex::new(SessionState::default()),
            notices,
        })
    }

    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionNotice> {
        self.notices.subscribe()
    }

    /// Runs the startup update check. On engine failure the session stays in
    /// `CheckingUpdate` and the error surfaces to the caller as non-fatal.
    pub async fn initialize(&self) -> Result<()> {
        self.set_phase(SessionPhase::CheckingUpdate).await;
        self.log_orchestrator("checking whether content needs updating")
            .await;
        match self.engine.check_update_needed().await {
            Ok(true) => {
                self.log_orchestrator("content update required").await;
                self.set_phase(SessionPhase::NeedsUpdate).await;
            }
            Ok(false) => {
                self.log_orchestrator("content is up to date").await;
                self.set_phase(SessionPhase::ReadyToLaunch).await;
            }
            Err(error) => {
                warn!(%error, "update check failed");
                self.log_orchestrator(format!("update check failed: {error}"))
                    .await;
                self.notify_failure("check-update", &error);
                return Err(error.context("update check failed"));
            }
        }
        Ok(())
    }

    /// Issues the content update command. Valid only in `NeedsUpdate`; the
    /// phase changes arrive later via progress events, not here.
    pub async fn request_update(&self) -> Result<CommandOutcome> {
        {
            let state = self.inner.lock().await;
            if state.phase != SessionPhase::NeedsUpdate {
                self.notify_rejection("request-update", state.phase);
                return Ok(CommandOutcome::Rejected);
            }
        }
        self.log_orchestrator("applying content update").await;
        if let Err(error) = self.engine.apply_update().await {
            warn!(%error, "content update command failed");
            self.log_orchestrator(format!("content update failed: {error}"))
                .await;
            self.notify_failure("request-update", &error);
            return Err(error.context("content update failed"));
        }
        Ok(CommandOutcome::Accepted)
    }

    /// Issues the launch command with a snapshot of the current settings.
    /// Valid from `ReadyToLaunch` and `Launched` (relaunch); anything else is
    /// a no-op rejection with no external call. Engine failure reverts to the
    /// pre-call phase.
    pub async fn request_launch(&self) -> Result<CommandOutcome> {
        let prior_phase = {
            let mut state = self.inner.lock().await;
            match state.phase {
                SessionPhase::ReadyToLaunch | SessionPhase::Launched => {
                    let prior = state.phase;
                    state.phase = SessionPhase::Launching;
                    let snapshot = state.clone();
                    drop(state);
                    self.notify_state(snapshot);
                    prior
                }
                phase => {
                    drop(state);
                    self.notify_rejection("request-launch", phase);
                    return Ok(CommandOutcome::Rejected);
                }
            }
        };

        let profile = LaunchProfile::from(&self.settings.current().await);
        self.log_orchestrator(format!("launching as '{}'", profile.username))
            .await;
        if let Err(error) = self.engine.launch(profile).await {
            warn!(%error, "launch command failed");
            self.log_orchestrator(format!("launch failed: {error}")).await;
            // Late lifecycle events may already have moved the phase on; only
            // undo our own transition.
            {
                let mut state = self.inner.lock().await;
                if state.phase == SessionPhase::Launching {
                    state.phase = prior_phase;
                    let snapshot = state.clone();
                    drop(state);
                    self.notify_state(snapshot);
                }
            }
            self.notify_failure("request-launch", &error);
            return Err(error.context("launch failed"));
        }
        Ok(CommandOutcome::Accepted)
    }

    /// Single entry point for events delivered by the bridge.
    pub async fn dispatch(&self, event: EngineEvent) {
        match event {
            EngineEvent::Progress(payload) => self.on_progress(payload).await,
            EngineEvent::Log(payload) => self.logs.push(payload.message, payload.origin).await,
            EngineEvent::ProcessStarted => self.on_process_started().await,
            EngineEvent::ProcessExited => self.on_process_exited().await,
            EngineEvent::CredentialRenewed(account) => {
                self.log_orchestrator("applying externally renewed credential")
                    .await;
                refresh::apply_renewed_credential(&self.settings, account).await;
            }
        }
    }

    /// Wholesale snapshot replacement, last write wins. The phase follows the
    /// component tag when recognized, otherwise stays put.
    async fn on_progress(&self, payload: ProgressPayload) {
        let progress = payload.snapshot();
        let mut state = self.inner.lock().await;
        if let Some(phase) = phase_for_component(&payload.component) {
            state.phase = phase;
        }
        state.progress = progress;
        let snapshot = state.clone();
        drop(state);
        self.notify_state(snapshot);
    }

    async fn on_process_started(&self) {
        info!("game process started");
        let mut state = self.inner.lock().await;
        state.phase = SessionPhase::Launched;
        state.progress.percent = 100;
        let snapshot = state.clone();
        drop(state);
        self.notify_state(snapshot);
    }

    async fn on_process_exited(&self) {
        info!("game process exited");
        let mut state = self.inner.lock().await;
        state.phase = SessionPhase::ReadyToLaunch;
        state.progress = ProgressSnapshot::default();
        let snapshot = state.clone();
        drop(state);
        self.notify_state(snapshot);
    }

    pub async fn install_root(&self) -> Result<PathBuf> {
        self.engine
            .install_root()
            .await
            .context("failed to resolve install root")
    }

    /// Moves the installation root, then re-runs the update check: content at
    /// the new root may be stale.
    pub async fn set_install_root(&self, path: PathBuf) -> Result<()> {
        self.engine
            .set_install_root(path.clone())
            .await
            .context("failed to set install root")?;
        self.log_orchestrator(format!("install root moved to '{}'", path.display()))
            .await;
        if self
            .engine
            .check_update_needed()
            .await
            .context("update check after install-root change failed")?
        {
            self.set_phase(SessionPhase::NeedsUpdate).await;
        }
        Ok(())
    }

    async fn set_phase(&self, phase: SessionPhase) {
        let mut state = self.inner.lock().await;
        if state.phase == phase {
            return;
        }
        state.phase = phase;
        let snapshot = state.clone();
        drop(state);
        self.notify_state(snapshot);
    }

    async fn log_orchestrator(&self, message: impl Into<String>) {
        self.logs.push(message, LogOrigin::Orchestrator).await;
    }

    fn notify_state(&self, state: SessionState) {
        let _ = self.notices.send(SessionNotice::StateChanged(state));
    }

    fn notify_rejection(&self, command: &'static str, phase: SessionPhase) {
        info!(command, ?phase, "command rejected in current phase");
        let _ = self
            .notices
            .send(SessionNotice::CommandRejected { command, phase });
    }

    fn notify_failure(&self, command: &'static str, error: &anyhow::Error) {
        let _ = self.notices.send(SessionNotice::CommandFailed {
            command,
            error: error.to_string(),
        });
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
