//! End-to-end pass through a full session: pending update, update progress,
//! launch, process lifecycle, and return to ready.

use std::{collections::HashMap, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use launcher_core::{
    CommandOutcome, EventBridge, GameEngine, LauncherSession, LogBuffer, SettingsService,
};
use shared::{
    domain::{LaunchProfile, LogOrigin, SessionPhase},
    persist::BlobStore,
    protocol::{EngineChannel, EngineEvent, LogPayload, ProgressPayload},
};
use tokio::sync::{broadcast, Mutex};

struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn load_blob(&self, key: &str) -> Result<Option<String>> {
        Ok(self.blobs.lock().await.get(key).cloned())
    }

    async fn save_blob(&self, key: &str, value: &str) -> Result<()> {
        self.blobs
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Engine double that emits the event script a real update+launch produces.
struct ScriptedEngine {
    update_needed: Mutex<bool>,
    senders: HashMap<EngineChannel, broadcast::Sender<EngineEvent>>,
}

impl ScriptedEngine {
    fn new() -> Arc<Self> {
        let mut senders = HashMap::new();
        for channel in EngineChannel::ALL {
            let (sender, _) = broadcast::channel(64);
            senders.insert(channel, sender);
        }
        Arc::new(Self {
            update_needed: Mutex::new(true),
            senders,
        })
    }

    fn emit(&self, event: EngineEvent) {
        let _ = self.senders[&event.channel()].send(event);
    }

    fn progress(&self, message: &str, current: u64, total: u64, component: &str) {
        self.emit(EngineEvent::Progress(ProgressPayload {
            message: message.into(),
            percentage: -1.0,
            current,
            total,
            component: component.into(),
        }));
    }
}

#[async_trait]
impl GameEngine for ScriptedEngine {
    async fn check_update_needed(&self) -> Result<bool> {
        Ok(*self.update_needed.lock().await)
    }

    async fn apply_update(&self) -> Result<()> {
        *self.update_needed.lock().await = false;
        self.progress("downloading modpack", 10, 40, "downloading-modpack");
        self.progress("installing modpack", 40, 40, "installing-modpack");
        self.progress("update complete", 0, 0, "launch");
        Ok(())
    }

    async fn launch(&self, _profile: LaunchProfile) -> Result<()> {
        self.emit(EngineEvent::Log(LogPayload {
            message: "spawning game process".into(),
            origin: LogOrigin::Engine,
        }));
        self.emit(EngineEvent::ProcessStarted);
        Ok(())
    }

    async fn install_root(&self) -> Result<PathBuf> {
        Err(anyhow!("not used by this script"))
    }

    async fn set_install_root(&self, _path: PathBuf) -> Result<()> {
        Err(anyhow!("not used by this script"))
    }

    fn subscribe(&self, channel: EngineChannel) -> broadcast::Receiver<EngineEvent> {
        self.senders[&channel].subscribe()
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

#[tokio::test(start_paused = true)]
async fn full_update_launch_exit_cycle() {
    let engine = ScriptedEngine::new();
    let store = Arc::new(MemoryBlobStore {
        blobs: Mutex::new(HashMap::new()),
    });
    let settings = SettingsService::load(store as Arc<dyn BlobStore>).await;
    let logs = Arc::new(LogBuffer::new());
    let session = LauncherSession::new(
        engine.clone() as Arc<dyn GameEngine>,
        settings,
        logs.clone(),
    );
    let bridge = EventBridge::new();
    bridge
        .start(&(engine.clone() as Arc<dyn GameEngine>), &session)
        .await;

    session.initialize().await.unwrap();
    assert_eq!(session.state().await.phase, SessionPhase::NeedsUpdate);

    // Launching before the update completes is dropped, not queued.
    assert_eq!(
        session.request_launch().await.unwrap(),
        CommandOutcome::Rejected
    );

    assert_eq!(
        session.request_update().await.unwrap(),
        CommandOutcome::Accepted
    );
    settle().await;
    assert_eq!(session.state().await.phase, SessionPhase::ReadyToLaunch);

    assert_eq!(
        session.request_launch().await.unwrap(),
        CommandOutcome::Accepted
    );
    settle().await;
    let launched = session.state().await;
    assert_eq!(launched.phase, SessionPhase::Launched);
    assert_eq!(launched.progress.percent, 100);

    engine.emit(EngineEvent::ProcessExited);
    settle().await;
    let back = session.state().await;
    assert_eq!(back.phase, SessionPhase::ReadyToLaunch);
    assert_eq!(back.progress.percent, 0);
    assert!(back.progress.message.is_empty());

    // Engine log line made it through the bridge.
    let entries = logs.entries().await;
    assert!(entries
        .iter()
        .any(|e| e.origin == LogOrigin::Engine && e.message.contains("spawning")));

    bridge.dispose_all().await;
}
