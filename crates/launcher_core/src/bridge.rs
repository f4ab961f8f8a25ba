use std::sync::Arc;

use shared::protocol::EngineChannel;
use tokio::{
    sync::{broadcast::error::RecvError, Mutex},
    task::JoinHandle,
};
use tracing::{info, warn};

use crate::{session::LauncherSession, GameEngine};

/// Handle for one named-channel subscription. Disposing (or dropping) it
/// stops the forwarder task, so no handler fires after the owning session
/// ends.
pub struct SubscriptionHandle {
    channel: EngineChannel,
    task: JoinHandle<()>,
}

impl SubscriptionHandle {
    pub fn channel(&self) -> EngineChannel {
        self.channel
    }

    pub fn dispose(&self) {
        self.task.abort();
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Subscribes to the engine's named event channels and forwards payloads
/// verbatim into the session's dispatch entry point. One forwarder task per
/// channel: FIFO within a channel, no ordering across channels.
pub struct EventBridge {
    subscriptions: Mutex<Vec<SubscriptionHandle>>,
}

impl EventBridge {
    pub fn new() -> Self {
        Self {
            subscriptions: Mutex::new(Vec::new()),
        }
    }

    /// Starts forwarding. Idempotent: a second call while subscriptions are
    /// live is a no-op.
    pub async fn start(&self, engine: &Arc<dyn GameEngine>, session: &Arc<LauncherSession>) {
        let mut subscriptions = self.subscriptions.lock().await;
        if !subscriptions.is_empty() {
            return;
        }
        for channel in EngineChannel::ALL {
            let mut receiver = engine.subscribe(channel);
            let session = Arc::clone(session);
            let task = tokio::spawn(async move {
                loop {
                    match receiver.recv().await {
                        Ok(event) => session.dispatch(event).await,
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(channel = channel.name(), skipped, "event channel lagged");
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            });
            subscriptions.push(SubscriptionHandle { channel, task });
        }
        info!("event bridge subscribed to engine channels");
    }

    /// Releases every subscription together at session end.
    pub async fn dispose_all(&self) {
        let mut subscriptions = self.subscriptions.lock().await;
        for subscription in subscriptions.drain(..) {
            subscription.dispose();
        }
    }
}

impl Default for EventBridge {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "tests/bridge_tests.rs"]
mod tests;
