use serde::{Deserialize, Serialize};

use crate::domain::{LogOrigin, MicrosoftAccount, ProgressSnapshot};

/// Named event channels exposed by the external engine. Delivery is FIFO
/// within one channel; nothing is guaranteed across channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineChannel {
    Progress,
    Log,
    ProcessStarted,
    ProcessExited,
    CredentialRenewed,
}

impl EngineChannel {
    pub const ALL: [EngineChannel; 5] = [
        EngineChannel::Progress,
        EngineChannel::Log,
        EngineChannel::ProcessStarted,
        EngineChannel::ProcessExited,
        EngineChannel::CredentialRenewed,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EngineChannel::Progress => "progress",
            EngineChannel::Log => "log",
            EngineChannel::ProcessStarted => "process-started",
            EngineChannel::ProcessExited => "process-exited",
            EngineChannel::CredentialRenewed => "credential-renewed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressPayload {
    pub message: String,
    /// Raw percentage from the engine; negative means "not provided".
    pub percentage: f32,
    pub current: u64,
    pub total: u64,
    /// Component tag, e.g. `downloading-assets` or `launch`.
    pub component: String,
}

impl ProgressPayload {
    /// Derives the observable snapshot. A `current/total` pair wins over the
    /// raw percentage; with neither usable the percent is 0.
    pub fn snapshot(&self) -> ProgressSnapshot {
        let percent = if self.total > 0 {
            let ratio = self.current as f64 / self.total as f64;
            (ratio * 100.0).round().clamp(0.0, 100.0) as u8
        } else if self.percentage >= 0.0 {
            f64::from(self.percentage).round().clamp(0.0, 100.0) as u8
        } else {
            0
        };
        ProgressSnapshot {
            message: self.message.clone(),
            percent,
            current: self.current,
            total: self.total,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogPayload {
    pub message: String,
    pub origin: LogOrigin,
}

/// Events delivered by the external engine across the named channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum EngineEvent {
    Progress(ProgressPayload),
    Log(LogPayload),
    ProcessStarted,
    ProcessExited,
    CredentialRenewed(MicrosoftAccount),
}

impl EngineEvent {
    pub fn channel(&self) -> EngineChannel {
        match self {
            EngineEvent::Progress(_) => EngineChannel::Progress,
            EngineEvent::Log(_) => EngineChannel::Log,
            EngineEvent::ProcessStarted => EngineChannel::ProcessStarted,
            EngineEvent::ProcessExited => EngineChannel::ProcessExited,
            EngineEvent::CredentialRenewed(_) => EngineChannel::CredentialRenewed,
        }
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
