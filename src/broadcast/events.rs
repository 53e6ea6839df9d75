//! Push-channel frames.

use serde::Serialize;

use crate::ledger::UsageInfo;
use crate::scheduler::TranscriptEntry;

/// A frame sent to a viewer, serialized as `{"event": ..., "data": ...}`
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Full transcript, once per viewer on connect
    InitialHistory(Vec<TranscriptEntry>),
    /// One new line, to every viewer
    NewMessage(TranscriptEntry),
    /// Budget snapshot, once per viewer on connect
    ApiUsage(UsageInfo),
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::InitialHistory(_) => "initialHistory",
            ServerEvent::NewMessage(_) => "newMessage",
            ServerEvent::ApiUsage(_) => "apiUsage",
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
