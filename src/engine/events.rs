//! Events observed from the avatar engine

use serde::{Deserialize, Serialize};

/// An event raised by the avatar engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum EngineEvent {
    /// The avatar is on screen and the conversation is live
    #[serde(rename_all = "camelCase")]
    Show { session_id: Option<String> },
    /// The avatar started speaking an utterance
    SpeakStart { ext: Option<String> },
    SpeakEnd { ext: Option<String> },
    /// Speech recognition picked up user input
    AsrStart,
    AsrStop,
    /// Audio playback started; only reported in audio mode
    TtsSpeakStart,
    TtsSpeakEnd,
    Bye,
    Error { message: String },
}

impl EngineEvent {
    pub fn kind(&self) -> EngineEventKind {
        match self {
            EngineEvent::Show { .. } => EngineEventKind::Show,
            EngineEvent::SpeakStart { .. } => EngineEventKind::SpeakStart,
            EngineEvent::SpeakEnd { .. } => EngineEventKind::SpeakEnd,
            EngineEvent::AsrStart => EngineEventKind::AsrStart,
            EngineEvent::AsrStop => EngineEventKind::AsrStop,
            EngineEvent::TtsSpeakStart => EngineEventKind::TtsSpeakStart,
            EngineEvent::TtsSpeakEnd => EngineEventKind::TtsSpeakEnd,
            EngineEvent::Bye => EngineEventKind::Bye,
            EngineEvent::Error { .. } => EngineEventKind::Error,
        }
    }
}

/// The fixed set of event names the coordinator subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EngineEventKind {
    Show,
    SpeakStart,
    SpeakEnd,
    AsrStart,
    AsrStop,
    TtsSpeakStart,
    TtsSpeakEnd,
    Bye,
    Error,
}

impl EngineEventKind {
    pub const ALL: [EngineEventKind; 9] = [
        EngineEventKind::Show,
        EngineEventKind::SpeakStart,
        EngineEventKind::SpeakEnd,
        EngineEventKind::AsrStart,
        EngineEventKind::AsrStop,
        EngineEventKind::TtsSpeakStart,
        EngineEventKind::TtsSpeakEnd,
        EngineEventKind::Bye,
        EngineEventKind::Error,
    ];

    /// Event name as used by the engine SDK
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineEventKind::Show => "show",
            EngineEventKind::SpeakStart => "speakStart",
            EngineEventKind::SpeakEnd => "speakEnd",
            EngineEventKind::AsrStart => "asrStart",
            EngineEventKind::AsrStop => "asrStop",
            EngineEventKind::TtsSpeakStart => "ttsSpeakStart",
            EngineEventKind::TtsSpeakEnd => "ttsSpeakEnd",
            EngineEventKind::Bye => "bye",
            EngineEventKind::Error => "error",
        }
    }
}
