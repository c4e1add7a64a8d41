//! Termination reasons and host-facing actions

use serde::{Deserialize, Serialize};

/// Why a call was terminated
///
/// The serialized names are the identifiers the host page already knows,
/// so they must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reason {
    #[serde(rename = "bye")]
    Bye,
    #[serde(rename = "exceedslimit")]
    Exceedslimit,
    #[serde(rename = "tasterTimeCheck")]
    TasterTimeCheck,
    #[serde(rename = "inactive")]
    Inactive,
    #[serde(rename = "stopCall")]
    Stop,
    /// A ready event arrived after the call had already been stopped
    #[serde(rename = "stopMarker")]
    StopMarker,
    #[serde(rename = "cancelCall")]
    CancelCall,
    #[serde(rename = "unmount")]
    Unmount,
    #[serde(rename = "stopCallTimeCheck")]
    StopCallTimeCheck,
}

impl Reason {
    /// Wire identifier of this reason
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::Bye => "bye",
            Reason::Exceedslimit => "exceedslimit",
            Reason::TasterTimeCheck => "tasterTimeCheck",
            Reason::Inactive => "inactive",
            Reason::Stop => "stopCall",
            Reason::StopMarker => "stopMarker",
            Reason::CancelCall => "cancelCall",
            Reason::Unmount => "unmount",
            Reason::StopCallTimeCheck => "stopCallTimeCheck",
        }
    }

    /// Whether the reason comes from one of the call timers
    pub fn is_timer_driven(&self) -> bool {
        matches!(
            self,
            Reason::Inactive
                | Reason::Exceedslimit
                | Reason::TasterTimeCheck
                | Reason::StopCallTimeCheck
        )
    }
}

impl std::fmt::Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-terminating notifications for the host page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum CallAction {
    /// A taster-mode session became active
    StartSession(Option<String>),
}
