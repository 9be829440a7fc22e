//! The operator-guidance command shape carried over the bus — distinct from
//! `ssi_agent::guidance`'s types, which describe the request/response pair
//! as seen from inside the controller. This is the wire shape a WebSocket
//! or CLI client actually sends.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuidanceAction {
    Click,
    Type,
    Goto,
    Skip,
    Continue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuidanceCommand {
    pub action: GuidanceAction,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub reason: String,
}
