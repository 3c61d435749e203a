//! Top-level configuration document

use super::communication::ConfigNode;
use parley_core::{AudioRouting, ChannelNode, VariableDecl};
use serde::{Deserialize, Serialize};

/// One RON configuration file
///
/// Every section is optional so definitions can be split across files.
///
/// ```ron
/// (
///     variables: [(name: "Alerted", default: false)],
///     channels: [(name: "Global", min_silence: 1.0, children: [(name: "Idle")])],
///     configs: [(name: "Soldier", communications: [...])],
///     global: (prefix_for_play_trigger: "Play_"),
/// )
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub variables: Vec<VariableDecl>,
    #[serde(default)]
    pub channels: Vec<ChannelNode>,
    #[serde(default)]
    pub configs: Vec<ConfigNode>,
    /// Audio routing handed to the backend; a later document overrides an earlier one
    #[serde(default)]
    pub global: Option<AudioRouting>,
}

impl Document {
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
            && self.channels.is_empty()
            && self.configs.is_empty()
            && self.global.is_none()
    }
}
