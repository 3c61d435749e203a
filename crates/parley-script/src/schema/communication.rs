//! Config, communication and variation nodes

use serde::{Deserialize, Serialize};

/// A named bundle of communications
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigNode {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub communications: Vec<CommunicationNode>,
}

/// A communication and its variations
///
/// `defaults` holds variation attributes inherited by every entry in
/// `variations`. Omitted choice methods mean "randomsequence".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommunicationNode {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub choice_method: Option<String>,
    #[serde(default)]
    pub response_name: Option<String>,
    #[serde(default)]
    pub response_choice_method: Option<String>,
    #[serde(default)]
    pub force_animation: bool,
    #[serde(default)]
    pub defaults: VariationNode,
    #[serde(default)]
    pub variations: Vec<VariationNode>,
}

/// Variation attributes; absent fields keep the inherited value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariationNode {
    #[serde(default)]
    pub animation_name: Option<String>,
    #[serde(default)]
    pub sound_name: Option<String>,
    #[serde(default)]
    pub voice_name: Option<String>,
    #[serde(default)]
    pub look_at_target: Option<bool>,
    /// Comma list of "animation", "sound", "voice", "timeout" or "all"
    #[serde(default)]
    pub finish_method: Option<String>,
    /// Comma list of "movement", "fire", "all" or "none"
    #[serde(default)]
    pub blocking: Option<String>,
    /// "signal" or "action"
    #[serde(default)]
    pub animation_type: Option<String>,
    #[serde(default)]
    pub timeout: Option<f32>,
    #[serde(default)]
    pub condition: Option<String>,
}
