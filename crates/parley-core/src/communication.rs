//! Communication definitions and their variations
//!
//! A [`CommConfig`] is a named bundle of [`CommunicationDef`]s. Each
//! communication carries up to [`MAX_VARIATION_COUNT`] variations and a
//! played-history bitmask used by the selector.

use crate::condition::Condition;
use crate::error::{Error, Result};
use crate::identity::{CommId, ConfigId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};
use std::str::FromStr;

/// Upper bound on variations per communication (one history bit each)
pub const MAX_VARIATION_COUNT: usize = 32;

/// Bitset over the sub-components of a playing session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Components(u8);

impl Components {
    pub const NONE: Components = Components(0);
    pub const ANIMATION: Components = Components(1);
    pub const SOUND: Components = Components(2);
    pub const VOICE: Components = Components(4);
    pub const TIMEOUT: Components = Components(8);
    pub const ALL: Components = Components(15);

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn contains(&self, other: Components) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(&self, other: Components) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: Components) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Components) {
        self.0 &= !other.0;
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn is_all(&self) -> bool {
        self.contains(Components::ALL)
    }
}

impl BitOr for Components {
    type Output = Components;

    fn bitor(self, rhs: Components) -> Components {
        Components(self.0 | rhs.0)
    }
}

impl BitAnd for Components {
    type Output = Components;

    fn bitand(self, rhs: Components) -> Components {
        Components(self.0 & rhs.0)
    }
}

impl BitOrAssign for Components {
    fn bitor_assign(&mut self, rhs: Components) {
        self.0 |= rhs.0;
    }
}

impl FromStr for Components {
    type Err = Error;

    /// Parse a comma list such as `"animation, voice"` or `"all"`
    fn from_str(s: &str) -> Result<Self> {
        let mut flags = Components::NONE;
        for item in s.split(',').map(str::trim).filter(|i| !i.is_empty()) {
            flags |= match item.to_ascii_lowercase().as_str() {
                "animation" => Components::ANIMATION,
                "sound" => Components::SOUND,
                "voice" => Components::VOICE,
                "timeout" => Components::TIMEOUT,
                "all" => Components::ALL,
                _ => {
                    return Err(Error::InvalidValue {
                        attribute: "finish_method",
                        value: item.to_string(),
                    })
                }
            };
        }
        Ok(flags)
    }
}

/// Actor capabilities suppressed while a variation plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BlockFlags(u8);

impl BlockFlags {
    pub const NONE: BlockFlags = BlockFlags(0);
    pub const MOVEMENT: BlockFlags = BlockFlags(1);
    pub const FIRE: BlockFlags = BlockFlags(2);
    pub const ALL: BlockFlags = BlockFlags(3);

    pub fn contains(&self, other: BlockFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl BitOr for BlockFlags {
    type Output = BlockFlags;

    fn bitor(self, rhs: BlockFlags) -> BlockFlags {
        BlockFlags(self.0 | rhs.0)
    }
}

impl FromStr for BlockFlags {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut flags = BlockFlags::NONE;
        for item in s.split(',').map(str::trim).filter(|i| !i.is_empty()) {
            let flag = match item.to_ascii_lowercase().as_str() {
                "movement" => BlockFlags::MOVEMENT,
                "fire" => BlockFlags::FIRE,
                "all" => BlockFlags::ALL,
                "none" => BlockFlags::NONE,
                _ => {
                    return Err(Error::InvalidValue {
                        attribute: "blocking",
                        value: item.to_string(),
                    })
                }
            };
            flags = flags | flag;
        }
        Ok(flags)
    }
}

/// How the backend drives a variation's animation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AnimationMethod {
    /// One-shot signal; reports its own completion
    #[default]
    Signal,
    /// Looping action; must be stopped explicitly
    Action,
}

impl FromStr for AnimationMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "signal" => Ok(AnimationMethod::Signal),
            "action" => Ok(AnimationMethod::Action),
            _ => Err(Error::InvalidValue {
                attribute: "animation_type",
                value: s.to_string(),
            }),
        }
    }
}

/// Variation selection policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ChoiceMethod {
    Random,
    Sequence,
    #[default]
    RandomSequence,
    Match,
}

impl FromStr for ChoiceMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" => Ok(ChoiceMethod::Random),
            "sequence" => Ok(ChoiceMethod::Sequence),
            "randomsequence" => Ok(ChoiceMethod::RandomSequence),
            "match" => Ok(ChoiceMethod::Match),
            _ => Err(Error::InvalidValue {
                attribute: "choice_method",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for ChoiceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChoiceMethod::Random => "random",
            ChoiceMethod::Sequence => "sequence",
            ChoiceMethod::RandomSequence => "randomsequence",
            ChoiceMethod::Match => "match",
        };
        f.write_str(name)
    }
}

/// One concrete realization of a communication
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variation {
    pub animation_name: Option<String>,
    pub sound_name: Option<String>,
    pub voice_name: Option<String>,
    pub look_at_target: bool,
    /// Sub-components that must complete before the session finishes
    pub finish: Components,
    pub blocking: BlockFlags,
    pub animation_method: AnimationMethod,
    /// Seconds; zero means no timeout component
    pub timeout: f32,
    /// Gate evaluated at selection time; None is always eligible
    pub condition: Option<Condition>,
}

impl Default for Variation {
    fn default() -> Self {
        Self {
            animation_name: None,
            sound_name: None,
            voice_name: None,
            look_at_target: false,
            finish: Components::ALL,
            blocking: BlockFlags::NONE,
            animation_method: AnimationMethod::Signal,
            timeout: 0.0,
            condition: None,
        }
    }
}

impl Variation {
    pub fn with_animation(mut self, name: impl Into<String>) -> Self {
        self.animation_name = Some(name.into());
        self
    }

    pub fn with_sound(mut self, name: impl Into<String>) -> Self {
        self.sound_name = Some(name.into());
        self
    }

    pub fn with_voice(mut self, name: impl Into<String>) -> Self {
        self.voice_name = Some(name.into());
        self
    }

    pub fn with_finish(mut self, finish: Components) -> Self {
        self.finish = finish;
        self
    }

    pub fn with_blocking(mut self, blocking: BlockFlags) -> Self {
        self.blocking = blocking;
        self
    }

    pub fn with_animation_method(mut self, method: AnimationMethod) -> Self {
        self.animation_method = method;
        self
    }

    pub fn with_timeout(mut self, timeout: f32) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn with_look_at_target(mut self) -> Self {
        self.look_at_target = true;
        self
    }

    pub fn has_animation(&self) -> bool {
        self.animation_name.as_deref().is_some_and(|n| !n.is_empty())
    }

    pub fn has_sound(&self) -> bool {
        self.sound_name.as_deref().is_some_and(|n| !n.is_empty())
    }

    pub fn has_voice(&self) -> bool {
        self.voice_name.as_deref().is_some_and(|n| !n.is_empty())
    }
}

/// Played-history bitmask, one bit per variation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct History {
    pub played: u32,
}

impl History {
    pub fn is_played(&self, index: usize) -> bool {
        index < MAX_VARIATION_COUNT && self.played & (1 << index) != 0
    }

    pub fn clear(&mut self) {
        self.played = 0;
    }
}

/// A named communication with its variations
#[derive(Debug, Clone, PartialEq)]
pub struct CommunicationDef {
    pub id: CommId,
    pub name: String,
    pub variations: Vec<Variation>,
    pub choice_method: ChoiceMethod,
    pub response: Option<CommId>,
    pub response_choice_method: ChoiceMethod,
    pub force_animation: bool,
    pub history: History,
}

impl CommunicationDef {
    /// Create a communication with no variations
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: CommId::from_name(&name),
            name,
            variations: Vec::new(),
            choice_method: ChoiceMethod::default(),
            response: None,
            response_choice_method: ChoiceMethod::default(),
            force_animation: false,
            history: History::default(),
        }
    }

    pub fn with_choice_method(mut self, method: ChoiceMethod) -> Self {
        self.choice_method = method;
        self
    }

    pub fn with_force_animation(mut self, force: bool) -> Self {
        self.force_animation = force;
        self
    }

    pub fn with_response(mut self, name: &str, method: ChoiceMethod) -> Self {
        self.response = Some(CommId::from_name(name));
        self.response_choice_method = method;
        self
    }

    /// Append a variation; returns false once the cap is reached
    pub fn push_variation(&mut self, variation: Variation) -> bool {
        if self.variations.len() >= MAX_VARIATION_COUNT {
            return false;
        }
        self.variations.push(variation);
        true
    }

    pub fn with_variation(mut self, variation: Variation) -> Self {
        if !self.push_variation(variation) {
            tracing::warn!(comm = %self.name, "variation limit reached");
        }
        self
    }

    /// Check if any variation plays an animation
    pub fn has_animation(&self) -> bool {
        self.variations.iter().any(Variation::has_animation)
    }
}

/// A named bundle of communications
#[derive(Debug, Clone, PartialEq)]
pub struct CommConfig {
    pub id: ConfigId,
    pub name: String,
    comms: IndexMap<CommId, CommunicationDef>,
}

impl CommConfig {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: ConfigId::from_name(&name),
            name,
            comms: IndexMap::new(),
        }
    }

    /// Add a communication, rejecting duplicate or colliding names
    pub fn insert(&mut self, comm: CommunicationDef) -> Result<CommId> {
        if comm.name.trim().is_empty() {
            return Err(Error::MissingName("communication"));
        }
        if let Some(existing) = self.comms.get(&comm.id) {
            return Err(Error::name_clash("communication", &comm.name, &existing.name));
        }
        let id = comm.id;
        self.comms.insert(id, comm);
        Ok(id)
    }

    pub fn get(&self, id: CommId) -> Option<&CommunicationDef> {
        self.comms.get(&id)
    }

    pub fn get_mut(&mut self, id: CommId) -> Option<&mut CommunicationDef> {
        self.comms.get_mut(&id)
    }

    /// Communication at a position in declaration order
    pub fn get_index(&self, index: usize) -> Option<&CommunicationDef> {
        self.comms.get_index(index).map(|(_, comm)| comm)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommunicationDef> {
        self.comms.values()
    }

    pub fn len(&self) -> usize {
        self.comms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comms.is_empty()
    }

    pub fn reset_history(&mut self) {
        for comm in self.comms.values_mut() {
            comm.history.clear();
        }
    }
}
