//! Channels: the contended resource slots communications play on
//!
//! A channel is free only when it is unoccupied, its silence has elapsed
//! and its parent (transitively) is free as well. The parent walk lives in
//! [`ChannelRegistry`](crate::ChannelRegistry), which owns every channel in
//! an arena and links parents by [`ChannelHandle`].

use crate::error::Error;
use crate::identity::ChannelId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How concrete channel instances are shared between actors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ChannelKind {
    /// One instance for everyone
    #[default]
    Global,
    /// One instance per actor group
    Group,
    /// One instance per actor
    Personal,
}

impl FromStr for ChannelKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" => Ok(ChannelKind::Global),
            "group" => Ok(ChannelKind::Group),
            "personal" => Ok(ChannelKind::Personal),
            _ => Err(Error::InvalidChannelType(s.to_string())),
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChannelKind::Global => "global",
            ChannelKind::Group => "group",
            ChannelKind::Personal => "personal",
        };
        f.write_str(name)
    }
}

/// Static configuration of a channel definition
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelParams {
    pub id: ChannelId,
    pub name: String,
    pub parent: Option<ChannelId>,
    /// Higher preempts lower
    pub priority: i32,
    pub kind: ChannelKind,
    /// Silence imposed when a session releases the channel
    pub min_silence: f32,
    /// Silence imposed when a preemption vacates the channel
    pub flush_silence: f32,
    /// Voice restriction given to the actor that occupies the channel
    pub actor_min_silence: f32,
    pub ignore_actor_silence: bool,
}

/// Arena index of a concrete channel instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelHandle(pub(crate) usize);

impl ChannelHandle {
    /// Get the raw arena index
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A concrete channel instance
#[derive(Debug, Clone)]
pub struct Channel {
    id: ChannelId,
    priority: i32,
    kind: ChannelKind,
    min_silence: f32,
    flush_silence: f32,
    actor_min_silence: f32,
    ignore_actor_silence: bool,
    occupied: bool,
    silence: f32,
    parent: Option<ChannelHandle>,
}

impl Channel {
    /// Instantiate a channel from its definition
    pub fn new(params: &ChannelParams, parent: Option<ChannelHandle>) -> Self {
        Self {
            id: params.id,
            priority: params.priority,
            kind: params.kind,
            min_silence: params.min_silence,
            flush_silence: params.flush_silence,
            actor_min_silence: params.actor_min_silence,
            ignore_actor_silence: params.ignore_actor_silence,
            occupied: false,
            silence: 0.0,
            parent,
        }
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    pub fn parent(&self) -> Option<ChannelHandle> {
        self.parent
    }

    pub fn is_occupied(&self) -> bool {
        self.occupied
    }

    /// Remaining silence in seconds
    pub fn silence(&self) -> f32 {
        self.silence
    }

    pub fn actor_min_silence(&self) -> f32 {
        self.actor_min_silence
    }

    pub fn ignores_actor_silence(&self) -> bool {
        self.ignore_actor_silence
    }

    /// Free ignoring the parent chain
    pub(crate) fn is_locally_free(&self) -> bool {
        !self.occupied && self.silence <= 0.0
    }

    pub(crate) fn occupy(&mut self) {
        self.occupied = true;
    }

    /// Release and start the silence; negative or missing uses the default
    pub(crate) fn release(&mut self, min_silence: Option<f32>) {
        self.occupied = false;
        self.silence = match min_silence {
            Some(s) if s >= 0.0 => s,
            _ => self.min_silence,
        };
    }

    pub(crate) fn reset_silence(&mut self) {
        self.silence = self.flush_silence;
    }

    /// Count the silence down; occupied channels keep theirs frozen
    pub(crate) fn tick(&mut self, dt: f32) {
        if !self.occupied && self.silence > 0.0 {
            self.silence = (self.silence - dt).max(0.0);
        }
    }
}
