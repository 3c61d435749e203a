//! Play requests and queue entries

use crate::identity::{ActorId, ChannelId, CommId, ConfigId, PlayId};
use crate::notify::ListenerId;
use serde::{Deserialize, Serialize};

/// Which queue a request waits in when its channel is busy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum QueueOrdering {
    Ordered,
    #[default]
    Unordered,
}

/// One play intent
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub actor: ActorId,
    pub config: ConfigId,
    pub comm: CommId,
    pub channel: ChannelId,
    /// Look-at target
    pub target: Option<ActorId>,
    pub ordering: QueueOrdering,
    /// Seconds a queued request may wait before it expires
    pub expiry: f32,
    /// Silence imposed on the channel at release; channel default when None
    pub min_silence: Option<f32>,
    pub skip_animation: bool,
    pub skip_sound: bool,
    pub listener: Option<ListenerId>,
    /// Exact variation to play, chosen with the match policy
    pub variation: Option<usize>,
}

impl Request {
    pub fn new(actor: ActorId, config: ConfigId, comm: CommId, channel: ChannelId) -> Self {
        Self {
            actor,
            config,
            comm,
            channel,
            target: None,
            ordering: QueueOrdering::default(),
            expiry: 0.0,
            min_silence: None,
            skip_animation: false,
            skip_sound: false,
            listener: None,
            variation: None,
        }
    }

    /// Build a request from config, communication and channel names
    pub fn named(actor: ActorId, config: &str, comm: &str, channel: &str) -> Self {
        Self::new(
            actor,
            ConfigId::from_name(config),
            CommId::from_name(comm),
            ChannelId::from_name(channel),
        )
    }

    pub fn with_target(mut self, target: ActorId) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_ordering(mut self, ordering: QueueOrdering) -> Self {
        self.ordering = ordering;
        self
    }

    pub fn with_expiry(mut self, expiry: f32) -> Self {
        self.expiry = expiry;
        self
    }

    pub fn with_min_silence(mut self, min_silence: f32) -> Self {
        self.min_silence = Some(min_silence);
        self
    }

    pub fn with_listener(mut self, listener: ListenerId) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn with_variation(mut self, variation: usize) -> Self {
        self.variation = Some(variation);
        self
    }

    pub fn skipping_animation(mut self) -> Self {
        self.skip_animation = true;
        self
    }

    pub fn skipping_sound(mut self) -> Self {
        self.skip_sound = true;
        self
    }
}

/// A request waiting for its channel
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedRequest {
    pub play_id: PlayId,
    pub request: Request,
    /// Seconds spent in the queue
    pub age: f32,
}
