//! Per-actor voice and animation restrictions
//!
//! Each actor has an explicit reference-counted restriction and a timed one,
//! tracked separately for voice and animation. Either kind blocks.

use crate::identity::ActorId;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct ActorRestriction {
    voice_count: u32,
    animation_count: u32,
    voice_time: f32,
    animation_time: f32,
}

impl ActorRestriction {
    fn is_voice_restricted(&self) -> bool {
        self.voice_count > 0 || self.voice_time > 0.0
    }

    fn is_animation_restricted(&self) -> bool {
        self.animation_count > 0 || self.animation_time > 0.0
    }
}

/// Restriction records for every restricted actor
#[derive(Debug, Clone, Default)]
pub struct ActorRestrictions {
    actors: HashMap<ActorId, ActorRestriction>,
}

impl ActorRestrictions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start timed restrictions; non-positive durations leave that kind alone
    pub fn set_restricted_duration(&mut self, actor: ActorId, voice: f32, animation: f32) {
        let record = self.actors.entry(actor).or_default();
        if voice > 0.0 {
            record.voice_time = voice;
        }
        if animation > 0.0 {
            record.animation_time = animation;
        }
    }

    /// Add one explicit restriction reference
    pub fn add_restriction(&mut self, actor: ActorId, voice: bool, animation: bool) {
        let record = self.actors.entry(actor).or_default();
        if voice {
            record.voice_count += 1;
        }
        if animation {
            record.animation_count += 1;
        }
    }

    /// Drop one explicit restriction reference
    pub fn remove_restriction(&mut self, actor: ActorId, voice: bool, animation: bool) {
        if let Some(record) = self.actors.get_mut(&actor) {
            if voice {
                record.voice_count = record.voice_count.saturating_sub(1);
            }
            if animation {
                record.animation_count = record.animation_count.saturating_sub(1);
            }
        }
    }

    pub fn is_voice_restricted(&self, actor: ActorId) -> bool {
        self.actors
            .get(&actor)
            .is_some_and(ActorRestriction::is_voice_restricted)
    }

    pub fn is_animation_restricted(&self, actor: ActorId) -> bool {
        self.actors
            .get(&actor)
            .is_some_and(ActorRestriction::is_animation_restricted)
    }

    /// Count timed restrictions down and forget unrestricted actors
    pub fn update(&mut self, dt: f32) {
        self.actors.retain(|_, record| {
            record.voice_time = (record.voice_time - dt).max(0.0);
            record.animation_time = (record.animation_time - dt).max(0.0);
            record.is_voice_restricted() || record.is_animation_restricted()
        });
    }

    pub fn clear(&mut self) {
        self.actors.clear();
    }
}
