//! The playback backend seam
//!
//! The scheduler never renders anything itself. It asks a
//! [`PlaybackBackend`] to start and stop sounds, voices and animations, and
//! the host feeds completion back as [`BackendEvent`]s through
//! [`Scheduler::on_backend_event`](crate::Scheduler::on_backend_event).

use crate::communication::{AnimationMethod, BlockFlags};
use crate::config::AudioRouting;
use crate::identity::{ActorId, PlayId};
use std::collections::{HashMap, HashSet};

/// Which sub-component an event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Media {
    Animation,
    Sound,
    Voice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendEventKind {
    Started,
    Finished,
    Failed,
    Cancelled,
}

/// A progress report for one sub-component of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendEvent {
    pub play_id: PlayId,
    pub media: Media,
    pub kind: BackendEventKind,
}

impl BackendEvent {
    pub fn new(play_id: PlayId, media: Media, kind: BackendEventKind) -> Self {
        Self { play_id, media, kind }
    }

    pub fn finished(play_id: PlayId, media: Media) -> Self {
        Self::new(play_id, media, BackendEventKind::Finished)
    }

    /// Check if the event ends its sub-component
    pub fn is_terminal(&self) -> bool {
        !matches!(self.kind, BackendEventKind::Started)
    }
}

/// Per-actor readability settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Readability {
    pub ignore_animations: bool,
    pub ignore_voice: bool,
}

/// Rendering side of the engine, implemented by the host
pub trait PlaybackBackend {
    /// Start a sound effect; false if it could not start
    fn start_sound(&mut self, actor: ActorId, play_id: PlayId, name: &str) -> bool;

    /// Start a voice line; false if it could not start
    fn start_voice(&mut self, actor: ActorId, play_id: PlayId, name: &str) -> bool;

    fn start_animation(
        &mut self,
        actor: ActorId,
        play_id: PlayId,
        name: &str,
        method: AnimationMethod,
    ) -> bool;

    fn stop_animation(&mut self, actor: ActorId, name: &str, method: AnimationMethod);

    /// Stop any sound or voice still running for a session
    fn stop_audio(&mut self, _actor: ActorId, _play_id: PlayId) {}

    /// Check if the actor's animation state still shows this animation
    fn is_in_animation_state(&self, actor: ActorId, name: &str) -> bool;

    fn reset_animation_state(&mut self, actor: ActorId);

    /// Check if the actor is mid-transition on a contextual action
    fn is_playing_smart_object_action(&self, _actor: ActorId) -> bool {
        false
    }

    fn set_blocking(&mut self, _actor: ActorId, _flags: BlockFlags, _blocked: bool) {}

    fn update_look_target(&mut self, _actor: ActorId, _target: Option<ActorId>) {}

    /// Vertical offset of the target relative to the actor, if known
    fn target_height_offset(&self, _actor: ActorId, _target: Option<ActorId>) -> Option<f32> {
        None
    }

    fn readability(&self, _actor: ActorId) -> Readability {
        Readability::default()
    }

    fn configure_audio(&mut self, _routing: &AudioRouting) {}
}

/// A call made on a [`RecordingBackend`]
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    StartSound { actor: ActorId, play_id: PlayId, name: String },
    StartVoice { actor: ActorId, play_id: PlayId, name: String },
    StartAnimation { actor: ActorId, play_id: PlayId, name: String, method: AnimationMethod },
    StopAnimation { actor: ActorId, name: String },
    StopAudio { actor: ActorId, play_id: PlayId },
    ResetAnimationState { actor: ActorId },
    LookAt { actor: ActorId, target: Option<ActorId> },
}

/// Headless backend that records every call
///
/// Starts succeed unless the name is listed in `failing`. Started
/// animations stay in the actor's animation state until stopped or reset.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub calls: Vec<BackendCall>,
    pub failing: HashSet<String>,
    pub smart_object_actors: HashSet<ActorId>,
    pub animation_states: HashSet<(ActorId, String)>,
    pub height_offsets: HashMap<ActorId, f32>,
    pub readability: HashMap<ActorId, Readability>,
    pub blocked: HashMap<ActorId, BlockFlags>,
    pub routing: Option<AudioRouting>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every start of this name fail
    pub fn fail(mut self, name: impl Into<String>) -> Self {
        self.failing.insert(name.into());
        self
    }

    /// Names of everything started, in order
    pub fn started(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::StartSound { name, .. }
                | BackendCall::StartVoice { name, .. }
                | BackendCall::StartAnimation { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&BackendCall) -> bool) -> usize {
        self.calls.iter().filter(|call| pred(call)).count()
    }
}

impl PlaybackBackend for RecordingBackend {
    fn start_sound(&mut self, actor: ActorId, play_id: PlayId, name: &str) -> bool {
        self.calls.push(BackendCall::StartSound {
            actor,
            play_id,
            name: name.to_string(),
        });
        !self.failing.contains(name)
    }

    fn start_voice(&mut self, actor: ActorId, play_id: PlayId, name: &str) -> bool {
        self.calls.push(BackendCall::StartVoice {
            actor,
            play_id,
            name: name.to_string(),
        });
        !self.failing.contains(name)
    }

    fn start_animation(
        &mut self,
        actor: ActorId,
        play_id: PlayId,
        name: &str,
        method: AnimationMethod,
    ) -> bool {
        self.calls.push(BackendCall::StartAnimation {
            actor,
            play_id,
            name: name.to_string(),
            method,
        });
        if self.failing.contains(name) {
            return false;
        }
        self.animation_states.insert((actor, name.to_string()));
        true
    }

    fn stop_animation(&mut self, actor: ActorId, name: &str, _method: AnimationMethod) {
        self.calls.push(BackendCall::StopAnimation {
            actor,
            name: name.to_string(),
        });
        self.animation_states.remove(&(actor, name.to_string()));
    }

    fn stop_audio(&mut self, actor: ActorId, play_id: PlayId) {
        self.calls.push(BackendCall::StopAudio { actor, play_id });
    }

    fn is_in_animation_state(&self, actor: ActorId, name: &str) -> bool {
        self.animation_states.contains(&(actor, name.to_string()))
    }

    fn reset_animation_state(&mut self, actor: ActorId) {
        self.calls.push(BackendCall::ResetAnimationState { actor });
        self.animation_states.retain(|(a, _)| *a != actor);
    }

    fn is_playing_smart_object_action(&self, actor: ActorId) -> bool {
        self.smart_object_actors.contains(&actor)
    }

    fn set_blocking(&mut self, actor: ActorId, flags: BlockFlags, blocked: bool) {
        if blocked {
            self.blocked.insert(actor, flags);
        } else {
            self.blocked.remove(&actor);
        }
    }

    fn update_look_target(&mut self, actor: ActorId, target: Option<ActorId>) {
        self.calls.push(BackendCall::LookAt { actor, target });
    }

    fn target_height_offset(&self, actor: ActorId, _target: Option<ActorId>) -> Option<f32> {
        self.height_offsets.get(&actor).copied()
    }

    fn readability(&self, actor: ActorId) -> Readability {
        self.readability.get(&actor).copied().unwrap_or_default()
    }

    fn configure_audio(&mut self, routing: &AudioRouting) {
        self.routing = Some(routing.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_backend() {
        let mut backend = RecordingBackend::new().fail("broken");
        let actor = ActorId::new(1);

        assert!(backend.start_voice(actor, PlayId(1), "hello"));
        assert!(!backend.start_sound(actor, PlayId(1), "broken"));
        assert!(backend.start_animation(actor, PlayId(1), "wave", AnimationMethod::Action));
        assert!(backend.is_in_animation_state(actor, "wave"));

        backend.reset_animation_state(actor);
        assert!(!backend.is_in_animation_state(actor, "wave"));
        assert_eq!(backend.started(), vec!["hello", "broken", "wave"]);
    }

    #[test]
    fn test_event_terminal() {
        let started = BackendEvent::new(PlayId(3), Media::Voice, BackendEventKind::Started);
        assert!(!started.is_terminal());
        assert!(BackendEvent::finished(PlayId(3), Media::Voice).is_terminal());
    }
}
