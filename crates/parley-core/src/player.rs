//! Playback session tracker
//!
//! Tracks the sub-components of every playing session. A session starts
//! with the components its variation does not require already marked done,
//! and finishes once every required component is done, whether through
//! backend events, its timeout, or a forced close.

use crate::backend::{BackendEvent, Media, PlaybackBackend};
use crate::communication::{AnimationMethod, BlockFlags, CommunicationDef, Components};
use crate::identity::{ActorId, CommId, PlayId};
use crate::request::Request;
use indexmap::IndexMap;

/// Final state of a session handed back to the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinishedSession {
    pub play_id: PlayId,
    pub actor: ActorId,
    pub comm: CommId,
    /// [`Components::ALL`] for a clean finish
    pub done: Components,
}

#[derive(Debug, Clone)]
struct Session {
    actor: ActorId,
    comm: CommId,
    target: Option<ActorId>,
    required: Components,
    done: Components,
    animation: Option<(String, AnimationMethod)>,
    /// Components the backend actually started
    started: Components,
    /// Components the backend reported as ended
    reported: Components,
    look_at_target: bool,
    blocking: BlockFlags,
    timeout: f32,
}

impl Session {
    fn is_complete(&self) -> bool {
        self.done.contains(self.required)
    }
}

/// Owner of all playing sessions
#[derive(Debug, Default)]
pub struct SessionTracker {
    sessions: IndexMap<PlayId, Session>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session for one variation of a communication
    ///
    /// Returns false if the variation does not exist. Backend start
    /// failures are not fatal: the failed component is marked done.
    pub fn open<B: PlaybackBackend>(
        &mut self,
        play_id: PlayId,
        request: &Request,
        comm: &CommunicationDef,
        variation: usize,
        backend: &mut B,
    ) -> bool {
        let Some(v) = comm.variations.get(variation) else {
            return false;
        };
        let actor = request.actor;

        let mut done = Components::ALL;
        done.remove(v.finish);

        let mut started = Components::NONE;
        match v.sound_name.as_deref().filter(|_| !request.skip_sound) {
            Some(name) if !name.is_empty() => {
                if backend.start_sound(actor, play_id, name) {
                    started.insert(Components::SOUND);
                } else {
                    tracing::warn!(%play_id, %actor, sound = name, "sound failed to start");
                    done.insert(Components::SOUND);
                }
            }
            _ => done.insert(Components::SOUND),
        }

        match v.voice_name.as_deref().filter(|_| !request.skip_sound) {
            Some(name) if !name.is_empty() => {
                if backend.start_voice(actor, play_id, name) {
                    started.insert(Components::VOICE);
                } else {
                    tracing::warn!(%play_id, %actor, voice = name, "voice failed to start");
                    done.insert(Components::VOICE);
                }
            }
            _ => done.insert(Components::VOICE),
        }

        let mut animation = None;
        match v.animation_name.as_deref().filter(|_| !request.skip_animation) {
            Some(name) if !name.is_empty() => {
                if backend.start_animation(actor, play_id, name, v.animation_method) {
                    started.insert(Components::ANIMATION);
                    animation = Some((name.to_string(), v.animation_method));
                } else {
                    tracing::warn!(%play_id, %actor, animation = name, "animation failed to start");
                    done.insert(Components::ANIMATION);
                }
            }
            _ => done.insert(Components::ANIMATION),
        }

        if v.timeout <= 0.0 {
            done.insert(Components::TIMEOUT);
        }

        if !v.blocking.is_empty() {
            backend.set_blocking(actor, v.blocking, true);
        }
        if v.look_at_target {
            backend.update_look_target(actor, request.target);
        }

        self.sessions.insert(
            play_id,
            Session {
                actor,
                comm: comm.id,
                target: request.target,
                required: v.finish,
                done,
                animation,
                started,
                reported: Components::NONE,
                look_at_target: v.look_at_target,
                blocking: v.blocking,
                timeout: v.timeout.max(0.0),
            },
        );
        true
    }

    /// Apply a backend report; returns the session if it just finished
    ///
    /// Events for unknown sessions are ignored.
    pub fn on_backend_event<B: PlaybackBackend>(
        &mut self,
        event: BackendEvent,
        backend: &mut B,
    ) -> Option<FinishedSession> {
        if !event.is_terminal() {
            return None;
        }
        let session = self.sessions.get_mut(&event.play_id)?;
        let component = match event.media {
            Media::Animation => Components::ANIMATION,
            Media::Sound => Components::SOUND,
            Media::Voice => Components::VOICE,
        };
        session.done.insert(component);
        session.reported.insert(component);

        if session.is_complete() {
            self.finish(event.play_id, backend)
        } else {
            None
        }
    }

    /// Advance timeouts and look-at; returns the sessions that finished
    pub fn tick<B: PlaybackBackend>(&mut self, dt: f32, backend: &mut B) -> Vec<FinishedSession> {
        let mut complete = Vec::new();

        for (play_id, session) in &mut self.sessions {
            if session.look_at_target {
                backend.update_look_target(session.actor, session.target);
            }

            if !session.done.contains(Components::TIMEOUT) {
                session.timeout -= dt;
                if session.timeout <= 0.0 {
                    session.timeout = 0.0;
                    session.done.insert(Components::TIMEOUT);
                }
            }

            if session.is_complete() {
                complete.push(*play_id);
            }
        }

        complete
            .into_iter()
            .filter_map(|play_id| self.finish(play_id, backend))
            .collect()
    }

    /// Force a session to end
    pub fn close<B: PlaybackBackend>(
        &mut self,
        play_id: PlayId,
        backend: &mut B,
    ) -> Option<FinishedSession> {
        let session = self.sessions.get(&play_id)?;
        let audio_pending = session.started.intersects(Components::SOUND | Components::VOICE)
            && !session.reported.contains(session.started & (Components::SOUND | Components::VOICE));
        if audio_pending {
            backend.stop_audio(session.actor, play_id);
        }
        self.finish(play_id, backend)
    }

    fn finish<B: PlaybackBackend>(
        &mut self,
        play_id: PlayId,
        backend: &mut B,
    ) -> Option<FinishedSession> {
        let mut session = self.sessions.shift_remove(&play_id)?;

        // Action animations loop until stopped
        if let Some((name, AnimationMethod::Action)) = &session.animation {
            if !session.reported.contains(Components::ANIMATION) {
                backend.stop_animation(session.actor, name, AnimationMethod::Action);
                session.done.insert(Components::ANIMATION);
            }
        }

        if !session.blocking.is_empty() {
            backend.set_blocking(session.actor, session.blocking, false);
        }

        tracing::debug!(%play_id, actor = %session.actor, done = session.done.bits(), "session finished");
        Some(FinishedSession {
            play_id,
            actor: session.actor,
            comm: session.comm,
            done: session.done,
        })
    }

    pub fn is_playing(&self, play_id: PlayId) -> bool {
        self.sessions.contains_key(&play_id)
    }

    /// Remaining timeout of a playing session
    pub fn remaining_time(&self, play_id: PlayId) -> Option<f32> {
        self.sessions.get(&play_id).map(|s| s.timeout)
    }

    pub fn comm_id(&self, play_id: PlayId) -> Option<CommId> {
        self.sessions.get(&play_id).map(|s| s.comm)
    }

    /// Components still pending for a playing session
    pub fn pending(&self, play_id: PlayId) -> Option<Components> {
        self.sessions.get(&play_id).map(|s| {
            let mut pending = s.required;
            pending.remove(s.done);
            pending
        })
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop every session without callbacks
    pub fn reset(&mut self) {
        self.sessions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendCall, BackendEventKind, RecordingBackend};
    use crate::communication::Variation;

    fn request() -> Request {
        Request::named(ActorId::new(1), "Soldier", "Alert", "Idle")
    }

    fn comm(variation: Variation) -> CommunicationDef {
        CommunicationDef::new("Alert").with_variation(variation)
    }

    #[test]
    fn test_voice_finish() {
        let mut tracker = SessionTracker::new();
        let mut backend = RecordingBackend::new();
        let comm = comm(Variation::default().with_voice("alert_01"));

        assert!(tracker.open(PlayId(1), &request(), &comm, 0, &mut backend));
        assert_eq!(tracker.pending(PlayId(1)), Some(Components::VOICE));
        assert!(tracker.tick(0.1, &mut backend).is_empty());

        let finished = tracker
            .on_backend_event(BackendEvent::finished(PlayId(1), Media::Voice), &mut backend)
            .unwrap();
        assert_eq!(finished.done, Components::ALL);
        assert!(!tracker.is_playing(PlayId(1)));

        // Late events are ignored
        assert!(tracker
            .on_backend_event(BackendEvent::finished(PlayId(1), Media::Voice), &mut backend)
            .is_none());
    }

    #[test]
    fn test_start_failure_marks_done() {
        let mut tracker = SessionTracker::new();
        let mut backend = RecordingBackend::new().fail("broken");
        let comm = comm(Variation::default().with_voice("broken").with_animation("wave"));

        tracker.open(PlayId(2), &request(), &comm, 0, &mut backend);
        assert_eq!(tracker.pending(PlayId(2)), Some(Components::ANIMATION));

        let started = BackendEvent::new(PlayId(2), Media::Animation, BackendEventKind::Started);
        assert!(tracker.on_backend_event(started, &mut backend).is_none());
        let failed = BackendEvent::new(PlayId(2), Media::Animation, BackendEventKind::Failed);
        assert!(tracker.on_backend_event(failed, &mut backend).is_some());
    }

    #[test]
    fn test_timeout_finish() {
        let mut tracker = SessionTracker::new();
        let mut backend = RecordingBackend::new();
        let comm = comm(
            Variation::default()
                .with_voice("alert_01")
                .with_timeout(1.0)
                .with_finish(Components::TIMEOUT),
        );

        tracker.open(PlayId(3), &request(), &comm, 0, &mut backend);
        assert!(tracker.tick(0.6, &mut backend).is_empty());
        assert!((tracker.remaining_time(PlayId(3)).unwrap() - 0.4).abs() < 1e-5);

        let finished = tracker.tick(0.6, &mut backend);
        assert_eq!(finished.len(), 1);
        // The voice was not required, so the finish is clean
        assert!(finished[0].done.is_all());
    }

    #[test]
    fn test_action_animation_stopped_on_finish() {
        let mut tracker = SessionTracker::new();
        let mut backend = RecordingBackend::new();
        let comm = comm(
            Variation::default()
                .with_animation("salute")
                .with_animation_method(AnimationMethod::Action)
                .with_blocking(BlockFlags::MOVEMENT)
                .with_timeout(0.5)
                .with_finish(Components::TIMEOUT),
        );

        tracker.open(PlayId(4), &request(), &comm, 0, &mut backend);
        assert_eq!(backend.blocked.get(&ActorId::new(1)), Some(&BlockFlags::MOVEMENT));

        let finished = tracker.tick(1.0, &mut backend);
        assert!(finished[0].done.is_all());
        assert!(backend.calls.contains(&BackendCall::StopAnimation {
            actor: ActorId::new(1),
            name: "salute".to_string(),
        }));
        assert!(backend.blocked.is_empty());
    }

    #[test]
    fn test_forced_close_leaves_signal_animation_pending() {
        let mut tracker = SessionTracker::new();
        let mut backend = RecordingBackend::new();
        let comm = comm(Variation::default().with_animation("wave").with_voice("hey"));

        tracker.open(PlayId(5), &request(), &comm, 0, &mut backend);
        let finished = tracker.close(PlayId(5), &mut backend).unwrap();
        assert!(!finished.done.contains(Components::ANIMATION));
        assert!(!finished.done.is_all());
        assert_eq!(
            backend.count(|c| matches!(c, BackendCall::StopAudio { .. })),
            1
        );
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_skip_flags() {
        let mut tracker = SessionTracker::new();
        let mut backend = RecordingBackend::new();
        let comm = comm(Variation::default().with_animation("wave").with_voice("hey"));

        let request = request().skipping_sound();
        tracker.open(PlayId(6), &request, &comm, 0, &mut backend);
        assert_eq!(backend.started(), vec!["wave"]);
        assert_eq!(tracker.pending(PlayId(6)), Some(Components::ANIMATION));
        assert!(!tracker.open(PlayId(7), &request, &comm, 3, &mut backend));
    }
}
