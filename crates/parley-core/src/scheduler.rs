//! The communication scheduler
//!
//! Accepts play and stop requests, arbitrates channels by priority, starts
//! playback through the [`SessionTracker`] or parks requests in the ordered
//! and unordered queues, and advances every timer once per [`update`].
//!
//! [`update`]: Scheduler::update

use crate::backend::{BackendEvent, PlaybackBackend, Readability};
use crate::channel::{ChannelHandle, ChannelKind};
use crate::communication::ChoiceMethod;
use crate::config::SchedulerConfig;
use crate::error::Error;
use crate::identity::{ActorId, ChannelId, CommId, ConfigId, PlayId};
use crate::library::{CommLibrary, Definitions};
use crate::notify::{CommEvent, CommEventKind, ListenerId, Listeners};
use crate::player::{FinishedSession, SessionTracker};
use crate::registry::ChannelRegistry;
use crate::request::{QueueOrdering, QueuedRequest, Request};
use crate::restriction::ActorRestrictions;
use crate::rng::SelectionRng;
use crate::selector;
use crate::stats::Statistics;
use crate::test_driver::{TestDriver, TestReport};
use crate::variables::{VariableDeclarations, Variables, TARGET_IS_ABOVE, TARGET_IS_BELOW};
use indexmap::IndexMap;
use std::collections::{HashMap, VecDeque};

/// Scheduler-side record of a playing (or unfinalized) session
#[derive(Debug, Clone)]
struct PlayingSession {
    actor: ActorId,
    config: ConfigId,
    comm: CommId,
    channel: ChannelHandle,
    listener: Option<ListenerId>,
    /// Animation the session started, if any
    animation: Option<String>,
    /// Nothing was occupied, so nothing is released
    skip_sound: bool,
    min_silence: Option<f32>,
    start_time: f32,
}

/// Channel arbitration and playback orchestration
pub struct Scheduler<B: PlaybackBackend> {
    config: SchedulerConfig,
    backend: B,
    channels: ChannelRegistry,
    library: CommLibrary,
    declarations: VariableDeclarations,
    variables: Variables,
    tracker: SessionTracker,
    playing: IndexMap<PlayId, PlayingSession>,
    /// Stopped sessions whose animation may still be running
    unfinalized: Vec<PlayingSession>,
    ordered: VecDeque<QueuedRequest>,
    unordered: VecDeque<QueuedRequest>,
    restrictions: ActorRestrictions,
    readability: HashMap<ActorId, Readability>,
    listeners: Listeners,
    stats: Statistics,
    rng: SelectionRng,
    test_driver: TestDriver,
    last_play_id: PlayId,
    /// Seconds of simulated time
    now: f32,
}

impl<B: PlaybackBackend> Scheduler<B> {
    /// Create a scheduler with no definitions
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, SchedulerConfig::default())
    }

    pub fn with_config(backend: B, config: SchedulerConfig) -> Self {
        let declarations = VariableDeclarations::new();
        Self {
            rng: SelectionRng::new(config.rng_seed),
            config,
            backend,
            channels: ChannelRegistry::new(),
            library: CommLibrary::new(),
            variables: declarations.defaults(),
            declarations,
            tracker: SessionTracker::new(),
            playing: IndexMap::new(),
            unfinalized: Vec::new(),
            ordered: VecDeque::new(),
            unordered: VecDeque::new(),
            restrictions: ActorRestrictions::new(),
            readability: HashMap::new(),
            listeners: Listeners::new(),
            stats: Statistics::default(),
            test_driver: TestDriver::default(),
            last_play_id: PlayId::NONE,
            now: 0.0,
        }
    }

    /// Create a scheduler and load definitions into it
    pub fn with_definitions(backend: B, defs: Definitions) -> (Self, Vec<Error>) {
        let mut scheduler = Self::new(backend);
        let errors = scheduler.reload(defs);
        (scheduler, errors)
    }

    /// Replace every definition
    ///
    /// Runtime state is reset first. Bad channel entries are skipped and
    /// returned.
    pub fn reload(&mut self, defs: Definitions) -> Vec<Error> {
        self.reset();
        self.channels.clear();

        let errors = self.channels.load_channels(&defs.channels);
        for err in &errors {
            tracing::warn!(error = %err, "skipping channel definition");
        }

        self.library = defs.library;
        self.declarations = defs.variables;
        self.variables = self.declarations.defaults();

        if let Some(audio) = &defs.audio {
            self.backend.configure_audio(audio);
        }

        tracing::debug!(
            channels = self.channels.definition_count(),
            configs = self.library.config_count(),
            "definitions loaded"
        );
        errors
    }

    /// Drop all runtime state, keeping definitions and statistics
    pub fn reset(&mut self) {
        for listener in self.test_driver.reset() {
            self.listeners.remove(listener);
        }

        self.channels.reset();
        self.tracker.reset();
        self.library.reset_history();

        self.playing.clear();
        self.unfinalized.clear();
        self.ordered.clear();
        self.unordered.clear();

        self.restrictions.clear();
        self.readability.clear();
        self.variables = self.declarations.defaults();
    }

    /// Check if the request's channel resolves and is free
    pub fn can_play(&mut self, request: &Request) -> bool {
        self.channels
            .resolve(request.channel, request.actor)
            .is_some_and(|channel| self.channels.is_free(channel))
    }

    /// Seconds until the request could play: zero when free, `f32::MAX`
    /// when unknown
    pub fn estimated_wait(&mut self, request: &Request) -> f32 {
        if self.can_play(request) {
            0.0
        } else {
            f32::MAX
        }
    }

    /// Submit a play request
    ///
    /// Returns [`PlayId::NONE`] when the request is rejected outright. An
    /// accepted request either starts now or waits in a queue.
    pub fn play(&mut self, mut request: Request) -> PlayId {
        let actor = request.actor;

        let Some(comm) = self.library.communication(request.config, request.comm) else {
            tracing::debug!(%actor, comm = %request.comm, "unknown communication");
            return PlayId::NONE;
        };
        let has_animation = comm.has_animation();
        let force_allowed = comm.force_animation;

        if has_animation && self.backend.is_playing_smart_object_action(actor) {
            tracing::debug!(%actor, "actor busy with a contextual action");
            return PlayId::NONE;
        }

        let Some(channel) = self.channels.resolve(request.channel, actor) else {
            tracing::debug!(%actor, channel = %request.channel, "unknown channel");
            return PlayId::NONE;
        };

        self.last_play_id = self.last_play_id.successor();
        let play_id = self.last_play_id;

        if self.config.record_statistics {
            self.stats.record_request(request.config, request.comm);
        }

        self.flush_sessions(actor, channel);

        let readability = self.readability_of(actor);
        let ignores_silence = self.channels.channel(channel).ignores_actor_silence();
        if !has_animation
            || readability.ignore_animations
            || self.restrictions.is_animation_restricted(actor)
        {
            request.skip_animation = true;
        }
        if (readability.ignore_voice || self.restrictions.is_voice_restricted(actor))
            && !ignores_silence
        {
            request.skip_sound = true;
        }
        if request.skip_animation && request.skip_sound {
            tracing::debug!(%play_id, %actor, "nothing left to play");
            return PlayId::NONE;
        }

        let force = force_allowed && !request.skip_animation && !self.is_animating(actor);
        let free = self.channels.is_free(channel);

        self.flush_queues(actor, channel);

        if force || free {
            if !free {
                request.skip_sound = true;
            }
            self.start(play_id, request, channel);
        } else {
            self.enqueue(play_id, request);
        }

        play_id
    }

    /// Stop a playing or queued request
    pub fn stop(&mut self, play_id: PlayId) {
        if self.tracker.is_playing(play_id) {
            if let Some(playing) = self.playing.get(&play_id) {
                tracing::debug!(%play_id, actor = %playing.actor, "stopping");
                self.listeners.notify(
                    CommEventKind::Cancelled,
                    playing.actor,
                    playing.comm,
                    play_id,
                    playing.listener,
                );
            }
            if let Some(finished) = self.tracker.close(play_id, &mut self.backend) {
                self.on_session_finished(finished);
            }
            return;
        }

        for queue in [&mut self.ordered, &mut self.unordered] {
            if let Some(pos) = queue.iter().position(|q| q.play_id == play_id) {
                if let Some(queued) = queue.remove(pos) {
                    self.listeners.notify(
                        CommEventKind::Cancelled,
                        queued.request.actor,
                        queued.request.comm,
                        play_id,
                        queued.request.listener,
                    );
                }
                return;
            }
        }
    }

    /// Feed a backend progress report into the session tracker
    pub fn on_backend_event(&mut self, event: BackendEvent) {
        if let Some(finished) = self.tracker.on_backend_event(event, &mut self.backend) {
            self.on_session_finished(finished);
        }
    }

    /// Advance the scheduler by one tick
    pub fn update(&mut self, dt: f32) {
        self.now += dt;

        self.channels.update(dt);
        for finished in self.tracker.tick(dt, &mut self.backend) {
            self.on_session_finished(finished);
        }

        let mut driver = std::mem::take(&mut self.test_driver);
        driver.update(self);
        self.test_driver = driver;

        self.restrictions.update(dt);

        for queue in [&mut self.ordered, &mut self.unordered] {
            age_queue(queue, dt, &mut self.listeners);
        }

        self.process_queue(QueueOrdering::Ordered);
        self.process_queue(QueueOrdering::Unordered);

        self.cull_stuck_session();
    }

    pub fn is_playing(&self, play_id: PlayId) -> bool {
        self.tracker.is_playing(play_id)
    }

    /// Remaining timeout of a playing session
    pub fn remaining_time(&self, play_id: PlayId) -> Option<f32> {
        self.tracker.remaining_time(play_id)
    }

    pub fn is_queued(&self, play_id: PlayId) -> bool {
        self.ordered
            .iter()
            .chain(self.unordered.iter())
            .any(|q| q.play_id == play_id)
    }

    /// Detach the per-session listener of a playing or queued request
    pub fn remove_instance_listener(&mut self, play_id: PlayId) {
        if let Some(playing) = self.playing.get_mut(&play_id) {
            playing.listener = None;
        }
        for queued in self.ordered.iter_mut().chain(self.unordered.iter_mut()) {
            if queued.play_id == play_id {
                queued.request.listener = None;
            }
        }
    }

    // Listeners

    pub fn create_listener(&mut self) -> ListenerId {
        self.listeners.create()
    }

    /// Subscribe a listener to every session's events
    pub fn register_listener(&mut self, listener: ListenerId) -> bool {
        self.listeners.register_global(listener)
    }

    pub fn unregister_listener(&mut self, listener: ListenerId) {
        self.listeners.unregister_global(listener);
    }

    pub fn remove_listener(&mut self, listener: ListenerId) {
        self.listeners.remove(listener);
    }

    pub fn take_events(&mut self, listener: ListenerId) -> Vec<CommEvent> {
        self.listeners.take_events(listener)
    }

    // Actor restrictions

    pub fn set_restricted_duration(&mut self, actor: ActorId, voice: f32, animation: f32) {
        self.restrictions.set_restricted_duration(actor, voice, animation);
    }

    pub fn add_actor_restriction(&mut self, actor: ActorId, voice: bool, animation: bool) {
        self.restrictions.add_restriction(actor, voice, animation);
    }

    pub fn remove_actor_restriction(&mut self, actor: ActorId, voice: bool, animation: bool) {
        self.restrictions.remove_restriction(actor, voice, animation);
    }

    pub fn is_voice_restricted(&self, actor: ActorId) -> bool {
        self.restrictions.is_voice_restricted(actor)
    }

    pub fn is_animation_restricted(&self, actor: ActorId) -> bool {
        self.restrictions.is_animation_restricted(actor)
    }

    // Variables

    /// Set a condition variable
    pub fn set_variable(&mut self, name: &str, value: bool) {
        if self.declarations.id_of(name).is_none() {
            tracing::warn!(variable = name, "setting undeclared variable");
        }
        self.variables.set_named(name, value);
    }

    pub fn variable(&self, name: &str) -> bool {
        self.declarations
            .id_of(name)
            .is_some_and(|id| self.variables.get(id))
    }

    pub fn variable_names(&self) -> Vec<&str> {
        self.declarations.names().collect()
    }

    // Lookups

    pub fn channel_id(&self, name: &str) -> Option<ChannelId> {
        self.channels.channel_id(name)
    }

    pub fn config_id(&self, name: &str) -> Option<ConfigId> {
        self.library.config_id(name)
    }

    /// Id of a communication defined in any config
    pub fn communication_id(&self, name: &str) -> Option<CommId> {
        let id = CommId::from_name(name);
        self.library.communication_name(id).map(|_| id)
    }

    pub fn communication_name(&self, comm: CommId) -> Option<&str> {
        self.library.communication_name(comm)
    }

    pub fn config_count(&self) -> usize {
        self.library.config_count()
    }

    pub fn config_name(&self, index: usize) -> Option<&str> {
        self.library.config_at(index).map(|c| c.name.as_str())
    }

    pub fn config_id_at(&self, index: usize) -> Option<ConfigId> {
        self.library.config_at(index).map(|c| c.id)
    }

    pub fn communication_count(&self, config: ConfigId) -> usize {
        self.library.config(config).map_or(0, |c| c.len())
    }

    pub fn communication_name_at(&self, config: ConfigId, index: usize) -> Option<&str> {
        self.library
            .config(config)?
            .get_index(index)
            .map(|c| c.name.as_str())
    }

    /// Priority of the channel a session plays on; 0 when not playing
    pub fn priority_of(&self, play_id: PlayId) -> i32 {
        self.playing
            .get(&play_id)
            .map_or(0, |p| self.channels.channel(p.channel).priority())
    }

    /// Communication of a playing session
    pub fn playing_communication(&self, play_id: PlayId) -> Option<CommId> {
        self.tracker.comm_id(play_id)
    }

    pub fn library(&self) -> &CommLibrary {
        &self.library
    }

    pub fn channels(&self) -> &ChannelRegistry {
        &self.channels
    }

    /// Resolve a channel instance, creating it if needed
    pub fn resolve_channel(&mut self, channel: ChannelId, actor: ActorId) -> Option<ChannelHandle> {
        self.channels.resolve(channel, actor)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn playing_count(&self) -> usize {
        self.playing.len()
    }

    pub fn unfinalized_count(&self) -> usize {
        self.unfinalized.len()
    }

    pub fn queued_count(&self) -> usize {
        self.ordered.len() + self.unordered.len()
    }

    // Statistics

    pub fn statistics(&self) -> &Statistics {
        &self.stats
    }

    pub fn clear_statistics(&mut self) {
        self.stats.clear();
    }

    // Test driver

    /// Start cycling through a config's communications on one actor
    ///
    /// With `comm` set only that communication's variations are played.
    /// Returns false for an unknown config or communication.
    pub fn start_test(
        &mut self,
        actor: ActorId,
        config: ConfigId,
        channel: ChannelId,
        comm: Option<CommId>,
    ) -> bool {
        let Some(lib_config) = self.library.config(config) else {
            return false;
        };
        if comm.is_some_and(|c| lib_config.get(c).is_none()) {
            return false;
        }
        let listener = self.listeners.create();
        if let Some(old) = self.test_driver.start(actor, config, channel, comm, listener) {
            self.listeners.remove(old);
        }
        true
    }

    /// Abort an actor's test run, stopping its current play
    pub fn stop_test(&mut self, actor: ActorId) {
        if let Some((current, listener)) = self.test_driver.stop(actor) {
            self.stop(current);
            self.listeners.remove(listener);
        }
    }

    pub fn is_testing(&self, actor: ActorId) -> bool {
        self.test_driver.is_running(actor)
    }

    pub fn test_report(&self, actor: ActorId) -> Option<TestReport> {
        self.test_driver.report(actor)
    }

    // Internals

    fn readability_of(&mut self, actor: ActorId) -> Readability {
        let backend = &self.backend;
        *self
            .readability
            .entry(actor)
            .or_insert_with(|| backend.readability(actor))
    }

    /// Check if the actor has a playing or lingering animation
    fn is_animating(&self, actor: ActorId) -> bool {
        self.playing
            .values()
            .chain(self.unfinalized.iter())
            .any(|p| p.actor == actor && p.animation.is_some())
    }

    /// A request on `channel` evicts entries of `other_actor` on lower
    /// priority channels: personal channels only the same actor's
    fn evicts(&self, channel: ChannelHandle, actor: ActorId, other_actor: ActorId) -> bool {
        self.channels.channel(channel).kind() != ChannelKind::Personal || actor == other_actor
    }

    fn reset_vacated_silence(&mut self, channel: ChannelHandle) {
        if !self.channels.is_occupied(channel) && !self.channels.is_free(channel) {
            self.channels.reset_silence(channel);
        }
    }

    /// Stop lower priority sessions and clear out the unfinalized set
    fn flush_sessions(&mut self, actor: ActorId, channel: ChannelHandle) {
        let priority = self.channels.channel(channel).priority();

        let evicted: Vec<PlayId> = self
            .playing
            .iter()
            .filter(|(_, p)| {
                self.channels.channel(p.channel).priority() < priority
                    && self.evicts(channel, actor, p.actor)
            })
            .map(|(id, _)| *id)
            .collect();

        for play_id in evicted {
            tracing::debug!(%play_id, "preempted");
            self.stop(play_id);
            self.reset_vacated_silence(channel);
        }

        let mut index = 0;
        while index < self.unfinalized.len() {
            let session = &self.unfinalized[index];
            let lower = self.channels.channel(session.channel).priority() < priority;

            if lower && self.evicts(channel, actor, session.actor) {
                let session = self.unfinalized.swap_remove(index);
                if session.animation.is_some() {
                    self.backend.reset_animation_state(session.actor);
                }
                self.reset_vacated_silence(channel);
                continue;
            }

            if !lower {
                if let Some(name) = &session.animation {
                    if !self.backend.is_in_animation_state(session.actor, name) {
                        self.unfinalized.swap_remove(index);
                        continue;
                    }
                }
            }

            index += 1;
        }
    }

    /// Cancel queued requests the same priority rule would evict
    fn flush_queues(&mut self, actor: ActorId, channel: ChannelHandle) {
        let priority = self.channels.channel(channel).priority();
        let personal = self.channels.channel(channel).kind() == ChannelKind::Personal;

        for ordering in [QueueOrdering::Ordered, QueueOrdering::Unordered] {
            let mut queue = std::mem::take(self.queue_mut(ordering));
            let channels = &mut self.channels;
            let listeners = &mut self.listeners;

            queue.retain(|queued| {
                let request = &queued.request;
                let lower = channels
                    .resolve(request.channel, request.actor)
                    .is_some_and(|h| channels.channel(h).priority() < priority);
                let flushed = lower && (!personal || request.actor == actor);
                if flushed {
                    tracing::debug!(play_id = %queued.play_id, "flushed from queue");
                    listeners.notify(
                        CommEventKind::Cancelled,
                        request.actor,
                        request.comm,
                        queued.play_id,
                        request.listener,
                    );
                }
                !flushed
            });

            *self.queue_mut(ordering) = queue;
        }
    }

    fn queue_mut(&mut self, ordering: QueueOrdering) -> &mut VecDeque<QueuedRequest> {
        match ordering {
            QueueOrdering::Ordered => &mut self.ordered,
            QueueOrdering::Unordered => &mut self.unordered,
        }
    }

    fn enqueue(&mut self, play_id: PlayId, request: Request) {
        tracing::debug!(%play_id, actor = %request.actor, comm = %request.comm, "queued");
        self.listeners.notify(
            CommEventKind::Queued,
            request.actor,
            request.comm,
            play_id,
            request.listener,
        );

        let ordering = request.ordering;
        self.queue_mut(ordering).push_back(QueuedRequest {
            play_id,
            request,
            age: 0.0,
        });

        let queued = self.queued_count();
        if queued > self.config.queue_soft_limit {
            tracing::warn!(queued, limit = self.config.queue_soft_limit, "queues growing");
        }
    }

    /// Play queued requests from the front while their channel is free
    fn process_queue(&mut self, ordering: QueueOrdering) {
        loop {
            let Some(front) = self.queue_mut(ordering).front() else {
                break;
            };
            let actor = front.request.actor;
            let channel_id = front.request.channel;

            let channel = self.channels.resolve(channel_id, actor);
            if channel.is_some_and(|h| !self.channels.is_free(h)) {
                break;
            }
            let Some(mut queued) = self.queue_mut(ordering).pop_front() else {
                break;
            };
            let Some(channel) = channel else {
                tracing::warn!(play_id = %queued.play_id, "dropping request for unknown channel");
                self.cancel_queued(queued);
                continue;
            };

            if self.restrictions.is_animation_restricted(actor) {
                queued.request.skip_animation = true;
            }
            if self.restrictions.is_voice_restricted(actor)
                && !self.channels.channel(channel).ignores_actor_silence()
            {
                queued.request.skip_sound = true;
            }

            if queued.request.skip_animation && queued.request.skip_sound {
                tracing::debug!(play_id = %queued.play_id, "dropping restricted request");
                self.cancel_queued(queued);
                continue;
            }
            self.start(queued.play_id, queued.request, channel);
        }
    }

    fn cancel_queued(&mut self, queued: QueuedRequest) {
        self.listeners.notify(
            CommEventKind::Cancelled,
            queued.request.actor,
            queued.request.comm,
            queued.play_id,
            queued.request.listener,
        );
    }

    /// Select a variation and open a session for it
    fn start(&mut self, play_id: PlayId, request: Request, channel: ChannelHandle) -> bool {
        self.update_internal_variables(&request);
        let started = self.start_session(play_id, request, channel);
        self.variables.set_named(TARGET_IS_ABOVE, false);
        self.variables.set_named(TARGET_IS_BELOW, false);
        started
    }

    fn start_session(&mut self, play_id: PlayId, mut request: Request, channel: ChannelHandle) -> bool {
        let actor = request.actor;
        let Some(comm) = self.library.communication_mut(request.config, request.comm) else {
            return false;
        };

        let (method, index) = match request.variation {
            Some(index) => (ChoiceMethod::Match, index),
            None => (comm.choice_method, 0),
        };
        let Some(variation) =
            selector::choose_with_fallback(comm, method, index, &self.variables, &mut self.rng)
        else {
            tracing::debug!(%play_id, %actor, comm = %comm.name, "no eligible variation");
            return false;
        };

        if !self.tracker.open(play_id, &request, comm, variation, &mut self.backend) {
            return false;
        }
        selector::update_history(comm, variation);

        let v = &comm.variations[variation];
        if !v.has_sound() && !v.has_voice() {
            request.skip_sound = true;
        }
        let animation = v
            .animation_name
            .clone()
            .filter(|name| !name.is_empty() && !request.skip_animation);
        tracing::debug!(%play_id, %actor, comm = %comm.name, variation, "playing");

        if self.config.record_statistics {
            self.stats.record_play(request.config, request.comm);
        }

        if !request.skip_sound {
            self.channels.occupy(channel);
            let actor_silence = self.channels.channel(channel).actor_min_silence();
            if actor_silence > 0.0 {
                self.restrictions.set_restricted_duration(actor, actor_silence, 0.0);
            }
        }

        self.playing.insert(
            play_id,
            PlayingSession {
                actor,
                config: request.config,
                comm: request.comm,
                channel,
                listener: request.listener,
                animation,
                skip_sound: request.skip_sound,
                min_silence: request.min_silence,
                start_time: self.now,
            },
        );

        self.listeners.notify(
            CommEventKind::Started,
            actor,
            request.comm,
            play_id,
            request.listener,
        );
        true
    }

    fn update_internal_variables(&mut self, request: &Request) {
        let threshold = self.config.target_height_threshold;
        let Some(offset) = self.backend.target_height_offset(request.actor, request.target) else {
            return;
        };
        if offset > threshold {
            self.variables.set_named(TARGET_IS_ABOVE, true);
        } else if offset < -threshold {
            self.variables.set_named(TARGET_IS_BELOW, true);
        }
    }

    fn on_session_finished(&mut self, finished: FinishedSession) {
        let Some(playing) = self.playing.shift_remove(&finished.play_id) else {
            tracing::debug!(play_id = %finished.play_id, "finish for unknown session");
            return;
        };

        if !playing.skip_sound {
            self.channels.release(playing.channel, playing.min_silence);
        }

        self.listeners.notify(
            CommEventKind::Finished,
            playing.actor,
            playing.comm,
            finished.play_id,
            playing.listener,
        );

        // Only a lingering animation keeps the session around
        if !finished.done.is_all() && playing.animation.is_some() {
            self.unfinalized.push(playing);
        }
    }

    /// Force-stop at most one session that has played past the watchdog
    fn cull_stuck_session(&mut self) {
        let watchdog = self.config.watchdog_secs;
        let stuck = self
            .playing
            .iter()
            .find(|(_, p)| self.now - p.start_time > watchdog)
            .map(|(id, p)| (*id, p.config, p.comm));

        if let Some((play_id, config, comm)) = stuck {
            tracing::warn!(%play_id, %config, %comm, "stopping stuck communication");
            self.stop(play_id);
        }
    }
}

/// Age a queue, dropping entries past their expiry
fn age_queue(queue: &mut VecDeque<QueuedRequest>, dt: f32, listeners: &mut Listeners) {
    queue.retain_mut(|queued| {
        queued.age += dt;
        if queued.age <= queued.request.expiry {
            return true;
        }
        tracing::debug!(play_id = %queued.play_id, "expired in queue");
        listeners.notify(
            CommEventKind::Expired,
            queued.request.actor,
            queued.request.comm,
            queued.play_id,
            queued.request.listener,
        );
        false
    });
}
