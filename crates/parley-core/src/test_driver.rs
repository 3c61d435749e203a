//! Sequential playback of every variation for validation
//!
//! A test run walks one actor through each (communication, variation) pair
//! of a config, playing the next pair once the previous one has left both
//! the playing set and the queues. Outcomes are read from the run's own
//! listener mailbox.

use crate::backend::PlaybackBackend;
use crate::identity::{ActorId, ChannelId, CommId, ConfigId, PlayId};
use crate::library::CommLibrary;
use crate::notify::{CommEventKind, ListenerId};
use crate::request::Request;
use crate::scheduler::Scheduler;
use indexmap::IndexMap;
use std::collections::HashMap;

/// Per-actor totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TestReport {
    pub attempted: u32,
    pub failed: u32,
}

#[derive(Debug, Clone)]
struct TestRun {
    config: ConfigId,
    channel: ChannelId,
    /// Only this communication when set
    single: Option<CommId>,
    comm_index: usize,
    variation: usize,
    current: PlayId,
    listener: ListenerId,
}

impl TestRun {
    /// The pair the cursor points at, or None once exhausted
    fn cursor(&self, library: &CommLibrary) -> Option<(CommId, usize)> {
        let config = library.config(self.config)?;
        let comm = match self.single {
            Some(id) if self.comm_index == 0 => config.get(id)?,
            Some(_) => return None,
            None => config.get_index(self.comm_index)?,
        };
        Some((comm.id, self.variation))
    }

    /// Move to the next variation, rolling over to the next communication
    fn advance(&mut self, library: &CommLibrary) {
        let count = self
            .cursor(library)
            .and_then(|(comm, _)| library.communication(self.config, comm))
            .map_or(0, |c| c.variations.len());

        self.variation += 1;
        if self.variation >= count {
            self.variation = 0;
            self.comm_index += 1;
        }
    }
}

/// Drives test runs on behalf of the scheduler
#[derive(Debug, Default)]
pub struct TestDriver {
    runs: IndexMap<ActorId, TestRun>,
    totals: HashMap<ActorId, TestReport>,
}

impl TestDriver {
    /// Begin a run; returns the listener of a run it replaced
    pub(crate) fn start(
        &mut self,
        actor: ActorId,
        config: ConfigId,
        channel: ChannelId,
        single: Option<CommId>,
        listener: ListenerId,
    ) -> Option<ListenerId> {
        self.totals.insert(actor, TestReport::default());
        self.runs
            .insert(
                actor,
                TestRun {
                    config,
                    channel,
                    single,
                    comm_index: 0,
                    variation: 0,
                    current: PlayId::NONE,
                    listener,
                },
            )
            .map(|old| old.listener)
    }

    /// End a run; returns its current play and listener
    pub(crate) fn stop(&mut self, actor: ActorId) -> Option<(PlayId, ListenerId)> {
        self.runs
            .shift_remove(&actor)
            .map(|run| (run.current, run.listener))
    }

    pub fn is_running(&self, actor: ActorId) -> bool {
        self.runs.contains_key(&actor)
    }

    pub fn report(&self, actor: ActorId) -> Option<TestReport> {
        self.totals.get(&actor).copied()
    }

    /// Drop every run and report; returns the listeners to release
    pub(crate) fn reset(&mut self) -> Vec<ListenerId> {
        self.totals.clear();
        self.runs.drain(..).map(|(_, run)| run.listener).collect()
    }

    pub(crate) fn update<B: PlaybackBackend>(&mut self, scheduler: &mut Scheduler<B>) {
        let mut done = Vec::new();

        for (actor, run) in &mut self.runs {
            let totals = self.totals.entry(*actor).or_default();

            if run.current.is_some() {
                if scheduler.is_playing(run.current) || scheduler.is_queued(run.current) {
                    continue;
                }

                let events = scheduler.take_events(run.listener);
                let finished = events.iter().any(|e| e.kind == CommEventKind::Finished);
                let aborted = events
                    .iter()
                    .any(|e| matches!(e.kind, CommEventKind::Cancelled | CommEventKind::Expired));

                totals.attempted += 1;
                if !finished || aborted {
                    totals.failed += 1;
                }
                run.current = PlayId::NONE;
                run.advance(scheduler.library());
            }

            loop {
                let Some((comm, variation)) = run.cursor(scheduler.library()) else {
                    tracing::debug!(%actor, attempted = totals.attempted, failed = totals.failed, "test run complete");
                    done.push(*actor);
                    break;
                };

                let request = Request::new(*actor, run.config, comm, run.channel)
                    .with_variation(variation)
                    .with_listener(run.listener);
                let play_id = scheduler.play(request);
                if play_id.is_some() {
                    run.current = play_id;
                    break;
                }

                totals.attempted += 1;
                totals.failed += 1;
                run.advance(scheduler.library());
            }
        }

        for actor in done {
            if let Some(run) = self.runs.shift_remove(&actor) {
                scheduler.remove_listener(run.listener);
            }
        }
    }
}
