//! Parley Core - communication scheduling and channel arbitration
//!
//! Decides whether, when and on which channel each actor communication
//! plays:
//! - Hierarchical channels with priorities and silence cooldowns
//! - Priority preemption of playing sessions and queued requests
//! - Ordered and unordered waiting queues with expiry
//! - Variation selection with history-based fairness
//! - Per-actor voice and animation restrictions
//!
//! Everything runs synchronously inside [`Scheduler::play`],
//! [`Scheduler::stop`] and [`Scheduler::update`]. Rendering is delegated to
//! a host-provided [`PlaybackBackend`].

mod backend;
mod channel;
pub mod communication;
mod condition;
mod config;
mod error;
mod identity;
mod library;
mod notify;
mod player;
mod registry;
mod request;
mod restriction;
mod rng;
mod scheduler;
pub mod selector;
mod stats;
mod test_driver;
mod variables;

pub use backend::{
    BackendCall, BackendEvent, BackendEventKind, Media, PlaybackBackend, Readability,
    RecordingBackend,
};
pub use channel::{Channel, ChannelHandle, ChannelKind, ChannelParams};
pub use communication::{
    AnimationMethod, BlockFlags, ChoiceMethod, CommConfig, CommunicationDef, Components, History,
    Variation, MAX_VARIATION_COUNT,
};
pub use condition::Condition;
pub use config::{AudioRouting, SchedulerConfig};
pub use error::{Error, Result};
pub use identity::{name_hash, ActorId, ChannelId, CommId, ConfigId, GroupId, PlayId, VariableId};
pub use library::{CommLibrary, Definitions};
pub use notify::{CommEvent, CommEventKind, ListenerId, Listeners};
pub use player::{FinishedSession, SessionTracker};
pub use registry::{ChannelNode, ChannelRegistry};
pub use request::{QueueOrdering, QueuedRequest, Request};
pub use restriction::ActorRestrictions;
pub use rng::SelectionRng;
pub use scheduler::Scheduler;
pub use stats::{CommCounts, Statistics};
pub use test_driver::{TestDriver, TestReport};
pub use variables::{
    VariableDecl, VariableDeclarations, Variables, TARGET_IS_ABOVE, TARGET_IS_BELOW,
};
