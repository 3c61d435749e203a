//! Lifecycle notifications
//!
//! Listeners are mailboxes owned by the scheduler and addressed by
//! [`ListenerId`]. A request may name one listener for its own session;
//! global listeners hear about every session. Events are queued during the
//! call that produced them and drained by the host with
//! [`Listeners::take_events`].

use crate::identity::{ActorId, CommId, PlayId};
use indexmap::IndexMap;
use std::fmt;

/// What happened to a communication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommEventKind {
    Started,
    Finished,
    Cancelled,
    Queued,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommEvent {
    pub kind: CommEventKind,
    pub actor: ActorId,
    pub comm: CommId,
    /// Set for per-session listeners only
    pub play_id: Option<PlayId>,
}

/// Handle to a listener mailbox
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u32);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener:{}", self.0)
    }
}

#[derive(Debug, Default)]
struct Mailbox {
    global: bool,
    events: Vec<CommEvent>,
}

/// Registry of listener mailboxes
#[derive(Debug, Default)]
pub struct Listeners {
    next_id: u32,
    mailboxes: IndexMap<ListenerId, Mailbox>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty mailbox
    pub fn create(&mut self) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.mailboxes.insert(id, Mailbox::default());
        id
    }

    /// Subscribe a mailbox to every session's events
    pub fn register_global(&mut self, id: ListenerId) -> bool {
        match self.mailboxes.get_mut(&id) {
            Some(mailbox) => {
                mailbox.global = true;
                true
            }
            None => false,
        }
    }

    pub fn unregister_global(&mut self, id: ListenerId) {
        if let Some(mailbox) = self.mailboxes.get_mut(&id) {
            mailbox.global = false;
        }
    }

    /// Delete a mailbox and its pending events
    pub fn remove(&mut self, id: ListenerId) {
        self.mailboxes.shift_remove(&id);
    }

    pub fn contains(&self, id: ListenerId) -> bool {
        self.mailboxes.contains_key(&id)
    }

    /// Drain the events queued for a mailbox
    pub fn take_events(&mut self, id: ListenerId) -> Vec<CommEvent> {
        self.mailboxes
            .get_mut(&id)
            .map(|mailbox| std::mem::take(&mut mailbox.events))
            .unwrap_or_default()
    }

    /// Deliver to the session listener and every global listener
    pub(crate) fn notify(
        &mut self,
        kind: CommEventKind,
        actor: ActorId,
        comm: CommId,
        play_id: PlayId,
        listener: Option<ListenerId>,
    ) {
        if let Some(mailbox) = listener.and_then(|id| self.mailboxes.get_mut(&id)) {
            mailbox.events.push(CommEvent {
                kind,
                actor,
                comm,
                play_id: Some(play_id),
            });
        }

        for mailbox in self.mailboxes.values_mut().filter(|m| m.global) {
            mailbox.events.push(CommEvent {
                kind,
                actor,
                comm,
                play_id: None,
            });
        }
    }

    /// Drop every pending event, keeping the mailboxes
    pub fn clear_events(&mut self) {
        for mailbox in self.mailboxes.values_mut() {
            mailbox.events.clear();
        }
    }
}
