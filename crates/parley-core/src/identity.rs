//! Identity types for channels, configs, communications, actors and plays
//!
//! Definition ids are derived from names with a case-insensitive CRC32, so
//! callers can look them up by string without holding a reference to the
//! loaded definitions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Hash a definition name into its 32-bit id (case-insensitive)
pub fn name_hash(name: &str) -> u32 {
    crc32fast::hash(name.to_lowercase().as_bytes())
}

macro_rules! hashed_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl $name {
            /// Derive the id from a definition name
            pub fn from_name(name: &str) -> Self {
                Self(name_hash(name))
            }

            /// Get the raw id value
            pub fn raw(&self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, ":{:08x}"), self.0)
            }
        }
    };
}

hashed_id!(
    /// Identifier of a channel definition
    ChannelId,
    "channel"
);
hashed_id!(
    /// Identifier of a named bundle of communications
    ConfigId,
    "config"
);
hashed_id!(
    /// Identifier of a communication within a config
    CommId,
    "comm"
);
hashed_id!(
    /// Identifier of a boolean condition variable
    VariableId,
    "var"
);

/// Unique identifier for an actor able to communicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub u64);

impl ActorId {
    /// Create a new actor ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor:{}", self.0)
    }
}

/// Handle of one accepted play attempt
///
/// Zero is reserved for "no session"; allocation skips it on wraparound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct PlayId(pub u32);

impl PlayId {
    /// The sentinel returned when a request is rejected
    pub const NONE: PlayId = PlayId(0);

    /// Check if this is the rejection sentinel
    pub fn is_none(&self) -> bool {
        self.0 == 0
    }

    /// Check if this refers to an accepted play
    pub fn is_some(&self) -> bool {
        self.0 != 0
    }

    /// The id allocated after this one, never zero
    pub fn successor(self) -> PlayId {
        match self.0.wrapping_add(1) {
            0 => PlayId(1),
            next => PlayId(next),
        }
    }

    /// Get the raw ID value
    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for PlayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "play:{}", self.0)
    }
}

/// Identifier of an actor group owning group-scoped channel instances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct GroupId(pub u32);

impl GroupId {
    /// The single implicit group every actor belongs to
    pub const DEFAULT: GroupId = GroupId(0);
}
