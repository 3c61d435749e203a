//! Error types for parley-core
//!
//! Only configuration loading produces errors. Runtime operations signal
//! failure through sentinel ids, booleans or `Option`.

use crate::identity::ChannelId;
use thiserror::Error;

/// Core error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Missing 'name' for {0} definition")]
    MissingName(&'static str),

    #[error("Invalid channel type '{0}'")]
    InvalidChannelType(String),

    #[error("{kind} name '{name}' hash collision (existing name '{existing}')")]
    HashCollision {
        kind: &'static str,
        name: String,
        existing: String,
    },

    #[error("{kind} '{name}' redefinition")]
    Redefinition { kind: &'static str, name: String },

    #[error("Invalid value '{value}' for attribute '{attribute}'")]
    InvalidValue { attribute: &'static str, value: String },

    #[error("Condition error: {0}")]
    Condition(String),

    #[error("Unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("Unknown parent channel {0}")]
    UnknownParent(ChannelId),
}

impl Error {
    /// Build the error reported when a hashed name is already taken
    pub(crate) fn name_clash(kind: &'static str, name: &str, existing: &str) -> Self {
        if name.eq_ignore_ascii_case(existing) {
            Error::Redefinition {
                kind,
                name: name.to_string(),
            }
        } else {
            Error::HashCollision {
                kind,
                name: name.to_string(),
                existing: existing.to_string(),
            }
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
