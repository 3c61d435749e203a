//! Parley Script - RON loader for channels and communications
//!
//! Loads scheduler definitions from RON documents:
//! - Channel hierarchies
//! - Configs of communications and their variations
//! - Condition variables
//! - Audio routing forwarded to the playback backend
//!
//! Loading is fail-soft: bad entries are skipped and collected in a
//! [`LoadReport`].

mod error;
mod loader;
mod schema;

pub use error::{Error, Result};
pub use loader::{reload, LoadReport, Loader};
pub use schema::{CommunicationNode, ConfigNode, Document, VariationNode};
