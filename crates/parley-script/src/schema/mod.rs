//! Schema definitions for RON configuration documents

pub mod communication;
pub mod document;

pub use communication::{CommunicationNode, ConfigNode, VariationNode};
pub use document::Document;
