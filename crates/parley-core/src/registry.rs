//! Channel registry: channel definitions and their lazily created instances
//!
//! Definitions are loaded from configuration into a table keyed by
//! [`ChannelId`]. Concrete channels are created on first resolution and
//! cached per definition (global), per group, or per actor (personal).
//! Parents are resolved first, so the arena never contains a cycle.

use crate::channel::{Channel, ChannelHandle, ChannelKind, ChannelParams};
use crate::error::{Error, Result};
use crate::identity::{ActorId, ChannelId, GroupId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One channel entry as written in configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelNode {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub min_silence: f32,
    /// Defaults to `min_silence` when absent
    #[serde(default)]
    pub flush_silence: Option<f32>,
    #[serde(default)]
    pub actor_min_silence: f32,
    #[serde(default)]
    pub ignore_actor_silence: bool,
    #[serde(default)]
    pub priority: i32,
    /// "global", "group" or "personal"; global when absent
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub children: Vec<ChannelNode>,
}

impl ChannelNode {
    /// Create a global channel node
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_silence(mut self, min_silence: f32, flush_silence: f32) -> Self {
        self.min_silence = min_silence;
        self.flush_silence = Some(flush_silence);
        self
    }

    pub fn with_actor_silence(mut self, actor_min_silence: f32, ignore_actor_silence: bool) -> Self {
        self.actor_min_silence = actor_min_silence;
        self.ignore_actor_silence = ignore_actor_silence;
        self
    }

    pub fn with_child(mut self, child: ChannelNode) -> Self {
        self.children.push(child);
        self
    }
}

/// Owner of all channel definitions and instances
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    definitions: IndexMap<ChannelId, ChannelParams>,
    arena: Vec<Channel>,
    global: HashMap<ChannelId, ChannelHandle>,
    group: HashMap<(GroupId, ChannelId), ChannelHandle>,
    personal: HashMap<(ActorId, ChannelId), ChannelHandle>,
}

impl ChannelRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a batch of top-level channel entries
    ///
    /// Failing entries are skipped; the rest of the batch still loads.
    pub fn load_channels(&mut self, nodes: &[ChannelNode]) -> Vec<Error> {
        nodes
            .iter()
            .filter_map(|node| self.load_channel_definition(node, None).err())
            .collect()
    }

    /// Load one channel entry and its nested children
    ///
    /// Children inherit this channel as their parent. A failing child is
    /// logged and skipped without affecting its siblings.
    pub fn load_channel_definition(
        &mut self,
        node: &ChannelNode,
        parent: Option<ChannelId>,
    ) -> Result<ChannelId> {
        let id = self.define(node, parent)?;

        for child in &node.children {
            if let Err(err) = self.load_channel_definition(child, Some(id)) {
                tracing::warn!(parent = %id, error = %err, "skipping channel definition");
            }
        }

        Ok(id)
    }

    fn define(&mut self, node: &ChannelNode, parent: Option<ChannelId>) -> Result<ChannelId> {
        let name = node
            .name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .ok_or(Error::MissingName("channel"))?;

        let kind = match node.kind.as_deref() {
            Some(kind) => kind.parse::<ChannelKind>()?,
            None => ChannelKind::Global,
        };

        if let Some(parent) = parent {
            if !self.definitions.contains_key(&parent) {
                return Err(Error::UnknownParent(parent));
            }
        }

        let id = ChannelId::from_name(name);
        if let Some(existing) = self.definitions.get(&id) {
            return Err(Error::name_clash("channel", name, &existing.name));
        }

        self.definitions.insert(
            id,
            ChannelParams {
                id,
                name: name.to_string(),
                parent,
                priority: node.priority,
                kind,
                min_silence: node.min_silence,
                flush_silence: node.flush_silence.unwrap_or(node.min_silence),
                actor_min_silence: node.actor_min_silence,
                ignore_actor_silence: node.ignore_actor_silence,
            },
        );
        Ok(id)
    }

    /// Get the concrete channel for this (definition, actor) pair
    ///
    /// Creates and caches the instance, and its parents, on first use.
    /// Returns None for an unknown definition.
    pub fn resolve(&mut self, id: ChannelId, actor: ActorId) -> Option<ChannelHandle> {
        let params = self.definitions.get(&id)?;
        let kind = params.kind;
        let parent_id = params.parent;

        let cached = match kind {
            ChannelKind::Global => self.global.get(&id),
            ChannelKind::Group => self.group.get(&(GroupId::DEFAULT, id)),
            ChannelKind::Personal => self.personal.get(&(actor, id)),
        };
        if let Some(handle) = cached {
            return Some(*handle);
        }

        let parent = match parent_id {
            Some(parent_id) => Some(self.resolve(parent_id, actor)?),
            None => None,
        };

        let handle = ChannelHandle(self.arena.len());
        let params = self.definitions.get(&id)?;
        self.arena.push(Channel::new(params, parent));

        match kind {
            ChannelKind::Global => self.global.insert(id, handle),
            ChannelKind::Group => self.group.insert((GroupId::DEFAULT, id), handle),
            ChannelKind::Personal => self.personal.insert((actor, id), handle),
        };
        Some(handle)
    }

    /// Borrow a concrete channel
    ///
    /// Handles are only produced by [`resolve`](Self::resolve) and stay
    /// valid until the next [`reset`](Self::reset) or [`clear`](Self::clear).
    pub fn channel(&self, handle: ChannelHandle) -> &Channel {
        &self.arena[handle.0]
    }

    /// Check if the channel and every ancestor are free
    pub fn is_free(&self, handle: ChannelHandle) -> bool {
        let mut current = Some(handle);
        while let Some(h) = current {
            let channel = &self.arena[h.0];
            if !channel.is_locally_free() {
                return false;
            }
            current = channel.parent();
        }
        true
    }

    pub fn is_occupied(&self, handle: ChannelHandle) -> bool {
        self.arena[handle.0].is_occupied()
    }

    /// Occupy the channel and its ancestors
    pub fn occupy(&mut self, handle: ChannelHandle) {
        let mut current = Some(handle);
        while let Some(h) = current {
            let channel = &mut self.arena[h.0];
            channel.occupy();
            current = channel.parent();
        }
    }

    /// Release the channel and its ancestors, starting their silence
    pub fn release(&mut self, handle: ChannelHandle, min_silence: Option<f32>) {
        let mut current = Some(handle);
        while let Some(h) = current {
            let channel = &mut self.arena[h.0];
            channel.release(min_silence);
            current = channel.parent();
        }
    }

    /// Force the silence to the flush duration
    ///
    /// Unoccupied ancestors get their own flush duration as well; the walk
    /// stops at the first occupied ancestor.
    pub fn reset_silence(&mut self, handle: ChannelHandle) {
        let mut current = Some(handle);
        while let Some(h) = current {
            let channel = &mut self.arena[h.0];
            channel.reset_silence();
            current = channel.parent().filter(|p| !self.arena[p.0].is_occupied());
        }
    }

    /// Count down the silence of every unoccupied channel
    pub fn update(&mut self, dt: f32) {
        for channel in &mut self.arena {
            channel.tick(dt);
        }
    }

    /// Drop every instance, keeping the definitions
    pub fn reset(&mut self) {
        self.arena.clear();
        self.global.clear();
        self.group.clear();
        self.personal.clear();
    }

    /// Drop every instance and definition
    pub fn clear(&mut self) {
        self.reset();
        self.definitions.clear();
    }

    /// Look up a channel definition
    pub fn params(&self, id: ChannelId) -> Option<&ChannelParams> {
        self.definitions.get(&id)
    }

    /// Id of a defined channel, by name
    pub fn channel_id(&self, name: &str) -> Option<ChannelId> {
        let id = ChannelId::from_name(name);
        self.definitions.contains_key(&id).then_some(id)
    }

    /// Number of channel definitions
    pub fn definition_count(&self) -> usize {
        self.definitions.len()
    }

    /// Number of concrete instances created so far
    pub fn instance_count(&self) -> usize {
        self.arena.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ChannelRegistry {
        let mut registry = ChannelRegistry::new();
        let errors = registry.load_channels(&[
            ChannelNode::new("Global")
                .with_silence(1.0, 0.0)
                .with_child(
                    ChannelNode::new("Group")
                        .with_kind("group")
                        .with_priority(1)
                        .with_silence(2.0, 0.5)
                        .with_child(
                            ChannelNode::new("Personal")
                                .with_kind("personal")
                                .with_priority(2)
                                .with_silence(0.5, 0.0),
                        ),
                ),
        ]);
        assert!(errors.is_empty());
        registry
    }

    #[test]
    fn test_load_errors() {
        let mut registry = registry();

        let err = registry
            .load_channel_definition(&ChannelNode::default(), None)
            .unwrap_err();
        assert_eq!(err, Error::MissingName("channel"));

        let err = registry
            .load_channel_definition(&ChannelNode::new("Bad").with_kind("squad"), None)
            .unwrap_err();
        assert_eq!(err, Error::InvalidChannelType("squad".to_string()));

        let err = registry
            .load_channel_definition(&ChannelNode::new("global"), None)
            .unwrap_err();
        assert!(matches!(err, Error::Redefinition { .. }));

        assert_eq!(registry.definition_count(), 3);
    }

    #[test]
    fn test_bad_child_skipped() {
        let mut registry = ChannelRegistry::new();
        let id = registry
            .load_channel_definition(
                &ChannelNode::new("Root")
                    .with_child(ChannelNode::new("Broken").with_kind("nope"))
                    .with_child(ChannelNode::new("Fine")),
                None,
            )
            .unwrap();

        assert_eq!(registry.channel_id("root"), Some(id));
        assert!(registry.channel_id("Broken").is_none());
        assert_eq!(
            registry.params(ChannelId::from_name("Fine")).unwrap().parent,
            Some(id)
        );
    }

    #[test]
    fn test_resolve_caching() {
        let mut registry = registry();
        let personal = ChannelId::from_name("Personal");
        let a = ActorId::new(1);
        let b = ActorId::new(2);

        let pa = registry.resolve(personal, a).unwrap();
        let pb = registry.resolve(personal, b).unwrap();
        assert_ne!(pa, pb);
        assert_eq!(registry.resolve(personal, a), Some(pa));

        // Both personal instances share the group and global parents
        let ga = registry.channel(pa).parent().unwrap();
        let gb = registry.channel(pb).parent().unwrap();
        assert_eq!(ga, gb);
        assert_eq!(registry.instance_count(), 4);

        assert!(registry.resolve(ChannelId::from_name("Missing"), a).is_none());
    }

    #[test]
    fn test_hierarchy_freedom() {
        let mut registry = registry();
        let actor = ActorId::new(1);
        let personal = registry.resolve(ChannelId::from_name("Personal"), actor).unwrap();
        let group = registry.resolve(ChannelId::from_name("Group"), actor).unwrap();
        let global = registry.resolve(ChannelId::from_name("Global"), actor).unwrap();

        registry.occupy(personal);
        assert!(registry.is_occupied(group));
        assert!(registry.is_occupied(global));

        registry.release(personal, None);
        assert!(!registry.is_occupied(global));
        // Each level takes its own default silence
        assert_eq!(registry.channel(personal).silence(), 0.5);
        assert_eq!(registry.channel(group).silence(), 2.0);
        assert_eq!(registry.channel(global).silence(), 1.0);

        registry.update(1.0);
        assert!(registry.is_free(global));
        assert!(!registry.is_free(group));
        assert!(!registry.is_free(personal));

        registry.update(1.0);
        assert!(registry.is_free(personal));
    }

    #[test]
    fn test_release_with_explicit_silence() {
        let mut registry = registry();
        let actor = ActorId::new(1);
        let personal = registry.resolve(ChannelId::from_name("Personal"), actor).unwrap();
        let global = registry.resolve(ChannelId::from_name("Global"), actor).unwrap();

        registry.occupy(personal);
        registry.release(personal, Some(3.0));
        assert_eq!(registry.channel(personal).silence(), 3.0);
        assert_eq!(registry.channel(global).silence(), 3.0);
    }

    #[test]
    fn test_reset_silence_stops_at_occupied_parent() {
        let mut registry = registry();
        let actor = ActorId::new(1);
        let personal = registry.resolve(ChannelId::from_name("Personal"), actor).unwrap();
        let group = registry.resolve(ChannelId::from_name("Group"), actor).unwrap();
        let global = registry.resolve(ChannelId::from_name("Global"), actor).unwrap();

        registry.occupy(personal);
        registry.release(personal, Some(4.0));
        registry.reset_silence(personal);
        assert_eq!(registry.channel(personal).silence(), 0.0);
        assert_eq!(registry.channel(group).silence(), 0.5);
        assert_eq!(registry.channel(global).silence(), 0.0);
        assert!(!registry.is_free(personal));

        registry.occupy(global);
        registry.release(personal, Some(4.0));
        registry.occupy(group);
        registry.release(group, Some(4.0));
        registry.occupy(global);
        registry.reset_silence(personal);
        assert_eq!(registry.channel(group).silence(), 0.5);
        assert_eq!(registry.channel(global).silence(), 4.0);
        assert!(registry.is_occupied(global));
    }

    #[test]
    fn test_reset_and_clear() {
        let mut registry = registry();
        let actor = ActorId::new(1);
        registry.resolve(ChannelId::from_name("Personal"), actor).unwrap();

        registry.reset();
        assert_eq!(registry.instance_count(), 0);
        assert_eq!(registry.definition_count(), 3);

        registry.clear();
        assert_eq!(registry.definition_count(), 0);
        assert!(registry.resolve(ChannelId::from_name("Global"), actor).is_none());
    }
}
