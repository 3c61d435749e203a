//! Loaded definitions: the config library and the bundle handed to the scheduler

use crate::communication::{CommConfig, CommunicationDef};
use crate::config::AudioRouting;
use crate::error::{Error, Result};
use crate::identity::{CommId, ConfigId};
use crate::registry::ChannelNode;
use crate::variables::VariableDeclarations;
use indexmap::IndexMap;

/// All communication configs, in load order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommLibrary {
    configs: IndexMap<ConfigId, CommConfig>,
}

impl CommLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a config, rejecting duplicate or colliding names
    pub fn insert(&mut self, config: CommConfig) -> Result<ConfigId> {
        if config.name.trim().is_empty() {
            return Err(Error::MissingName("config"));
        }
        if let Some(existing) = self.configs.get(&config.id) {
            return Err(Error::name_clash("config", &config.name, &existing.name));
        }
        let id = config.id;
        self.configs.insert(id, config);
        Ok(id)
    }

    /// Add every config of another library, collecting failures
    pub fn merge(&mut self, other: CommLibrary) -> Vec<Error> {
        other
            .configs
            .into_values()
            .filter_map(|config| self.insert(config).err())
            .collect()
    }

    pub fn config(&self, id: ConfigId) -> Option<&CommConfig> {
        self.configs.get(&id)
    }

    pub fn config_mut(&mut self, id: ConfigId) -> Option<&mut CommConfig> {
        self.configs.get_mut(&id)
    }

    pub fn communication(&self, config: ConfigId, comm: CommId) -> Option<&CommunicationDef> {
        self.configs.get(&config)?.get(comm)
    }

    pub fn communication_mut(
        &mut self,
        config: ConfigId,
        comm: CommId,
    ) -> Option<&mut CommunicationDef> {
        self.configs.get_mut(&config)?.get_mut(comm)
    }

    pub fn config_count(&self) -> usize {
        self.configs.len()
    }

    pub fn config_at(&self, index: usize) -> Option<&CommConfig> {
        self.configs.get_index(index).map(|(_, config)| config)
    }

    pub fn config_id(&self, name: &str) -> Option<ConfigId> {
        let id = ConfigId::from_name(name);
        self.configs.contains_key(&id).then_some(id)
    }

    /// Find a communication name in any config
    pub fn communication_name(&self, comm: CommId) -> Option<&str> {
        self.configs
            .values()
            .find_map(|config| config.get(comm))
            .map(|c| c.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommConfig> {
        self.configs.values()
    }

    pub fn reset_history(&mut self) {
        for config in self.configs.values_mut() {
            config.reset_history();
        }
    }

    pub fn clear(&mut self) {
        self.configs.clear();
    }
}

/// Everything a scheduler loads from configuration
#[derive(Debug, Clone, Default)]
pub struct Definitions {
    pub channels: Vec<ChannelNode>,
    pub variables: VariableDeclarations,
    pub library: CommLibrary,
    pub audio: Option<AudioRouting>,
}

impl Definitions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel(mut self, node: ChannelNode) -> Self {
        self.channels.push(node);
        self
    }

    /// Add a config; a clashing name is logged and dropped
    pub fn with_config(mut self, config: CommConfig) -> Self {
        if let Err(err) = self.library.insert(config) {
            tracing::warn!(error = %err, "skipping config");
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::communication::Variation;

    fn library() -> CommLibrary {
        let mut soldier = CommConfig::new("Soldier");
        soldier
            .insert(CommunicationDef::new("Alert").with_variation(Variation::default().with_voice("alert_01")))
            .unwrap();
        soldier.insert(CommunicationDef::new("Idle")).unwrap();

        let mut library = CommLibrary::new();
        library.insert(soldier).unwrap();
        library.insert(CommConfig::new("Civilian")).unwrap();
        library
    }

    #[test]
    fn test_lookup() {
        let library = library();
        let soldier = library.config_id("soldier").unwrap();
        assert_eq!(library.config_count(), 2);
        assert_eq!(library.config_at(1).unwrap().name, "Civilian");

        let alert = CommId::from_name("Alert");
        assert!(library.communication(soldier, alert).is_some());
        assert_eq!(library.communication_name(alert), Some("Alert"));
        assert!(library.config_id("Pilot").is_none());
    }

    #[test]
    fn test_duplicate_config() {
        let mut library = library();
        let err = library.insert(CommConfig::new("SOLDIER")).unwrap_err();
        assert!(matches!(err, Error::Redefinition { kind: "config", .. }));

        let mut other = CommLibrary::new();
        other.insert(CommConfig::new("Civilian")).unwrap();
        other.insert(CommConfig::new("Pilot")).unwrap();
        let errors = library.merge(other);
        assert_eq!(errors.len(), 1);
        assert_eq!(library.config_count(), 3);
    }

    #[test]
    fn test_reset_history() {
        let mut library = library();
        let soldier = ConfigId::from_name("Soldier");
        let alert = CommId::from_name("Alert");
        library.communication_mut(soldier, alert).unwrap().history.played = 1;
        library.reset_history();
        assert_eq!(library.communication(soldier, alert).unwrap().history.played, 0);
    }
}
