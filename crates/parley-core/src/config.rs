//! Scheduler tuning and the opaque audio-routing block

use serde::{Deserialize, Serialize};

/// Runtime settings passed to [`Scheduler::with_config`](crate::Scheduler::with_config)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Sessions playing longer than this are treated as stuck
    pub watchdog_secs: f32,
    /// Vertical target offset that sets the TargetIsAbove/Below variables
    pub target_height_threshold: f32,
    pub rng_seed: u64,
    /// Queue length above which a warning is logged
    pub queue_soft_limit: usize,
    pub record_statistics: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            watchdog_secs: 7.0,
            target_height_threshold: 2.0,
            rng_seed: 12345,
            queue_soft_limit: 64,
            record_statistics: true,
        }
    }
}

/// Audio trigger and switch names forwarded to the backend untouched
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioRouting {
    pub prefix_for_play_trigger: String,
    pub prefix_for_stop_trigger: String,
    pub switch_name_for_character_voice: String,
    pub switch_name_for_character_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.watchdog_secs, 7.0);
        assert_eq!(config.target_height_threshold, 2.0);
        assert!(config.record_statistics);
    }
}
