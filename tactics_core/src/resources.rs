use bevy::prelude::Resource;

use crate::tactics_config::EpisodeConfig;

/// Ticks elapsed in the current episode and the budget they run against.
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct EpisodeClock {
    pub tick: u64,
    pub max_ticks: u64,
    pub tick_duration: f32,
}

impl EpisodeClock {
    pub fn new(config: &EpisodeConfig) -> Self {
        Self {
            tick: 0,
            max_ticks: config.max_ticks(),
            tick_duration: config.tick_duration,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.tick >= self.max_ticks
    }

    /// Simulated time elapsed so far.
    pub fn elapsed(&self) -> f32 {
        self.tick as f32 * self.tick_duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_budget_is_forty_eight_ticks() {
        let mut clock = EpisodeClock::new(&EpisodeConfig::default());
        assert_eq!(clock.max_ticks, 48);
        assert!(!clock.is_expired());
        clock.tick = 48;
        assert!(clock.is_expired());
        assert_eq!(clock.elapsed(), 12.0);
    }
}
