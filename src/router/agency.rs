//! Proactive check-ins after a period of silence.

use crate::config::AgencyConfig;
use rand::seq::SliceRandom;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct AgencyTimer {
    enabled: bool,
    threshold: Duration,
    prompts: Vec<String>,
    last_interaction: Instant,
}

impl AgencyTimer {
    pub fn new(config: &AgencyConfig, now: Instant) -> Self {
        Self {
            enabled: config.enabled && !config.prompts.is_empty(),
            threshold: config.idle_threshold(),
            prompts: config.prompts.clone(),
            last_interaction: now,
        }
    }

    /// Record activity. Never moves the timer backwards.
    pub fn touch(&mut self, now: Instant) {
        if now > self.last_interaction {
            self.last_interaction = now;
        }
    }

    pub fn last_interaction(&self) -> Instant {
        self.last_interaction
    }

    /// A check-in prompt once idle time exceeds the threshold. The timer
    /// resets before returning so the next poll stays quiet.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        if !self.enabled {
            return None;
        }
        if now.saturating_duration_since(self.last_interaction) <= self.threshold {
            return None;
        }
        self.last_interaction = now;
        self.prompts.choose(&mut rand::thread_rng()).cloned()
    }
}
