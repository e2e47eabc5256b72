//! Reconnection delay policy
//!
//! Fixed delay by default. Exponential backoff with jitter is available for
//! deployments that want to ease off a struggling backend. Attempts are never
//! capped: the stream retries for as long as its owner keeps it open.

use std::str::FromStr;
use std::time::Duration;

use rand::Rng;

use crate::error::MarketDataError;

/// Delay growth strategy between reconnect attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backoff {
    /// Same delay before every attempt
    #[default]
    Fixed,
    /// Delay multiplied after every attempt, capped at `max_delay`
    Exponential,
}

impl FromStr for Backoff {
    type Err = MarketDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(Backoff::Fixed),
            "exponential" | "exp" => Ok(Backoff::Exponential),
            other => Err(MarketDataError::ConfigError(format!(
                "unknown reconnect backoff '{}'",
                other
            ))),
        }
    }
}

/// Reconnect timing
#[derive(Debug, Clone)]
pub struct ReconnectSettings {
    /// Fixed delay, or the first delay under exponential backoff
    pub delay: Duration,
    /// Upper bound for exponential backoff
    pub max_delay: Duration,
    pub backoff: Backoff,
    /// Growth factor for exponential backoff
    pub multiplier: f64,
    /// Jitter as a fraction of the delay (0.1 = ±10%), exponential only
    pub jitter_factor: f64,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(3000),
            max_delay: Duration::from_secs(60),
            backoff: Backoff::Fixed,
            multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

/// Produces the delay to wait before each reconnect attempt
#[derive(Debug)]
pub struct ReconnectPolicy {
    settings: ReconnectSettings,
    current_delay: Duration,
    attempts: u32,
}

impl ReconnectPolicy {
    pub fn new(settings: ReconnectSettings) -> Self {
        let current_delay = settings.delay;
        Self {
            settings,
            current_delay,
            attempts: 0,
        }
    }

    /// Delay before the next attempt
    pub fn next_delay(&mut self) -> Duration {
        self.attempts = self.attempts.saturating_add(1);

        match self.settings.backoff {
            Backoff::Fixed => self.settings.delay,
            Backoff::Exponential => {
                let delay = self.apply_jitter(self.current_delay);
                let scaled =
                    (self.current_delay.as_millis() as f64 * self.settings.multiplier).round();
                self.current_delay = if scaled.is_finite() && scaled > 0.0 {
                    Duration::from_millis(scaled as u64).min(self.settings.max_delay)
                } else {
                    self.settings.max_delay
                };
                delay.min(self.settings.max_delay)
            }
        }
    }

    /// Called after a successful open
    pub fn reset(&mut self) {
        self.current_delay = self.settings.delay;
        self.attempts = 0;
    }

    /// Attempts since the last successful open
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    fn apply_jitter(&self, duration: Duration) -> Duration {
        if self.settings.jitter_factor <= 0.0 {
            return duration;
        }

        let base_millis = duration.as_millis() as f64;
        let jitter_range = base_millis * self.settings.jitter_factor;
        let jitter: f64 = rand::thread_rng().gen_range(-jitter_range..=jitter_range);
        Duration::from_millis((base_millis + jitter).max(1.0) as u64)
    }
}
