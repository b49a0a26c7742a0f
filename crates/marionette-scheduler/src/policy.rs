use marionette_core::config::AutonomousConfig;
use marionette_core::{ControlError, Result};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

/// Runtime-mutable scheduler configuration.
///
/// Interval changes never interrupt an in-flight iteration; the loop reads
/// the current values at the top of each sleep.
pub struct AutonomousPolicy {
    enabled: AtomicBool,
    /// (min, max) sleep bounds in seconds.
    intervals: RwLock<(f64, f64)>,
    prompt_pool: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PolicySnapshot {
    pub enabled: bool,
    pub min_interval: f64,
    pub max_interval: f64,
}

impl AutonomousPolicy {
    pub fn from_config(cfg: &AutonomousConfig) -> Result<Self> {
        validate_intervals(cfg.min_interval_seconds, cfg.max_interval_seconds)?;
        if cfg.prompt_pool.is_empty() {
            return Err(ControlError::Config(
                "autonomous.prompt_pool must not be empty".to_string(),
            ));
        }
        Ok(Self {
            enabled: AtomicBool::new(cfg.enabled),
            intervals: RwLock::new((cfg.min_interval_seconds, cfg.max_interval_seconds)),
            prompt_pool: cfg.prompt_pool.clone(),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, on: bool) {
        self.enabled.store(on, Ordering::Relaxed);
    }

    pub fn intervals(&self) -> (f64, f64) {
        *self.intervals.read().unwrap()
    }

    /// Replace the sleep bounds. Applied at the scheduler's next iteration.
    pub fn set_intervals(&self, min: f64, max: f64) -> Result<()> {
        validate_intervals(min, max)?;
        *self.intervals.write().unwrap() = (min, max);
        Ok(())
    }

    pub fn snapshot(&self) -> PolicySnapshot {
        let (min_interval, max_interval) = self.intervals();
        PolicySnapshot {
            enabled: self.is_enabled(),
            min_interval,
            max_interval,
        }
    }

    pub fn prompt_pool(&self) -> &[String] {
        &self.prompt_pool
    }
}

fn validate_intervals(min: f64, max: f64) -> Result<()> {
    if !(min > 0.0 && min <= max) {
        return Err(ControlError::Validation(format!(
            "intervals must satisfy 0 < min <= max (got min={min}, max={max})"
        )));
    }
    Ok(())
}
