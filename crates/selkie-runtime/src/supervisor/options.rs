//! Supervisor strategies and options

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use selkie_core::constants::{
    SUPERVISOR_MAX_RESTARTS_DEFAULT, SUPERVISOR_RESTART_PERIOD_MS_DEFAULT,
};
use selkie_core::error::{Error, Result};

static NEXT_SUPERVISOR_ID: AtomicU64 = AtomicU64::new(1);

/// What a supervisor restarts when one child dies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Restart only the child that died
    OneForOne,
    /// Restart every running child
    OneForAll,
    /// Restart the child that died and every child declared after it
    RestForOne,
}

/// Per-supervisor options
#[derive(Debug, Clone)]
pub struct Options {
    /// Restart strategy
    pub strategy: Strategy,
    /// Restarts tolerated per child within `period`
    pub max_restarts: u32,
    /// Restart intensity window
    pub period: Duration,
    /// Name used in log output only
    pub name: String,
}

impl Options {
    pub fn new(strategy: Strategy) -> Self {
        let n = NEXT_SUPERVISOR_ID.fetch_add(1, Ordering::Relaxed);
        Self {
            strategy,
            max_restarts: SUPERVISOR_MAX_RESTARTS_DEFAULT,
            period: Duration::from_millis(SUPERVISOR_RESTART_PERIOD_MS_DEFAULT),
            name: format!("supervisor-{}", n),
        }
    }

    pub fn one_for_one() -> Self {
        Self::new(Strategy::OneForOne)
    }

    pub fn one_for_all() -> Self {
        Self::new(Strategy::OneForAll)
    }

    pub fn rest_for_one() -> Self {
        Self::new(Strategy::RestForOne)
    }

    pub fn with_max_restarts(mut self, max_restarts: u32) -> Self {
        self.max_restarts = max_restarts;
        self
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::invalid_supervisor_options("name", "must not be empty"));
        }
        if self.period.is_zero() {
            return Err(Error::invalid_supervisor_options(
                "period",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

impl Default for Options {
    fn default() -> Self {
        Self::one_for_one()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = Options::one_for_one();
        assert_eq!(options.strategy, Strategy::OneForOne);
        assert_eq!(options.max_restarts, SUPERVISOR_MAX_RESTARTS_DEFAULT);
        assert_eq!(
            options.period,
            Duration::from_millis(SUPERVISOR_RESTART_PERIOD_MS_DEFAULT)
        );
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_generated_names_are_unique() {
        let a = Options::one_for_one();
        let b = Options::one_for_all();
        assert_ne!(a.name, b.name);
    }

    #[test]
    fn test_zero_period_rejected() {
        let options = Options::one_for_one().with_period(Duration::ZERO);
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_empty_name_rejected() {
        let options = Options::one_for_one().with_name("");
        assert!(options.validate().is_err());
    }
}
