//! Child registry and restart-intensity accounting
//!
//! The registry is the supervisor's private view of which pid currently
//! embodies which spec. Dead pids are remembered so a late exit signal from
//! an already-replaced child can be attributed and ignored instead of
//! triggering a second restart.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use crate::pid::Pid;

pub(crate) struct ChildRegistry {
    alive: HashMap<Pid, String>,
    dead: HashMap<Pid, String>,
    restarts: HashMap<String, VecDeque<Instant>>,
    max_restarts: u32,
    period: Duration,
}

impl ChildRegistry {
    pub(crate) fn new(max_restarts: u32, period: Duration) -> Self {
        Self {
            alive: HashMap::new(),
            dead: HashMap::new(),
            restarts: HashMap::new(),
            max_restarts,
            period,
        }
    }

    /// Record a freshly started child
    pub(crate) fn put(&mut self, pid: Pid, id: String) {
        self.alive.insert(pid, id);
    }

    /// Move a pid from the alive set to the dead set
    pub(crate) fn mark_dead(&mut self, pid: &Pid) -> Option<String> {
        let id = self.alive.remove(pid)?;
        self.dead.insert(pid.clone(), id.clone());
        Some(id)
    }

    pub(crate) fn alive_id(&self, pid: &Pid) -> Option<&str> {
        self.alive.get(pid).map(String::as_str)
    }

    pub(crate) fn dead_id(&self, pid: &Pid) -> Option<&str> {
        self.dead.get(pid).map(String::as_str)
    }

    pub(crate) fn alive_pid(&self, id: &str) -> Option<Pid> {
        self.alive
            .iter()
            .find(|(_, child_id)| child_id.as_str() == id)
            .map(|(pid, _)| pid.clone())
    }

    pub(crate) fn alive_count(&self) -> usize {
        self.alive.len()
    }

    pub(crate) fn alive_snapshot(&self) -> Vec<(Pid, String)> {
        self.alive
            .iter()
            .map(|(pid, id)| (pid.clone(), id.clone()))
            .collect()
    }

    /// Forget everything about a deleted child spec
    pub(crate) fn forget(&mut self, id: &str) {
        self.dead.retain(|_, child_id| child_id != id);
        self.restarts.remove(id);
    }

    /// Record one restart for `id` and report whether the budget is blown
    ///
    /// Counts restarts within the sliding period, including the one being
    /// recorded. True means the supervisor must give up instead.
    pub(crate) fn record_restart(&mut self, id: &str) -> bool {
        self.record_restart_at(id, Instant::now())
    }

    fn record_restart_at(&mut self, id: &str, now: Instant) -> bool {
        let history = self.restarts.entry(id.to_string()).or_default();
        while let Some(&oldest) = history.front() {
            if now.duration_since(oldest) > self.period {
                history.pop_front();
            } else {
                break;
            }
        }
        history.push_back(now);
        history.len() > self.max_restarts as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailbox;
    use crate::pid::ActorRole;

    fn make_pid() -> Pid {
        let (sender, _mailbox) = mailbox::channel(8, 8);
        Pid::new(sender, ActorRole::Worker)
    }

    #[test]
    fn test_alive_and_dead_attribution() {
        let mut registry = ChildRegistry::new(3, Duration::from_secs(5));
        let pid = make_pid();

        registry.put(pid.clone(), "a".into());
        assert_eq!(registry.alive_id(&pid), Some("a"));
        assert_eq!(registry.alive_pid("a"), Some(pid.clone()));

        assert_eq!(registry.mark_dead(&pid), Some("a".into()));
        assert_eq!(registry.alive_id(&pid), None);
        assert_eq!(registry.dead_id(&pid), Some("a"));
        assert_eq!(registry.alive_count(), 0);

        // A second mark is a no-op.
        assert_eq!(registry.mark_dead(&pid), None);
    }

    #[test]
    fn test_restart_budget_within_period() {
        let mut registry = ChildRegistry::new(2, Duration::from_secs(5));
        let now = Instant::now();

        assert!(!registry.record_restart_at("a", now));
        assert!(!registry.record_restart_at("a", now + Duration::from_millis(10)));
        assert!(registry.record_restart_at("a", now + Duration::from_millis(20)));
    }

    #[test]
    fn test_restart_budget_slides() {
        let mut registry = ChildRegistry::new(2, Duration::from_secs(5));
        let now = Instant::now();

        assert!(!registry.record_restart_at("a", now));
        assert!(!registry.record_restart_at("a", now + Duration::from_secs(1)));
        // The first restart has aged out of the window by now.
        assert!(!registry.record_restart_at("a", now + Duration::from_secs(7)));
    }

    #[test]
    fn test_budgets_are_per_child() {
        let mut registry = ChildRegistry::new(1, Duration::from_secs(5));
        let now = Instant::now();

        assert!(!registry.record_restart_at("a", now));
        assert!(!registry.record_restart_at("b", now));
        assert!(registry.record_restart_at("a", now + Duration::from_millis(1)));
    }

    #[test]
    fn test_forget_clears_history() {
        let mut registry = ChildRegistry::new(1, Duration::from_secs(5));
        let now = Instant::now();

        assert!(!registry.record_restart_at("a", now));
        registry.forget("a");
        assert!(!registry.record_restart_at("a", now + Duration::from_millis(1)));
    }
}
