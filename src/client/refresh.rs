//! Single-flight coordination of access token refreshes.
//!
//! At most one refresh cycle runs at a time. Calls that hit a 401 while a
//! cycle is running park a oneshot receiver in the pending queue; the leader
//! resolves them in arrival order when its refresh returns.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

/// How a refresh cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Refreshed(String),
    Failed,
}

/// What a call that just received a 401 should do next.
#[derive(Debug)]
pub enum Ticket {
    /// A refresh landed after this call was sent; replay with this token.
    Current(String),
    /// No refresh is running; this call performs it.
    Leader(RefreshLease),
    /// A refresh is running; wait for its outcome.
    Waiter(oneshot::Receiver<RefreshOutcome>),
}

#[derive(Debug, Default)]
struct Cycle {
    in_flight: bool,
    pending: Vec<oneshot::Sender<RefreshOutcome>>,
}

#[derive(Debug, Clone, Default)]
pub struct RefreshCoordinator {
    cycle: Arc<Mutex<Cycle>>,
}

fn lock(cycle: &Mutex<Cycle>) -> MutexGuard<'_, Cycle> {
    cycle.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide the role of a call that was rejected with 401.
    ///
    /// `sent_with` is the token the rejected attempt carried; `current`
    /// reads the token store. Both checks happen under the cycle lock, so
    /// exactly one caller becomes leader per cycle.
    pub fn begin(
        &self,
        sent_with: Option<&str>,
        current: impl FnOnce() -> Option<String>,
    ) -> Ticket {
        let mut cycle = lock(&self.cycle);

        if cycle.in_flight {
            let (tx, rx) = oneshot::channel();
            cycle.pending.push(tx);
            return Ticket::Waiter(rx);
        }

        if let Some(token) = current().filter(|token| Some(token.as_str()) != sent_with) {
            return Ticket::Current(token);
        }

        cycle.in_flight = true;
        Ticket::Leader(RefreshLease {
            cycle: self.cycle.clone(),
            settled: false,
        })
    }

    pub fn is_refreshing(&self) -> bool {
        lock(&self.cycle).in_flight
    }

    /// Number of calls parked behind the running refresh.
    pub fn pending(&self) -> usize {
        lock(&self.cycle).pending.len()
    }
}

/// Held by the leader for the duration of one refresh cycle.
///
/// Dropping it unsettled (the leader's future was cancelled) ends the cycle
/// and drops every parked sender; waiters then start over.
#[derive(Debug)]
pub struct RefreshLease {
    cycle: Arc<Mutex<Cycle>>,
    settled: bool,
}

impl RefreshLease {
    /// End the cycle and resolve every parked call in enqueue order.
    /// Returns how many calls were resolved.
    pub fn settle(mut self, outcome: RefreshOutcome) -> usize {
        self.settled = true;
        let pending = self.close();
        let count = pending.len();
        for waiter in pending {
            // A waiter whose call was dropped is simply skipped.
            let _ = waiter.send(outcome.clone());
        }
        count
    }

    fn close(&self) -> Vec<oneshot::Sender<RefreshOutcome>> {
        let mut cycle = lock(&self.cycle);
        cycle.in_flight = false;
        std::mem::take(&mut cycle.pending)
    }
}

impl Drop for RefreshLease {
    fn drop(&mut self) {
        if !self.settled {
            drop(self.close());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leader(coordinator: &RefreshCoordinator) -> RefreshLease {
        match coordinator.begin(None, || None) {
            Ticket::Leader(lease) => lease,
            other => panic!("expected leader, got {:?}", other),
        }
    }

    fn waiter(coordinator: &RefreshCoordinator) -> oneshot::Receiver<RefreshOutcome> {
        match coordinator.begin(Some("old"), || Some("old".to_string())) {
            Ticket::Waiter(rx) => rx,
            other => panic!("expected waiter, got {:?}", other),
        }
    }

    #[test]
    fn test_first_401_leads_later_ones_wait() {
        let coordinator = RefreshCoordinator::new();
        let lease = leader(&coordinator);
        assert!(coordinator.is_refreshing());

        let _a = waiter(&coordinator);
        let _b = waiter(&coordinator);
        assert_eq!(coordinator.pending(), 2);

        drop(lease);
    }

    #[test]
    fn test_settle_resolves_every_waiter_and_ends_cycle() {
        let coordinator = RefreshCoordinator::new();
        let lease = leader(&coordinator);
        let mut waiters: Vec<_> = (0..3).map(|_| waiter(&coordinator)).collect();

        let resolved = lease.settle(RefreshOutcome::Refreshed("new".to_string()));
        assert_eq!(resolved, 3);
        assert!(!coordinator.is_refreshing());
        assert_eq!(coordinator.pending(), 0);

        for rx in waiters.iter_mut() {
            assert_eq!(
                rx.try_recv().unwrap(),
                RefreshOutcome::Refreshed("new".to_string())
            );
        }
    }

    #[test]
    fn test_failed_cycle_fails_waiters() {
        let coordinator = RefreshCoordinator::new();
        let lease = leader(&coordinator);
        let mut rx = waiter(&coordinator);

        lease.settle(RefreshOutcome::Failed);

        assert_eq!(rx.try_recv().unwrap(), RefreshOutcome::Failed);
    }

    #[test]
    fn test_stale_token_skips_refresh() {
        let coordinator = RefreshCoordinator::new();

        match coordinator.begin(Some("old"), || Some("new".to_string())) {
            Ticket::Current(token) => assert_eq!(token, "new"),
            other => panic!("expected current token, got {:?}", other),
        }
        assert!(!coordinator.is_refreshing());
    }

    #[test]
    fn test_same_token_or_empty_store_starts_refresh() {
        let coordinator = RefreshCoordinator::new();
        let lease = match coordinator.begin(Some("old"), || Some("old".to_string())) {
            Ticket::Leader(lease) => lease,
            other => panic!("expected leader, got {:?}", other),
        };
        lease.settle(RefreshOutcome::Failed);

        assert!(matches!(
            coordinator.begin(Some("old"), || None),
            Ticket::Leader(_)
        ));
    }

    #[test]
    fn test_dropped_lease_releases_waiters() {
        let coordinator = RefreshCoordinator::new();
        let lease = leader(&coordinator);
        let mut rx = waiter(&coordinator);

        drop(lease);

        assert!(!coordinator.is_refreshing());
        assert!(matches!(
            rx.try_recv(),
            Err(oneshot::error::TryRecvError::Closed)
        ));
        // The next 401 can lead a fresh cycle
        assert!(matches!(coordinator.begin(None, || None), Ticket::Leader(_)));
    }
}
