//! Shared handle to one component state.
//!
//! The state itself sits behind a `std::sync::Mutex`; every update holds
//! the lock for its whole pass, so readers never see a half-applied
//! command. Each change bumps a version counter on a `tokio::sync::watch`
//! channel, which is what observers wait on.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use raillib_core::{CommandCodec, Error, Result, Scope};
use raillib_pdi::irda::IrdaData;
use tokio::sync::watch;

use crate::component::{ComponentState, Update};
use crate::dependency::DependencyCache;

#[derive(Debug)]
pub struct StateHandle {
    scope: Scope,
    address: u16,
    state: Mutex<ComponentState>,
    version: watch::Sender<u64>,
}

impl StateHandle {
    pub fn new(state: ComponentState, address: u16) -> Self {
        let (version, _) = watch::channel(0);
        StateHandle {
            scope: state.scope(),
            address,
            state: Mutex::new(state),
            version,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ComponentState> {
        // A panic mid-update leaves a state that is still well-formed.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn address(&self) -> u16 {
        self.address
    }

    /// Apply `update` and notify watchers if it changed anything.
    pub fn update(&self, update: Update<'_>, deps: &DependencyCache) -> Result<bool> {
        let changed = self.lock().update(update, deps)?;
        if changed {
            self.bump();
        }
        Ok(changed)
    }

    /// Fold a sensor-track sighting into an engine state.
    pub fn record_sighting(&self, data: &IrdaData) -> bool {
        let changed = self.lock().record_sighting(data);
        if changed {
            self.bump();
        }
        changed
    }

    fn bump(&self) {
        self.version.send_modify(|v| *v = v.wrapping_add(1));
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> ComponentState {
        self.lock().clone()
    }

    /// Run `f` against the current state under the lock.
    pub fn with<R>(&self, f: impl FnOnce(&ComponentState) -> R) -> R {
        f(&self.lock())
    }

    pub fn as_bytes(&self, codec: &dyn CommandCodec) -> Result<Vec<u8>> {
        self.lock().as_bytes(codec)
    }

    pub fn is_known(&self) -> bool {
        self.lock().is_known()
    }

    /// Number of changes applied so far.
    pub fn version(&self) -> u64 {
        *self.version.borrow()
    }

    /// A receiver that wakes on every change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    /// Wait for the next change, up to `timeout`.
    ///
    /// Returns the new version. Dropping the future abandons the wait and
    /// has no other effect.
    pub async fn changed_within(&self, timeout: Duration) -> Result<u64> {
        let mut rx = self.version.subscribe();
        rx.borrow_and_update();
        match tokio::time::timeout(timeout, rx.changed()).await {
            Ok(Ok(())) => Ok(*rx.borrow()),
            // The sender lives as long as `self`.
            Ok(Err(_)) => Err(Error::ConnectionLost),
            Err(_) => Err(Error::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Settings;
    use raillib_core::{AuxOp, CommandId, CommandReq};
    use std::sync::Arc;

    fn acc(address: u16) -> StateHandle {
        let state = ComponentState::new(Scope::Acc, Some(address), Settings::default()).unwrap();
        StateHandle::new(state, address)
    }

    fn aux(op: AuxOp, address: u16) -> CommandReq {
        CommandReq::build(CommandId::Aux(op), address, None, None).unwrap()
    }

    #[test]
    fn version_counts_changes() {
        let deps = DependencyCache::new();
        let h = acc(5);
        assert_eq!(h.version(), 0);
        assert!(h.update(Update::Command(&aux(AuxOp::Aux1On, 5)), &deps).unwrap());
        assert_eq!(h.version(), 1);
        // Different address: rejected, no bump.
        assert!(h.update(Update::Command(&aux(AuxOp::Aux1On, 6)), &deps).is_err());
        assert_eq!(h.version(), 1);
        assert!(h.with(|s| s.as_accessory().is_some_and(|a| a.is_aux_on())));
    }

    #[test]
    fn snapshot_is_detached() {
        let deps = DependencyCache::new();
        let h = acc(5);
        let before = h.snapshot();
        h.update(Update::Command(&aux(AuxOp::Aux1On, 5)), &deps).unwrap();
        assert!(!before.is_known());
        assert!(h.is_known());
    }

    #[tokio::test]
    async fn watcher_wakes_on_change() {
        let deps = Arc::new(DependencyCache::new());
        let h = Arc::new(acc(5));
        let waiter = {
            let h = Arc::clone(&h);
            tokio::spawn(async move { h.changed_within(Duration::from_secs(5)).await })
        };
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        h.update(Update::Command(&aux(AuxOp::Aux2On, 5)), &deps).unwrap();
        assert_eq!(waiter.await.unwrap().unwrap(), 1);
    }

    #[tokio::test]
    async fn watcher_times_out() {
        let h = acc(5);
        let err = h.changed_within(Duration::from_millis(20)).await.unwrap_err();
        assert!(matches!(err, Error::Timeout));
    }
}
