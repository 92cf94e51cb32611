//! Context -- the dependency cache and state store, shared explicitly.
//!
//! Everything that would otherwise be process-wide (the dependency graph,
//! the per-scope state tables, timing settings) hangs off one [`Context`].
//! Build it once with [`ContextBuilder`] and hand `Arc<Context>` clones to
//! the listener and to observers.
//!
//! # Example
//!
//! ```
//! use raillib_state::ContextBuilder;
//! use std::time::Duration;
//!
//! let ctx = ContextBuilder::new()
//!     .duplicate_window(Duration::from_millis(500))
//!     .event_capacity(64)
//!     .build();
//! assert!(ctx.store().is_empty());
//! ```

use std::sync::Arc;
use std::time::Duration;

use raillib_pdi::frame::DEFAULT_MAX_BUFFER;

use crate::component::{DEFAULT_AUX_PULSE_WINDOW, DEFAULT_DUPLICATE_WINDOW, Settings};
use crate::dependency::DependencyCache;
use crate::store::ComponentStateStore;

/// Default capacity of the state event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Fluent builder for [`Context`].
#[derive(Debug)]
pub struct ContextBuilder {
    duplicate_window: Duration,
    aux_pulse_window: Duration,
    event_capacity: usize,
    max_buffer: usize,
    deps: Option<DependencyCache>,
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextBuilder {
    pub fn new() -> Self {
        ContextBuilder {
            duplicate_window: DEFAULT_DUPLICATE_WINDOW,
            aux_pulse_window: DEFAULT_AUX_PULSE_WINDOW,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            max_buffer: DEFAULT_MAX_BUFFER,
            deps: None,
        }
    }

    /// Window in which a repeated engine command is dropped (default: 1s).
    pub fn duplicate_window(mut self, window: Duration) -> Self {
        self.duplicate_window = window;
        self
    }

    /// Minimum spacing between aux option-one presses that toggle
    /// (default: 1s).
    pub fn aux_pulse_window(mut self, window: Duration) -> Self {
        self.aux_pulse_window = window;
        self
    }

    /// Capacity of the [`StateEvent`](raillib_core::StateEvent) channel
    /// (default: 256).
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Cap on unframed bytes a listener buffers (default: 4096).
    pub fn max_buffer(mut self, bytes: usize) -> Self {
        self.max_buffer = bytes;
        self
    }

    /// Replace the stock dependency graph.
    pub fn dependencies(mut self, deps: DependencyCache) -> Self {
        self.deps = Some(deps);
        self
    }

    pub fn build(self) -> Arc<Context> {
        let settings = Settings {
            duplicate_window: self.duplicate_window,
            aux_pulse_window: self.aux_pulse_window,
        };
        let deps = Arc::new(self.deps.unwrap_or_else(DependencyCache::new));
        Arc::new(Context {
            store: ComponentStateStore::new(Arc::clone(&deps), settings, self.event_capacity),
            deps,
            settings,
            max_buffer: self.max_buffer,
        })
    }
}

/// The shared dependency cache and component state store.
#[derive(Debug)]
pub struct Context {
    deps: Arc<DependencyCache>,
    store: ComponentStateStore,
    settings: Settings,
    max_buffer: usize,
}

impl Context {
    pub fn deps(&self) -> &DependencyCache {
        &self.deps
    }

    pub fn store(&self) -> &ComponentStateStore {
        &self.store
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    pub fn max_buffer(&self) -> usize {
        self.max_buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Update;
    use raillib_core::{AuxOp, CommandId, CommandKey, CommandReq, EngineOp, Syntax};

    #[test]
    fn builder_defaults() {
        let ctx = ContextBuilder::new().build();
        assert_eq!(ctx.settings(), Settings::default());
        assert_eq!(ctx.max_buffer(), 4096);
        assert!(ctx.store().is_empty());
    }

    #[test]
    fn builder_overrides() {
        let ctx = ContextBuilder::new()
            .duplicate_window(Duration::from_millis(250))
            .aux_pulse_window(Duration::from_millis(750))
            .max_buffer(512)
            .build();
        assert_eq!(ctx.settings().duplicate_window, Duration::from_millis(250));
        assert_eq!(ctx.settings().aux_pulse_window, Duration::from_millis(750));
        assert_eq!(ctx.store().settings(), ctx.settings());
        assert_eq!(ctx.max_buffer(), 512);
    }

    #[test]
    fn custom_dependencies() {
        let opt1 = CommandKey::plain(CommandId::Aux(AuxOp::Aux1OptOne));
        assert!(!ContextBuilder::new().build().deps().toggled_by(opt1).is_empty());
        let ctx = ContextBuilder::new().dependencies(DependencyCache::empty()).build();
        assert!(ctx.deps().toggled_by(opt1).is_empty());
        assert!(Arc::ptr_eq(ctx.store().deps(), &ctx.deps));
    }

    #[tokio::test(start_paused = true)]
    async fn default_duplicate_window_through_the_store() {
        let ctx = ContextBuilder::new().build();
        let speed = CommandId::Engine(Syntax::Legacy, EngineOp::AbsoluteSpeed);
        let req = CommandReq::build(speed, 12, Some(40), None).unwrap();
        let store = ctx.store();
        assert_eq!(store.dispatch(Update::Command(&req)), 1);
        assert_eq!(store.dispatch(Update::Command(&req)), 0);
        tokio::time::advance(Duration::from_millis(999)).await;
        assert_eq!(store.dispatch(Update::Command(&req)), 0);
        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(store.dispatch(Update::Command(&req)), 1);
    }
}
