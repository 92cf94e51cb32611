//! # raillib -- PDI Protocol and Layout State for Model Railroads
//!
//! `raillib` speaks the PDI serial protocol of a TMCC/Legacy Base command
//! station and keeps a believed state for every engine, train, switch,
//! route, accessory, sensor track and block it hears about. It is meant for
//! layout control panels, network bridges between Bases, and loggers that
//! need to know what the layout is doing without polling it.
//!
//! ## Quick Start
//!
//! Build a [`Context`](state::Context), hand a transport to a
//! [`Listener`], and read state back out of the store:
//!
//! ```no_run
//! use raillib::state::ContextBuilder;
//! use raillib::{Listener, Scope, Transport};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(transport: Box<dyn Transport>) -> raillib::Result<()> {
//! let ctx = ContextBuilder::new().build();
//! let mut listener = Listener::new(transport, ctx.clone());
//!
//! let cancel = CancellationToken::new();
//! let pump = tokio::spawn(async move { listener.run(cancel).await });
//!
//! // ... later
//! for acc in ctx.store().get_all(Scope::Acc) {
//!     println!("{:?}", acc.snapshot());
//! }
//! # let _ = pump;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! | Crate                   | Purpose                                          |
//! |-------------------------|--------------------------------------------------|
//! | `raillib-core`          | Scopes, the TMCC command model, [`Transport`], errors |
//! | `raillib-pdi`           | Frame codec and every PDI sub-protocol request   |
//! | `raillib-state`         | Dependency cache, state machines, the store      |
//! | **`raillib`**           | This facade crate, plus the [`Listener`] pump    |
//!
//! raillib never fixes the byte layout of legacy TMCC commands.
//! Applications supply a [`CommandCodec`]; without one, TMCC pass-through
//! frames are dropped by the listener.
//!
//! ## Watching for Changes
//!
//! The store publishes a [`StateEvent`] after every applied update, and each
//! component carries a version counter:
//!
//! ```no_run
//! use raillib::StateEvent;
//! # async fn example(ctx: std::sync::Arc<raillib::state::Context>) {
//! let mut events = ctx.store().subscribe();
//! while let Ok(event) = events.recv().await {
//!     if let StateEvent::Updated { scope, address } = event {
//!         println!("{scope} {address} changed");
//!     }
//! }
//! # }
//! ```

pub mod listener;

pub use listener::{Listener, ListenerStats};
pub use raillib_core::*;

/// PDI link-layer codec and sub-protocol requests.
///
/// Provides [`FrameBuffer`](pdi::FrameBuffer) for reassembling frames from
/// transport chunks and [`PdiReq`](pdi::PdiReq), one enum over every
/// request kind the Base and LCS devices exchange.
pub mod pdi {
    pub use raillib_pdi::*;
}

/// Component state engine.
///
/// Provides [`Context`](state::Context) and
/// [`ComponentStateStore`](state::ComponentStateStore), plus the per-kind
/// state machines they hold.
pub mod state {
    pub use raillib_state::*;
}
