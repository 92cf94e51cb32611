//! raillib-state: believed state of every component on the layout.
//!
//! Commands and PDI frames observed on the Base link are folded into one
//! state machine per `(scope, address)`:
//!
//! - **Dependency cache** ([`dependency`]) -- what each command implies and
//!   what it switches off.
//! - **State machines** ([`ComponentState`]) -- engines and trains,
//!   switches, routes, accessories, sensor tracks, blocks, the Base, sync.
//! - **Store** ([`ComponentStateStore`]) -- routing, broadcast and halt
//!   fan-out, road-number aliases, and re-synthesis of the whole layout.
//! - **Context** ([`Context`]) -- the cache and store, built once and shared.
//!
//! # Example
//!
//! ```
//! use raillib_core::{CommandId, CommandReq, SwitchOp};
//! use raillib_state::{ContextBuilder, Update};
//!
//! let ctx = ContextBuilder::new().build();
//! let out = CommandReq::build(CommandId::Switch(SwitchOp::Out), 12, None, None).unwrap();
//! assert_eq!(ctx.store().dispatch(Update::Command(&out)), 1);
//!
//! let switch = ctx.store().query(raillib_core::Scope::Switch, 12).unwrap();
//! assert_eq!(switch.with(|s| s.as_switch().and_then(|sw| sw.is_out())), Some(true));
//! ```

pub mod accessory;
pub mod base;
pub mod block;
pub mod component;
pub mod context;
pub mod dependency;
pub mod engine;
pub mod handle;
pub mod irda;
pub mod store;
pub mod switch;

pub use accessory::{AccVariant, AccessoryState};
pub use base::{BaseState, SyncState};
pub use block::{BlockState, ComponentKey};
pub use component::{ComponentState, LastCommand, Settings, Update};
pub use context::{Context, ContextBuilder};
pub use dependency::{DependencyCache, KeySet};
pub use engine::{EngineState, SmokeLevel};
pub use handle::StateHandle;
pub use irda::IrdaState;
pub use store::ComponentStateStore;
pub use switch::{RouteState, SwitchState};
