//! raillib-core: Core types, command model, and error definitions for raillib.
//!
//! This crate defines the protocol-agnostic vocabulary shared by the PDI
//! codec and the component state engine. Applications that only route
//! commands can depend on it without pulling in either.
//!
//! # Key types
//!
//! - [`Scope`] -- device-kind discriminator and address ranges
//! - [`CommandId`] / [`CommandReq`] -- symbolic TMCC commands
//! - [`CommandCodec`] -- external byte layout for TMCC commands
//! - [`Transport`] -- byte-level link to the Base
//! - [`StateEvent`] -- state change notifications
//! - [`Error`] / [`Result`] -- error handling

pub mod command;
pub mod error;
pub mod events;
pub mod transport;
pub mod types;

// Re-export key types at crate root for ergonomic `use raillib_core::*`.
pub use command::{
    AuxOp, CommandCodec, CommandId, CommandKey, CommandReq, EngineOp, RouteOp, SwitchOp, SyncOp,
};
pub use error::{Error, FrameError, Result};
pub use events::StateEvent;
pub use transport::Transport;
pub use types::*;
