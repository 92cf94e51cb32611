//! PDI link-layer codec and sub-protocol requests for raillib.
//!
//! Every message exchanged with a Base command station is a PDI frame.
//! This crate provides:
//!
//! - **Frame codec** ([`frame`]) -- byte stuffing, checksum, and the
//!   [`FrameBuffer`] that reassembles frames from arbitrary transport
//!   chunks.
//! - **Command table** ([`command`]) -- the [`PdiCommand`] byte and its
//!   family/direction predicates.
//! - **LCS devices** ([`lcs`], [`asc2`], [`bpc2`], [`amc2`], [`stm2`],
//!   [`irda`], [`wifi`]) -- the addressed accessory, sensor, and power
//!   controllers, sharing one envelope.
//! - **Base records** ([`base`], [`memory`], [`d4`]) -- full records, raw
//!   memory access, and the four-digit address database.
//! - **Block reports** ([`block`]) and **TMCC pass-through** ([`tmcc`]).
//! - **Dispatch** ([`req`]) -- [`PdiReq`], one enum over all of the above.
//!
//! # Example
//!
//! ```
//! use raillib_pdi::{FrameBuffer, PdiReq};
//! use raillib_pdi::asc2::Asc2Req;
//!
//! let cmd = Asc2Req::relay(5, true, None).unwrap();
//! let wire = cmd.as_bytes();
//!
//! let mut buf = FrameBuffer::new();
//! buf.extend(&wire[..3]);
//! assert!(buf.next_frame().is_none());
//! buf.extend(&wire[3..]);
//! let frame = buf.next_frame().unwrap().unwrap();
//! assert_eq!(PdiReq::from_frame(&frame).unwrap(), PdiReq::Asc2(cmd));
//! ```

pub mod action;
pub mod amc2;
pub mod asc2;
pub mod base;
pub mod block;
pub mod bpc2;
pub mod command;
pub mod consist;
pub mod d4;
pub mod frame;
pub mod irda;
pub mod lcs;
pub mod memory;
pub mod req;
pub mod stm2;
pub mod tmcc;
pub mod wifi;
pub mod wire;

pub use command::{PdiCommand, PdiDevice, Role};
pub use frame::{FrameBuffer, KEEP_ALIVE, PdiFrame, decode, encode_frame};
pub use lcs::{LcsError, LcsReq};
pub use req::PdiReq;
