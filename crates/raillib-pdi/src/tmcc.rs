//! TMCC pass-through frames.
//!
//! `TMCC_TX`/`TMCC_RX` (and the `TMCC4` four-digit variants) wrap the
//! bytes of one legacy command. raillib does not interpret those bytes;
//! [`TmccReq::to_command`] hands them to a caller-supplied codec.

use raillib_core::{CommandCodec, CommandReq, Error, Result};

use crate::command::PdiCommand;
use crate::frame::PdiFrame;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TmccReq {
    pub command: PdiCommand,
    pub bytes: Vec<u8>,
}

impl TmccReq {
    /// Wrap an already-encoded command for transmission to the Base.
    pub fn tx(bytes: impl Into<Vec<u8>>) -> Self {
        TmccReq {
            command: PdiCommand::TmccTx,
            bytes: bytes.into(),
        }
    }

    /// Encode `req` with `codec` and wrap it. Four-digit engine and train
    /// addresses use the `TMCC4` frame.
    pub fn from_command(req: &CommandReq, codec: &dyn CommandCodec) -> Result<Self> {
        let command = if req.address > 99 {
            PdiCommand::Tmcc4Tx
        } else {
            PdiCommand::TmccTx
        };
        Ok(TmccReq {
            command,
            bytes: codec.encode(req)?,
        })
    }

    pub fn from_frame(frame: &PdiFrame) -> Result<Self> {
        if !frame.command.is_tmcc() {
            return Err(Error::Protocol(format!(
                "{} is not a TMCC pass-through frame",
                frame.command
            )));
        }
        if frame.payload.is_empty() {
            return Err(Error::Protocol(format!("{} carries no command", frame.command)));
        }
        Ok(TmccReq {
            command: frame.command,
            bytes: frame.payload.clone(),
        })
    }

    pub fn to_frame(&self) -> PdiFrame {
        PdiFrame::new(self.command, self.bytes.clone())
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        self.to_frame().encode()
    }

    /// Decode the wrapped bytes.
    pub fn to_command(&self, codec: &dyn CommandCodec) -> Result<CommandReq> {
        codec.decode(&self.bytes)
    }
}
