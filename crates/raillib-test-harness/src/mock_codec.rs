//! A stand-in TMCC command codec.
//!
//! raillib never defines the legacy command byte layout; applications
//! supply a [`CommandCodec`]. [`MockCodec`] lets tests push commands through
//! pass-through frames without one: each distinct command is assigned a
//! slot in a table, and the wire form is a marker byte plus the slot index.
//!
//! Only bytes produced by the same `MockCodec` instance decode.

use std::sync::Mutex;

use raillib_core::command::{CommandCodec, CommandReq};
use raillib_core::error::{Error, Result};

/// First byte of every encoded command.
pub const MOCK_MARKER: u8 = 0xFE;

#[derive(Debug, Default)]
pub struct MockCodec {
    table: Mutex<Vec<CommandReq>>,
}

impl MockCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct commands encoded so far.
    pub fn len(&self) -> usize {
        self.table.lock().map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CommandCodec for MockCodec {
    fn encode(&self, req: &CommandReq) -> Result<Vec<u8>> {
        let mut table = self
            .table
            .lock()
            .map_err(|_| Error::Codec("mock codec table poisoned".into()))?;
        let slot = match table.iter().position(|r| r == req) {
            Some(slot) => slot,
            None => {
                table.push(*req);
                table.len() - 1
            }
        };
        let slot = u16::try_from(slot).map_err(|_| Error::Codec("mock codec table full".into()))?;
        let [hi, lo] = slot.to_be_bytes();
        Ok(vec![MOCK_MARKER, hi, lo])
    }

    fn decode(&self, bytes: &[u8]) -> Result<CommandReq> {
        let [MOCK_MARKER, hi, lo] = *bytes else {
            return Err(Error::Codec(format!("not a mock command: {bytes:02X?}")));
        };
        let table = self
            .table
            .lock()
            .map_err(|_| Error::Codec("mock codec table poisoned".into()))?;
        table
            .get(usize::from(u16::from_be_bytes([hi, lo])))
            .copied()
            .ok_or_else(|| Error::Codec(format!("unknown mock command slot {hi:02X}{lo:02X}")))
    }
}
