//! Block occupancy reports.
//!
//! ```text
//! payload: <block_id> <prev> <next> <flags> <sensor_track> <switch>
//!          <motive_id:LE16> <motive_scope> <motive_dir> <name:33>
//! ```
//!
//! Zero in any id field means "none".

use bytes::{BufMut, BytesMut};
use raillib_core::{Direction, Error, Result, Scope};

use crate::command::PdiCommand;
use crate::frame::PdiFrame;
use crate::wire::{Reader, put_text};

pub const OCCUPIED: u8 = 1 << 0;
pub const ENTERED: u8 = 1 << 1;
pub const SLOWED: u8 = 1 << 2;
pub const STOPPED: u8 = 1 << 3;
pub const LEFT_TO_RIGHT: u8 = 1 << 4;

const NAME_LEN: usize = 33;

/// The engine or train occupying a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Occupant {
    pub scope: Scope,
    pub address: u16,
    pub direction: Direction,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockReq {
    pub block_id: u8,
    pub prev_block: Option<u8>,
    pub next_block: Option<u8>,
    pub flags: u8,
    pub sensor_track: Option<u8>,
    pub switch: Option<u8>,
    pub occupant: Option<Occupant>,
    pub name: Option<String>,
}

fn nonzero(b: u8) -> Option<u8> {
    (b != 0).then_some(b)
}

impl BlockReq {
    pub fn new(block_id: u8) -> Self {
        BlockReq {
            block_id,
            ..Default::default()
        }
    }

    pub fn from_frame(frame: &PdiFrame) -> Result<Self> {
        if frame.command != PdiCommand::BlockRx {
            return Err(Error::Protocol(format!("{} is not a block report", frame.command)));
        }
        let mut r = Reader::new(&frame.payload);
        let block_id = r.u8()?;
        let prev_block = r.opt_u8().and_then(nonzero);
        let next_block = r.opt_u8().and_then(nonzero);
        let flags = r.opt_u8().unwrap_or(0);
        let sensor_track = r.opt_u8().and_then(nonzero);
        let switch = r.opt_u8().and_then(nonzero);
        let motive_id = r.le16().ok();
        let motive_scope = r.opt_u8().and_then(Scope::from_wire);
        let motive_dir = r.opt_u8().map(Direction::from_wire).unwrap_or_default();
        let occupant = match (motive_id, motive_scope) {
            (Some(address), Some(scope)) if address != 0 => Some(Occupant {
                scope,
                address,
                direction: motive_dir,
            }),
            _ => None,
        };
        let name = match r.remaining() {
            0 => None,
            n => Some(r.text(n.min(NAME_LEN))?),
        };
        Ok(BlockReq {
            block_id,
            prev_block,
            next_block,
            flags,
            sensor_track,
            switch,
            occupant,
            name,
        })
    }

    pub fn to_frame(&self) -> PdiFrame {
        let mut buf = BytesMut::with_capacity(10 + NAME_LEN);
        buf.put_u8(self.block_id);
        buf.put_u8(self.prev_block.unwrap_or(0));
        buf.put_u8(self.next_block.unwrap_or(0));
        buf.put_u8(self.flags);
        buf.put_u8(self.sensor_track.unwrap_or(0));
        buf.put_u8(self.switch.unwrap_or(0));
        match self.occupant {
            Some(occ) => {
                buf.put_u16_le(occ.address);
                buf.put_u8(occ.scope.wire_value());
                buf.put_u8(occ.direction.wire_value());
            }
            None => buf.put_bytes(0, 4),
        }
        put_text(&mut buf, self.name.as_deref().unwrap_or_default(), NAME_LEN);
        PdiFrame::new(PdiCommand::BlockRx, buf.to_vec())
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        self.to_frame().encode()
    }

    pub fn is_occupied(&self) -> bool {
        self.flags & OCCUPIED != 0
    }

    pub fn is_entered(&self) -> bool {
        self.flags & ENTERED != 0
    }

    pub fn is_slowed(&self) -> bool {
        self.flags & SLOWED != 0
    }

    pub fn is_stopped(&self) -> bool {
        self.flags & STOPPED != 0
    }

    /// Direction of travel through the block.
    pub fn direction(&self) -> Direction {
        if self.flags & LEFT_TO_RIGHT != 0 {
            Direction::LeftToRight
        } else {
            Direction::RightToLeft
        }
    }

    pub fn address(&self) -> u16 {
        u16::from(self.block_id)
    }
}
