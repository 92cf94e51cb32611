//! Block occupancy state.
//!
//! Neighbouring blocks, the sensor track, the switch and the occupying
//! engine or train are held as `(scope, address)` keys. Resolve them
//! through [`ComponentStateStore::resolve`](crate::ComponentStateStore::resolve)
//! when the referenced state itself is needed.

use raillib_core::{Direction, Result, Scope};
use raillib_pdi::PdiReq;
use raillib_pdi::block::{
    BlockReq, ENTERED, LEFT_TO_RIGHT, OCCUPIED, Occupant, SLOWED, STOPPED,
};

use crate::component::{Common, Settings, Update};

/// A reference to another component.
pub type ComponentKey = (Scope, u16);

#[derive(Debug, Clone)]
pub struct BlockState {
    pub(crate) common: Common,
    flags: Option<u8>,
    prev_block: Option<u8>,
    next_block: Option<u8>,
    sensor_track: Option<u8>,
    switch: Option<u8>,
    occupant: Option<Occupant>,
}

impl BlockState {
    pub(crate) fn new(address: Option<u16>, settings: Settings) -> Result<Self> {
        Ok(BlockState {
            common: Common::new(Scope::Block, address, settings)?,
            flags: None,
            prev_block: None,
            next_block: None,
            sensor_track: None,
            switch: None,
            occupant: None,
        })
    }

    pub(crate) fn update(&mut self, update: Update<'_>) -> Result<bool> {
        self.common.accept(&update)?;
        let Update::Pdi(PdiReq::Block(req)) = update else {
            return Ok(false);
        };
        let before = self.to_req();
        self.flags = Some(req.flags);
        self.prev_block = req.prev_block;
        self.next_block = req.next_block;
        self.sensor_track = req.sensor_track;
        self.switch = req.switch;
        self.occupant = req.occupant;
        self.common.bind_names(req.name.as_deref(), None);
        self.common.record(update);
        Ok(before != self.to_req())
    }

    fn to_req(&self) -> Option<BlockReq> {
        let block_id = self.common.record_no()?;
        Some(BlockReq {
            flags: self.flags.unwrap_or(0),
            prev_block: self.prev_block,
            next_block: self.next_block,
            sensor_track: self.sensor_track,
            switch: self.switch,
            occupant: self.occupant,
            name: self.common.road_name.clone(),
            ..BlockReq::new(block_id)
        })
    }

    /// The last block report, rebuilt.
    pub(crate) fn as_bytes(&self) -> Result<Vec<u8>> {
        Ok(match self.to_req().filter(|_| self.flags.is_some()) {
            Some(req) => req.as_bytes(),
            None => Vec::new(),
        })
    }

    pub(crate) fn is_known(&self) -> bool {
        self.flags.is_some()
    }

    fn flag(&self, bit: u8) -> bool {
        self.flags.is_some_and(|f| f & bit != 0)
    }

    pub fn is_occupied(&self) -> bool {
        self.flag(OCCUPIED)
    }

    pub fn is_entered(&self) -> bool {
        self.flag(ENTERED)
    }

    pub fn is_slowed(&self) -> bool {
        self.flag(SLOWED)
    }

    pub fn is_stopped(&self) -> bool {
        self.flag(STOPPED)
    }

    /// Direction of travel through the block, once reported.
    pub fn direction(&self) -> Direction {
        match self.flags {
            None => Direction::Unknown,
            Some(f) if f & LEFT_TO_RIGHT != 0 => Direction::LeftToRight,
            Some(_) => Direction::RightToLeft,
        }
    }

    pub fn prev_block(&self) -> Option<ComponentKey> {
        self.prev_block.map(|b| (Scope::Block, u16::from(b)))
    }

    pub fn next_block(&self) -> Option<ComponentKey> {
        self.next_block.map(|b| (Scope::Block, u16::from(b)))
    }

    pub fn sensor_track(&self) -> Option<ComponentKey> {
        self.sensor_track.map(|s| (Scope::Irda, u16::from(s)))
    }

    pub fn switch(&self) -> Option<ComponentKey> {
        self.switch.map(|s| (Scope::Switch, u16::from(s)))
    }

    /// Engine or train in the block.
    pub fn occupant(&self) -> Option<ComponentKey> {
        self.occupant.map(|o| (o.scope, o.address))
    }

    pub fn occupant_direction(&self) -> Direction {
        self.occupant.map(|o| o.direction).unwrap_or_default()
    }
}
