//! Sensor track (IRDA) state.
//!
//! Holds the sensor's configuration and the last engine or train seen
//! passing it. Engine details from a pass-by report are folded into the
//! engine's own state by the store, not here.

use raillib_core::{Direction, Result, Scope};
use raillib_pdi::PdiReq;
use raillib_pdi::action::{CommonAction, IrdaAction};
use raillib_pdi::irda::{ANY_LOCO, IrdaBody, IrdaConfig, IrdaReq, IrdaSequence};
use tokio::time::Instant;
use tracing::trace;

use crate::component::{Common, Settings, Update};

#[derive(Debug, Clone)]
pub struct IrdaState {
    pub(crate) common: Common,
    tmcc_id: Option<u8>,
    sequence: Option<IrdaSequence>,
    loco_rl: Option<u8>,
    loco_lr: Option<u8>,
    last_engine_id: Option<u16>,
    last_train_id: Option<u16>,
    last_direction: Direction,
    last_seen: Option<Instant>,
}

fn nonzero(id: u8) -> Option<u16> {
    (id != 0).then_some(u16::from(id))
}

impl IrdaState {
    pub(crate) fn new(address: Option<u16>, settings: Settings) -> Result<Self> {
        Ok(IrdaState {
            common: Common::new(Scope::Irda, address, settings)?,
            tmcc_id: None,
            sequence: None,
            loco_rl: None,
            loco_lr: None,
            last_engine_id: None,
            last_train_id: None,
            last_direction: Direction::Unknown,
            last_seen: None,
        })
    }

    pub(crate) fn update(&mut self, update: Update<'_>) -> Result<bool> {
        self.common.accept(&update)?;
        let Update::Pdi(PdiReq::Irda(req)) = update else {
            return Ok(false);
        };
        if req.is_error() {
            return Ok(false);
        }
        match &req.body {
            IrdaBody::Config(config) => {
                self.tmcc_id = Some(config.tmcc_id);
                self.sequence = Some(config.sequence);
                self.loco_rl = Some(config.loco_rl);
                self.loco_lr = Some(config.loco_lr);
            }
            IrdaBody::Sequence(sequence) => self.sequence = Some(*sequence),
            IrdaBody::Data(data) => {
                self.last_engine_id = nonzero(data.engine_id);
                self.last_train_id = nonzero(data.train_id);
                self.last_direction = data.direction();
                self.last_seen = Some(Instant::now());
                trace!(
                    address = req.address,
                    engine = data.engine_id,
                    train = data.train_id,
                    direction = ?self.last_direction,
                    "sensor track pass-by"
                );
            }
            _ => return Ok(false),
        }
        self.common.record(update);
        Ok(true)
    }

    /// A config report carrying the sequence and loco filters.
    pub(crate) fn as_bytes(&self) -> Result<Vec<u8>> {
        let (Some(address), Some(sequence)) = (self.common.record_no(), self.sequence) else {
            return Ok(Vec::new());
        };
        let config = IrdaConfig {
            tmcc_id: self.tmcc_id.unwrap_or(address),
            debug: 0,
            sequence,
            loco_rl: self.loco_rl.unwrap_or(ANY_LOCO),
            loco_lr: self.loco_lr.unwrap_or(ANY_LOCO),
        };
        let action = IrdaAction::Common(CommonAction::Config);
        Ok(IrdaReq::rx(address, action, IrdaBody::Config(config))?.as_bytes())
    }

    pub(crate) fn is_known(&self) -> bool {
        self.sequence.is_some() || self.last_seen.is_some()
    }

    pub fn sequence(&self) -> Option<IrdaSequence> {
        self.sequence
    }

    /// Engine filter for right-to-left passes; `None` for any engine.
    pub fn loco_rl(&self) -> Option<u8> {
        self.loco_rl.filter(|&id| id != ANY_LOCO)
    }

    /// Engine filter for left-to-right passes; `None` for any engine.
    pub fn loco_lr(&self) -> Option<u8> {
        self.loco_lr.filter(|&id| id != ANY_LOCO)
    }

    pub fn last_engine_id(&self) -> Option<u16> {
        self.last_engine_id
    }

    pub fn last_train_id(&self) -> Option<u16> {
        self.last_train_id
    }

    pub fn last_direction(&self) -> Direction {
        self.last_direction
    }

    pub fn last_seen(&self) -> Option<Instant> {
        self.last_seen
    }
}
