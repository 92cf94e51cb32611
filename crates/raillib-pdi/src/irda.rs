//! IRDA sensor track.
//!
//! A sensor track reads the IR beacon of a passing engine and reports it
//! with an unsolicited Data frame. It can also fire a configured sound or
//! speed sequence at the engine as it passes.
//!
//! Data body layout after the action byte:
//!
//! ```text
//!  0  valid1 (LE16)     12  runtime (LE16)    21  name (33)
//!  2  valid2 (LE16)     14  product rev       54  number (5)
//!  4  direction         15  product id        59  TSDB left
//!  5  engine id         16  bluetooth id (2)  60  TSDB right
//!  6  train id          18  year (2 ASCII)    61  max speed
//!  7  status            20  spare             62  odometer (LE24)
//!  8  fuel  9 water  10 burn  11 fuel/water/burn mask
//! ```
//!
//! Older boards stop after the mask byte; the product block is optional.

use bytes::{BufMut, BytesMut};
use raillib_core::{Direction, Error, Result, Scope};

use crate::action::{CommonAction, IrdaAction};
use crate::command::{PdiCommand, PdiDevice};
use crate::lcs::{CommonBody, ConfigHeader, LcsBody, LcsReq};
use crate::wire::{Reader, put_le24, put_text};

/// Loco filter value matching any engine.
pub const ANY_LOCO: u8 = 255;

const PRODUCT_LEN: usize = 53;

/// Sequence fired when an engine passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IrdaSequence {
    #[default]
    None,
    CrossingGateNone,
    NoneCrossingGate,
    BellNone,
    NoneBell,
    JourneyBeginJourneyEnd,
    JourneyEndJourneyBegin,
    SlowSpeedNormalSpeed,
    NormalSpeedSlowSpeed,
    Recording,
}

impl IrdaSequence {
    pub const ALL: [IrdaSequence; 10] = [
        IrdaSequence::None,
        IrdaSequence::CrossingGateNone,
        IrdaSequence::NoneCrossingGate,
        IrdaSequence::BellNone,
        IrdaSequence::NoneBell,
        IrdaSequence::JourneyBeginJourneyEnd,
        IrdaSequence::JourneyEndJourneyBegin,
        IrdaSequence::SlowSpeedNormalSpeed,
        IrdaSequence::NormalSpeedSlowSpeed,
        IrdaSequence::Recording,
    ];

    pub fn from_byte(b: u8) -> Result<Self> {
        IrdaSequence::ALL
            .get(usize::from(b))
            .copied()
            .ok_or_else(|| Error::Protocol(format!("unknown IRDA sequence {b}")))
    }

    pub fn as_byte(self) -> u8 {
        IrdaSequence::ALL
            .iter()
            .position(|&s| s == self)
            .map(|p| p as u8)
            .unwrap_or(0)
    }
}

/// State of the sequence recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    NoRecording,
    Idle,
    Playback,
    Armed,
    Recording,
    Other(u8),
}

impl RecordStatus {
    pub fn from_byte(b: u8) -> Self {
        match b {
            0 => RecordStatus::NoRecording,
            1 => RecordStatus::Idle,
            2 => RecordStatus::Playback,
            3 => RecordStatus::Armed,
            4 => RecordStatus::Recording,
            other => RecordStatus::Other(other),
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            RecordStatus::NoRecording => 0,
            RecordStatus::Idle => 1,
            RecordStatus::Playback => 2,
            RecordStatus::Armed => 3,
            RecordStatus::Recording => 4,
            RecordStatus::Other(b) => b,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RecordStatus::NoRecording => "No Recording",
            RecordStatus::Idle => "Idle",
            RecordStatus::Playback => "Playback...",
            RecordStatus::Armed => "Armed...",
            RecordStatus::Recording => "Recording...",
            RecordStatus::Other(_) => "NA",
        }
    }
}

/// Label for a product id byte.
pub fn product_label(id: u8) -> &'static str {
    match id {
        0x02 => "Diesel",
        0x03 => "Diesel Switcher",
        0x04 => "Steam",
        0x05 => "Steam Switcher",
        0x06 => "Subway",
        0x07 => "Electric",
        0x08 => "Acela",
        0x09 => "Pullmor Diesel",
        0x0A => "Pullmor Steam",
        0x0B => "Breakdown",
        0x0C => "Track Crane",
        0x0D => "Accessory",
        0x0E => "Stock Car",
        0x0F => "Passenger Car",
        _ => "NA",
    }
}

/// IRDA configuration. The header's mode byte carries the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrdaConfig {
    pub tmcc_id: u8,
    pub debug: u8,
    pub sequence: IrdaSequence,
    /// Only fire for this engine when passing right to left.
    pub loco_rl: u8,
    /// Only fire for this engine when passing left to right.
    pub loco_lr: u8,
}

impl IrdaConfig {
    fn decode(r: &mut Reader<'_>) -> Result<Self> {
        let header = ConfigHeader::decode(r)?;
        Ok(IrdaConfig {
            tmcc_id: header.tmcc_id,
            debug: header.debug,
            sequence: IrdaSequence::from_byte(header.mode)?,
            loco_rl: r.opt_u8().unwrap_or(ANY_LOCO),
            loco_lr: r.opt_u8().unwrap_or(ANY_LOCO),
        })
    }

    fn encode(&self, buf: &mut BytesMut) {
        ConfigHeader {
            tmcc_id: self.tmcc_id,
            debug: self.debug,
            mode: self.sequence.as_byte(),
        }
        .encode(buf);
        buf.put_u8(self.loco_rl);
        buf.put_u8(self.loco_lr);
    }
}

/// Product identity block of a Data report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrdaProduct {
    pub runtime: u16,
    pub prod_rev: u8,
    pub prod_id: u8,
    pub bt_id: u16,
    /// Full year of manufacture.
    pub year: u16,
    pub name: String,
    pub number: String,
    pub tsdb_left: u8,
    pub tsdb_right: u8,
    pub max_speed: u8,
    pub odometer: u32,
}

impl IrdaProduct {
    fn decode(r: &mut Reader<'_>) -> Result<Self> {
        let runtime = r.le16()?;
        let prod_rev = r.u8()?;
        let prod_id = r.u8()?;
        let bt_id = r.le16()?;
        let digits = r.bytes(2)?;
        let year = std::str::from_utf8(digits)
            .ok()
            .and_then(|s| s.trim().parse::<u16>().ok())
            .map(|y| 2000 + y)
            .unwrap_or(0);
        r.skip(1)?;
        Ok(IrdaProduct {
            runtime,
            prod_rev,
            prod_id,
            bt_id,
            year,
            name: r.text(33)?,
            number: r.text(5)?,
            tsdb_left: r.u8()?,
            tsdb_right: r.u8()?,
            max_speed: r.u8()?,
            odometer: r.le24()?,
        })
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u16_le(self.runtime);
        buf.put_u8(self.prod_rev);
        buf.put_u8(self.prod_id);
        buf.put_u16_le(self.bt_id);
        if self.year >= 2000 {
            put_text(buf, &format!("{:02}", (self.year - 2000) % 100), 2);
        } else {
            buf.put_u16(0);
        }
        buf.put_u8(0);
        put_text(buf, &self.name, 33);
        put_text(buf, &self.number, 5);
        buf.put_u8(self.tsdb_left);
        buf.put_u8(self.tsdb_right);
        buf.put_u8(self.max_speed);
        put_le24(buf, self.odometer);
    }

    pub fn product_type(&self) -> &'static str {
        product_label(self.prod_id)
    }
}

/// An engine passing the sensor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrdaData {
    pub valid1: u16,
    pub valid2: u16,
    /// Raw direction: 0 right-to-left, 1 left-to-right.
    pub dir: u8,
    pub engine_id: u8,
    pub train_id: u8,
    pub status: u8,
    pub fuel: u8,
    pub water: u8,
    pub burn: u8,
    pub fwb_mask: u8,
    pub product: Option<IrdaProduct>,
}

impl IrdaData {
    pub fn direction(&self) -> Direction {
        match self.dir {
            0 => Direction::RightToLeft,
            1 => Direction::LeftToRight,
            _ => Direction::Unknown,
        }
    }

    fn decode(r: &mut Reader<'_>) -> Result<Self> {
        let mut data = IrdaData {
            valid1: r.le16()?,
            valid2: r.le16()?,
            dir: r.u8()?,
            engine_id: r.u8()?,
            train_id: r.u8()?,
            status: r.u8()?,
            fuel: r.u8()?,
            water: r.u8()?,
            burn: r.u8()?,
            fwb_mask: r.u8()?,
            product: None,
        };
        if r.remaining() >= PRODUCT_LEN {
            data.product = Some(IrdaProduct::decode(r)?);
        }
        Ok(data)
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u16_le(self.valid1);
        buf.put_u16_le(self.valid2);
        buf.put_u8(self.dir);
        buf.put_u8(self.engine_id);
        buf.put_u8(self.train_id);
        buf.put_u8(self.status);
        buf.put_u8(self.fuel);
        buf.put_u8(self.water);
        buf.put_u8(self.burn);
        buf.put_u8(self.fwb_mask);
        if let Some(product) = &self.product {
            product.encode(buf);
        }
    }
}

/// Body of an IRDA request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrdaBody {
    Common(CommonBody),
    Config(IrdaConfig),
    Data(IrdaData),
    Sequence(IrdaSequence),
    Record(RecordStatus),
    /// Diagnostic dump, kept opaque.
    DiagData(Vec<u8>),
}

impl LcsBody for IrdaBody {
    type Action = IrdaAction;
    const DEVICE: PdiDevice = PdiDevice::Irda;

    fn empty() -> Self {
        IrdaBody::Common(CommonBody::Empty)
    }

    fn decode(command: PdiCommand, action: IrdaAction, r: &mut Reader<'_>) -> Result<Self> {
        Ok(match action {
            IrdaAction::Common(CommonAction::Config) => IrdaBody::Config(IrdaConfig::decode(r)?),
            IrdaAction::Common(other) => IrdaBody::Common(CommonBody::decode(command, other, r)?),
            IrdaAction::Data => IrdaBody::Data(IrdaData::decode(r)?),
            IrdaAction::Sequence => IrdaBody::Sequence(IrdaSequence::from_byte(r.u8()?)?),
            IrdaAction::Record => IrdaBody::Record(RecordStatus::from_byte(r.u8()?)),
            IrdaAction::DiagData => IrdaBody::DiagData(r.rest().to_vec()),
        })
    }

    fn encode(&self, _command: PdiCommand, buf: &mut BytesMut) {
        match self {
            IrdaBody::Common(body) => body.encode(buf),
            IrdaBody::Config(config) => config.encode(buf),
            IrdaBody::Data(data) => data.encode(buf),
            IrdaBody::Sequence(seq) => buf.put_u8(seq.as_byte()),
            IrdaBody::Record(status) => buf.put_u8(status.as_byte()),
            IrdaBody::DiagData(raw) => buf.put_slice(raw),
        }
    }

    /// Info reports describe the board as an accessory.
    fn scope(action: IrdaAction) -> Scope {
        match action {
            IrdaAction::Common(CommonAction::Info) => Scope::Acc,
            _ => Scope::Irda,
        }
    }
}

pub type IrdaReq = LcsReq<IrdaBody>;

impl IrdaReq {
    /// Configure the sequence fired for passing engines.
    pub fn set_sequence(address: u8, sequence: IrdaSequence) -> Result<Self> {
        Self::set(address, IrdaAction::Sequence, IrdaBody::Sequence(sequence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::PdiFrame;

    fn data_payload(with_product: bool) -> Vec<u8> {
        let mut p = vec![
            3, 0x10, // address, action
            0xFF, 0xFF, 0x03, 0x00, // valid1, valid2
            1, 12, 0, 0, // dir, engine, train, status
            200, 150, 100, 0x07, // fuel, water, burn, mask
        ];
        if with_product {
            p.extend_from_slice(&[0x34, 0x12, 0x01, 0x04, 0xCD, 0xAB]);
            p.extend_from_slice(b"19");
            p.push(0);
            let mut name = b"BIG BOY".to_vec();
            name.resize(33, 0);
            p.extend(name);
            p.extend_from_slice(b"4014\0");
            p.extend_from_slice(&[1, 8, 120, 0x10, 0x27, 0x00]);
        }
        p
    }

    #[test]
    fn data_with_product_block() {
        let frame = PdiFrame::new(PdiCommand::IrdaRx, data_payload(true));
        let req = IrdaReq::from_frame(&frame).unwrap();
        assert_eq!(req.scope(), Scope::Irda);
        let IrdaBody::Data(ref data) = req.body else {
            panic!("expected data");
        };
        assert_eq!(data.engine_id, 12);
        assert_eq!(data.direction(), Direction::LeftToRight);
        let product = data.product.as_ref().unwrap();
        assert_eq!(product.runtime, 0x1234);
        assert_eq!(product.product_type(), "Steam");
        assert_eq!(product.bt_id, 0xABCD);
        assert_eq!(product.year, 2019);
        assert_eq!(product.name, "BIG BOY");
        assert_eq!(product.number, "4014");
        assert_eq!(product.max_speed, 120);
        assert_eq!(product.odometer, 10_000);
        assert_eq!(req.to_frame().payload, data_payload(true));
    }

    #[test]
    fn data_without_product_block() {
        let frame = PdiFrame::new(PdiCommand::IrdaRx, data_payload(false));
        let req = IrdaReq::from_frame(&frame).unwrap();
        let IrdaBody::Data(data) = req.body else {
            panic!("expected data");
        };
        assert_eq!(data.fuel, 200);
        assert!(data.product.is_none());
    }

    #[test]
    fn config_carries_sequence_and_filters() {
        let frame = PdiFrame::new(PdiCommand::IrdaRx, vec![3, 0x03, 3, 0, 0, 0, 5, 255, 12]);
        let req = IrdaReq::from_frame(&frame).unwrap();
        assert_eq!(
            req.body,
            IrdaBody::Config(IrdaConfig {
                tmcc_id: 3,
                debug: 0,
                sequence: IrdaSequence::JourneyBeginJourneyEnd,
                loco_rl: ANY_LOCO,
                loco_lr: 12,
            })
        );
    }

    #[test]
    fn info_is_accessory_scope() {
        let frame = PdiFrame::new(PdiCommand::IrdaRx, vec![3, 0x04, 3, 1, 0x20, 120]);
        assert_eq!(IrdaReq::from_frame(&frame).unwrap().scope(), Scope::Acc);
    }

    #[test]
    fn sequence_set() {
        let req = IrdaReq::set_sequence(3, IrdaSequence::BellNone).unwrap();
        assert_eq!(req.to_frame().payload, vec![3, 0x11, 3]);
        assert!(IrdaSequence::from_byte(10).is_err());
    }

    #[test]
    fn record_status_labels() {
        let frame = PdiFrame::new(PdiCommand::IrdaRx, vec![3, 0x12, 3]);
        let req = IrdaReq::from_frame(&frame).unwrap();
        assert_eq!(req.body, IrdaBody::Record(RecordStatus::Armed));
        assert_eq!(RecordStatus::Armed.label(), "Armed...");
    }

    #[test]
    fn data_cannot_be_queried() {
        assert!(IrdaReq::get(3, IrdaAction::Data).is_err());
    }
}
