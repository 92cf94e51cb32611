//! Raw Base memory access (`BASE_MEMORY`).
//!
//! Where a record frame carries a fixed layout, a memory frame reads or
//! writes an arbitrary byte range of an engine or train record:
//!
//! ```text
//! payload: <record_no> <flags> <status> <record_type> <start:LE32> <port> <len> [<data>...]
//! ```
//!
//! [`MemoryField`] maps offsets within an engine/train record to named
//! fields so that a memory frame can be applied to component state.
//! Values are stored Base-scaled; see the scaling helpers in
//! [`base`](crate::base).

use bytes::{BufMut, BytesMut};
use raillib_core::{Error, Result, Scope};

use crate::base::{READ_FLAGS, WRITE_FLAGS};
use crate::command::PdiCommand;
use crate::consist::ConsistComponent;
use crate::frame::PdiFrame;
use crate::wire::{Reader, decode_text, put_text};

/// Port number of the Base's record EEPROM.
pub const EEPROM_PORT: u8 = 2;

/// Length of a complete engine or train memory record.
pub const RECORD_LEN: usize = 0xC0;

fn record_type(scope: Scope) -> Option<u8> {
    Some(match scope {
        Scope::Engine => 1,
        Scope::Train => 2,
        Scope::Acc => 3,
        Scope::Route => 5,
        Scope::Switch => 6,
        _ => return None,
    })
}

fn record_scope(raw: u8) -> Option<Scope> {
    Some(match raw {
        1 => Scope::Engine,
        2 => Scope::Train,
        3 => Scope::Acc,
        5 => Scope::Route,
        6 => Scope::Switch,
        _ => return None,
    })
}

/// A named field of an engine or train memory record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryField {
    PrevLink,
    NextLink,
    BtId,
    Speed,
    TargetSpeed,
    TrainBrake,
    /// RPM in the low three bits, Base-encoded labor above.
    RpmLabor,
    Momentum,
    RoadName,
    RoadNumberLen,
    RoadNumber,
    EngineType,
    ControlType,
    SoundType,
    EngineClass,
    TsdbLeft,
    TsdbRight,
    Smoke,
    SpeedLimit,
    MaxSpeed,
    ConsistFlags,
    ConsistComps,
    /// D4 records only.
    TmccId,
    /// D4 records only.
    Timestamp,
}

impl MemoryField {
    const ENGINE: [MemoryField; 22] = [
        MemoryField::PrevLink,
        MemoryField::NextLink,
        MemoryField::BtId,
        MemoryField::Speed,
        MemoryField::TargetSpeed,
        MemoryField::TrainBrake,
        MemoryField::RpmLabor,
        MemoryField::Momentum,
        MemoryField::RoadName,
        MemoryField::RoadNumberLen,
        MemoryField::RoadNumber,
        MemoryField::EngineType,
        MemoryField::ControlType,
        MemoryField::SoundType,
        MemoryField::EngineClass,
        MemoryField::TsdbLeft,
        MemoryField::TsdbRight,
        MemoryField::Smoke,
        MemoryField::SpeedLimit,
        MemoryField::MaxSpeed,
        MemoryField::TmccId,
        MemoryField::Timestamp,
    ];

    pub fn offset(self) -> u32 {
        match self {
            MemoryField::PrevLink => 0x00,
            MemoryField::NextLink => 0x01,
            MemoryField::BtId => 0x04,
            MemoryField::Speed => 0x07,
            MemoryField::TargetSpeed => 0x08,
            MemoryField::TrainBrake => 0x09,
            MemoryField::RpmLabor => 0x0C,
            MemoryField::Momentum => 0x18,
            MemoryField::RoadName => 0x1F,
            MemoryField::RoadNumberLen => 0x3E,
            MemoryField::RoadNumber => 0x3F,
            MemoryField::EngineType => 0x43,
            MemoryField::ControlType => 0x44,
            MemoryField::SoundType => 0x45,
            MemoryField::EngineClass => 0x46,
            MemoryField::TsdbLeft => 0x59,
            MemoryField::TsdbRight => 0x5B,
            MemoryField::Smoke => 0x69,
            MemoryField::SpeedLimit => 0x6A,
            MemoryField::MaxSpeed => 0x6B,
            MemoryField::ConsistFlags => 0x6F,
            MemoryField::ConsistComps => 0x70,
            MemoryField::TmccId => 0xB8,
            MemoryField::Timestamp => 0xBC,
        }
    }

    pub fn size(self) -> usize {
        match self {
            MemoryField::BtId => 2,
            MemoryField::RoadName => 31,
            MemoryField::RoadNumber | MemoryField::TmccId | MemoryField::Timestamp => 4,
            MemoryField::ConsistComps => 32,
            _ => 1,
        }
    }

    pub fn is_d4_only(self) -> bool {
        matches!(self, MemoryField::TmccId | MemoryField::Timestamp)
    }

    /// Fields present in `scope`'s records.
    pub fn fields(scope: Scope) -> impl Iterator<Item = MemoryField> {
        let train = scope == Scope::Train;
        let consist = [MemoryField::ConsistFlags, MemoryField::ConsistComps]
            .into_iter()
            .filter(move |_| train);
        let motive = scope.is_motive();
        Self::ENGINE.into_iter().filter(move |_| motive).chain(consist)
    }

    /// Field starting exactly at `offset` in `scope`'s records.
    pub fn at(scope: Scope, offset: u32) -> Option<MemoryField> {
        Self::fields(scope).find(|f| f.offset() == offset)
    }

    /// Decode this field from exactly [`size`](Self::size) bytes.
    pub fn decode(self, raw: &[u8]) -> Result<MemoryValue> {
        if raw.len() != self.size() {
            return Err(Error::Protocol(format!(
                "{self:?} needs {} bytes, got {}",
                self.size(),
                raw.len()
            )));
        }
        Ok(match self {
            MemoryField::BtId => MemoryValue::Word(u16::from_le_bytes([raw[0], raw[1]])),
            MemoryField::Timestamp => {
                MemoryValue::Long(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
            }
            MemoryField::RoadName | MemoryField::RoadNumber => {
                MemoryValue::Text(decode_text(raw))
            }
            MemoryField::TmccId => {
                let text = decode_text(raw);
                let id = text
                    .parse()
                    .map_err(|_| Error::Protocol(format!("bad TMCC id {text:?}")))?;
                MemoryValue::Word(id)
            }
            MemoryField::ConsistComps => MemoryValue::Consist(ConsistComponent::decode_list(raw)),
            _ => MemoryValue::Byte(raw[0]),
        })
    }

    /// Encode `value` into exactly [`size`](Self::size) bytes.
    pub fn encode(self, value: &MemoryValue) -> Result<Vec<u8>> {
        let mut buf = BytesMut::with_capacity(self.size());
        match (self, value) {
            (MemoryField::TmccId, MemoryValue::Word(id)) => {
                buf.put_slice(format!("{id:04}").as_bytes());
            }
            (MemoryField::BtId, MemoryValue::Word(w)) => buf.put_u16_le(*w),
            (MemoryField::Timestamp, MemoryValue::Long(l)) => buf.put_u32_le(*l),
            (MemoryField::RoadName | MemoryField::RoadNumber, MemoryValue::Text(t)) => {
                put_text(&mut buf, t, self.size())
            }
            (MemoryField::ConsistComps, MemoryValue::Consist(c)) => {
                ConsistComponent::encode_list(c, 16, &mut buf)
            }
            (f, MemoryValue::Byte(b)) if f.size() == 1 => buf.put_u8(*b),
            (f, v) => {
                return Err(Error::InvalidParameter(format!(
                    "{v:?} does not fit memory field {f:?}"
                )));
            }
        }
        Ok(buf.to_vec())
    }
}

/// A decoded memory field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryValue {
    Byte(u8),
    Word(u16),
    Long(u32),
    Text(String),
    Consist(Vec<ConsistComponent>),
}

impl MemoryValue {
    pub fn as_byte(&self) -> Option<u8> {
        match self {
            MemoryValue::Byte(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            MemoryValue::Text(t) => Some(t),
            _ => None,
        }
    }
}

/// A raw read or write of a Base record's memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseMemoryReq {
    pub record_no: u8,
    pub flags: u8,
    pub status: u8,
    /// Record type; `None` for a type the Base reported but raillib does
    /// not model.
    pub scope: Option<Scope>,
    pub start: u32,
    pub port: u8,
    pub data_len: u8,
    pub data: Vec<u8>,
}

impl BaseMemoryReq {
    /// Read `len` bytes of `scope` record `record_no` starting at `start`.
    pub fn read(scope: Scope, record_no: u8, start: u32, len: u8) -> Result<Self> {
        Self::check_scope(scope)?;
        Ok(BaseMemoryReq {
            record_no,
            flags: READ_FLAGS,
            status: 0,
            scope: Some(scope),
            start,
            port: EEPROM_PORT,
            data_len: len,
            data: Vec::new(),
        })
    }

    /// Read one named field.
    pub fn read_field(scope: Scope, record_no: u8, field: MemoryField) -> Result<Self> {
        Self::read(scope, record_no, field.offset(), field.size() as u8)
    }

    /// Write one named field.
    pub fn write_field(
        scope: Scope,
        record_no: u8,
        field: MemoryField,
        value: &MemoryValue,
    ) -> Result<Self> {
        Self::check_scope(scope)?;
        if MemoryField::at(scope, field.offset()) != Some(field) {
            return Err(Error::InvalidParameter(format!(
                "{field:?} is not part of a {scope} record"
            )));
        }
        let data = field.encode(value)?;
        Ok(BaseMemoryReq {
            record_no,
            flags: WRITE_FLAGS,
            status: 0,
            scope: Some(scope),
            start: field.offset(),
            port: EEPROM_PORT,
            data_len: data.len() as u8,
            data,
        })
    }

    fn check_scope(scope: Scope) -> Result<()> {
        record_type(scope)
            .map(|_| ())
            .ok_or_else(|| Error::InvalidParameter(format!("{scope} has no memory record")))
    }

    pub fn from_frame(frame: &PdiFrame) -> Result<Self> {
        if frame.command != PdiCommand::BaseMemory {
            return Err(Error::Protocol(format!("{} is not a memory frame", frame.command)));
        }
        let mut r = Reader::new(&frame.payload);
        Ok(BaseMemoryReq {
            record_no: r.u8()?,
            flags: r.u8()?,
            status: r.u8()?,
            scope: record_scope(r.u8()?),
            start: r.le32()?,
            port: r.u8()?,
            data_len: r.u8()?,
            data: r.rest().to_vec(),
        })
    }

    pub fn to_frame(&self) -> PdiFrame {
        let mut buf = BytesMut::with_capacity(10 + self.data.len());
        buf.put_u8(self.record_no);
        buf.put_u8(self.flags);
        buf.put_u8(self.status);
        buf.put_u8(self.scope.and_then(record_type).unwrap_or(1));
        buf.put_u32_le(self.start);
        buf.put_u8(self.port);
        buf.put_u8(self.data_len);
        buf.put_slice(&self.data);
        PdiFrame::new(PdiCommand::BaseMemory, buf.to_vec())
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        self.to_frame().encode()
    }

    pub fn address(&self) -> u16 {
        u16::from(self.record_no)
    }

    /// `true` when the frame carries a complete engine/train record.
    pub fn is_full_record(&self) -> bool {
        self.start == 0 && self.data.len() >= RECORD_LEN
    }

    /// Every known field wholly contained in the carried data.
    pub fn fields(&self) -> Vec<(MemoryField, MemoryValue)> {
        let Some(scope) = self.scope else {
            return Vec::new();
        };
        let end = self.start as usize + self.data.len();
        MemoryField::fields(scope)
            .filter(|f| !f.is_d4_only())
            .filter_map(|f| {
                let at = f.offset() as usize;
                if at < self.start as usize || at + f.size() > end {
                    return None;
                }
                let lo = at - self.start as usize;
                f.decode(&self.data[lo..lo + f.size()]).ok().map(|v| (f, v))
            })
            .collect()
    }

    /// The single field this frame starts at, if it is exactly one field.
    pub fn field(&self) -> Option<(MemoryField, MemoryValue)> {
        let field = MemoryField::at(self.scope?, self.start)?;
        if self.data.len() != field.size() {
            return None;
        }
        field.decode(&self.data).ok().map(|v| (field, v))
    }
}
