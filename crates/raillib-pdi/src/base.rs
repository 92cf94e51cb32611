//! Base command station records.
//!
//! The Base keeps one record per engine, train, accessory, switch, and
//! route, plus a record describing itself. A record frame starts with a
//! common header:
//!
//! ```text
//! <record_no> <flags> <status> <spare> <valid1:LE16> [<valid2:LE16>] <fields>...
//! ```
//!
//! `valid1`/`valid2` flag which fields of the record carry meaningful data
//! (see [`EngineBit`]). A frame that stops after the spare byte is an
//! acknowledge: it says nothing about the record contents, so it decodes
//! with `valid == None` rather than as an all-zero record.
//!
//! Speed updates (`UPDATE_ENGINE_SPEED`/`UPDATE_TRAIN_SPEED`) are a compact
//! `<record_no> <speed>` form and are decoded by [`SpeedUpdate`].

use bytes::{BufMut, BytesMut};
use raillib_core::{Error, Result, Scope};

use crate::command::PdiCommand;
use crate::consist::ConsistComponent;
use crate::frame::PdiFrame;
use crate::wire::{Reader, decode_text, put_text};

/// Flags byte the Base uses for host-originated record writes.
pub const WRITE_FLAGS: u8 = 0xC2;

/// Flags byte for a plain record query.
pub const READ_FLAGS: u8 = 0x02;

/// Link value marking an unused record.
pub const NO_LINK: u8 = 0xFF;

/// Link value written into synthesized records.
const SYNTH_LINK: u8 = 101;

const NAME_LEN: usize = 33;
const NUMBER_LEN: usize = 5;
const MAX_CONSIST: usize = 16;
const MAX_ROUTE: usize = 16;

/// Bit positions in the combined validity mask of an engine or train
/// record. Bits 0-15 live in `valid1`, 16-31 in `valid2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EngineBit {
    ReverseLink = 0,
    ForwardLink = 1,
    RoadName = 2,
    RoadNumber = 3,
    LocoType = 4,
    ControlType = 5,
    SoundType = 6,
    ClassType = 7,
    TsdbLeft = 8,
    TsdbRight = 9,
    Spare = 10,
    Speed = 11,
    RunLevel = 12,
    LaborBias = 13,
    SpeedLimit = 14,
    MaxSpeed = 15,
    FuelLevel = 16,
    WaterLevel = 17,
    TrainAddress = 18,
    TrainPosition = 19,
    SmokeLevel = 20,
    DitchLight = 21,
    TrainBrake = 22,
    Momentum = 23,
}

impl EngineBit {
    pub fn mask(self) -> u32 {
        1 << (self as u8)
    }
}

/// Validity mask for a synthesized accessory, switch, or route record
/// (name and number).
pub const COMPONENT_SYNTH_VALID: u32 = 0b1100;

/// Validity mask for a synthesized Base record.
pub const BASE_SYNTH_VALID: u32 = 0b1111;

// ---------------------------------------------------------------------------
// Scaling
// ---------------------------------------------------------------------------

/// Convert a Base labor bias byte (0-31, 12-biased) to a TMCC labor value.
pub fn labor_to_tmcc(raw: u8) -> u8 {
    if raw <= 19 { raw + 12 } else { raw - 20 }
}

/// Inverse of [`labor_to_tmcc`].
pub fn labor_to_base(labor: u8) -> u8 {
    let labor = labor.min(31);
    if labor >= 12 { labor - 12 } else { labor + 20 }
}

/// Train brake, Base scale (0-15) to TMCC scale (0-7).
pub fn brake_to_tmcc(raw: u8) -> u8 {
    ((f32::from(raw) * 0.4667).round() as u8).min(7)
}

/// Train brake, TMCC scale (0-7) to Base scale (0-15).
pub fn brake_to_base(brake: u8) -> u8 {
    ((f32::from(brake) * 2.143).round() as u8).min(15)
}

/// Momentum, Base scale (0-127) to TMCC scale (0-7).
pub fn momentum_to_tmcc(raw: u8) -> u8 {
    ((f32::from(raw) * 0.05512).round() as u8).min(7)
}

/// Momentum, TMCC scale (0-7) to Base scale (0-127).
pub fn momentum_to_base(momentum: u8) -> u8 {
    ((f32::from(momentum) * 18.14).round() as u8).min(127)
}

/// Route throw rate byte (1-9) to seconds (0.00-2.00 in 0.25 s steps).
pub fn throw_rate_secs(raw: u8) -> Option<f32> {
    (1..=9).contains(&raw).then(|| f32::from(raw - 1) * 0.25)
}

/// Inverse of [`throw_rate_secs`]; out-of-range values encode as 2.00 s.
pub fn throw_rate_byte(secs: f32) -> u8 {
    if !(0.0..2.0).contains(&secs) {
        return 9;
    }
    (secs / 0.25).floor() as u8 + 1
}

// ---------------------------------------------------------------------------
// Record bodies
// ---------------------------------------------------------------------------

/// Fields of an engine or train record.
///
/// Every field is `None` when the frame ended before it. Whether a present
/// field is meaningful is decided by the record's validity mask.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MotiveRecord {
    pub rev_link: Option<u8>,
    pub fwd_link: Option<u8>,
    pub name: Option<String>,
    pub number: Option<String>,
    pub loco_type: Option<u8>,
    pub control_type: Option<u8>,
    pub sound_type: Option<u8>,
    pub class_type: Option<u8>,
    pub tsdb_left: Option<u8>,
    pub tsdb_right: Option<u8>,
    pub spare: Option<u8>,
    pub speed: Option<u8>,
    pub run_level: Option<u8>,
    /// Base-encoded; see [`labor_to_tmcc`].
    pub labor_bias: Option<u8>,
    pub speed_limit: Option<u8>,
    pub max_speed: Option<u8>,
    pub fuel: Option<u8>,
    pub water: Option<u8>,
    pub train_address: Option<u8>,
    pub train_position: Option<u8>,
    /// 0 off, 1 low, 2 medium, 3 high.
    pub smoke: Option<u8>,
    pub ditch: Option<u8>,
    /// Base scale (0-15).
    pub train_brake: Option<u8>,
    /// Base scale (0-127).
    pub momentum: Option<u8>,
    /// Train records only.
    pub consist_flags: Option<u8>,
    /// Train records only, in wire order.
    pub consist: Vec<ConsistComponent>,
}

impl MotiveRecord {
    fn decode(r: &mut Reader<'_>, train: bool) -> Result<Self> {
        let mut rec = MotiveRecord {
            rev_link: r.opt_u8(),
            fwd_link: r.opt_u8(),
            ..Default::default()
        };
        rec.name = opt_text(r, NAME_LEN);
        rec.number = opt_text(r, NUMBER_LEN);
        let fields = [
            &mut rec.loco_type,
            &mut rec.control_type,
            &mut rec.sound_type,
            &mut rec.class_type,
            &mut rec.tsdb_left,
            &mut rec.tsdb_right,
            &mut rec.spare,
            &mut rec.speed,
            &mut rec.run_level,
            &mut rec.labor_bias,
            &mut rec.speed_limit,
            &mut rec.max_speed,
            &mut rec.fuel,
            &mut rec.water,
            &mut rec.train_address,
            &mut rec.train_position,
            &mut rec.smoke,
            &mut rec.ditch,
            &mut rec.train_brake,
            &mut rec.momentum,
        ];
        for field in fields {
            *field = r.opt_u8();
        }
        if train {
            rec.consist_flags = r.opt_u8();
            rec.consist = ConsistComponent::decode_list(r.rest());
        }
        Ok(rec)
    }

    fn encode(&self, buf: &mut BytesMut, train: bool) {
        buf.put_u8(self.rev_link.unwrap_or(SYNTH_LINK));
        buf.put_u8(self.fwd_link.unwrap_or(SYNTH_LINK));
        put_text(buf, self.name.as_deref().unwrap_or_default(), NAME_LEN);
        put_text(buf, self.number.as_deref().unwrap_or_default(), NUMBER_LEN);
        for field in [
            self.loco_type,
            self.control_type,
            self.sound_type,
            self.class_type,
            self.tsdb_left,
            self.tsdb_right,
            self.spare,
            self.speed,
            self.run_level,
            self.labor_bias,
            self.speed_limit,
            self.max_speed,
            self.fuel,
            self.water,
            self.train_address,
            self.train_position,
            self.smoke,
            self.ditch,
            self.train_brake,
            self.momentum,
        ] {
            buf.put_u8(field.unwrap_or(0));
        }
        if train && (self.consist_flags.is_some() || !self.consist.is_empty()) {
            buf.put_u8(self.consist_flags.unwrap_or(0));
            ConsistComponent::encode_list(&self.consist, MAX_CONSIST, buf);
        }
    }

    /// TMCC-scale labor.
    pub fn labor(&self) -> Option<u8> {
        self.labor_bias.map(labor_to_tmcc)
    }

    /// TMCC-scale momentum.
    pub fn momentum_tmcc(&self) -> Option<u8> {
        self.momentum.map(momentum_to_tmcc)
    }

    /// TMCC-scale train brake.
    pub fn train_brake_tmcc(&self) -> Option<u8> {
        self.train_brake.map(brake_to_tmcc)
    }

    /// Validity mask with a bit set for every field that is present.
    pub fn valid_mask(&self) -> u32 {
        [
            (EngineBit::ReverseLink, self.rev_link.is_some()),
            (EngineBit::ForwardLink, self.fwd_link.is_some()),
            (EngineBit::RoadName, self.name.is_some()),
            (EngineBit::RoadNumber, self.number.is_some()),
            (EngineBit::LocoType, self.loco_type.is_some()),
            (EngineBit::ControlType, self.control_type.is_some()),
            (EngineBit::SoundType, self.sound_type.is_some()),
            (EngineBit::ClassType, self.class_type.is_some()),
            (EngineBit::TsdbLeft, self.tsdb_left.is_some()),
            (EngineBit::TsdbRight, self.tsdb_right.is_some()),
            (EngineBit::Spare, self.spare.is_some()),
            (EngineBit::Speed, self.speed.is_some()),
            (EngineBit::RunLevel, self.run_level.is_some()),
            (EngineBit::LaborBias, self.labor_bias.is_some()),
            (EngineBit::SpeedLimit, self.speed_limit.is_some()),
            (EngineBit::MaxSpeed, self.max_speed.is_some()),
            (EngineBit::FuelLevel, self.fuel.is_some()),
            (EngineBit::WaterLevel, self.water.is_some()),
            (EngineBit::TrainAddress, self.train_address.is_some()),
            (EngineBit::TrainPosition, self.train_position.is_some()),
            (EngineBit::SmokeLevel, self.smoke.is_some()),
            (EngineBit::DitchLight, self.ditch.is_some()),
            (EngineBit::TrainBrake, self.train_brake.is_some()),
            (EngineBit::Momentum, self.momentum.is_some()),
        ]
        .into_iter()
        .filter(|(_, present)| *present)
        .fold(0, |mask, (bit, _)| mask | bit.mask())
    }
}

fn opt_text(r: &mut Reader<'_>, width: usize) -> Option<String> {
    if r.is_empty() {
        return None;
    }
    let n = width.min(r.remaining());
    r.bytes(n).ok().map(decode_text)
}

/// Fields of an accessory, switch, or route record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentRecord {
    pub rev_link: Option<u8>,
    pub fwd_link: Option<u8>,
    pub name: Option<String>,
    pub number: Option<String>,
    /// Route records only: raw component words.
    pub route: Vec<RouteComponent>,
}

/// A switch position held by a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteComponent(pub u16);

impl RouteComponent {
    pub fn new(switch: u8, thrown: bool) -> Self {
        RouteComponent(u16::from(switch & 0x7F) | if thrown { 0x0100 } else { 0 })
    }

    /// Switch address.
    pub fn switch(self) -> u8 {
        (self.0 & 0x7F) as u8
    }

    /// `true` when the route throws this switch to out.
    pub fn is_thrown(self) -> bool {
        self.0 & 0x0300 != 0
    }
}

impl ComponentRecord {
    fn decode(r: &mut Reader<'_>, route: bool) -> Self {
        let mut rec = ComponentRecord {
            rev_link: r.opt_u8(),
            fwd_link: r.opt_u8(),
            ..Default::default()
        };
        rec.name = opt_text(r, NAME_LEN);
        rec.number = opt_text(r, NUMBER_LEN);
        if route && rec.is_active() {
            while rec.route.len() < MAX_ROUTE {
                let Ok(word) = r.be16() else { break };
                if word != 0xFFFF && word != 0 {
                    rec.route.push(RouteComponent(word));
                }
            }
        }
        rec
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.rev_link.unwrap_or(SYNTH_LINK));
        buf.put_u8(self.fwd_link.unwrap_or(SYNTH_LINK));
        put_text(buf, self.name.as_deref().unwrap_or_default(), NAME_LEN);
        put_text(buf, self.number.as_deref().unwrap_or_default(), NUMBER_LEN);
        for comp in self.route.iter().take(MAX_ROUTE) {
            buf.put_u16(comp.0);
        }
    }

    /// A record with both links unused and no name or number is empty.
    pub fn is_active(&self) -> bool {
        !(self.rev_link == Some(NO_LINK)
            && self.fwd_link == Some(NO_LINK)
            && self.name.as_deref().unwrap_or_default().is_empty()
            && self.number.as_deref().unwrap_or_default().is_empty())
    }
}

/// The Base's own record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaseInfo {
    pub firmware_high: Option<u8>,
    pub firmware_low: Option<u8>,
    /// Route throw rate, in seconds.
    pub throw_rate: Option<f32>,
    pub name: Option<String>,
}

impl BaseInfo {
    fn decode(r: &mut Reader<'_>) -> Self {
        BaseInfo {
            firmware_high: r.opt_u8(),
            firmware_low: r.opt_u8(),
            throw_rate: r.opt_u8().and_then(throw_rate_secs),
            name: (!r.is_empty()).then(|| decode_text(r.rest())),
        }
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.firmware_high.unwrap_or(0));
        buf.put_u8(self.firmware_low.unwrap_or(0));
        buf.put_u8(throw_rate_byte(self.throw_rate.unwrap_or(2.0)));
        put_text(buf, self.name.as_deref().unwrap_or_default(), NAME_LEN);
    }

    /// Firmware as "high.low", once known.
    pub fn firmware(&self) -> Option<String> {
        Some(format!("{}.{}", self.firmware_high?, self.firmware_low?))
    }
}

/// Decoded record contents.
#[derive(Debug, Clone, PartialEq)]
pub enum BaseRecord {
    /// Header only; the Base acknowledged a write.
    Ack,
    Engine(MotiveRecord),
    Train(MotiveRecord),
    Acc(ComponentRecord),
    Switch(ComponentRecord),
    Route(ComponentRecord),
    Base(BaseInfo),
}

// ---------------------------------------------------------------------------
// Record request
// ---------------------------------------------------------------------------

/// A full Base record frame (`BASE`, `BASE_ENGINE`, `BASE_TRAIN`,
/// `BASE_ACC`, `BASE_SWITCH`, `BASE_ROUTE`).
#[derive(Debug, Clone, PartialEq)]
pub struct BaseReq {
    pub command: PdiCommand,
    pub record_no: u8,
    pub flags: u8,
    pub status: u8,
    pub spare: u8,
    /// Combined `valid1 | valid2 << 16`; `None` for an acknowledge.
    pub valid: Option<u32>,
    pub record: BaseRecord,
}

fn has_valid2(command: PdiCommand) -> bool {
    matches!(command, PdiCommand::BaseEngine | PdiCommand::BaseTrain)
}

fn is_record_command(command: PdiCommand) -> bool {
    matches!(
        command,
        PdiCommand::Base
            | PdiCommand::BaseEngine
            | PdiCommand::BaseTrain
            | PdiCommand::BaseAcc
            | PdiCommand::BaseSwitch
            | PdiCommand::BaseRoute
    )
}

impl BaseReq {
    /// Record command for `scope`.
    pub fn command_for(scope: Scope) -> Option<PdiCommand> {
        Some(match scope {
            Scope::Engine => PdiCommand::BaseEngine,
            Scope::Train => PdiCommand::BaseTrain,
            Scope::Acc => PdiCommand::BaseAcc,
            Scope::Switch => PdiCommand::BaseSwitch,
            Scope::Route => PdiCommand::BaseRoute,
            Scope::Base => PdiCommand::Base,
            _ => return None,
        })
    }

    /// Ask the Base for a record.
    pub fn query(scope: Scope, record_no: u8) -> Result<Self> {
        let command = Self::command_for(scope)
            .ok_or_else(|| Error::InvalidParameter(format!("{scope} has no Base record")))?;
        Ok(BaseReq {
            command,
            record_no,
            flags: READ_FLAGS,
            status: 0,
            spare: 0,
            valid: None,
            record: BaseRecord::Ack,
        })
    }

    /// A record carrying `record` with validity mask `valid`.
    pub fn with_record(record_no: u8, valid: u32, record: BaseRecord) -> Result<Self> {
        let command = match record {
            BaseRecord::Engine(_) => PdiCommand::BaseEngine,
            BaseRecord::Train(_) => PdiCommand::BaseTrain,
            BaseRecord::Acc(_) => PdiCommand::BaseAcc,
            BaseRecord::Switch(_) => PdiCommand::BaseSwitch,
            BaseRecord::Route(_) => PdiCommand::BaseRoute,
            BaseRecord::Base(_) => PdiCommand::Base,
            BaseRecord::Ack => {
                return Err(Error::InvalidParameter(
                    "an acknowledge carries no record".into(),
                ));
            }
        };
        Ok(BaseReq {
            command,
            record_no,
            flags: WRITE_FLAGS,
            status: 0,
            spare: 0,
            valid: Some(valid),
            record,
        })
    }

    pub fn from_frame(frame: &PdiFrame) -> Result<Self> {
        if !is_record_command(frame.command) {
            return Err(Error::Protocol(format!(
                "{} is not a Base record command",
                frame.command
            )));
        }
        let mut r = Reader::new(&frame.payload);
        let record_no = r.u8()?;
        let flags = r.opt_u8().unwrap_or(0);
        let status = r.opt_u8().unwrap_or(0);
        let spare = r.opt_u8().unwrap_or(0);

        if r.remaining() < 2 {
            return Ok(BaseReq {
                command: frame.command,
                record_no,
                flags,
                status,
                spare,
                valid: None,
                record: BaseRecord::Ack,
            });
        }
        let mut valid = u32::from(r.le16()?);
        if has_valid2(frame.command) {
            if let Ok(valid2) = r.le16() {
                valid |= u32::from(valid2) << 16;
            }
        }

        let record = match frame.command {
            PdiCommand::BaseEngine => BaseRecord::Engine(MotiveRecord::decode(&mut r, false)?),
            PdiCommand::BaseTrain => BaseRecord::Train(MotiveRecord::decode(&mut r, true)?),
            PdiCommand::BaseAcc => BaseRecord::Acc(ComponentRecord::decode(&mut r, false)),
            PdiCommand::BaseSwitch => BaseRecord::Switch(ComponentRecord::decode(&mut r, false)),
            PdiCommand::BaseRoute => BaseRecord::Route(ComponentRecord::decode(&mut r, true)),
            _ => BaseRecord::Base(BaseInfo::decode(&mut r)),
        };
        Ok(BaseReq {
            command: frame.command,
            record_no,
            flags,
            status,
            spare,
            valid: Some(valid),
            record,
        })
    }

    pub fn to_frame(&self) -> PdiFrame {
        let mut buf = BytesMut::with_capacity(104);
        buf.put_u8(self.record_no);
        buf.put_u8(self.flags);
        buf.put_u8(self.status);
        buf.put_u8(self.spare);
        if let Some(valid) = self.valid {
            buf.put_u16_le(valid as u16);
            if has_valid2(self.command) {
                buf.put_u16_le((valid >> 16) as u16);
            }
            match &self.record {
                BaseRecord::Ack => {}
                BaseRecord::Engine(rec) => rec.encode(&mut buf, false),
                BaseRecord::Train(rec) => rec.encode(&mut buf, true),
                BaseRecord::Acc(rec) | BaseRecord::Switch(rec) | BaseRecord::Route(rec) => {
                    rec.encode(&mut buf)
                }
                BaseRecord::Base(info) => info.encode(&mut buf),
            }
        }
        PdiFrame::new(self.command, buf.to_vec())
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        self.to_frame().encode()
    }

    pub fn scope(&self) -> Scope {
        match self.command {
            PdiCommand::BaseEngine => Scope::Engine,
            PdiCommand::BaseTrain => Scope::Train,
            PdiCommand::BaseAcc => Scope::Acc,
            PdiCommand::BaseSwitch => Scope::Switch,
            PdiCommand::BaseRoute => Scope::Route,
            _ => Scope::Base,
        }
    }

    /// Component address the record describes (0 for the Base itself).
    pub fn address(&self) -> u16 {
        match self.command {
            PdiCommand::Base => 0,
            _ => u16::from(self.record_no),
        }
    }

    pub fn is_ack(&self) -> bool {
        self.valid.is_none()
    }

    /// `true` if `bit` of the validity mask is set.
    pub fn is_valid(&self, bit: u8) -> bool {
        bit < 32 && self.valid.is_some_and(|v| v & (1 << bit) != 0)
    }

    /// Shorthand for [`is_valid`](Self::is_valid) on engine/train records.
    pub fn has(&self, bit: EngineBit) -> bool {
        self.is_valid(bit as u8)
    }

    /// Road name, if the record carries a valid one.
    pub fn name(&self) -> Option<&str> {
        if !self.has(EngineBit::RoadName) && !matches!(self.record, BaseRecord::Base(_)) {
            return None;
        }
        match &self.record {
            BaseRecord::Engine(rec) | BaseRecord::Train(rec) => rec.name.as_deref(),
            BaseRecord::Acc(rec) | BaseRecord::Switch(rec) | BaseRecord::Route(rec) => {
                rec.name.as_deref()
            }
            BaseRecord::Base(info) => info.name.as_deref(),
            BaseRecord::Ack => None,
        }
    }

    /// Road number, if the record carries a valid one.
    pub fn number(&self) -> Option<&str> {
        if !self.has(EngineBit::RoadNumber) {
            return None;
        }
        match &self.record {
            BaseRecord::Engine(rec) | BaseRecord::Train(rec) => rec.number.as_deref(),
            BaseRecord::Acc(rec) | BaseRecord::Switch(rec) | BaseRecord::Route(rec) => {
                rec.number.as_deref()
            }
            _ => None,
        }
    }

    /// `false` for an unused record slot.
    pub fn is_active(&self) -> bool {
        match &self.record {
            BaseRecord::Engine(rec) | BaseRecord::Train(rec) => {
                !(rec.rev_link == Some(NO_LINK)
                    && rec.fwd_link == Some(NO_LINK)
                    && rec.name.as_deref().unwrap_or_default().is_empty()
                    && rec.number.as_deref().unwrap_or_default().is_empty())
            }
            BaseRecord::Acc(rec) | BaseRecord::Switch(rec) | BaseRecord::Route(rec) => {
                rec.is_active()
            }
            _ => true,
        }
    }

    /// Engine or train fields, when this is a motive record.
    pub fn motive(&self) -> Option<&MotiveRecord> {
        match &self.record {
            BaseRecord::Engine(rec) | BaseRecord::Train(rec) => Some(rec),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Speed updates
// ---------------------------------------------------------------------------

/// Compact speed report for an engine or train.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeedUpdate {
    pub scope: Scope,
    pub record_no: u8,
    pub speed: u8,
}

impl SpeedUpdate {
    pub fn new(scope: Scope, record_no: u8, speed: u8) -> Result<Self> {
        if !scope.is_motive() {
            return Err(Error::InvalidParameter(format!(
                "speed updates apply to engines and trains, not {scope}"
            )));
        }
        Ok(SpeedUpdate {
            scope,
            record_no,
            speed,
        })
    }

    pub fn from_frame(frame: &PdiFrame) -> Result<Self> {
        let scope = match frame.command {
            PdiCommand::UpdateEngineSpeed => Scope::Engine,
            PdiCommand::UpdateTrainSpeed => Scope::Train,
            other => {
                return Err(Error::Protocol(format!("{other} is not a speed update")));
            }
        };
        let mut r = Reader::new(&frame.payload);
        Ok(SpeedUpdate {
            scope,
            record_no: r.u8()?,
            speed: r.u8()?,
        })
    }

    pub fn to_frame(&self) -> PdiFrame {
        let command = if self.scope == Scope::Train {
            PdiCommand::UpdateTrainSpeed
        } else {
            PdiCommand::UpdateEngineSpeed
        };
        PdiFrame::new(command, vec![self.record_no, self.speed])
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        self.to_frame().encode()
    }

    pub fn address(&self) -> u16 {
        u16::from(self.record_no)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::decode;

    fn engine_payload() -> Vec<u8> {
        let mut p = vec![23, 0x02, 0x00, 0x00];
        p.extend_from_slice(&0b1111_1000_1111_1100u16.to_le_bytes());
        p.extend_from_slice(&0b1100_0000u16.to_le_bytes());
        p.push(0xFF);
        p.push(0xFF);
        let mut name = b"NYC HUDSON".to_vec();
        name.resize(NAME_LEN, 0);
        p.extend_from_slice(&name);
        p.extend_from_slice(b"5344\0");
        // loco, control, sound, class, tsdb l/r, spare
        p.extend_from_slice(&[2, 1, 2, 3, 0, 0, 0]);
        // speed, run level, labor bias, limit, max
        p.extend_from_slice(&[40, 3, 0, 199, 199]);
        // fuel, water, train id, pos, smoke, ditch, brake, momentum
        p.extend_from_slice(&[255, 255, 0, 0, 2, 0, 4, 54]);
        p
    }

    // ---------------------------------------------------------------
    // Engine records
    // ---------------------------------------------------------------

    #[test]
    fn decode_engine_record() {
        let frame = PdiFrame::new(PdiCommand::BaseEngine, engine_payload());
        let req = BaseReq::from_frame(&frame).unwrap();
        assert_eq!(req.scope(), Scope::Engine);
        assert_eq!(req.address(), 23);
        assert!(req.has(EngineBit::Speed));
        assert!(req.has(EngineBit::Momentum));
        assert!(!req.has(EngineBit::FuelLevel));
        assert_eq!(req.name(), Some("NYC HUDSON"));
        assert_eq!(req.number(), Some("5344"));

        let rec = req.motive().unwrap();
        assert_eq!(rec.speed, Some(40));
        assert_eq!(rec.labor(), Some(12));
        assert_eq!(rec.momentum_tmcc(), Some(3));
        assert_eq!(rec.train_brake_tmcc(), Some(2));
        assert_eq!(rec.smoke, Some(2));
    }

    #[test]
    fn engine_record_round_trip() {
        let frame = PdiFrame::new(PdiCommand::BaseEngine, engine_payload());
        let req = BaseReq::from_frame(&frame).unwrap();
        assert_eq!(req.to_frame(), frame);
        let (wire, rest) = decode(&req.as_bytes()).map(|(f, r)| (f, r.to_vec())).unwrap();
        assert!(rest.is_empty());
        assert_eq!(BaseReq::from_frame(&wire).unwrap(), req);
    }

    #[test]
    fn valid_mask_covers_present_fields_only() {
        let rec = MotiveRecord {
            name: Some("GG1".into()),
            speed: Some(55),
            momentum: Some(18),
            ..Default::default()
        };
        let mask = rec.valid_mask();
        assert_eq!(
            mask,
            EngineBit::RoadName.mask() | EngineBit::Speed.mask() | EngineBit::Momentum.mask()
        );
        assert_eq!(MotiveRecord::default().valid_mask(), 0);

        let req = BaseReq::with_record(12, mask, BaseRecord::Engine(rec)).unwrap();
        let back = BaseReq::from_frame(&req.to_frame()).unwrap();
        assert!(back.has(EngineBit::Speed));
        assert!(!back.has(EngineBit::MaxSpeed));
        assert!(!back.has(EngineBit::RoadNumber));
    }

    #[test]
    fn acknowledge_is_not_zeroed_data() {
        let frame = PdiFrame::new(PdiCommand::BaseEngine, vec![23, 0xC2, 0, 0]);
        let req = BaseReq::from_frame(&frame).unwrap();
        assert!(req.is_ack());
        assert_eq!(req.record, BaseRecord::Ack);
        assert!(!req.has(EngineBit::Speed));
        assert_eq!(req.name(), None);
        assert_eq!(req.to_frame(), frame);
    }

    #[test]
    fn truncated_record_leaves_missing_fields_unset() {
        let payload = engine_payload()[..60].to_vec();
        let req = BaseReq::from_frame(&PdiFrame::new(PdiCommand::BaseEngine, payload)).unwrap();
        let rec = req.motive().unwrap();
        assert_eq!(rec.speed, Some(40));
        assert_eq!(rec.momentum, None);
    }

    #[test]
    fn train_record_consist() {
        let mut p = engine_payload();
        p.push(0x01);
        p.extend_from_slice(&[0x01, 12, 0x07, 14]);
        p.extend_from_slice(&[0xFF; 28]);
        let req = BaseReq::from_frame(&PdiFrame::new(PdiCommand::BaseTrain, p)).unwrap();
        assert_eq!(req.scope(), Scope::Train);
        let rec = req.motive().unwrap();
        assert_eq!(rec.consist_flags, Some(1));
        assert_eq!(rec.consist.len(), 2);
        assert_eq!(rec.consist[0].address, 12);
        assert!(rec.consist[1].is_tail());
        assert!(rec.consist[1].is_reverse());
    }

    // ---------------------------------------------------------------
    // Accessory, switch, route
    // ---------------------------------------------------------------

    fn component_payload(name: &str, number: &str) -> Vec<u8> {
        let mut p = vec![5, 0x02, 0, 0];
        p.extend_from_slice(&0b1100u16.to_le_bytes());
        p.extend_from_slice(&[0xFF, 0xFF]);
        let mut n = name.as_bytes().to_vec();
        n.resize(NAME_LEN, 0);
        p.extend_from_slice(&n);
        let mut num = number.as_bytes().to_vec();
        num.resize(NUMBER_LEN, 0);
        p.extend_from_slice(&num);
        p
    }

    #[test]
    fn switch_record() {
        let frame = PdiFrame::new(PdiCommand::BaseSwitch, component_payload("Yard Lead", "5"));
        let req = BaseReq::from_frame(&frame).unwrap();
        assert_eq!(req.scope(), Scope::Switch);
        assert_eq!(req.name(), Some("Yard Lead"));
        assert!(req.is_active());
        assert_eq!(req.to_frame(), frame);
    }

    #[test]
    fn empty_slot_is_inactive() {
        let frame = PdiFrame::new(PdiCommand::BaseAcc, component_payload("", ""));
        assert!(!BaseReq::from_frame(&frame).unwrap().is_active());
    }

    #[test]
    fn route_components() {
        let mut p = component_payload("Main", "1");
        p.extend_from_slice(&[0x00, 0x05, 0x01, 0x07, 0xFF, 0xFF, 0x00, 0x00]);
        let req = BaseReq::from_frame(&PdiFrame::new(PdiCommand::BaseRoute, p)).unwrap();
        let BaseRecord::Route(rec) = &req.record else {
            panic!("expected route");
        };
        assert_eq!(rec.route.len(), 2);
        assert_eq!(rec.route[0].switch(), 5);
        assert!(!rec.route[0].is_thrown());
        assert_eq!(rec.route[1].switch(), 7);
        assert!(rec.route[1].is_thrown());
        assert_eq!(RouteComponent::new(7, true), rec.route[1]);
    }

    // ---------------------------------------------------------------
    // Base record
    // ---------------------------------------------------------------

    #[test]
    fn base_record() {
        let mut p = vec![0, 0x02, 0, 0];
        p.extend_from_slice(&0b1111u16.to_le_bytes());
        p.extend_from_slice(&[1, 22, 5]);
        p.extend_from_slice(b"My Base\0");
        let req = BaseReq::from_frame(&PdiFrame::new(PdiCommand::Base, p)).unwrap();
        assert_eq!(req.scope(), Scope::Base);
        assert_eq!(req.address(), 0);
        let BaseRecord::Base(info) = &req.record else {
            panic!("expected base record");
        };
        assert_eq!(info.firmware().as_deref(), Some("1.22"));
        assert_eq!(info.throw_rate, Some(1.0));
        assert_eq!(req.name(), Some("My Base"));
    }

    #[test]
    fn throw_rate_table() {
        assert_eq!(throw_rate_secs(1), Some(0.0));
        assert_eq!(throw_rate_secs(9), Some(2.0));
        assert_eq!(throw_rate_secs(0), None);
        assert_eq!(throw_rate_byte(0.5), 3);
        assert_eq!(throw_rate_byte(0.6), 3);
        assert_eq!(throw_rate_byte(5.0), 9);
    }

    // ---------------------------------------------------------------
    // Scaling and speed updates
    // ---------------------------------------------------------------

    #[test]
    fn labor_scaling() {
        assert_eq!(labor_to_tmcc(0), 12);
        assert_eq!(labor_to_tmcc(19), 31);
        assert_eq!(labor_to_tmcc(20), 0);
        for labor in 0..=31 {
            assert_eq!(labor_to_tmcc(labor_to_base(labor)), labor);
        }
    }

    #[test]
    fn brake_and_momentum_scaling() {
        assert_eq!(brake_to_base(7), 15);
        assert_eq!(brake_to_tmcc(15), 7);
        assert_eq!(momentum_to_base(7), 127);
        assert_eq!(momentum_to_tmcc(127), 7);
        assert_eq!(momentum_to_base(1), 18);
        assert_eq!(momentum_to_tmcc(18), 1);
    }

    #[test]
    fn speed_update() {
        let frame = PdiFrame::new(PdiCommand::UpdateTrainSpeed, vec![4, 90]);
        let upd = SpeedUpdate::from_frame(&frame).unwrap();
        assert_eq!(upd.scope, Scope::Train);
        assert_eq!(upd.speed, 90);
        assert_eq!(upd.to_frame(), frame);
        assert!(SpeedUpdate::new(Scope::Acc, 4, 1).is_err());
    }

    #[test]
    fn query_is_header_only() {
        let req = BaseReq::query(Scope::Route, 3).unwrap();
        assert_eq!(req.to_frame().payload, vec![3, READ_FLAGS, 0, 0]);
        assert!(BaseReq::query(Scope::Irda, 3).is_err());
    }
}
