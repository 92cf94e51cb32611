//! The LCS request envelope shared by every accessory, sensor, and power
//! device.
//!
//! ```text
//! payload: <address> <action | 0x80 if error> [<body>...]
//! ```
//!
//! The envelope ([`LcsReq`]) is generic over a per-device body type
//! implementing [`LcsBody`]. Bodies for the common actions (firmware,
//! status, info, identify) are decoded here by [`CommonBody`]; each device
//! module decodes its own config and control layouts.
//!
//! A device answers an unsupported or malformed request with the error bit
//! set and an error code as the first body byte. That is a legitimate
//! response and decodes to an [`LcsReq`] whose `error` is populated.

use std::fmt::{self, Debug};

use bytes::{BufMut, BytesMut};
use raillib_core::{Error, Result, Scope};

use crate::action::{CommonAction, PdiAction};
use crate::command::{PdiCommand, PdiDevice, Role};
use crate::frame::PdiFrame;
use crate::wire::Reader;

const ERROR_BIT: u8 = 0x80;

// ---------------------------------------------------------------------------
// Error responses
// ---------------------------------------------------------------------------

/// Error code carried by an LCS error response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LcsError {
    CommandNotSupported,
    ActionNotSupported,
    MissingParameters,
    ExtraParameters,
    InvalidContents,
    Undefined,
    /// A code outside the documented table.
    Other(u8),
}

impl LcsError {
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => LcsError::CommandNotSupported,
            2 => LcsError::ActionNotSupported,
            3 => LcsError::MissingParameters,
            4 => LcsError::ExtraParameters,
            5 => LcsError::InvalidContents,
            0xFF => LcsError::Undefined,
            other => LcsError::Other(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            LcsError::CommandNotSupported => 1,
            LcsError::ActionNotSupported => 2,
            LcsError::MissingParameters => 3,
            LcsError::ExtraParameters => 4,
            LcsError::InvalidContents => 5,
            LcsError::Undefined => 0xFF,
            LcsError::Other(code) => code,
        }
    }

    /// Human-readable cause.
    pub fn cause(self) -> &'static str {
        match self {
            LcsError::CommandNotSupported => "PDI command not supported",
            LcsError::ActionNotSupported => "Action not supported",
            LcsError::MissingParameters => {
                "Data field with missing parameter(s) - missing bytes before EOP"
            }
            LcsError::ExtraParameters => {
                "Data field with extra parameter(s) - extra bytes before EOP"
            }
            LcsError::InvalidContents => "Data field with invalid contents",
            LcsError::Undefined | LcsError::Other(_) => "Undefined error",
        }
    }
}

impl fmt::Display for LcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.cause(), self.code())
    }
}

// ---------------------------------------------------------------------------
// Lookup tables
// ---------------------------------------------------------------------------

/// Kind of Base a board reports being attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseType {
    Unknown,
    Legacy,
    Base1L,
    NoBase,
    NoSupport,
    Other(u8),
}

impl BaseType {
    pub fn from_byte(b: u8) -> Self {
        match b {
            0 => BaseType::Unknown,
            1 => BaseType::Legacy,
            2 => BaseType::Base1L,
            3 => BaseType::NoBase,
            4 => BaseType::NoSupport,
            other => BaseType::Other(other),
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            BaseType::Unknown => 0,
            BaseType::Legacy => 1,
            BaseType::Base1L => 2,
            BaseType::NoBase => 3,
            BaseType::NoSupport => 4,
            BaseType::Other(b) => b,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BaseType::Unknown => "Unknown",
            BaseType::Legacy => "Legacy",
            BaseType::Base1L => "Base1-L",
            BaseType::NoBase => "No Base",
            BaseType::NoSupport => "No Support",
            BaseType::Other(_) => "NA",
        }
    }
}

/// Role of a board UART in the LCS chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UartRole {
    Unknown,
    /// Directly attached to the Base.
    Base,
    /// Upstream towards the Base.
    ToBase,
    /// Downstream from the Base.
    FromBase,
    Other(u8),
}

impl UartRole {
    pub fn from_byte(b: u8) -> Self {
        match b {
            0 => UartRole::Unknown,
            1 => UartRole::Base,
            2 => UartRole::ToBase,
            3 => UartRole::FromBase,
            other => UartRole::Other(other),
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            UartRole::Unknown => 0,
            UartRole::Base => 1,
            UartRole::ToBase => 2,
            UartRole::FromBase => 3,
            UartRole::Other(b) => b,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            UartRole::Unknown => "Unknown",
            UartRole::Base => ">Base<",
            UartRole::ToBase => "->Base",
            UartRole::FromBase => "Base->",
            UartRole::Other(_) => "NA",
        }
    }
}

// ---------------------------------------------------------------------------
// Common bodies
// ---------------------------------------------------------------------------

/// Firmware version triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Firmware {
    pub version: u8,
    pub revision: u8,
    pub sub_revision: u8,
}

impl fmt::Display for Firmware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.version, self.revision, self.sub_revision)
    }
}

/// Board status report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LcsStatus {
    pub board_id: u8,
    pub num_ids: u8,
    pub model: u8,
    pub uart0: UartRole,
    pub uart1: UartRole,
    pub base_type: BaseType,
    /// Supply voltage in tenths of a volt.
    pub dc_volts_raw: u8,
    /// Per-category error counters.
    pub error_counts: [u8; 16],
}

impl LcsStatus {
    pub fn dc_volts(&self) -> f32 {
        f32::from(self.dc_volts_raw) / 10.0
    }

    fn decode(r: &mut Reader<'_>) -> Result<Self> {
        let board_id = r.u8()?;
        let num_ids = r.u8()?;
        let model = r.u8()?;
        let uart0 = UartRole::from_byte(r.u8()?);
        let uart1 = UartRole::from_byte(r.u8()?);
        let base_type = BaseType::from_byte(r.u8()?);
        let dc_volts_raw = r.u8()?;
        // Older firmware reports fewer counters.
        let mut error_counts = [0u8; 16];
        for (slot, &b) in error_counts.iter_mut().zip(r.rest()) {
            *slot = b;
        }
        Ok(LcsStatus {
            board_id,
            num_ids,
            model,
            uart0,
            uart1,
            base_type,
            dc_volts_raw,
            error_counts,
        })
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.board_id);
        buf.put_u8(self.num_ids);
        buf.put_u8(self.model);
        buf.put_u8(self.uart0.as_byte());
        buf.put_u8(self.uart1.as_byte());
        buf.put_u8(self.base_type.as_byte());
        buf.put_u8(self.dc_volts_raw);
        buf.put_slice(&self.error_counts);
    }
}

/// Board info report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LcsInfo {
    pub board_id: u8,
    pub num_ids: u8,
    pub model: u8,
    pub dc_volts_raw: u8,
}

impl LcsInfo {
    pub fn dc_volts(&self) -> f32 {
        f32::from(self.dc_volts_raw) / 10.0
    }
}

/// Body of a common (non device-specific) action other than config.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CommonBody {
    /// GET frames, error responses, clear-errors, reset.
    #[default]
    Empty,
    Firmware(Firmware),
    Status(LcsStatus),
    Info(LcsInfo),
    /// Identify request; the device flashes its LED while non-zero.
    Identify(u8),
}

impl CommonBody {
    /// Decode the body of a common action from a SET or RX frame.
    pub fn decode(command: PdiCommand, action: CommonAction, r: &mut Reader<'_>) -> Result<Self> {
        if r.is_empty() {
            return Ok(CommonBody::Empty);
        }
        Ok(match action {
            CommonAction::Firmware => CommonBody::Firmware(Firmware {
                version: r.u8()?,
                revision: r.u8()?,
                sub_revision: r.u8()?,
            }),
            CommonAction::Status => CommonBody::Status(LcsStatus::decode(r)?),
            CommonAction::Info => CommonBody::Info(LcsInfo {
                board_id: r.u8()?,
                num_ids: r.u8()?,
                model: r.u8()?,
                dc_volts_raw: r.u8()?,
            }),
            CommonAction::Identify if command.is_set() => CommonBody::Identify(r.u8()?),
            _ => CommonBody::Empty,
        })
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        match self {
            CommonBody::Empty => {}
            CommonBody::Firmware(fw) => {
                buf.put_u8(fw.version);
                buf.put_u8(fw.revision);
                buf.put_u8(fw.sub_revision);
            }
            CommonBody::Status(status) => status.encode(buf),
            CommonBody::Info(info) => {
                buf.put_u8(info.board_id);
                buf.put_u8(info.num_ids);
                buf.put_u8(info.model);
                buf.put_u8(info.dc_volts_raw);
            }
            CommonBody::Identify(ident) => buf.put_u8(*ident),
        }
    }
}

/// The `[tmcc_id, debug, 0, 0, mode]` prefix of every LCS config body.
///
/// `tmcc_id` is written back on SET, which lets a board be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfigHeader {
    pub tmcc_id: u8,
    pub debug: u8,
    pub mode: u8,
}

impl ConfigHeader {
    pub fn decode(r: &mut Reader<'_>) -> Result<Self> {
        let tmcc_id = r.u8()?;
        let debug = r.u8()?;
        r.skip(2)?;
        let mode = r.u8()?;
        Ok(ConfigHeader {
            tmcc_id,
            debug,
            mode,
        })
    }

    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.tmcc_id);
        buf.put_u8(self.debug);
        buf.put_u16(0);
        buf.put_u8(self.mode);
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Per-device body of an LCS request.
pub trait LcsBody: Sized + Clone + Debug + PartialEq {
    type Action: PdiAction;

    /// Device family whose GET/SET/RX commands carry this body.
    const DEVICE: PdiDevice;

    /// Body of a GET frame or error response.
    fn empty() -> Self;

    /// Decode the body of a SET or RX frame, or of a GET frame that
    /// carries a selector.
    fn decode(command: PdiCommand, action: Self::Action, r: &mut Reader<'_>) -> Result<Self>;

    /// Append the body; `command` selects between GET, SET and RX layouts.
    fn encode(&self, command: PdiCommand, buf: &mut BytesMut);

    /// Component scope a request with `action` refers to.
    fn scope(action: Self::Action) -> Scope;
}

/// An addressed LCS request or response.
#[derive(Debug, Clone, PartialEq)]
pub struct LcsReq<B: LcsBody> {
    pub command: PdiCommand,
    /// TMCC id of the board (1-99).
    pub address: u8,
    pub action: B::Action,
    /// Set when the device rejected the request.
    pub error: Option<LcsError>,
    pub body: B,
}

impl<B: LcsBody> LcsReq<B> {
    /// A request with an explicit body.
    pub fn new(role: Role, address: u8, action: B::Action, body: B) -> Result<Self> {
        let command = PdiCommand::lcs(B::DEVICE, role).ok_or_else(|| {
            Error::InvalidParameter(format!("{:?} has no {role:?} command", B::DEVICE))
        })?;
        let caps = action.capabilities();
        let allowed = match role {
            Role::Get => caps.gettable,
            Role::Set => caps.settable,
            Role::Rx => caps.responds,
            Role::Other => false,
        };
        if !allowed {
            return Err(Error::InvalidParameter(format!(
                "{action:?} cannot be sent as {role:?}"
            )));
        }
        Ok(LcsReq {
            command,
            address,
            action,
            error: None,
            body,
        })
    }

    /// A query for `action`.
    pub fn get(address: u8, action: B::Action) -> Result<Self> {
        Self::new(Role::Get, address, action, B::empty())
    }

    /// A command with `body`.
    pub fn set(address: u8, action: B::Action, body: B) -> Result<Self> {
        Self::new(Role::Set, address, action, body)
    }

    /// A device response with `body`.
    pub fn rx(address: u8, action: B::Action, body: B) -> Result<Self> {
        Self::new(Role::Rx, address, action, body)
    }

    /// An error response from the device.
    pub fn error_response(address: u8, action: B::Action, error: LcsError) -> Result<Self> {
        let mut req = Self::new(Role::Rx, address, action, B::empty())?;
        req.error = Some(error);
        Ok(req)
    }

    /// Decode an LCS frame of this device family.
    pub fn from_frame(frame: &PdiFrame) -> Result<Self> {
        if frame.command.device() != B::DEVICE || !frame.command.is_lcs() {
            return Err(Error::Protocol(format!(
                "{} is not a {:?} command",
                frame.command,
                B::DEVICE
            )));
        }
        let mut r = Reader::new(&frame.payload);
        let address = r.u8()?;
        let raw = r.u8()?;
        let action = B::Action::from_bits(raw & !ERROR_BIT).ok_or_else(|| {
            Error::Protocol(format!(
                "unknown {:?} action 0x{:02X}",
                B::DEVICE,
                raw & !ERROR_BIT
            ))
        })?;

        let (error, body) = if raw & ERROR_BIT != 0 {
            let code = r.opt_u8().unwrap_or(LcsError::Undefined.code());
            (Some(LcsError::from_code(code)), B::empty())
        } else if frame.command.is_get() && r.is_empty() {
            (None, B::empty())
        } else {
            (None, B::decode(frame.command, action, &mut r)?)
        };

        Ok(LcsReq {
            command: frame.command,
            address,
            action,
            error,
            body,
        })
    }

    pub fn to_frame(&self) -> PdiFrame {
        let mut buf = BytesMut::with_capacity(16);
        buf.put_u8(self.address);
        match self.error {
            Some(err) => {
                buf.put_u8(self.action.bits() | ERROR_BIT);
                buf.put_u8(err.code());
            }
            None => {
                buf.put_u8(self.action.bits());
                self.body.encode(self.command, &mut buf);
            }
        }
        PdiFrame::new(self.command, buf.to_vec())
    }

    /// Encode as a complete wire frame.
    pub fn as_bytes(&self) -> Vec<u8> {
        self.to_frame().encode()
    }

    pub fn scope(&self) -> Scope {
        B::scope(self.action)
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// The same request addressed from the device (`*_RX`).
    pub fn as_rx(&self) -> Self {
        let mut req = self.clone();
        if let Some(rx) = PdiCommand::lcs(B::DEVICE, Role::Rx) {
            req.command = rx;
        }
        req
    }
}

// ---------------------------------------------------------------------------
// Serial bridge
// ---------------------------------------------------------------------------

/// SER2 serial bridge body: common actions only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ser2Body {
    Common(CommonBody),
    Config(ConfigHeader),
}

impl LcsBody for Ser2Body {
    type Action = CommonAction;
    const DEVICE: PdiDevice = PdiDevice::Ser2;

    fn empty() -> Self {
        Ser2Body::Common(CommonBody::Empty)
    }

    fn decode(command: PdiCommand, action: CommonAction, r: &mut Reader<'_>) -> Result<Self> {
        match action {
            CommonAction::Config => Ok(Ser2Body::Config(ConfigHeader::decode(r)?)),
            other => Ok(Ser2Body::Common(CommonBody::decode(command, other, r)?)),
        }
    }

    fn encode(&self, _command: PdiCommand, buf: &mut BytesMut) {
        match self {
            Ser2Body::Common(body) => body.encode(buf),
            Ser2Body::Config(header) => header.encode(buf),
        }
    }

    fn scope(_action: CommonAction) -> Scope {
        Scope::Acc
    }
}

pub type Ser2Req = LcsReq<Ser2Body>;

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(command: PdiCommand, payload: &[u8]) -> PdiFrame {
        PdiFrame::new(command, payload.to_vec())
    }

    // ---------------------------------------------------------------
    // Envelope
    // ---------------------------------------------------------------

    #[test]
    fn get_frame_has_no_body() {
        let req = Ser2Req::get(4, CommonAction::Status).unwrap();
        assert_eq!(req.command, PdiCommand::Ser2Get);
        assert_eq!(req.to_frame().payload, vec![4, 0x02]);
    }

    #[test]
    fn get_rejects_set_only_action() {
        assert!(matches!(
            Ser2Req::get(4, CommonAction::Reset),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn error_bit_decodes_to_error_data() {
        let req = Ser2Req::from_frame(&frame(PdiCommand::Ser2Rx, &[4, 0x83, 0x02])).unwrap();
        assert_eq!(req.action, CommonAction::Config);
        assert_eq!(req.error, Some(LcsError::ActionNotSupported));
        assert_eq!(req.body, Ser2Body::empty());
        assert_eq!(req.to_frame().payload, vec![4, 0x83, 0x02]);
    }

    #[test]
    fn error_without_code_is_undefined() {
        let req = Ser2Req::from_frame(&frame(PdiCommand::Ser2Rx, &[4, 0x81])).unwrap();
        assert_eq!(req.error, Some(LcsError::Undefined));
    }

    #[test]
    fn wrong_device_rejected() {
        assert!(Ser2Req::from_frame(&frame(PdiCommand::Asc2Rx, &[4, 0x01])).is_err());
    }

    #[test]
    fn unknown_action_rejected() {
        assert!(matches!(
            Ser2Req::from_frame(&frame(PdiCommand::Ser2Rx, &[4, 0x10])),
            Err(Error::Protocol(_))
        ));
    }

    // ---------------------------------------------------------------
    // Common bodies
    // ---------------------------------------------------------------

    #[test]
    fn firmware_response() {
        let req = Ser2Req::from_frame(&frame(PdiCommand::Ser2Rx, &[4, 0x01, 1, 2, 3])).unwrap();
        match req.body {
            Ser2Body::Common(CommonBody::Firmware(fw)) => assert_eq!(fw.to_string(), "1.2.3"),
            other => panic!("expected firmware, got {other:?}"),
        }
    }

    #[test]
    fn status_response_with_short_counters() {
        let payload = [4, 0x02, 9, 1, 0x2C, 1, 3, 2, 182, 5, 6];
        let req = Ser2Req::from_frame(&frame(PdiCommand::Ser2Rx, &payload)).unwrap();
        let Ser2Body::Common(CommonBody::Status(status)) = req.body else {
            panic!("expected status");
        };
        assert_eq!(status.board_id, 9);
        assert_eq!(status.uart0, UartRole::Base);
        assert_eq!(status.uart1.label(), "Base->");
        assert_eq!(status.base_type.label(), "Base1-L");
        assert!((status.dc_volts() - 18.2).abs() < 1e-4);
        assert_eq!(&status.error_counts[..3], &[5, 6, 0]);
    }

    #[test]
    fn info_response() {
        let req = Ser2Req::from_frame(&frame(PdiCommand::Ser2Rx, &[4, 0x04, 9, 1, 0x2C, 120]))
            .unwrap();
        assert_eq!(
            req.body,
            Ser2Body::Common(CommonBody::Info(LcsInfo {
                board_id: 9,
                num_ids: 1,
                model: 0x2C,
                dc_volts_raw: 120,
            }))
        );
    }

    #[test]
    fn truncated_info_is_protocol_error() {
        assert!(Ser2Req::from_frame(&frame(PdiCommand::Ser2Rx, &[4, 0x04, 9])).is_err());
    }

    #[test]
    fn identify_set() {
        let req = Ser2Req::set(4, CommonAction::Identify, Ser2Body::Common(CommonBody::Identify(1)))
            .unwrap();
        let bytes = req.as_bytes();
        let (decoded, _) = crate::frame::decode(&bytes).unwrap();
        assert_eq!(Ser2Req::from_frame(&decoded).unwrap(), req);
    }

    #[test]
    fn config_header_layout() {
        let header = ConfigHeader {
            tmcc_id: 4,
            debug: 1,
            mode: 2,
        };
        let req = Ser2Req::set(4, CommonAction::Config, Ser2Body::Config(header)).unwrap();
        assert_eq!(req.to_frame().payload, vec![4, 0x03, 4, 1, 0, 0, 2]);
    }

    #[test]
    fn error_display() {
        assert_eq!(
            LcsError::InvalidContents.to_string(),
            "Data field with invalid contents (5)"
        );
        assert_eq!(LcsError::from_code(0x42), LcsError::Other(0x42));
    }
}
