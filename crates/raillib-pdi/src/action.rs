//! LCS action codes.
//!
//! The second payload byte of every LCS frame names an *action*. Actions
//! `0x01`-`0x07` are shared by all LCS devices ([`CommonAction`]); codes
//! from `0x10` up are device specific. Bit 7 is reserved for the error
//! flag and is never part of an action code.
//!
//! Each action carries static capability flags describing whether a host
//! may query it, command it, and whether the device answers it.

use std::fmt::Debug;
use std::hash::Hash;

/// Static capability flags for an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// May appear in a `*_GET` frame.
    pub gettable: bool,
    /// May appear in a `*_SET` frame.
    pub settable: bool,
    /// The device sends a `*_RX` frame for it.
    pub responds: bool,
}

impl Capabilities {
    const fn new(gettable: bool, settable: bool, responds: bool) -> Self {
        Capabilities {
            gettable,
            settable,
            responds,
        }
    }

    const GSR: Capabilities = Capabilities::new(true, true, true);
    const GR: Capabilities = Capabilities::new(true, false, true);
    const S: Capabilities = Capabilities::new(false, true, false);
    const SR: Capabilities = Capabilities::new(false, true, true);
    const R: Capabilities = Capabilities::new(false, false, true);
}

/// Behaviour shared by every device's action enum.
pub trait PdiAction: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    /// Look up an action by its 7-bit code.
    fn from_bits(bits: u8) -> Option<Self>;

    /// The 7-bit action code.
    fn bits(self) -> u8;

    /// Static capability flags.
    fn capabilities(self) -> Capabilities;

    /// The shared action this is, if any.
    fn common(self) -> Option<CommonAction>;

    fn is_config(self) -> bool {
        self.common() == Some(CommonAction::Config)
    }
}

/// Actions understood by every LCS device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommonAction {
    Firmware,
    Status,
    Config,
    Info,
    ClearErrors,
    Reset,
    Identify,
}

impl CommonAction {
    pub const ALL: [CommonAction; 7] = [
        CommonAction::Firmware,
        CommonAction::Status,
        CommonAction::Config,
        CommonAction::Info,
        CommonAction::ClearErrors,
        CommonAction::Reset,
        CommonAction::Identify,
    ];
}

impl PdiAction for CommonAction {
    fn from_bits(bits: u8) -> Option<Self> {
        CommonAction::ALL.into_iter().find(|a| a.bits() == bits)
    }

    fn bits(self) -> u8 {
        match self {
            CommonAction::Firmware => 0x01,
            CommonAction::Status => 0x02,
            CommonAction::Config => 0x03,
            CommonAction::Info => 0x04,
            CommonAction::ClearErrors => 0x05,
            CommonAction::Reset => 0x06,
            CommonAction::Identify => 0x07,
        }
    }

    fn capabilities(self) -> Capabilities {
        match self {
            CommonAction::Firmware | CommonAction::Status | CommonAction::Info => Capabilities::GR,
            CommonAction::Config => Capabilities::GSR,
            CommonAction::ClearErrors | CommonAction::Reset | CommonAction::Identify => {
                Capabilities::S
            }
        }
    }

    fn common(self) -> Option<CommonAction> {
        Some(self)
    }
}

// ---------------------------------------------------------------------------
// Relay controller
// ---------------------------------------------------------------------------

/// ASC2 relay controller actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Asc2Action {
    Common(CommonAction),
    /// Single relay with hold time.
    Control1,
    /// Relay bank with valid mask.
    Control2,
    /// Sub-relay pulse.
    Control3,
    /// Switch machine with hold time.
    Control4,
    /// Switch machine, latched.
    Control5,
}

impl PdiAction for Asc2Action {
    fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0x10 => Some(Asc2Action::Control1),
            0x11 => Some(Asc2Action::Control2),
            0x12 => Some(Asc2Action::Control3),
            0x14 => Some(Asc2Action::Control4),
            0x15 => Some(Asc2Action::Control5),
            _ => CommonAction::from_bits(bits).map(Asc2Action::Common),
        }
    }

    fn bits(self) -> u8 {
        match self {
            Asc2Action::Common(c) => c.bits(),
            Asc2Action::Control1 => 0x10,
            Asc2Action::Control2 => 0x11,
            Asc2Action::Control3 => 0x12,
            Asc2Action::Control4 => 0x14,
            Asc2Action::Control5 => 0x15,
        }
    }

    fn capabilities(self) -> Capabilities {
        match self {
            Asc2Action::Common(c) => c.capabilities(),
            _ => Capabilities::GSR,
        }
    }

    fn common(self) -> Option<CommonAction> {
        match self {
            Asc2Action::Common(c) => Some(c),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Power district
// ---------------------------------------------------------------------------

/// BPC2 power district actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bpc2Action {
    Common(CommonAction),
    Control1,
    Control2,
    Control3,
    Control4,
}

impl PdiAction for Bpc2Action {
    fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0x10 => Some(Bpc2Action::Control1),
            0x11 => Some(Bpc2Action::Control2),
            0x12 => Some(Bpc2Action::Control3),
            0x13 => Some(Bpc2Action::Control4),
            _ => CommonAction::from_bits(bits).map(Bpc2Action::Common),
        }
    }

    fn bits(self) -> u8 {
        match self {
            Bpc2Action::Common(c) => c.bits(),
            Bpc2Action::Control1 => 0x10,
            Bpc2Action::Control2 => 0x11,
            Bpc2Action::Control3 => 0x12,
            Bpc2Action::Control4 => 0x13,
        }
    }

    fn capabilities(self) -> Capabilities {
        match self {
            Bpc2Action::Common(c) => c.capabilities(),
            _ => Capabilities::GSR,
        }
    }

    fn common(self) -> Option<CommonAction> {
        match self {
            Bpc2Action::Common(c) => Some(c),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Motor/lamp controller
// ---------------------------------------------------------------------------

/// AMC2 motor and lamp controller actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Amc2Action {
    Common(CommonAction),
    Motor,
    Lamp,
    MotorConfig,
}

impl PdiAction for Amc2Action {
    fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0x10 => Some(Amc2Action::Motor),
            0x11 => Some(Amc2Action::Lamp),
            0x12 => Some(Amc2Action::MotorConfig),
            _ => CommonAction::from_bits(bits).map(Amc2Action::Common),
        }
    }

    fn bits(self) -> u8 {
        match self {
            Amc2Action::Common(c) => c.bits(),
            Amc2Action::Motor => 0x10,
            Amc2Action::Lamp => 0x11,
            Amc2Action::MotorConfig => 0x12,
        }
    }

    fn capabilities(self) -> Capabilities {
        match self {
            Amc2Action::Common(c) => c.capabilities(),
            _ => Capabilities::GSR,
        }
    }

    fn common(self) -> Option<CommonAction> {
        match self {
            Amc2Action::Common(c) => Some(c),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Switch machine
// ---------------------------------------------------------------------------

/// STM2 switch machine actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stm2Action {
    Common(CommonAction),
    /// Switch position (query/report only).
    Control1,
}

impl PdiAction for Stm2Action {
    fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0x10 => Some(Stm2Action::Control1),
            _ => CommonAction::from_bits(bits).map(Stm2Action::Common),
        }
    }

    fn bits(self) -> u8 {
        match self {
            Stm2Action::Common(c) => c.bits(),
            Stm2Action::Control1 => 0x10,
        }
    }

    fn capabilities(self) -> Capabilities {
        match self {
            Stm2Action::Common(c) => c.capabilities(),
            Stm2Action::Control1 => Capabilities::GR,
        }
    }

    fn common(self) -> Option<CommonAction> {
        match self {
            Stm2Action::Common(c) => Some(c),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Sensor track
// ---------------------------------------------------------------------------

/// IRDA sensor track actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IrdaAction {
    Common(CommonAction),
    /// Unsolicited pass-by report.
    Data,
    Sequence,
    Record,
    DiagData,
}

impl PdiAction for IrdaAction {
    fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0x10 => Some(IrdaAction::Data),
            0x11 => Some(IrdaAction::Sequence),
            0x12 => Some(IrdaAction::Record),
            0x13 => Some(IrdaAction::DiagData),
            _ => CommonAction::from_bits(bits).map(IrdaAction::Common),
        }
    }

    fn bits(self) -> u8 {
        match self {
            IrdaAction::Common(c) => c.bits(),
            IrdaAction::Data => 0x10,
            IrdaAction::Sequence => 0x11,
            IrdaAction::Record => 0x12,
            IrdaAction::DiagData => 0x13,
        }
    }

    fn capabilities(self) -> Capabilities {
        match self {
            IrdaAction::Common(c) => c.capabilities(),
            IrdaAction::Data => Capabilities::R,
            _ => Capabilities::GSR,
        }
    }

    fn common(self) -> Option<CommonAction> {
        match self {
            IrdaAction::Common(c) => Some(c),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Wi-Fi module
// ---------------------------------------------------------------------------

/// Wi-Fi module actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WifiAction {
    Common(CommonAction),
    Connect,
    Ip,
    RespBcasts,
    Unlock,
    Passcode,
}

impl PdiAction for WifiAction {
    fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0x10 => Some(WifiAction::Connect),
            0x11 => Some(WifiAction::Ip),
            0x12 => Some(WifiAction::RespBcasts),
            0x13 => Some(WifiAction::Unlock),
            0x14 => Some(WifiAction::Passcode),
            _ => CommonAction::from_bits(bits).map(WifiAction::Common),
        }
    }

    fn bits(self) -> u8 {
        match self {
            WifiAction::Common(c) => c.bits(),
            WifiAction::Connect => 0x10,
            WifiAction::Ip => 0x11,
            WifiAction::RespBcasts => 0x12,
            WifiAction::Unlock => 0x13,
            WifiAction::Passcode => 0x14,
        }
    }

    fn capabilities(self) -> Capabilities {
        match self {
            WifiAction::Common(c) => c.capabilities(),
            WifiAction::Connect | WifiAction::Ip => Capabilities::GR,
            WifiAction::Unlock => Capabilities::SR,
            WifiAction::RespBcasts | WifiAction::Passcode => Capabilities::GSR,
        }
    }

    fn common(self) -> Option<CommonAction> {
        match self {
            WifiAction::Common(c) => Some(c),
            _ => None,
        }
    }
}
