//! PDI command codes.
//!
//! The byte following the start marker selects a sub-protocol and, for the
//! LCS devices, a direction: `*_GET` is a host query, `*_SET` a host
//! command, and `*_RX` a device response or unsolicited broadcast.
//!
//! | Family            | GET    | SET    | RX     |
//! |-------------------|--------|--------|--------|
//! | IRDA sensor track | `0x30` | `0x31` | `0x32` |
//! | Wi-Fi module      | `0x34` | `0x35` | `0x36` |
//! | SER2 bridge       | `0x38` | `0x39` | `0x3A` |
//! | ASC2 relay        | `0x3C` | `0x3D` | `0x3E` |
//! | BPC2 power        | `0x40` | `0x41` | `0x42` |
//! | AMC2 motor/lamp   | `0x44` | `0x45` | `0x46` |
//! | STM2 switch       | `0x4C` | `0x4D` | `0x4E` |

use std::fmt;

/// The device family a [`PdiCommand`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PdiDevice {
    All,
    Base,
    Tmcc,
    Ping,
    Irda,
    Wifi,
    Ser2,
    Asc2,
    Bpc2,
    Amc2,
    Stm2,
    Block,
    D4,
    Radio,
}

impl PdiDevice {
    /// Returns `true` for the LCS accessory/sensor family.
    pub fn is_lcs(&self) -> bool {
        matches!(
            self,
            PdiDevice::Irda
                | PdiDevice::Wifi
                | PdiDevice::Ser2
                | PdiDevice::Asc2
                | PdiDevice::Bpc2
                | PdiDevice::Amc2
                | PdiDevice::Stm2
        )
    }
}

/// Direction of an LCS command relative to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Host query.
    Get,
    /// Host command.
    Set,
    /// Device response or broadcast.
    Rx,
    /// Not a GET/SET/RX triple member.
    Other,
}

/// A PDI command code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum PdiCommand {
    AllGet = 0x01,
    AllSet = 0x02,
    BaseEngine = 0x20,
    BaseTrain = 0x21,
    BaseAcc = 0x22,
    Base = 0x23,
    BaseRoute = 0x24,
    BaseSwitch = 0x25,
    BaseMemory = 0x26,
    TmccTx = 0x27,
    TmccRx = 0x28,
    Ping = 0x29,
    UpdateEngineSpeed = 0x2A,
    UpdateTrainSpeed = 0x2B,
    Tmcc4Tx = 0x2C,
    Tmcc4Rx = 0x2D,
    IrdaGet = 0x30,
    IrdaSet = 0x31,
    IrdaRx = 0x32,
    WifiGet = 0x34,
    WifiSet = 0x35,
    WifiRx = 0x36,
    WifiPing = 0x37,
    Ser2Get = 0x38,
    Ser2Set = 0x39,
    Ser2Rx = 0x3A,
    Asc2Get = 0x3C,
    Asc2Set = 0x3D,
    Asc2Rx = 0x3E,
    Bpc2Get = 0x40,
    Bpc2Set = 0x41,
    Bpc2Rx = 0x42,
    Amc2Get = 0x44,
    Amc2Set = 0x45,
    Amc2Rx = 0x46,
    Stm2Get = 0x4C,
    Stm2Set = 0x4D,
    Stm2Rx = 0x4E,
    BlockRx = 0x50,
    D4Engine = 0x5A,
    D4Train = 0x5B,
    RfRx = 0x72,
    BleRx = 0x76,
}

impl PdiCommand {
    /// Every known command, in code order.
    pub const ALL: [PdiCommand; 43] = [
        PdiCommand::AllGet,
        PdiCommand::AllSet,
        PdiCommand::BaseEngine,
        PdiCommand::BaseTrain,
        PdiCommand::BaseAcc,
        PdiCommand::Base,
        PdiCommand::BaseRoute,
        PdiCommand::BaseSwitch,
        PdiCommand::BaseMemory,
        PdiCommand::TmccTx,
        PdiCommand::TmccRx,
        PdiCommand::Ping,
        PdiCommand::UpdateEngineSpeed,
        PdiCommand::UpdateTrainSpeed,
        PdiCommand::Tmcc4Tx,
        PdiCommand::Tmcc4Rx,
        PdiCommand::IrdaGet,
        PdiCommand::IrdaSet,
        PdiCommand::IrdaRx,
        PdiCommand::WifiGet,
        PdiCommand::WifiSet,
        PdiCommand::WifiRx,
        PdiCommand::WifiPing,
        PdiCommand::Ser2Get,
        PdiCommand::Ser2Set,
        PdiCommand::Ser2Rx,
        PdiCommand::Asc2Get,
        PdiCommand::Asc2Set,
        PdiCommand::Asc2Rx,
        PdiCommand::Bpc2Get,
        PdiCommand::Bpc2Set,
        PdiCommand::Bpc2Rx,
        PdiCommand::Amc2Get,
        PdiCommand::Amc2Set,
        PdiCommand::Amc2Rx,
        PdiCommand::Stm2Get,
        PdiCommand::Stm2Set,
        PdiCommand::Stm2Rx,
        PdiCommand::BlockRx,
        PdiCommand::D4Engine,
        PdiCommand::D4Train,
        PdiCommand::RfRx,
        PdiCommand::BleRx,
    ];

    /// Look up a command by its wire byte.
    pub fn from_byte(byte: u8) -> Option<PdiCommand> {
        PdiCommand::ALL.into_iter().find(|c| c.as_byte() == byte)
    }

    /// The wire byte for this command.
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Device family this command belongs to.
    pub fn device(self) -> PdiDevice {
        use PdiCommand::*;
        match self {
            AllGet | AllSet => PdiDevice::All,
            BaseEngine | BaseTrain | BaseAcc | Base | BaseRoute | BaseSwitch | BaseMemory
            | UpdateEngineSpeed | UpdateTrainSpeed => PdiDevice::Base,
            TmccTx | TmccRx | Tmcc4Tx | Tmcc4Rx => PdiDevice::Tmcc,
            Ping => PdiDevice::Ping,
            IrdaGet | IrdaSet | IrdaRx => PdiDevice::Irda,
            WifiGet | WifiSet | WifiRx | WifiPing => PdiDevice::Wifi,
            Ser2Get | Ser2Set | Ser2Rx => PdiDevice::Ser2,
            Asc2Get | Asc2Set | Asc2Rx => PdiDevice::Asc2,
            Bpc2Get | Bpc2Set | Bpc2Rx => PdiDevice::Bpc2,
            Amc2Get | Amc2Set | Amc2Rx => PdiDevice::Amc2,
            Stm2Get | Stm2Set | Stm2Rx => PdiDevice::Stm2,
            BlockRx => PdiDevice::Block,
            D4Engine | D4Train => PdiDevice::D4,
            RfRx | BleRx => PdiDevice::Radio,
        }
    }

    /// Direction of this command relative to the host.
    pub fn role(self) -> Role {
        use PdiCommand::*;
        match self {
            AllGet | IrdaGet | WifiGet | Ser2Get | Asc2Get | Bpc2Get | Amc2Get | Stm2Get => {
                Role::Get
            }
            AllSet | IrdaSet | WifiSet | Ser2Set | Asc2Set | Bpc2Set | Amc2Set | Stm2Set => {
                Role::Set
            }
            TmccRx | Tmcc4Rx | IrdaRx | WifiRx | Ser2Rx | Asc2Rx | Bpc2Rx | Amc2Rx | Stm2Rx
            | BlockRx | RfRx | BleRx => Role::Rx,
            _ => Role::Other,
        }
    }

    /// Select the GET/SET/RX member of an LCS family.
    pub fn lcs(device: PdiDevice, role: Role) -> Option<PdiCommand> {
        PdiCommand::ALL
            .into_iter()
            .find(|c| c.device() == device && c.role() == role && device.is_lcs())
    }

    /// Returns `true` for the keep-alive ping.
    pub fn is_ping(self) -> bool {
        self == PdiCommand::Ping
    }

    /// Returns `true` for TMCC pass-through frames.
    pub fn is_tmcc(self) -> bool {
        self.device() == PdiDevice::Tmcc
    }

    /// Returns `true` for 4-digit TMCC pass-through frames.
    pub fn is_tmcc4(self) -> bool {
        matches!(self, PdiCommand::Tmcc4Tx | PdiCommand::Tmcc4Rx)
    }

    /// Returns `true` for Base record, memory, and speed-update frames.
    pub fn is_base(self) -> bool {
        self.device() == PdiDevice::Base
    }

    /// Returns `true` for D4 record frames.
    pub fn is_d4(self) -> bool {
        self.device() == PdiDevice::D4
    }

    /// Returns `true` for the LCS accessory/sensor family.
    pub fn is_lcs(self) -> bool {
        self.device().is_lcs() && self != PdiCommand::WifiPing
    }

    pub fn is_get(self) -> bool {
        self.role() == Role::Get
    }

    pub fn is_set(self) -> bool {
        self.role() == Role::Set
    }

    pub fn is_rx(self) -> bool {
        self.role() == Role::Rx
    }
}

impl fmt::Display for PdiCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?} (0x{:02X})", self.as_byte())
    }
}
