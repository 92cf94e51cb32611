//! Wi-Fi module attached to the Base.

use std::net::Ipv4Addr;

use bytes::{BufMut, BytesMut};
use raillib_core::{Error, Result, Scope};

use crate::action::{CommonAction, WifiAction};
use crate::command::{PdiCommand, PdiDevice};
use crate::lcs::{CommonBody, LcsBody, LcsReq};
use crate::wire::Reader;

/// Network mode of the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiMode {
    /// Access point.
    Ap,
    /// Infrastructure (joined to a router).
    Infrastructure,
    Wps,
}

impl WifiMode {
    pub fn from_byte(b: u8) -> Result<Self> {
        match b {
            0 => Ok(WifiMode::Ap),
            1 => Ok(WifiMode::Infrastructure),
            2 => Ok(WifiMode::Wps),
            other => Err(Error::Protocol(format!("unknown Wi-Fi mode {other}"))),
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            WifiMode::Ap => 0,
            WifiMode::Infrastructure => 1,
            WifiMode::Wps => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            WifiMode::Ap => "AP",
            WifiMode::Infrastructure => "INF",
            WifiMode::Wps => "WPS",
        }
    }
}

/// A connected client: slot number and address on the Base's subnet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WifiClient {
    pub slot: u8,
    pub address: Ipv4Addr,
}

/// Body of a Wi-Fi request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WifiBody {
    Common(CommonBody),
    Connect {
        max_clients: u8,
        connected: u8,
        mode: WifiMode,
    },
    Ip {
        base: Ipv4Addr,
        /// Clients share the first three octets of `base`.
        clients: Vec<WifiClient>,
    },
    RespBcasts(bool),
    /// Config, unlock, and passcode bodies are carried opaque.
    Raw(Vec<u8>),
}

impl WifiBody {
    fn decode_ip(r: &mut Reader<'_>) -> Result<Self> {
        let o = r.bytes(4)?;
        let base = Ipv4Addr::new(o[0], o[1], o[2], o[3]);
        let mut clients = Vec::new();
        while r.remaining() >= 2 {
            let slot = r.u8()?;
            let last = r.u8()?;
            clients.push(WifiClient {
                slot,
                address: Ipv4Addr::new(o[0], o[1], o[2], last),
            });
        }
        Ok(WifiBody::Ip { base, clients })
    }
}

impl LcsBody for WifiBody {
    type Action = WifiAction;
    const DEVICE: PdiDevice = PdiDevice::Wifi;

    fn empty() -> Self {
        WifiBody::Common(CommonBody::Empty)
    }

    fn decode(command: PdiCommand, action: WifiAction, r: &mut Reader<'_>) -> Result<Self> {
        Ok(match action {
            WifiAction::Common(CommonAction::Config) | WifiAction::Unlock | WifiAction::Passcode => {
                WifiBody::Raw(r.rest().to_vec())
            }
            WifiAction::Common(other) => WifiBody::Common(CommonBody::decode(command, other, r)?),
            WifiAction::Connect => WifiBody::Connect {
                max_clients: r.u8()?,
                connected: r.u8()?,
                mode: WifiMode::from_byte(r.u8()?)?,
            },
            WifiAction::Ip => Self::decode_ip(r)?,
            WifiAction::RespBcasts => WifiBody::RespBcasts(r.u8()? == 1),
        })
    }

    fn encode(&self, _command: PdiCommand, buf: &mut BytesMut) {
        match self {
            WifiBody::Common(body) => body.encode(buf),
            WifiBody::Connect {
                max_clients,
                connected,
                mode,
            } => {
                buf.put_u8(*max_clients);
                buf.put_u8(*connected);
                buf.put_u8(mode.as_byte());
            }
            WifiBody::Ip { base, clients } => {
                buf.put_slice(&base.octets());
                for client in clients {
                    buf.put_u8(client.slot);
                    buf.put_u8(client.address.octets()[3]);
                }
            }
            WifiBody::RespBcasts(enabled) => buf.put_u8(u8::from(*enabled)),
            WifiBody::Raw(raw) => buf.put_slice(raw),
        }
    }

    fn scope(_action: WifiAction) -> Scope {
        Scope::Base
    }
}

pub type WifiReq = LcsReq<WifiBody>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::PdiFrame;

    #[test]
    fn connect_report() {
        let frame = PdiFrame::new(PdiCommand::WifiRx, vec![0, 0x10, 8, 2, 1]);
        let req = WifiReq::from_frame(&frame).unwrap();
        assert_eq!(
            req.body,
            WifiBody::Connect {
                max_clients: 8,
                connected: 2,
                mode: WifiMode::Infrastructure,
            }
        );
    }

    #[test]
    fn ip_report_lists_clients_on_base_subnet() {
        let frame = PdiFrame::new(PdiCommand::WifiRx, vec![0, 0x11, 192, 168, 1, 50, 1, 101, 2, 102]);
        let req = WifiReq::from_frame(&frame).unwrap();
        let WifiBody::Ip { base, ref clients } = req.body else {
            panic!("expected ip report");
        };
        assert_eq!(base, Ipv4Addr::new(192, 168, 1, 50));
        assert_eq!(clients.len(), 2);
        assert_eq!(clients[1].address, Ipv4Addr::new(192, 168, 1, 102));
        assert_eq!(req.to_frame().payload, frame.payload);
    }

    #[test]
    fn unlock_is_set_only_but_responds() {
        assert!(WifiReq::get(0, WifiAction::Unlock).is_err());
        assert!(WifiReq::set(0, WifiAction::Unlock, WifiBody::Raw(vec![1])).is_ok());
    }
}
