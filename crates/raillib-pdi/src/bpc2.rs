//! BPC2 power district controller.

use bytes::{BufMut, BytesMut};
use raillib_core::{Result, Scope};

use crate::action::{Bpc2Action, CommonAction};
use crate::command::{PdiCommand, PdiDevice};
use crate::lcs::{CommonBody, ConfigHeader, LcsBody, LcsReq};
use crate::wire::Reader;

const RESTORE_BIT: u8 = 0x80;

/// BPC2 configuration. Bit 7 of the mode byte is split out as `restore`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bpc2Config {
    pub header: ConfigHeader,
    /// Restore the previous power state on boot.
    pub restore: bool,
}

/// Body of a BPC2 request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bpc2Body {
    Common(CommonBody),
    Config(Bpc2Config),
    /// Single district on (1) or off (0), for Control1 and Control3.
    State(u8),
    /// District bank with valid mask, for Control2 and Control4.
    Bank { values: u8, valids: u8 },
}

impl Bpc2Body {
    /// Power state, for the single-district actions.
    pub fn state(&self) -> Option<u8> {
        match *self {
            Bpc2Body::State(s) => Some(s),
            _ => None,
        }
    }
}

impl LcsBody for Bpc2Body {
    type Action = Bpc2Action;
    const DEVICE: PdiDevice = PdiDevice::Bpc2;

    fn empty() -> Self {
        Bpc2Body::Common(CommonBody::Empty)
    }

    fn decode(command: PdiCommand, action: Bpc2Action, r: &mut Reader<'_>) -> Result<Self> {
        Ok(match action {
            Bpc2Action::Common(CommonAction::Config) => {
                let mut header = ConfigHeader::decode(r)?;
                let restore = header.mode & RESTORE_BIT != 0;
                header.mode &= !RESTORE_BIT;
                Bpc2Body::Config(Bpc2Config { header, restore })
            }
            Bpc2Action::Common(other) => Bpc2Body::Common(CommonBody::decode(command, other, r)?),
            Bpc2Action::Control1 | Bpc2Action::Control3 => Bpc2Body::State(r.u8()?),
            Bpc2Action::Control2 | Bpc2Action::Control4 => Bpc2Body::Bank {
                values: r.u8()?,
                valids: r.opt_u8().unwrap_or(0),
            },
        })
    }

    fn encode(&self, _command: PdiCommand, buf: &mut BytesMut) {
        match *self {
            Bpc2Body::Common(ref body) => body.encode(buf),
            Bpc2Body::Config(config) => {
                let mut header = config.header;
                if config.restore {
                    header.mode |= RESTORE_BIT;
                }
                header.encode(buf);
            }
            Bpc2Body::State(state) => buf.put_u8(state),
            Bpc2Body::Bank { values, valids } => {
                buf.put_u8(values);
                buf.put_u8(valids);
            }
        }
    }

    /// Control1/Control2 address the district as a train; Control3/Control4
    /// as an accessory.
    fn scope(action: Bpc2Action) -> Scope {
        match action {
            Bpc2Action::Control1 | Bpc2Action::Control2 => Scope::Train,
            _ => Scope::Acc,
        }
    }
}

pub type Bpc2Req = LcsReq<Bpc2Body>;

impl Bpc2Req {
    /// Switch a district on or off through its accessory address.
    pub fn power(address: u8, on: bool) -> Result<Self> {
        Self::set(address, Bpc2Action::Control3, Bpc2Body::State(u8::from(on)))
    }
}
