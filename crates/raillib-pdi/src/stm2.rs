//! STM2 switch machine controller.

use bytes::{BufMut, BytesMut};
use raillib_core::{Result, Scope};

use crate::action::{CommonAction, Stm2Action};
use crate::command::{PdiCommand, PdiDevice};
use crate::lcs::{CommonBody, ConfigHeader, LcsBody, LcsReq};
use crate::wire::Reader;

/// Body of an STM2 request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stm2Body {
    Common(CommonBody),
    Config(ConfigHeader),
    /// Reported switch position: 1 is out, anything else is through.
    Position(u8),
}

impl Stm2Body {
    pub fn is_out(&self) -> Option<bool> {
        match *self {
            Stm2Body::Position(state) => Some(state == 1),
            _ => None,
        }
    }

    pub fn is_thru(&self) -> Option<bool> {
        self.is_out().map(|out| !out)
    }
}

impl LcsBody for Stm2Body {
    type Action = Stm2Action;
    const DEVICE: PdiDevice = PdiDevice::Stm2;

    fn empty() -> Self {
        Stm2Body::Common(CommonBody::Empty)
    }

    fn decode(command: PdiCommand, action: Stm2Action, r: &mut Reader<'_>) -> Result<Self> {
        Ok(match action {
            Stm2Action::Common(CommonAction::Config) => Stm2Body::Config(ConfigHeader::decode(r)?),
            Stm2Action::Common(other) => Stm2Body::Common(CommonBody::decode(command, other, r)?),
            Stm2Action::Control1 => Stm2Body::Position(r.u8()?),
        })
    }

    fn encode(&self, _command: PdiCommand, buf: &mut BytesMut) {
        match self {
            Stm2Body::Common(body) => body.encode(buf),
            Stm2Body::Config(header) => header.encode(buf),
            Stm2Body::Position(state) => buf.put_u8(*state),
        }
    }

    fn scope(action: Stm2Action) -> Scope {
        match action {
            Stm2Action::Control1 => Scope::Switch,
            Stm2Action::Common(_) => Scope::Acc,
        }
    }
}

pub type Stm2Req = LcsReq<Stm2Body>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::PdiFrame;

    #[test]
    fn position_report() {
        let frame = PdiFrame::new(PdiCommand::Stm2Rx, vec![12, 0x10, 1]);
        let req = Stm2Req::from_frame(&frame).unwrap();
        assert_eq!(req.scope(), Scope::Switch);
        assert_eq!(req.body.is_out(), Some(true));

        let frame = PdiFrame::new(PdiCommand::Stm2Rx, vec![12, 0x10, 2]);
        assert_eq!(Stm2Req::from_frame(&frame).unwrap().body.is_thru(), Some(true));
    }

    #[test]
    fn position_cannot_be_set() {
        assert!(Stm2Req::set(12, Stm2Action::Control1, Stm2Body::Position(1)).is_err());
        assert!(Stm2Req::get(12, Stm2Action::Control1).is_ok());
    }
}
