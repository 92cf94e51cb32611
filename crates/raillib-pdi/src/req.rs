//! Typed dispatch over every PDI request kind.
//!
//! [`PdiReq::from_frame`] picks the decoder for a frame's command family, so
//! that code consuming a [`FrameBuffer`](crate::frame::FrameBuffer) can
//! match on one enum instead of switching on command bytes.

use raillib_core::{CommandCodec, CommandReq, Error, Result, Scope};

use crate::amc2::Amc2Req;
use crate::asc2::Asc2Req;
use crate::base::{BaseReq, SpeedUpdate};
use crate::block::BlockReq;
use crate::bpc2::Bpc2Req;
use crate::command::{PdiCommand, PdiDevice};
use crate::d4::D4Req;
use crate::frame::{self, PdiFrame};
use crate::irda::IrdaReq;
use crate::lcs::Ser2Req;
use crate::memory::BaseMemoryReq;
use crate::stm2::Stm2Req;
use crate::tmcc::TmccReq;
use crate::wifi::WifiReq;

/// A decoded PDI request or response.
#[derive(Debug, Clone, PartialEq)]
pub enum PdiReq {
    Ping,
    Tmcc(TmccReq),
    Base(BaseReq),
    Speed(SpeedUpdate),
    Memory(BaseMemoryReq),
    D4(D4Req),
    Block(BlockReq),
    Irda(IrdaReq),
    Wifi(WifiReq),
    Ser2(Ser2Req),
    Asc2(Asc2Req),
    Bpc2(Bpc2Req),
    Amc2(Amc2Req),
    Stm2(Stm2Req),
    /// All-device broadcasts, Wi-Fi pings, and radio receiver reports,
    /// carried undecoded.
    Raw(PdiFrame),
}

impl PdiReq {
    pub fn from_frame(frame: &PdiFrame) -> Result<Self> {
        let cmd = frame.command;
        Ok(match cmd.device() {
            PdiDevice::Ping => PdiReq::Ping,
            PdiDevice::Tmcc => PdiReq::Tmcc(TmccReq::from_frame(frame)?),
            PdiDevice::Base => match cmd {
                PdiCommand::BaseMemory => PdiReq::Memory(BaseMemoryReq::from_frame(frame)?),
                PdiCommand::UpdateEngineSpeed | PdiCommand::UpdateTrainSpeed => {
                    PdiReq::Speed(SpeedUpdate::from_frame(frame)?)
                }
                _ => PdiReq::Base(BaseReq::from_frame(frame)?),
            },
            PdiDevice::D4 => PdiReq::D4(D4Req::from_frame(frame)?),
            PdiDevice::Block => PdiReq::Block(BlockReq::from_frame(frame)?),
            PdiDevice::Irda => PdiReq::Irda(IrdaReq::from_frame(frame)?),
            PdiDevice::Wifi if cmd.is_lcs() => PdiReq::Wifi(WifiReq::from_frame(frame)?),
            PdiDevice::Ser2 => PdiReq::Ser2(Ser2Req::from_frame(frame)?),
            PdiDevice::Asc2 => PdiReq::Asc2(Asc2Req::from_frame(frame)?),
            PdiDevice::Bpc2 => PdiReq::Bpc2(Bpc2Req::from_frame(frame)?),
            PdiDevice::Amc2 => PdiReq::Amc2(Amc2Req::from_frame(frame)?),
            PdiDevice::Stm2 => PdiReq::Stm2(Stm2Req::from_frame(frame)?),
            PdiDevice::All | PdiDevice::Wifi | PdiDevice::Radio => PdiReq::Raw(frame.clone()),
        })
    }

    /// Decode one request from the front of `buf`, returning the rest.
    pub fn decode(buf: &[u8]) -> Result<(Self, &[u8])> {
        let (frame, rest) = frame::decode(buf)?;
        Ok((Self::from_frame(&frame)?, rest))
    }

    pub fn to_frame(&self) -> PdiFrame {
        match self {
            PdiReq::Ping => PdiFrame::new(PdiCommand::Ping, Vec::new()),
            PdiReq::Tmcc(r) => r.to_frame(),
            PdiReq::Base(r) => r.to_frame(),
            PdiReq::Speed(r) => r.to_frame(),
            PdiReq::Memory(r) => r.to_frame(),
            PdiReq::D4(r) => r.to_frame(),
            PdiReq::Block(r) => r.to_frame(),
            PdiReq::Irda(r) => r.to_frame(),
            PdiReq::Wifi(r) => r.to_frame(),
            PdiReq::Ser2(r) => r.to_frame(),
            PdiReq::Asc2(r) => r.to_frame(),
            PdiReq::Bpc2(r) => r.to_frame(),
            PdiReq::Amc2(r) => r.to_frame(),
            PdiReq::Stm2(r) => r.to_frame(),
            PdiReq::Raw(f) => f.clone(),
        }
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        self.to_frame().encode()
    }

    pub fn command(&self) -> PdiCommand {
        match self {
            PdiReq::Ping => PdiCommand::Ping,
            PdiReq::Tmcc(r) => r.command,
            PdiReq::Base(r) => r.command,
            PdiReq::D4(r) => r.command,
            PdiReq::Irda(r) => r.command,
            PdiReq::Wifi(r) => r.command,
            PdiReq::Ser2(r) => r.command,
            PdiReq::Asc2(r) => r.command,
            PdiReq::Bpc2(r) => r.command,
            PdiReq::Amc2(r) => r.command,
            PdiReq::Stm2(r) => r.command,
            PdiReq::Raw(f) => f.command,
            PdiReq::Speed(_) | PdiReq::Memory(_) | PdiReq::Block(_) => self.to_frame().command,
        }
    }

    /// Scope of the component this request describes.
    ///
    /// `None` for requests that are not about one component (pings, TMCC
    /// pass-through, raw frames, and memory frames of an unmodelled type).
    pub fn scope(&self) -> Option<Scope> {
        Some(match self {
            PdiReq::Base(r) => r.scope(),
            PdiReq::Speed(r) => r.scope,
            PdiReq::Memory(r) => r.scope?,
            PdiReq::D4(r) => r.scope(),
            PdiReq::Block(_) => Scope::Block,
            PdiReq::Irda(r) => r.scope(),
            PdiReq::Wifi(r) => r.scope(),
            PdiReq::Ser2(r) => r.scope(),
            PdiReq::Asc2(r) => r.scope(),
            PdiReq::Bpc2(r) => r.scope(),
            PdiReq::Amc2(r) => r.scope(),
            PdiReq::Stm2(r) => r.scope(),
            PdiReq::Ping | PdiReq::Tmcc(_) | PdiReq::Raw(_) => return None,
        })
    }

    /// Address of the component this request describes.
    ///
    /// D4 frames are keyed by record number, not address, and report
    /// `None` unless they are record counts (which describe the Base).
    pub fn address(&self) -> Option<u16> {
        Some(match self {
            PdiReq::Base(r) => r.address(),
            PdiReq::Speed(r) => r.address(),
            PdiReq::Memory(r) => r.address(),
            PdiReq::D4(r) if r.scope() == Scope::Base => 0,
            PdiReq::Block(r) => r.address(),
            PdiReq::Wifi(_) => 0,
            PdiReq::Irda(r) => u16::from(r.address),
            PdiReq::Ser2(r) => u16::from(r.address),
            PdiReq::Asc2(r) => u16::from(r.address),
            PdiReq::Bpc2(r) => u16::from(r.address),
            PdiReq::Amc2(r) => u16::from(r.address),
            PdiReq::Stm2(r) => u16::from(r.address),
            _ => return None,
        })
    }

    pub fn is_ping(&self) -> bool {
        matches!(self, PdiReq::Ping)
    }

    /// Decode the wrapped TMCC command of a pass-through frame.
    pub fn to_command(&self, codec: &dyn CommandCodec) -> Result<CommandReq> {
        match self {
            PdiReq::Tmcc(r) => r.to_command(codec),
            other => Err(Error::Protocol(format!(
                "{} does not carry a TMCC command",
                other.command()
            ))),
        }
    }
}

impl From<BaseReq> for PdiReq {
    fn from(r: BaseReq) -> Self {
        PdiReq::Base(r)
    }
}

impl From<Asc2Req> for PdiReq {
    fn from(r: Asc2Req) -> Self {
        PdiReq::Asc2(r)
    }
}

impl From<Bpc2Req> for PdiReq {
    fn from(r: Bpc2Req) -> Self {
        PdiReq::Bpc2(r)
    }
}

impl From<Amc2Req> for PdiReq {
    fn from(r: Amc2Req) -> Self {
        PdiReq::Amc2(r)
    }
}

impl From<Stm2Req> for PdiReq {
    fn from(r: Stm2Req) -> Self {
        PdiReq::Stm2(r)
    }
}

impl From<IrdaReq> for PdiReq {
    fn from(r: IrdaReq) -> Self {
        PdiReq::Irda(r)
    }
}

impl From<BlockReq> for PdiReq {
    fn from(r: BlockReq) -> Self {
        PdiReq::Block(r)
    }
}

impl From<D4Req> for PdiReq {
    fn from(r: D4Req) -> Self {
        PdiReq::D4(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Stm2Action;
    use crate::frame::{FrameBuffer, KEEP_ALIVE};
    use crate::stm2::Stm2Body;

    #[test]
    fn keep_alive_is_ping() {
        let (req, rest) = PdiReq::decode(&KEEP_ALIVE).unwrap();
        assert!(req.is_ping());
        assert!(rest.is_empty());
        assert_eq!(req.scope(), None);
        assert_eq!(req.as_bytes(), KEEP_ALIVE.to_vec());
    }

    #[test]
    fn dispatch_by_family() {
        let stm2 = Stm2Req::rx(12, Stm2Action::Control1, Stm2Body::Position(1)).unwrap();
        let req = PdiReq::from(stm2);
        let (back, _) = PdiReq::decode(&req.as_bytes()).unwrap();
        assert_eq!(back, req);
        assert_eq!(back.scope(), Some(Scope::Switch));
        assert_eq!(back.address(), Some(12));
        assert_eq!(back.command(), PdiCommand::Stm2Rx);
    }

    #[test]
    fn speed_and_memory_frames() {
        let speed = PdiFrame::new(PdiCommand::UpdateEngineSpeed, vec![8, 30]);
        let req = PdiReq::from_frame(&speed).unwrap();
        assert!(matches!(req, PdiReq::Speed(_)));
        assert_eq!(req.scope(), Some(Scope::Engine));
        assert_eq!(req.command(), PdiCommand::UpdateEngineSpeed);
    }

    #[test]
    fn packed_frames_through_buffer() {
        let a = Stm2Req::rx(3, Stm2Action::Control1, Stm2Body::Position(0)).unwrap();
        let b = BlockReq::new(4);
        let mut wire = PdiReq::from(a).as_bytes();
        wire.extend(PdiReq::from(b).as_bytes());
        wire.extend_from_slice(&KEEP_ALIVE);

        let mut buf = FrameBuffer::new();
        buf.extend(&wire);
        let reqs: Vec<PdiReq> = buf
            .drain_frames()
            .into_iter()
            .map(|f| PdiReq::from_frame(&f.unwrap()).unwrap())
            .collect();
        assert_eq!(reqs.len(), 3);
        assert_eq!(reqs[1].scope(), Some(Scope::Block));
        assert!(reqs[2].is_ping());
    }

    #[test]
    fn non_tmcc_has_no_command() {
        let codec = raillib_test_harness::MockCodec::new();
        assert!(PdiReq::Ping.to_command(&codec).is_err());
    }

    #[test]
    fn radio_frames_are_raw() {
        let frame = PdiFrame::new(PdiCommand::RfRx, vec![1, 2, 3]);
        let req = PdiReq::from_frame(&frame).unwrap();
        assert_eq!(req, PdiReq::Raw(frame));
        assert_eq!(req.address(), None);
    }
}
