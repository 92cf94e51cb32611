//! ASC2 relay controller.
//!
//! An ASC2 drives relays that can act as a plain accessory output
//! (Control1-3) or as a switch machine driver (Control4-5).

use std::time::Duration;

use bytes::{BufMut, BytesMut};
use raillib_core::{Result, Scope};

use crate::action::{Asc2Action, CommonAction};
use crate::command::{PdiCommand, PdiDevice};
use crate::lcs::{CommonBody, ConfigHeader, LcsBody, LcsReq};
use crate::wire::Reader;

/// Length of one hold-time tick.
pub const TICK: Duration = Duration::from_millis(10);

/// Convert a duration to 10 ms ticks, saturating at 255.
pub fn ticks(duration: Duration) -> u8 {
    let n = (duration.as_secs_f64() * 100.0).round();
    n.clamp(0.0, 255.0) as u8
}

/// ASC2 configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Asc2Config {
    pub header: ConfigHeader,
    /// Relay debounce delay, in 10 ms ticks.
    pub delay: u8,
}

impl Asc2Config {
    pub fn delay(&self) -> Duration {
        TICK * u32::from(self.delay)
    }
}

/// Body of an ASC2 request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Asc2Body {
    Common(CommonBody),
    Config(Asc2Config),
    /// Relay on/off with hold time (ticks).
    Control1 { values: u8, time: u8 },
    /// Relay bank with valid mask.
    Control2 { values: u8, valids: u8 },
    /// Relay bank as reported by the device.
    Control3 { values: u8, valids: u8 },
    /// Pulse one sub-relay (SET only).
    Control3Pulse { sub_id: u8, time: u8 },
    /// Switch position with hold time (ticks).
    Control4 { values: u8, time: u8 },
    /// Latched switch position.
    Control5 { values: u8 },
}

impl Asc2Body {
    /// Relay or switch value, for the control actions that carry one.
    pub fn values(&self) -> Option<u8> {
        match *self {
            Asc2Body::Control1 { values, .. }
            | Asc2Body::Control2 { values, .. }
            | Asc2Body::Control3 { values, .. }
            | Asc2Body::Control4 { values, .. }
            | Asc2Body::Control5 { values } => Some(values),
            _ => None,
        }
    }

    /// Hold time, for the actions that carry one.
    pub fn time(&self) -> Option<Duration> {
        match *self {
            Asc2Body::Control1 { time, .. }
            | Asc2Body::Control3Pulse { time, .. }
            | Asc2Body::Control4 { time, .. } => Some(TICK * u32::from(time)),
            _ => None,
        }
    }

    /// `Some(true)` for a switch-driver frame in the through position.
    pub fn is_thru(&self) -> Option<bool> {
        match *self {
            Asc2Body::Control4 { values, .. } | Asc2Body::Control5 { values } => Some(values == 0),
            _ => None,
        }
    }
}

impl LcsBody for Asc2Body {
    type Action = Asc2Action;
    const DEVICE: PdiDevice = PdiDevice::Asc2;

    fn empty() -> Self {
        Asc2Body::Common(CommonBody::Empty)
    }

    fn decode(command: PdiCommand, action: Asc2Action, r: &mut Reader<'_>) -> Result<Self> {
        Ok(match action {
            Asc2Action::Common(CommonAction::Config) => Asc2Body::Config(Asc2Config {
                header: ConfigHeader::decode(r)?,
                delay: r.u8()?,
            }),
            Asc2Action::Common(other) => Asc2Body::Common(CommonBody::decode(command, other, r)?),
            Asc2Action::Control1 => Asc2Body::Control1 {
                values: r.u8()?,
                time: r.opt_u8().unwrap_or(0),
            },
            Asc2Action::Control2 => Asc2Body::Control2 {
                values: r.u8()?,
                valids: r.opt_u8().unwrap_or(0),
            },
            Asc2Action::Control3 if command.is_set() => Asc2Body::Control3Pulse {
                sub_id: r.u8()?,
                time: r.opt_u8().unwrap_or(0),
            },
            Asc2Action::Control3 => Asc2Body::Control3 {
                values: r.u8()?,
                valids: r.opt_u8().unwrap_or(0),
            },
            Asc2Action::Control4 => Asc2Body::Control4 {
                values: r.u8()?,
                time: r.opt_u8().unwrap_or(0),
            },
            Asc2Action::Control5 => Asc2Body::Control5 { values: r.u8()? },
        })
    }

    fn encode(&self, _command: PdiCommand, buf: &mut BytesMut) {
        match *self {
            Asc2Body::Common(ref body) => body.encode(buf),
            Asc2Body::Config(config) => {
                config.header.encode(buf);
                buf.put_u8(config.delay);
            }
            Asc2Body::Control1 { values, time } => {
                buf.put_u8(values);
                buf.put_u8(time);
            }
            Asc2Body::Control2 { values, valids } | Asc2Body::Control3 { values, valids } => {
                buf.put_u8(values);
                buf.put_u8(valids);
            }
            // The board reads a single tick as "no hold".
            Asc2Body::Control3Pulse { sub_id, time } => {
                buf.put_u8(sub_id);
                buf.put_u8(if time == 1 { 0 } else { time });
            }
            Asc2Body::Control4 { values, time } => {
                buf.put_u8(values);
                buf.put_u8(if time == 1 { 0 } else { time });
            }
            Asc2Body::Control5 { values } => buf.put_u8(values),
        }
    }

    fn scope(action: Asc2Action) -> Scope {
        match action {
            Asc2Action::Control4 | Asc2Action::Control5 => Scope::Switch,
            _ => Scope::Acc,
        }
    }
}

pub type Asc2Req = LcsReq<Asc2Body>;

impl Asc2Req {
    /// Turn a relay on or off, optionally holding it for `hold`.
    pub fn relay(address: u8, on: bool, hold: Option<Duration>) -> Result<Self> {
        Self::set(
            address,
            Asc2Action::Control1,
            Asc2Body::Control1 {
                values: u8::from(on),
                time: hold.map(ticks).unwrap_or(0),
            },
        )
    }

    /// Throw a switch driven by this board.
    pub fn switch(address: u8, thru: bool, hold: Option<Duration>) -> Result<Self> {
        Self::set(
            address,
            Asc2Action::Control4,
            Asc2Body::Control4 {
                values: u8::from(!thru),
                time: hold.map(ticks).unwrap_or(0),
            },
        )
    }
}
