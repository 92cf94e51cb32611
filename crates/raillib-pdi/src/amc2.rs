//! AMC2 motor and lamp controller.
//!
//! An AMC2 drives two motor outputs and four lamp outputs. The full
//! configuration is read with a Config GET; individual Motor, Lamp, and
//! MotorConfig frames change one output at a time and can be folded back
//! into a cached config with [`update_config`].
//!
//! Config body layout after the action byte:
//!
//! ```text
//! tmcc_id debug option(2) access_type
//! out1 out2 dir1 dir2 restore1 restore2 state1 state2 speed1 speed2
//! lamp1 lamp2 lamp3 lamp4
//! ```
//!
//! Device responses to Motor, Lamp, and MotorConfig carry one reserved byte
//! ahead of the output index; host commands do not.

use bytes::{BufMut, BytesMut};
use raillib_core::{Error, Result, Scope};

use crate::action::{Amc2Action, CommonAction};
use crate::command::{PdiCommand, PdiDevice};
use crate::lcs::{CommonBody, LcsBody, LcsReq};
use crate::wire::Reader;

/// Number of motor outputs.
pub const MOTORS: usize = 2;

/// Number of lamp outputs.
pub const LAMPS: usize = 4;

/// Maximum motor speed and lamp level.
pub const MAX_LEVEL: u8 = 100;

/// How the board's outputs are addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessType {
    Engine,
    Train,
    #[default]
    Acc,
}

impl AccessType {
    pub fn from_byte(b: u8) -> Result<Self> {
        match b {
            0 => Ok(AccessType::Engine),
            1 => Ok(AccessType::Train),
            2 => Ok(AccessType::Acc),
            other => Err(Error::Protocol(format!("unknown AMC2 access type {other}"))),
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            AccessType::Engine => 0,
            AccessType::Train => 1,
            AccessType::Acc => 2,
        }
    }
}

/// Electrical drive of a motor output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputType {
    Normal,
    Delta,
    #[default]
    Ac,
}

impl OutputType {
    pub fn from_byte(b: u8) -> Result<Self> {
        match b {
            0 => Ok(OutputType::Normal),
            1 => Ok(OutputType::Delta),
            2 => Ok(OutputType::Ac),
            other => Err(Error::Protocol(format!("unknown AMC2 output type {other}"))),
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            OutputType::Normal => 0,
            OutputType::Delta => 1,
            OutputType::Ac => 2,
        }
    }

    pub fn is_dc(self) -> bool {
        matches!(self, OutputType::Normal | OutputType::Delta)
    }
}

/// Motor rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotorDirection {
    Forward,
    Reverse,
    #[default]
    Ac,
}

impl MotorDirection {
    pub fn from_byte(b: u8) -> Result<Self> {
        match b {
            1 => Ok(MotorDirection::Forward),
            2 => Ok(MotorDirection::Reverse),
            3 => Ok(MotorDirection::Ac),
            other => Err(Error::Protocol(format!("unknown AMC2 direction {other}"))),
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            MotorDirection::Forward => 1,
            MotorDirection::Reverse => 2,
            MotorDirection::Ac => 3,
        }
    }
}

/// One motor output as described by a Config report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Amc2Motor {
    pub output_type: OutputType,
    pub direction: MotorDirection,
    /// Restore `restore_state` on boot.
    pub restore: bool,
    pub restore_state: bool,
    pub speed: u8,
}

/// Full AMC2 configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Amc2Config {
    pub tmcc_id: u8,
    pub debug: u8,
    pub option: u16,
    pub access_type: AccessType,
    pub motors: [Amc2Motor; MOTORS],
    /// Lamp levels, 0-100.
    pub lamps: [u8; LAMPS],
}

impl Amc2Config {
    fn decode(r: &mut Reader<'_>) -> Result<Self> {
        let tmcc_id = r.u8()?;
        let debug = r.u8()?;
        let option = r.be16()?;
        let access_type = AccessType::from_byte(r.u8()?)?;
        let raw = r.bytes(2 * 5)?;
        let mut motors = [Amc2Motor::default(); MOTORS];
        for (i, motor) in motors.iter_mut().enumerate() {
            *motor = Amc2Motor {
                output_type: OutputType::from_byte(raw[i])?,
                direction: MotorDirection::from_byte(raw[2 + i])?,
                restore: raw[4 + i] != 0,
                restore_state: raw[6 + i] != 0,
                speed: raw[8 + i],
            };
        }
        let mut lamps = [0u8; LAMPS];
        for (slot, &b) in lamps.iter_mut().zip(r.rest()) {
            *slot = b;
        }
        Ok(Amc2Config {
            tmcc_id,
            debug,
            option,
            access_type,
            motors,
            lamps,
        })
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.tmcc_id);
        buf.put_u8(self.debug);
        buf.put_u16(self.option);
        buf.put_u8(self.access_type.as_byte());
        let [m1, m2] = self.motors;
        buf.put_u8(m1.output_type.as_byte());
        buf.put_u8(m2.output_type.as_byte());
        buf.put_u8(m1.direction.as_byte());
        buf.put_u8(m2.direction.as_byte());
        buf.put_u8(u8::from(m1.restore));
        buf.put_u8(u8::from(m2.restore));
        buf.put_u8(u8::from(m1.restore_state));
        buf.put_u8(u8::from(m2.restore_state));
        buf.put_u8(m1.speed);
        buf.put_u8(m2.speed);
        buf.put_slice(&self.lamps);
    }
}

/// Body of an AMC2 request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Amc2Body {
    Common(CommonBody),
    Config(Amc2Config),
    /// Output index selected by a Motor, Lamp, or MotorConfig GET.
    Select(u8),
    Motor {
        motor: u8,
        speed: u8,
        direction: MotorDirection,
    },
    Lamp {
        lamp: u8,
        level: u8,
    },
    MotorConfig {
        motor: u8,
        output_type: OutputType,
        restore_state: bool,
    },
}

fn check_range(what: &str, value: u8, max: u8) -> Result<u8> {
    if value > max {
        return Err(Error::InvalidParameter(format!(
            "{what} {value} out of range 0-{max}"
        )));
    }
    Ok(value)
}

fn skip_reserved(command: PdiCommand, r: &mut Reader<'_>) -> Result<()> {
    if command.is_rx() {
        r.skip(1)?;
    }
    Ok(())
}

impl Amc2Body {
    /// Set a motor's speed (0-100) and direction.
    pub fn motor(motor: u8, speed: u8, direction: MotorDirection) -> Result<Self> {
        Ok(Amc2Body::Motor {
            motor: check_range("motor", motor, MOTORS as u8 - 1)?,
            speed: check_range("speed", speed, MAX_LEVEL)?,
            direction,
        })
    }

    /// Set a lamp's level (0-100).
    pub fn lamp(lamp: u8, level: u8) -> Result<Self> {
        Ok(Amc2Body::Lamp {
            lamp: check_range("lamp", lamp, LAMPS as u8 - 1)?,
            level: check_range("level", level, MAX_LEVEL)?,
        })
    }

    /// Reconfigure a motor output.
    pub fn motor_config(motor: u8, output_type: OutputType, restore_state: bool) -> Result<Self> {
        Ok(Amc2Body::MotorConfig {
            motor: check_range("motor", motor, MOTORS as u8 - 1)?,
            output_type,
            restore_state,
        })
    }
}

impl LcsBody for Amc2Body {
    type Action = Amc2Action;
    const DEVICE: PdiDevice = PdiDevice::Amc2;

    fn empty() -> Self {
        Amc2Body::Common(CommonBody::Empty)
    }

    fn decode(command: PdiCommand, action: Amc2Action, r: &mut Reader<'_>) -> Result<Self> {
        Ok(match action {
            Amc2Action::Common(CommonAction::Config) => Amc2Body::Config(Amc2Config::decode(r)?),
            Amc2Action::Common(other) => Amc2Body::Common(CommonBody::decode(command, other, r)?),
            _ if command.is_get() => Amc2Body::Select(r.u8()?),
            Amc2Action::Motor => {
                skip_reserved(command, r)?;
                Amc2Body::Motor {
                    motor: r.u8()?,
                    speed: r.u8()?,
                    direction: MotorDirection::from_byte(r.u8()?)?,
                }
            }
            Amc2Action::Lamp => {
                skip_reserved(command, r)?;
                Amc2Body::Lamp {
                    lamp: r.u8()?,
                    level: r.u8()?,
                }
            }
            Amc2Action::MotorConfig => {
                skip_reserved(command, r)?;
                Amc2Body::MotorConfig {
                    motor: r.u8()?,
                    output_type: OutputType::from_byte(r.u8()?)?,
                    restore_state: r.u8()? != 0,
                }
            }
        })
    }

    fn encode(&self, command: PdiCommand, buf: &mut BytesMut) {
        let per_output = matches!(
            self,
            Amc2Body::Motor { .. } | Amc2Body::Lamp { .. } | Amc2Body::MotorConfig { .. }
        );
        if per_output && command.is_rx() {
            buf.put_u8(0);
        }
        match *self {
            Amc2Body::Common(ref body) => body.encode(buf),
            Amc2Body::Config(ref config) => config.encode(buf),
            Amc2Body::Select(index) => buf.put_u8(index),
            Amc2Body::Motor {
                motor,
                speed,
                direction,
            } => {
                buf.put_u8(motor);
                buf.put_u8(speed);
                buf.put_u8(direction.as_byte());
            }
            Amc2Body::Lamp { lamp, level } => {
                buf.put_u8(lamp);
                buf.put_u8(level);
            }
            Amc2Body::MotorConfig {
                motor,
                output_type,
                restore_state,
            } => {
                buf.put_u8(motor);
                buf.put_u8(output_type.as_byte());
                buf.put_u8(u8::from(restore_state));
            }
        }
    }

    fn scope(_action: Amc2Action) -> Scope {
        Scope::Acc
    }
}

pub type Amc2Req = LcsReq<Amc2Body>;

/// Fold a single-output frame into a cached config.
///
/// Returns `true` if `config` changed. Config frames replace the cache
/// wholesale; frames without output data leave it untouched.
pub fn update_config(config: &mut Amc2Config, req: &Amc2Req) -> bool {
    if req.is_error() {
        return false;
    }
    let before = *config;
    match req.body {
        Amc2Body::Config(ref full) => *config = *full,
        Amc2Body::Motor {
            motor,
            speed,
            direction,
        } => {
            if let Some(m) = config.motors.get_mut(usize::from(motor)) {
                m.speed = speed;
                m.direction = direction;
            }
        }
        Amc2Body::Lamp { lamp, level } => {
            if let Some(l) = config.lamps.get_mut(usize::from(lamp)) {
                *l = level;
            }
        }
        Amc2Body::MotorConfig {
            motor,
            output_type,
            restore_state,
        } => {
            if let Some(m) = config.motors.get_mut(usize::from(motor)) {
                m.output_type = output_type;
                m.restore_state = restore_state;
            }
        }
        Amc2Body::Common(_) | Amc2Body::Select(_) => {}
    }
    *config != before
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::PdiFrame;

    fn config_payload() -> Vec<u8> {
        vec![
            9, 0x03, // address, action
            9, 0, 0x00, 0x01, 2, // tmcc_id, debug, option, access type
            0, 2, // output types
            1, 2, // directions
            1, 0, // restore
            1, 0, // restore state
            50, 100, // speeds
            10, 20, 30, 40, // lamps
        ]
    }

    #[test]
    fn config_report_decodes_interleaved_motors() {
        let frame = PdiFrame::new(PdiCommand::Amc2Rx, config_payload());
        let req = Amc2Req::from_frame(&frame).unwrap();
        let Amc2Body::Config(config) = req.body else {
            panic!("expected config");
        };
        assert_eq!(config.option, 1);
        assert_eq!(config.access_type, AccessType::Acc);
        assert_eq!(config.motors[0].output_type, OutputType::Normal);
        assert_eq!(config.motors[1].output_type, OutputType::Ac);
        assert_eq!(config.motors[0].direction, MotorDirection::Forward);
        assert_eq!(config.motors[1].direction, MotorDirection::Reverse);
        assert!(config.motors[0].restore && config.motors[0].restore_state);
        assert_eq!(config.motors[1].speed, 100);
        assert_eq!(config.lamps, [10, 20, 30, 40]);
        assert_eq!(req.to_frame().payload, config_payload());
    }

    #[test]
    fn motor_set_layout() {
        let body = Amc2Body::motor(1, 75, MotorDirection::Reverse).unwrap();
        let req = Amc2Req::set(9, Amc2Action::Motor, body).unwrap();
        assert_eq!(req.to_frame().payload, vec![9, 0x10, 1, 75, 2]);
    }

    #[test]
    fn motor_response_skips_reserved_byte() {
        let frame = PdiFrame::new(PdiCommand::Amc2Rx, vec![9, 0x11, 0, 3, 80]);
        let req = Amc2Req::from_frame(&frame).unwrap();
        assert_eq!(req.body, Amc2Body::Lamp { lamp: 3, level: 80 });
        assert_eq!(req.to_frame().payload, vec![9, 0x11, 0, 3, 80]);
    }

    #[test]
    fn get_selects_output() {
        let req = Amc2Req::new(
            crate::command::Role::Get,
            9,
            Amc2Action::Lamp,
            Amc2Body::Select(2),
        )
        .unwrap();
        assert_eq!(req.to_frame().payload, vec![9, 0x11, 2]);
        let decoded = Amc2Req::from_frame(&req.to_frame()).unwrap();
        assert_eq!(decoded.body, Amc2Body::Select(2));
    }

    #[test]
    fn out_of_range_arguments_rejected() {
        assert!(Amc2Body::motor(2, 50, MotorDirection::Forward).is_err());
        assert!(Amc2Body::motor(0, 101, MotorDirection::Forward).is_err());
        assert!(Amc2Body::lamp(4, 50).is_err());
        assert!(Amc2Body::lamp(3, 101).is_err());
        assert!(Amc2Body::motor_config(5, OutputType::Delta, true).is_err());
    }

    #[test]
    fn update_config_folds_single_frames() {
        let mut config = Amc2Config::default();
        let lamp = Amc2Req::set(9, Amc2Action::Lamp, Amc2Body::lamp(2, 60).unwrap()).unwrap();
        assert!(update_config(&mut config, &lamp));
        assert_eq!(config.lamps, [0, 0, 60, 0]);
        assert!(!update_config(&mut config, &lamp));

        let motor = Amc2Req::set(
            9,
            Amc2Action::Motor,
            Amc2Body::motor(0, 40, MotorDirection::Forward).unwrap(),
        )
        .unwrap();
        assert!(update_config(&mut config, &motor));
        assert_eq!(config.motors[0].speed, 40);
        assert_eq!(config.motors[0].direction, MotorDirection::Forward);

        let mc = Amc2Req::set(
            9,
            Amc2Action::MotorConfig,
            Amc2Body::motor_config(1, OutputType::Delta, false).unwrap(),
        )
        .unwrap();
        assert!(update_config(&mut config, &mc));
        assert_eq!(config.motors[1].output_type, OutputType::Delta);
        assert!(!config.motors[1].restore_state);
    }
}
