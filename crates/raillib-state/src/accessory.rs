//! Accessory state.
//!
//! An accessory address is either a plain TMCC accessory or one of the LCS
//! boards that answer on it. The first PDI frame seen for the address fixes
//! which; frames from any other board family are rejected afterwards.
//!
//! Once an ASC2 relay or a BPC2 power district has reported its on/off
//! state, that report wins: TMCC aux commands to the same address are still
//! recorded as the last command but no longer change the on/off state.


use raillib_core::{
    AuxOp, CommandCodec, CommandId, CommandReq, Error, Result, Scope,
};
use raillib_pdi::PdiReq;
use raillib_pdi::action::{Asc2Action, Amc2Action, Bpc2Action, CommonAction, IrdaAction};
use raillib_pdi::amc2::{Amc2Body, Amc2Config, Amc2Req, update_config};
use raillib_pdi::asc2::Asc2Req;
use raillib_pdi::base::{BaseRecord, BaseReq, COMPONENT_SYNTH_VALID, ComponentRecord};
use raillib_pdi::bpc2::{Bpc2Body, Bpc2Req};
use raillib_pdi::irda::{IrdaBody, IrdaReq};
use raillib_pdi::lcs::{CommonBody, LcsInfo};
use tokio::time::Instant;
use tracing::debug;

use crate::component::{Common, Settings, Update, pulse, pulse_due, tmcc_bytes};
use crate::dependency::DependencyCache;

/// What drives an accessory address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AccVariant {
    /// TMCC accessory commands only.
    #[default]
    Plain,
    /// An IRDA sensor board reporting as an accessory.
    SensorTrack,
    /// A BPC2 power district.
    PowerDistrict,
    /// An ASC2 relay.
    Relay,
    /// An AMC2 motor and lamp controller.
    MotorLamp,
}

impl AccVariant {
    fn of(req: &PdiReq) -> Option<Self> {
        Some(match req {
            PdiReq::Asc2(_) => AccVariant::Relay,
            PdiReq::Bpc2(_) => AccVariant::PowerDistrict,
            PdiReq::Amc2(_) => AccVariant::MotorLamp,
            PdiReq::Irda(_) => AccVariant::SensorTrack,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct AccessoryState {
    pub(crate) common: Common,
    variant: AccVariant,
    lcs_claimed: bool,
    is_power_district: bool,
    aux: Option<AuxOp>,
    aux1: Option<AuxOp>,
    aux2: Option<AuxOp>,
    number: Option<u16>,
    last_aux1_opt1: Option<Instant>,
    last_aux2_opt1: Option<Instant>,
    bpc2_action: Option<Bpc2Action>,
    amc2: Option<Amc2Config>,
    sensor_info: Option<LcsInfo>,
}

impl AccessoryState {
    pub(crate) fn new(address: Option<u16>, settings: Settings) -> Result<Self> {
        Ok(AccessoryState {
            common: Common::new(Scope::Acc, address, settings)?,
            variant: AccVariant::Plain,
            lcs_claimed: false,
            is_power_district: false,
            aux: None,
            aux1: None,
            aux2: None,
            number: None,
            last_aux1_opt1: None,
            last_aux2_opt1: None,
            bpc2_action: None,
            amc2: None,
            sensor_info: None,
        })
    }

    pub(crate) fn update(&mut self, update: Update<'_>, deps: &DependencyCache) -> Result<bool> {
        self.common.accept(&update)?;
        match update {
            Update::Command(req) => Ok(self.apply_command(req, update, deps)),
            Update::Pdi(req) => self.apply_pdi(req, update),
        }
    }

    fn apply_command(&mut self, req: &CommandReq, update: Update<'_>, deps: &DependencyCache) -> bool {
        // Halt forces the rest state whoever drives the accessory.
        if update.is_halt() {
            self.common.record(update);
            self.aux1 = Some(AuxOp::Aux1Off);
            self.aux2 = Some(AuxOp::Aux2Off);
            self.aux = Some(AuxOp::Aux2OptOne);
            self.number = None;
            return true;
        }
        let CommandId::Aux(op) = req.command else {
            return false;
        };
        self.common.record(update);

        if op == AuxOp::Numeric {
            self.number = req.data;
        }
        if self.lcs_claimed {
            debug!(
                address = req.address,
                command = ?op,
                variant = ?self.variant,
                "accessory state held by LCS device"
            );
            return op == AuxOp::Numeric;
        }

        let window = self.common.settings.aux_pulse_window;
        match op {
            AuxOp::Aux1OptOne => {
                self.aux = Some(op);
                if pulse_due(self.last_aux1_opt1, window) {
                    self.aux1 = Some(pulse(self.aux1, AuxOp::Aux1On, AuxOp::Aux1OptTwo, AuxOp::Aux1Off));
                }
                self.last_aux1_opt1 = Some(Instant::now());
            }
            AuxOp::Aux2OptOne => {
                self.aux = Some(op);
                if pulse_due(self.last_aux2_opt1, window) {
                    self.aux2 = Some(pulse(self.aux2, AuxOp::Aux2On, AuxOp::Aux2OptTwo, AuxOp::Aux2Off));
                }
                self.last_aux2_opt1 = Some(Instant::now());
            }
            _ => {}
        }
        for key in deps.results_in(req.key(), true, false) {
            match key.command {
                CommandId::Aux(a @ (AuxOp::Aux1On | AuxOp::Aux1Off | AuxOp::Aux1OptTwo)) => {
                    self.aux1 = Some(a)
                }
                CommandId::Aux(a @ (AuxOp::Aux2On | AuxOp::Aux2Off | AuxOp::Aux2OptTwo)) => {
                    self.aux2 = Some(a)
                }
                _ => {}
            }
        }
        true
    }

    fn set_power(&mut self, on: bool) {
        if on {
            self.aux = Some(AuxOp::Aux1OptOne);
            self.aux1 = Some(AuxOp::Aux1On);
            self.aux2 = Some(AuxOp::Aux2On);
        } else {
            self.aux = Some(AuxOp::Aux2OptOne);
            self.aux1 = Some(AuxOp::Aux1Off);
            self.aux2 = Some(AuxOp::Aux2Off);
        }
    }

    fn apply_pdi(&mut self, req: &PdiReq, update: Update<'_>) -> Result<bool> {
        if let PdiReq::Base(rec) = req {
            if rec.is_ack() || rec.status != 0 {
                return Ok(false);
            }
            self.common.bind_names(rec.name(), rec.number());
            self.common.record(update);
            return Ok(true);
        }
        let Some(kind) = AccVariant::of(req) else {
            return Ok(false);
        };
        if self.variant == AccVariant::Plain {
            self.variant = kind;
        } else if self.variant != kind {
            return Err(Error::Protocol(format!(
                "accessory {} is a {:?}, not a {kind:?}",
                self.common.address.unwrap_or_default(),
                self.variant
            )));
        }

        let changed = match req {
            PdiReq::Asc2(r) if !r.is_error() => match (r.action, r.body.values()) {
                (Asc2Action::Control1, Some(values)) => {
                    self.lcs_claimed = true;
                    self.set_power(values != 0);
                    true
                }
                _ => false,
            },
            PdiReq::Bpc2(r) if !r.is_error() => match (r.action, r.body.state()) {
                (Bpc2Action::Control1 | Bpc2Action::Control3, Some(state)) => {
                    self.lcs_claimed = true;
                    self.is_power_district = true;
                    self.bpc2_action.get_or_insert(r.action);
                    self.set_power(state == 1);
                    true
                }
                _ => false,
            },
            PdiReq::Amc2(r) => match self.amc2.as_mut() {
                Some(config) => update_config(config, r),
                None => match r.body {
                    Amc2Body::Config(config) if !r.is_error() => {
                        self.amc2 = Some(config);
                        true
                    }
                    _ => false,
                },
            },
            PdiReq::Irda(r) => {
                if let IrdaBody::Common(CommonBody::Info(info)) = &r.body {
                    self.sensor_info = Some(*info);
                }
                true
            }
            _ => false,
        };
        if changed {
            self.common.record(update);
        }
        Ok(changed)
    }

    pub(crate) fn as_bytes(&self, codec: &dyn CommandCodec) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let (Some(address), Some(record_no)) = (self.common.address, self.common.record_no()) else {
            return Ok(out);
        };
        if self.common.has_names() {
            let record = ComponentRecord {
                name: self.common.road_name.clone(),
                number: self.common.road_number.clone(),
                ..Default::default()
            };
            out.extend(
                BaseReq::with_record(record_no, COMPONENT_SYNTH_VALID, BaseRecord::Acc(record))?
                    .as_bytes(),
            );
        }
        let on = self.is_aux_on();
        match self.variant {
            AccVariant::Relay => {
                if self.lcs_claimed {
                    out.extend(Asc2Req::relay(record_no, on, None)?.as_rx().as_bytes());
                }
            }
            AccVariant::PowerDistrict => {
                if self.lcs_claimed {
                    let action = self.bpc2_action.unwrap_or(Bpc2Action::Control3);
                    let req = Bpc2Req::rx(record_no, action, Bpc2Body::State(u8::from(on)))?;
                    out.extend(req.as_bytes());
                }
            }
            AccVariant::MotorLamp => {
                if let Some(config) = self.amc2 {
                    let action = Amc2Action::Common(CommonAction::Config);
                    out.extend(Amc2Req::rx(record_no, action, Amc2Body::Config(config))?.as_bytes());
                }
            }
            AccVariant::SensorTrack => {
                let info = self.sensor_info.unwrap_or(LcsInfo {
                    board_id: record_no,
                    num_ids: 1,
                    model: 0,
                    dc_volts_raw: 0,
                });
                let action = IrdaAction::Common(CommonAction::Info);
                let body = IrdaBody::Common(CommonBody::Info(info));
                out.extend(IrdaReq::rx(record_no, action, body)?.as_bytes());
            }
            AccVariant::Plain => {
                for op in [self.aux, self.aux1, self.aux2].into_iter().flatten() {
                    let req = CommandReq::build(CommandId::Aux(op), address, None, Some(Scope::Acc))?;
                    out.extend(tmcc_bytes(&req, codec)?);
                }
            }
        }
        Ok(out)
    }

    pub(crate) fn is_known(&self) -> bool {
        self.common.has_names()
            || self.aux.is_some()
            || self.aux1.is_some()
            || self.aux2.is_some()
            || self.number.is_some()
            || self.amc2.is_some()
            || self.variant != AccVariant::Plain
    }

    pub fn variant(&self) -> AccVariant {
        self.variant
    }

    /// `true` once an LCS device has reported this accessory's state.
    pub fn is_lcs_claimed(&self) -> bool {
        self.lcs_claimed
    }

    pub fn is_power_district(&self) -> bool {
        self.is_power_district
    }

    pub fn is_sensor_track(&self) -> bool {
        self.variant == AccVariant::SensorTrack
    }

    pub fn aux(&self) -> Option<AuxOp> {
        self.aux
    }

    pub fn aux1(&self) -> Option<AuxOp> {
        self.aux1
    }

    pub fn aux2(&self) -> Option<AuxOp> {
        self.aux2
    }

    pub fn is_aux_on(&self) -> bool {
        self.aux1 == Some(AuxOp::Aux1On)
    }

    pub fn is_aux2_on(&self) -> bool {
        self.aux2 == Some(AuxOp::Aux2On)
    }

    /// Last numeric key sent to this accessory.
    pub fn number(&self) -> Option<u16> {
        self.number
    }

    /// Cached motor and lamp settings of an AMC2.
    pub fn amc2(&self) -> Option<&Amc2Config> {
        self.amc2.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raillib_pdi::amc2::MotorDirection;
    use raillib_test_harness::MockCodec;
    use std::time::Duration;

    fn acc(address: u16) -> AccessoryState {
        AccessoryState::new(
            Some(address),
            Settings {
                duplicate_window: Duration::ZERO,
                aux_pulse_window: Duration::from_secs(3600),
            },
        )
        .unwrap()
    }

    fn aux(op: AuxOp, address: u16) -> CommandReq {
        CommandReq::build(CommandId::Aux(op), address, None, None).unwrap()
    }

    fn send(state: &mut AccessoryState, deps: &DependencyCache, req: CommandReq) -> bool {
        state.update(Update::Command(&req), deps).unwrap()
    }

    fn feed(state: &mut AccessoryState, deps: &DependencyCache, req: impl Into<PdiReq>) -> Result<bool> {
        let req = req.into();
        state.update(Update::Pdi(&req), deps)
    }

    fn bpc2_rx(address: u8, action: Bpc2Action, state: u8) -> Bpc2Req {
        Bpc2Req::rx(address, action, Bpc2Body::State(state)).unwrap()
    }

    // ---------------------------------------------------------------
    // Plain TMCC accessories
    // ---------------------------------------------------------------

    #[test]
    fn aux_commands() {
        let deps = DependencyCache::new();
        let mut a = acc(9);
        send(&mut a, &deps, aux(AuxOp::Aux1On, 9));
        assert!(a.is_aux_on());
        send(&mut a, &deps, aux(AuxOp::Aux1Off, 9));
        assert!(!a.is_aux_on());
        assert_eq!(a.variant(), AccVariant::Plain);
    }

    #[test]
    fn option_one_pulses() {
        let deps = DependencyCache::new();
        let mut a = acc(9);
        send(&mut a, &deps, aux(AuxOp::Aux1OptOne, 9));
        assert!(a.is_aux_on());
        assert_eq!(a.aux(), Some(AuxOp::Aux1OptOne));
        // Held button: still on inside the pulse window.
        send(&mut a, &deps, aux(AuxOp::Aux1OptOne, 9));
        assert!(a.is_aux_on());
    }

    #[test]
    fn halt_overrides_lcs_claim() {
        let deps = DependencyCache::new();
        let halt = CommandReq::build(CommandId::Halt, 99, None, None).unwrap();

        let mut relay = acc(5);
        feed(&mut relay, &deps, Asc2Req::relay(5, true, None).unwrap().as_rx()).unwrap();
        assert!(relay.is_lcs_claimed());
        assert!(relay.is_aux_on());
        assert!(send(&mut relay, &deps, halt));
        assert!(!relay.is_aux_on());
        assert_eq!(relay.aux(), Some(AuxOp::Aux2OptOne));

        let mut district = acc(8);
        feed(&mut district, &deps, bpc2_rx(8, Bpc2Action::Control3, 1)).unwrap();
        let number = CommandReq::build(CommandId::Aux(AuxOp::Numeric), 8, Some(2), None).unwrap();
        send(&mut district, &deps, number);
        assert!(send(&mut district, &deps, halt));
        assert_eq!(district.aux1(), Some(AuxOp::Aux1Off));
        assert_eq!(district.aux2(), Some(AuxOp::Aux2Off));
        assert_eq!(district.number(), None);
        assert!(district.is_power_district());
    }

    #[test]
    fn numeric_sets_number() {
        let deps = DependencyCache::new();
        let mut a = acc(9);
        let req = CommandReq::build(CommandId::Aux(AuxOp::Numeric), 9, Some(4), None).unwrap();
        send(&mut a, &deps, req);
        assert_eq!(a.number(), Some(4));
    }

    #[test]
    fn halt_turns_everything_off() {
        let deps = DependencyCache::new();
        let mut a = acc(9);
        send(&mut a, &deps, aux(AuxOp::Aux1On, 9));
        send(&mut a, &deps, aux(AuxOp::Aux2On, 9));
        let halt = CommandReq::build(CommandId::Halt, 99, None, None).unwrap();
        assert!(send(&mut a, &deps, halt));
        assert_eq!(a.aux1(), Some(AuxOp::Aux1Off));
        assert_eq!(a.aux2(), Some(AuxOp::Aux2Off));
        assert_eq!(a.aux(), Some(AuxOp::Aux2OptOne));
        assert_eq!(a.number(), None);
    }

    // ---------------------------------------------------------------
    // Power districts
    // ---------------------------------------------------------------

    #[test]
    fn power_district_on_and_off() {
        let deps = DependencyCache::new();
        let mut a = acc(8);
        assert!(feed(&mut a, &deps, bpc2_rx(8, Bpc2Action::Control1, 1)).unwrap());
        assert!(a.is_power_district());
        assert_eq!(a.variant(), AccVariant::PowerDistrict);
        assert_eq!(a.aux(), Some(AuxOp::Aux1OptOne));
        assert_eq!(a.aux1(), Some(AuxOp::Aux1On));
        assert_eq!(a.aux2(), Some(AuxOp::Aux2On));

        feed(&mut a, &deps, bpc2_rx(8, Bpc2Action::Control3, 0)).unwrap();
        assert_eq!(a.aux(), Some(AuxOp::Aux2OptOne));
        assert_eq!(a.aux1(), Some(AuxOp::Aux1Off));
        assert_eq!(a.aux2(), Some(AuxOp::Aux2Off));
    }

    #[test]
    fn claimed_district_ignores_tmcc() {
        let deps = DependencyCache::new();
        let mut a = acc(8);
        feed(&mut a, &deps, bpc2_rx(8, Bpc2Action::Control3, 1)).unwrap();
        let off = aux(AuxOp::Aux1Off, 8);
        assert!(!send(&mut a, &deps, off));
        assert!(a.is_aux_on());
        assert_eq!(
            a.common.last_command,
            Some(crate::component::LastCommand::Tmcc(off))
        );
    }

    // ---------------------------------------------------------------
    // Relays
    // ---------------------------------------------------------------

    #[test]
    fn asc2_claim() {
        let deps = DependencyCache::new();
        let mut a = acc(5);
        send(&mut a, &deps, aux(AuxOp::Aux1On, 5));
        assert!(!a.is_lcs_claimed());

        let relay_off = Asc2Req::relay(5, false, None).unwrap().as_rx();
        assert!(feed(&mut a, &deps, relay_off).unwrap());
        assert!(a.is_lcs_claimed());
        assert_eq!(a.variant(), AccVariant::Relay);
        assert!(!a.is_aux_on());

        // TMCC no longer overrides the relay.
        send(&mut a, &deps, aux(AuxOp::Aux1On, 5));
        assert!(!a.is_aux_on());
    }

    #[test]
    fn variants_are_exclusive() {
        let deps = DependencyCache::new();
        let mut a = acc(5);
        feed(&mut a, &deps, Asc2Req::relay(5, true, None).unwrap()).unwrap();
        let err = feed(&mut a, &deps, bpc2_rx(5, Bpc2Action::Control3, 0)).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
        assert!(a.is_aux_on());
        assert!(!a.is_power_district());
    }

    #[test]
    fn sensor_track_info() {
        let deps = DependencyCache::new();
        let mut a = acc(3);
        let info = IrdaReq::rx(
            3,
            IrdaAction::Common(CommonAction::Info),
            IrdaBody::Common(CommonBody::Info(LcsInfo {
                board_id: 3,
                num_ids: 1,
                model: 0,
                dc_volts_raw: 0,
            })),
        )
        .unwrap();
        assert!(feed(&mut a, &deps, info).unwrap());
        assert!(a.is_sensor_track());
    }

    #[test]
    fn amc2_config_cached() {
        let deps = DependencyCache::new();
        let mut a = acc(6);
        let action = Amc2Action::Common(CommonAction::Config);
        let config = Amc2Req::rx(6, action, Amc2Body::Config(Amc2Config::default())).unwrap();
        assert!(feed(&mut a, &deps, config).unwrap());
        let motor = Amc2Req::rx(6, Amc2Action::Motor, Amc2Body::motor(1, 50, MotorDirection::Forward).unwrap())
            .unwrap();
        assert!(feed(&mut a, &deps, motor).unwrap());
        assert_eq!(a.amc2().unwrap().motors[1].speed, 50);
        assert_eq!(a.variant(), AccVariant::MotorLamp);
    }

    // ---------------------------------------------------------------
    // Re-synthesis
    // ---------------------------------------------------------------

    fn replay(wire: &[u8], codec: &MockCodec, deps: &DependencyCache, address: u16) -> AccessoryState {
        let mut fresh = acc(address);
        let mut rest = wire;
        while !rest.is_empty() {
            let (req, tail) = PdiReq::decode(rest).unwrap();
            match &req {
                PdiReq::Tmcc(t) => {
                    let c = t.to_command(codec).unwrap();
                    send(&mut fresh, deps, c);
                }
                other => {
                    fresh.update(Update::Pdi(other), deps).unwrap();
                }
            }
            rest = tail;
        }
        fresh
    }

    #[test]
    fn district_resynthesis_round_trips() {
        let deps = DependencyCache::new();
        let codec = MockCodec::new();
        let mut a = acc(8);
        feed(&mut a, &deps, bpc2_rx(8, Bpc2Action::Control1, 1)).unwrap();
        let wire = a.as_bytes(&codec).unwrap();
        assert_eq!(a.as_bytes(&codec).unwrap(), wire);

        let fresh = replay(&wire, &codec, &deps, 8);
        assert!(fresh.is_power_district());
        assert!(fresh.is_aux_on());
        assert_eq!(fresh.as_bytes(&codec).unwrap(), wire);
    }

    #[test]
    fn sensor_track_resynthesis_round_trips() {
        let deps = DependencyCache::new();
        let codec = MockCodec::new();
        let mut a = acc(3);
        let info = IrdaReq::rx(
            3,
            IrdaAction::Common(CommonAction::Info),
            IrdaBody::Common(CommonBody::Info(LcsInfo {
                board_id: 3,
                num_ids: 1,
                model: 2,
                dc_volts_raw: 120,
            })),
        )
        .unwrap();
        feed(&mut a, &deps, info).unwrap();
        let wire = a.as_bytes(&codec).unwrap();
        assert!(!wire.is_empty());

        let fresh = replay(&wire, &codec, &deps, 3);
        assert!(fresh.is_sensor_track());
        assert_eq!(fresh.as_bytes(&codec).unwrap(), wire);
    }

    #[test]
    fn plain_resynthesis_round_trips() {
        let deps = DependencyCache::new();
        let codec = MockCodec::new();
        let mut a = acc(9);
        send(&mut a, &deps, aux(AuxOp::Aux1OptOne, 9));
        send(&mut a, &deps, aux(AuxOp::Aux2On, 9));
        let wire = a.as_bytes(&codec).unwrap();

        let fresh = replay(&wire, &codec, &deps, 9);
        assert_eq!(fresh.aux(), a.aux());
        assert_eq!(fresh.aux1(), a.aux1());
        assert_eq!(fresh.aux2(), a.aux2());
        assert_eq!(fresh.as_bytes(&codec).unwrap(), wire);
    }
}
