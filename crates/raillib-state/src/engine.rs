//! Engine and train state.
//!
//! Trains and engines share one state machine; a train is always driven
//! with Legacy commands and may carry a consist. Commands are applied in a
//! fixed order of field groups, each group looking at both the command
//! itself and everything the [`DependencyCache`] says it results in.

use raillib_core::{
    CommandCodec, CommandId, CommandKey, CommandReq, DEFAULT_ENGINE_LABOR, EngineOp, Result,
    Scope, Syntax,
};
use raillib_pdi::PdiCommand;
use raillib_pdi::PdiReq;
use raillib_pdi::base::{
    BaseRecord, BaseReq, EngineBit, MotiveRecord, brake_to_base,
    brake_to_tmcc, labor_to_base, labor_to_tmcc, momentum_to_base, momentum_to_tmcc,
};
use raillib_pdi::consist::ConsistComponent;
use raillib_pdi::d4::{D4Action, D4Body, D4Req};
use raillib_pdi::irda::IrdaData;
use raillib_pdi::memory::{BaseMemoryReq, MemoryField, MemoryValue};
use tokio::time::Instant;
use tracing::debug;

use crate::component::{Common, Settings, Update, pulse, pulse_due, tmcc_bytes};
use crate::dependency::{DependencyCache, KeySet};

/// Base control-type byte of a TMCC engine.
pub const CONTROL_TMCC: u8 = 1;

/// Base control-type byte of a Legacy engine.
pub const CONTROL_LEGACY: u8 = 2;

/// Legacy smoke levels. TMCC engines only know on (high) and off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SmokeLevel {
    Off,
    Low,
    Medium,
    High,
}

impl SmokeLevel {
    /// Level from a Base record byte.
    pub fn from_byte(b: u8) -> Option<Self> {
        Some(match b {
            0 => SmokeLevel::Off,
            1 => SmokeLevel::Low,
            2 => SmokeLevel::Medium,
            3 => SmokeLevel::High,
            _ => return None,
        })
    }

    pub fn as_byte(self) -> u8 {
        match self {
            SmokeLevel::Off => 0,
            SmokeLevel::Low => 1,
            SmokeLevel::Medium => 2,
            SmokeLevel::High => 3,
        }
    }

    /// Command that sets this level.
    pub fn command(self, syntax: Syntax) -> EngineOp {
        match (syntax, self) {
            (Syntax::Legacy, SmokeLevel::Off) => EngineOp::SmokeOff,
            (Syntax::Legacy, SmokeLevel::Low) => EngineOp::SmokeLow,
            (Syntax::Legacy, SmokeLevel::Medium) => EngineOp::SmokeMedium,
            (Syntax::Legacy, SmokeLevel::High) => EngineOp::SmokeHigh,
            (Syntax::Tmcc, SmokeLevel::Off) => EngineOp::SmokeOff,
            (Syntax::Tmcc, _) => EngineOp::SmokeOn,
        }
    }

    fn from_key(key: &CommandKey) -> Option<Self> {
        match (key.command, key.data) {
            (CommandId::Engine(Syntax::Legacy, op), None) => match op {
                EngineOp::SmokeOff => Some(SmokeLevel::Off),
                EngineOp::SmokeLow => Some(SmokeLevel::Low),
                EngineOp::SmokeMedium => Some(SmokeLevel::Medium),
                EngineOp::SmokeHigh => Some(SmokeLevel::High),
                _ => None,
            },
            (CommandId::Engine(Syntax::Tmcc, EngineOp::Numeric), Some(9)) => {
                Some(SmokeLevel::High)
            }
            (CommandId::Engine(Syntax::Tmcc, EngineOp::Numeric), Some(8)) => {
                Some(SmokeLevel::Off)
            }
            _ => None,
        }
    }
}

/// Believed state of an engine or train.
#[derive(Debug, Clone)]
pub struct EngineState {
    pub(crate) common: Common,
    legacy: Option<bool>,
    started: Option<bool>,
    speed: Option<u16>,
    speed_limit: Option<u8>,
    max_speed: Option<u8>,
    direction: Option<EngineOp>,
    /// Command generation the direction was latched from.
    direction_syntax: Option<Syntax>,
    momentum: Option<u8>,
    train_brake: Option<u8>,
    rpm: Option<u8>,
    labor: Option<u8>,
    numeric: Option<u16>,
    smoke: Option<SmokeLevel>,
    aux: Option<EngineOp>,
    aux1: Option<EngineOp>,
    aux2: Option<EngineOp>,
    last_aux1_opt1: Option<Instant>,
    last_aux2_opt1: Option<Instant>,
    loco_type: Option<u8>,
    control_type: Option<u8>,
    sound_type: Option<u8>,
    class_type: Option<u8>,
    fuel_level: Option<u8>,
    water_level: Option<u8>,
    year: Option<u16>,
    consist_flags: Option<u8>,
    consist: Vec<ConsistComponent>,
    d4_record_no: Option<u16>,
}

fn clamp_u8(v: u16) -> u8 {
    u8::try_from(v).unwrap_or(u8::MAX)
}

/// Replace every alias in `keys` by its canonical data-qualified form.
fn canonical(keys: KeySet) -> KeySet {
    keys.into_iter().map(|k| k.alias().unwrap_or(k)).collect()
}

/// Data value of the first `op` key in `effects` that carries one.
fn find_data(effects: &KeySet, op: EngineOp) -> Option<u16> {
    effects.iter().find_map(|k| match (k.command, k.data) {
        (CommandId::Engine(_, o), Some(d)) if o == op => Some(d),
        _ => None,
    })
}

/// `true` if `effects` contains the bare `op`.
fn has(effects: &KeySet, op: EngineOp) -> bool {
    effects
        .iter()
        .any(|k| matches!(k.command, CommandId::Engine(_, o) if o == op) && k.data.is_none())
}

fn is_startup(key: &CommandKey) -> bool {
    use EngineOp::*;
    matches!(
        (key.command, key.data),
        (CommandId::Engine(Syntax::Tmcc, Numeric), Some(3))
            | (CommandId::Engine(_, StartUpImmediate | StartUpDelayed), None)
    )
}

fn is_shutdown(key: &CommandKey) -> bool {
    use EngineOp::*;
    matches!(
        (key.command, key.data),
        (CommandId::Engine(_, Numeric), Some(5))
            | (CommandId::Engine(_, ShutdownImmediate | ShutdownDelayed), None)
    )
}

/// `value` if `bit` is set in the record's validity mask.
fn valid(rec: &BaseReq, bit: EngineBit, value: Option<u8>) -> Option<u8> {
    value.filter(|_| rec.has(bit))
}

impl EngineState {
    pub(crate) fn new(scope: Scope, address: Option<u16>, settings: Settings) -> Result<Self> {
        Ok(EngineState {
            common: Common::new(scope, address, settings)?,
            legacy: (scope == Scope::Train).then_some(true),
            started: None,
            speed: None,
            speed_limit: None,
            max_speed: None,
            direction: None,
            direction_syntax: None,
            momentum: None,
            train_brake: None,
            rpm: None,
            labor: None,
            numeric: None,
            smoke: None,
            aux: None,
            aux1: None,
            aux2: None,
            last_aux1_opt1: None,
            last_aux2_opt1: None,
            loco_type: None,
            control_type: None,
            sound_type: None,
            class_type: None,
            fuel_level: None,
            water_level: None,
            year: None,
            consist_flags: None,
            consist: Vec::new(),
            d4_record_no: None,
        })
    }

    pub(crate) fn update(&mut self, update: Update<'_>, deps: &DependencyCache) -> Result<bool> {
        self.common.accept(&update)?;
        match update {
            Update::Command(req) => Ok(self.apply_command(req, update, deps)),
            Update::Pdi(req) => Ok(self.apply_pdi(req, update)),
        }
    }

    fn apply_command(&mut self, req: &CommandReq, update: Update<'_>, deps: &DependencyCache) -> bool {
        use EngineOp::*;

        if self.legacy.is_none() && !update.is_halt() {
            self.legacy = Some(req.is_legacy() || req.address > 99);
        }
        if self.common.is_duplicate(&update) {
            debug!(
                scope = %self.common.scope,
                address = req.address,
                command = ?req.command,
                "duplicate command suppressed"
            );
            return false;
        }
        if update.is_halt() {
            self.halt();
            self.common.record(update);
            return true;
        }
        let CommandId::Engine(syntax, op) = req.command else {
            return false;
        };

        let mut effects = canonical(deps.results_in(req.key(), true, false));
        if let Some(key) = req.data_key() {
            effects.extend(canonical(deps.results_in(key, true, false)));
        }
        let data = req.data;

        // numeric
        if op == Numeric {
            self.numeric = data;
        } else if let Some(n) = find_data(&effects, Numeric) {
            self.numeric = Some(n);
        }

        // direction
        match op {
            ForwardDirection | ReverseDirection => {
                if self.direction == Some(op) {
                    self.common.record(update);
                    return false;
                }
                self.direction = Some(op);
                self.direction_syntax = Some(syntax);
            }
            ToggleDirection => {
                // Only a direction latched in the engine's own generation
                // can be flipped; otherwise it is no longer known.
                self.direction = match (self.direction, self.direction_syntax) {
                    (None, _) => None,
                    (Some(dir), Some(latched)) if latched == self.syntax() => match dir {
                        ForwardDirection => Some(ReverseDirection),
                        _ => Some(ForwardDirection),
                    },
                    _ => None,
                };
                if self.direction.is_none() {
                    self.direction_syntax = None;
                }
            }
            _ => {
                if has(&effects, ForwardDirection) {
                    self.direction = Some(ForwardDirection);
                    self.direction_syntax = Some(syntax);
                } else if has(&effects, ReverseDirection) {
                    self.direction = Some(ReverseDirection);
                    self.direction_syntax = Some(syntax);
                }
            }
        }

        // train brake
        if op == TrainBrake {
            self.train_brake = data.map(clamp_u8);
        } else if let Some(b) = find_data(&effects, TrainBrake) {
            self.train_brake = Some(clamp_u8(b));
        }

        // smoke
        if let Some(level) = effects.iter().find_map(SmokeLevel::from_key) {
            self.smoke = Some(level);
        }

        // aux
        let window = self.common.settings.aux_pulse_window;
        match op {
            Aux1OptionOne => {
                self.aux = Some(op);
                if pulse_due(self.last_aux1_opt1, window) {
                    self.aux1 = Some(pulse(self.aux1, Aux1On, Aux1OptionTwo, Aux1Off));
                }
                self.last_aux1_opt1 = Some(Instant::now());
            }
            Aux2OptionOne => {
                self.aux = Some(op);
                if pulse_due(self.last_aux2_opt1, window) {
                    self.aux2 = Some(pulse(self.aux2, Aux2On, Aux2OptionTwo, Aux2Off));
                }
                self.last_aux2_opt1 = Some(Instant::now());
            }
            _ => {}
        }
        for key in effects.iter().filter(|k| k.data.is_none()) {
            match key.command {
                CommandId::Engine(_, a @ (Aux1On | Aux1Off | Aux1OptionTwo)) => self.aux1 = Some(a),
                CommandId::Engine(_, a @ (Aux2On | Aux2Off | Aux2OptionTwo)) => self.aux2 = Some(a),
                _ => {}
            }
        }

        // rpm
        if op == DieselRpm {
            self.rpm = data.map(clamp_u8);
        } else if op == RpmUp {
            self.rpm = Some(self.rpm.map_or(1, |r| r.saturating_add(1).min(7)));
        } else if has(&effects, RpmDown) {
            self.rpm = Some(self.rpm.map_or(0, |r| r.saturating_sub(1)));
        } else if let Some(r) = find_data(&effects, DieselRpm) {
            self.rpm = Some(clamp_u8(r));
        } else if has(&effects, DieselRpm) {
            self.rpm = Some(0);
        }

        // labor
        if op == EngineLabor {
            self.labor = data.map(clamp_u8);
        } else if let Some(l) = find_data(&effects, EngineLabor) {
            self.labor = Some(clamp_u8(l));
        }

        // speed
        if op == AbsoluteSpeed {
            self.speed = data;
        } else if let Some(s) = find_data(&effects, AbsoluteSpeed) {
            self.speed = Some(s);
        } else if has(&effects, StopImmediate) {
            self.speed = Some(0);
        }

        // momentum
        match op {
            MomentumLow => self.momentum = Some(0),
            MomentumMedium => self.momentum = Some(3),
            MomentumHigh => self.momentum = Some(7),
            Momentum => self.momentum = data.map(clamp_u8),
            _ => {}
        }

        // start-up / shutdown
        if effects.iter().any(is_startup) {
            self.started = Some(true);
        } else if effects.iter().any(is_shutdown) {
            self.started = Some(false);
        }

        self.common.record(update);
        true
    }

    fn halt(&mut self) {
        self.aux1 = Some(EngineOp::Aux1Off);
        self.aux2 = Some(EngineOp::Aux2Off);
        self.aux = Some(EngineOp::Aux2OptionOne);
        self.speed = Some(0);
        self.rpm = Some(0);
        self.labor = Some(DEFAULT_ENGINE_LABOR);
        self.numeric = None;
    }

    fn apply_pdi(&mut self, req: &PdiReq, update: Update<'_>) -> bool {
        let changed = match req {
            PdiReq::Base(rec) => self.apply_record(rec),
            PdiReq::Speed(s) => {
                self.speed = Some(u16::from(s.speed));
                true
            }
            PdiReq::Memory(mem) => self.apply_memory(mem),
            PdiReq::D4(d4) if d4.action == D4Action::Map => {
                self.d4_record_no = Some(d4.record_no);
                true
            }
            _ => false,
        };
        if changed {
            self.common.record(update);
        }
        changed
    }

    fn set_control_type(&mut self, control_type: u8) {
        self.control_type = Some(control_type);
        if self.common.scope == Scope::Engine {
            self.legacy = Some(control_type == CONTROL_LEGACY);
        }
    }

    /// Overwrite the fields whose valid bit is set.
    fn apply_record(&mut self, rec: &BaseReq) -> bool {
        if rec.is_ack() || rec.status != 0 || !rec.is_active() {
            return false;
        }
        let Some(m) = rec.motive() else {
            return false;
        };
        self.common.bind_names(rec.name(), rec.number());

        if let Some(v) = valid(rec, EngineBit::LocoType, m.loco_type) {
            self.loco_type = Some(v);
        }
        if let Some(v) = valid(rec, EngineBit::ControlType, m.control_type) {
            self.set_control_type(v);
        }
        if let Some(v) = valid(rec, EngineBit::SoundType, m.sound_type) {
            self.sound_type = Some(v);
        }
        if let Some(v) = valid(rec, EngineBit::ClassType, m.class_type) {
            self.class_type = Some(v);
        }
        if let Some(v) = valid(rec, EngineBit::Speed, m.speed) {
            self.speed = Some(u16::from(v));
        }
        if let Some(v) = valid(rec, EngineBit::RunLevel, m.run_level) {
            self.rpm = Some(v);
        }
        if let Some(v) = valid(rec, EngineBit::LaborBias, m.labor_bias) {
            self.labor = Some(labor_to_tmcc(v));
        }
        if let Some(v) = valid(rec, EngineBit::SpeedLimit, m.speed_limit) {
            self.speed_limit = Some(v);
        }
        if let Some(v) = valid(rec, EngineBit::MaxSpeed, m.max_speed) {
            self.max_speed = Some(v);
        }
        if let Some(v) = valid(rec, EngineBit::FuelLevel, m.fuel) {
            self.fuel_level = Some(v);
        }
        if let Some(v) = valid(rec, EngineBit::WaterLevel, m.water) {
            self.water_level = Some(v);
        }
        if let Some(level) = valid(rec, EngineBit::SmokeLevel, m.smoke).and_then(SmokeLevel::from_byte)
        {
            self.smoke = Some(level);
        }
        if let Some(v) = valid(rec, EngineBit::TrainBrake, m.train_brake) {
            self.train_brake = Some(brake_to_tmcc(v));
        }
        if let Some(v) = valid(rec, EngineBit::Momentum, m.momentum) {
            self.momentum = Some(momentum_to_tmcc(v));
        }
        if matches!(rec.record, BaseRecord::Train(_)) {
            if m.consist_flags.is_some() {
                self.consist_flags = m.consist_flags;
            }
            if !m.consist.is_empty() {
                self.consist = m.consist.clone();
            }
        }
        true
    }

    fn apply_memory(&mut self, mem: &BaseMemoryReq) -> bool {
        let fields = mem.fields();
        for (field, value) in &fields {
            match (field, value) {
                (MemoryField::Speed, MemoryValue::Byte(v)) => self.speed = Some(u16::from(*v)),
                (MemoryField::TrainBrake, MemoryValue::Byte(v)) => {
                    self.train_brake = Some(brake_to_tmcc(*v))
                }
                (MemoryField::RpmLabor, MemoryValue::Byte(v)) => {
                    self.rpm = Some(v & 0x07);
                    self.labor = Some(labor_to_tmcc(v >> 3));
                }
                (MemoryField::Momentum, MemoryValue::Byte(v)) => {
                    self.momentum = Some(momentum_to_tmcc(*v))
                }
                (MemoryField::RoadName, MemoryValue::Text(t)) => {
                    self.common.bind_names(Some(t.as_str()), None)
                }
                (MemoryField::RoadNumber, MemoryValue::Text(t)) => {
                    self.common.bind_names(None, Some(t.as_str()))
                }
                (MemoryField::EngineType, MemoryValue::Byte(v)) => self.loco_type = Some(*v),
                (MemoryField::ControlType, MemoryValue::Byte(v)) => self.set_control_type(*v),
                (MemoryField::SoundType, MemoryValue::Byte(v)) => self.sound_type = Some(*v),
                (MemoryField::EngineClass, MemoryValue::Byte(v)) => self.class_type = Some(*v),
                (MemoryField::Smoke, MemoryValue::Byte(v)) => {
                    if let Some(level) = SmokeLevel::from_byte(*v) {
                        self.smoke = Some(level);
                    }
                }
                (MemoryField::SpeedLimit, MemoryValue::Byte(v)) => self.speed_limit = Some(*v),
                (MemoryField::MaxSpeed, MemoryValue::Byte(v)) => self.max_speed = Some(*v),
                (MemoryField::ConsistFlags, MemoryValue::Byte(v)) => self.consist_flags = Some(*v),
                (MemoryField::ConsistComps, MemoryValue::Consist(c)) => self.consist = c.clone(),
                _ => {}
            }
        }
        !fields.is_empty()
    }

    /// Fold in what a sensor track reported about this engine.
    pub(crate) fn record_sighting(&mut self, data: &IrdaData) -> bool {
        let Some(product) = &data.product else {
            return false;
        };
        self.common
            .bind_names(Some(product.name.as_str()), Some(product.number.as_str()));
        if product.year != 0 {
            self.year = Some(product.year);
        }
        if product.max_speed != 0 {
            self.max_speed = Some(product.max_speed);
        }
        true
    }

    fn has_record_fields(&self) -> bool {
        self.common.has_names()
            || self.speed.is_some()
            || self.rpm.is_some()
            || self.labor.is_some()
            || self.momentum.is_some()
            || self.train_brake.is_some()
            || self.speed_limit.is_some()
            || self.max_speed.is_some()
            || self.loco_type.is_some()
            || self.control_type.is_some()
            || self.sound_type.is_some()
            || self.class_type.is_some()
    }

    fn to_record(&self) -> MotiveRecord {
        let control_type = self.control_type.or(self
            .legacy
            .map(|l| if l { CONTROL_LEGACY } else { CONTROL_TMCC }));
        let train = self.common.scope == Scope::Train;
        MotiveRecord {
            name: self.common.road_name.clone(),
            number: self.common.road_number.clone(),
            loco_type: self.loco_type,
            control_type,
            sound_type: self.sound_type,
            class_type: self.class_type,
            speed: self.speed.map(clamp_u8),
            run_level: self.rpm,
            labor_bias: self.labor.map(labor_to_base),
            speed_limit: self.speed_limit,
            max_speed: self.max_speed,
            fuel: self.fuel_level,
            water: self.water_level,
            smoke: self.smoke.map(SmokeLevel::as_byte),
            train_brake: self.train_brake.map(brake_to_base),
            momentum: self.momentum.map(momentum_to_base),
            consist_flags: self.consist_flags.filter(|_| train),
            consist: if train { self.consist.clone() } else { Vec::new() },
            ..Default::default()
        }
    }

    /// Record frame, then the latched commands, for the current state.
    pub(crate) fn as_bytes(&self, codec: &dyn CommandCodec) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let Some(address) = self.common.address else {
            return Ok(out);
        };
        let scope = self.common.scope;

        if self.has_record_fields() {
            if let Some(record_no) = self.common.record_no().filter(|_| address <= 99) {
                let fields = self.to_record();
                let valid = fields.valid_mask();
                let record = match scope {
                    Scope::Train => BaseRecord::Train(fields),
                    _ => BaseRecord::Engine(fields),
                };
                out.extend(BaseReq::with_record(record_no, valid, record)?.as_bytes());
            }
        }
        if address > 99 {
            if let Some(record_no) = self.d4_record_no {
                let command = match scope {
                    Scope::Train => PdiCommand::D4Train,
                    _ => PdiCommand::D4Engine,
                };
                let map = D4Req {
                    command,
                    record_no,
                    action: D4Action::Map,
                    body: D4Body::Map {
                        post_action: 0,
                        tmcc_id: Some(address),
                    },
                };
                out.extend(map.as_bytes());
            }
        }

        let syntax = self.syntax();
        let mut ops = Vec::new();
        if let Some(started) = self.started {
            ops.push(if started {
                EngineOp::StartUpImmediate
            } else {
                EngineOp::ShutdownImmediate
            });
        }
        ops.extend(self.smoke.map(|s| s.command(syntax)));
        ops.extend(self.direction);
        ops.extend(self.aux);
        ops.extend(self.aux1);
        ops.extend(self.aux2);
        for op in ops {
            let req = CommandReq::build(CommandId::Engine(syntax, op), address, None, Some(scope))?;
            out.extend(tmcc_bytes(&req, codec)?);
        }
        Ok(out)
    }

    pub(crate) fn is_known(&self) -> bool {
        self.has_record_fields()
            || self.started.is_some()
            || self.direction.is_some()
            || self.smoke.is_some()
            || self.aux.is_some()
            || self.aux1.is_some()
            || self.aux2.is_some()
            || self.numeric.is_some()
    }

    /// Command generation this engine answers to.
    pub fn syntax(&self) -> Syntax {
        if self.legacy == Some(true) {
            Syntax::Legacy
        } else {
            Syntax::Tmcc
        }
    }

    pub fn is_legacy(&self) -> Option<bool> {
        self.legacy
    }

    pub fn scope(&self) -> Scope {
        self.common.scope
    }

    pub fn address(&self) -> Option<u16> {
        self.common.address
    }

    pub fn road_name(&self) -> Option<&str> {
        self.common.road_name.as_deref()
    }

    pub fn road_number(&self) -> Option<&str> {
        self.common.road_number.as_deref()
    }

    /// `Some(true)` once started up, `Some(false)` once shut down.
    pub fn is_started(&self) -> Option<bool> {
        self.started
    }

    pub fn speed(&self) -> Option<u16> {
        self.speed
    }

    pub fn speed_limit(&self) -> Option<u8> {
        self.speed_limit
    }

    pub fn max_speed(&self) -> Option<u8> {
        self.max_speed
    }

    /// [`EngineOp::ForwardDirection`] or [`EngineOp::ReverseDirection`].
    pub fn direction(&self) -> Option<EngineOp> {
        self.direction
    }

    pub fn is_forward(&self) -> bool {
        self.direction == Some(EngineOp::ForwardDirection)
    }

    pub fn is_reverse(&self) -> bool {
        self.direction == Some(EngineOp::ReverseDirection)
    }

    /// Momentum, 0-7.
    pub fn momentum(&self) -> Option<u8> {
        self.momentum
    }

    /// Train brake, 0-7.
    pub fn train_brake(&self) -> Option<u8> {
        self.train_brake
    }

    /// Diesel RPM, 0-7.
    pub fn rpm(&self) -> Option<u8> {
        self.rpm
    }

    /// Engine labor, 0-31.
    pub fn labor(&self) -> Option<u8> {
        self.labor
    }

    pub fn numeric(&self) -> Option<u16> {
        self.numeric
    }

    pub fn smoke(&self) -> Option<SmokeLevel> {
        self.smoke
    }

    /// The last aux option-one pressed.
    pub fn aux(&self) -> Option<EngineOp> {
        self.aux
    }

    pub fn aux1(&self) -> Option<EngineOp> {
        self.aux1
    }

    pub fn aux2(&self) -> Option<EngineOp> {
        self.aux2
    }

    pub fn is_aux1_on(&self) -> bool {
        self.aux1 == Some(EngineOp::Aux1On)
    }

    pub fn is_aux2_on(&self) -> bool {
        self.aux2 == Some(EngineOp::Aux2On)
    }

    pub fn loco_type(&self) -> Option<u8> {
        self.loco_type
    }

    pub fn control_type(&self) -> Option<u8> {
        self.control_type
    }

    pub fn sound_type(&self) -> Option<u8> {
        self.sound_type
    }

    pub fn class_type(&self) -> Option<u8> {
        self.class_type
    }

    pub fn fuel_level(&self) -> Option<u8> {
        self.fuel_level
    }

    pub fn water_level(&self) -> Option<u8> {
        self.water_level
    }

    /// Year of manufacture, from a sensor-track sighting.
    pub fn year(&self) -> Option<u16> {
        self.year
    }

    pub fn consist_flags(&self) -> Option<u8> {
        self.consist_flags
    }

    pub fn consist(&self) -> &[ConsistComponent] {
        &self.consist
    }

    /// Base D4 record holding this four-digit engine.
    pub fn d4_record_no(&self) -> Option<u16> {
        self.d4_record_no
    }
}
