//! The component state sum type and the bookkeeping every variant shares.
//!
//! A [`ComponentState`] is the believed state of one addressable device:
//! an engine, a switch, a sensor track. It is fed [`Update`]s (symbolic
//! TMCC commands or decoded PDI frames) and can re-synthesize a byte stream
//! that brings a fresh state to the same place.

use std::time::Duration;

use raillib_core::{
    BROADCAST_ADDRESS, CommandCodec, CommandReq, Error, Result, Scope,
};
use raillib_pdi::PdiReq;
use raillib_pdi::d4::D4Action;
use raillib_pdi::irda::IrdaData;
use raillib_pdi::tmcc::TmccReq;
use tokio::time::Instant;

use crate::accessory::AccessoryState;
use crate::base::{BaseState, SyncState};
use crate::block::BlockState;
use crate::dependency::DependencyCache;
use crate::engine::EngineState;
use crate::irda::IrdaState;
use crate::switch::{RouteState, SwitchState};

/// Default window in which a repeated engine command is ignored.
pub const DEFAULT_DUPLICATE_WINDOW: Duration = Duration::from_secs(1);

/// Default minimum spacing between aux option-one presses that toggle.
pub const DEFAULT_AUX_PULSE_WINDOW: Duration = Duration::from_secs(1);

/// Timing knobs fixed when a state is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    /// An engine command identical to the previous one and arriving within
    /// this window is dropped.
    pub duplicate_window: Duration,
    /// An aux option-one command toggles its output only when at least this
    /// long has passed since the previous one. The CAB repeats the command
    /// while the button is held.
    pub aux_pulse_window: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            duplicate_window: DEFAULT_DUPLICATE_WINDOW,
            aux_pulse_window: DEFAULT_AUX_PULSE_WINDOW,
        }
    }
}

/// One input to a state machine.
#[derive(Debug, Clone, Copy)]
pub enum Update<'a> {
    Command(&'a CommandReq),
    Pdi(&'a PdiReq),
}

impl<'a> From<&'a CommandReq> for Update<'a> {
    fn from(req: &'a CommandReq) -> Self {
        Update::Command(req)
    }
}

impl<'a> From<&'a PdiReq> for Update<'a> {
    fn from(req: &'a PdiReq) -> Self {
        Update::Pdi(req)
    }
}

impl Update<'_> {
    /// The `(scope, address)` entry this update belongs to.
    ///
    /// BPC2 frames always describe the power district's accessory entry,
    /// whatever scope their action carries. D4 map responses describe the
    /// engine or train whose TMCC id they resolve; record counts and first
    /// record numbers describe the Base. Frames with no component of their
    /// own (pings, Wi-Fi, serial bridges, D4 walks) have no target.
    pub fn target(&self) -> Option<(Scope, u16)> {
        match self {
            Update::Command(req) => Some((req.scope, req.address)),
            Update::Pdi(req) => match req {
                PdiReq::Bpc2(r) => Some((Scope::Acc, u16::from(r.address))),
                PdiReq::Stm2(r) => Some((Scope::Switch, u16::from(r.address))),
                PdiReq::D4(r) => match r.action {
                    D4Action::Count | D4Action::FirstRec => Some((Scope::Base, 0)),
                    D4Action::Map if !r.is_not_found() => Some((r.database(), r.tmcc_id()?)),
                    _ => None,
                },
                PdiReq::Wifi(_) | PdiReq::Ser2(_) => None,
                other => Some((other.scope()?, other.address()?)),
            },
        }
    }

    /// `true` for the TMCC halt and the Legacy system halt, which are
    /// accepted whatever scope a state has.
    pub fn is_halt(&self) -> bool {
        matches!(self, Update::Command(req) if req.is_halt() || req.is_system_halt())
    }

    pub(crate) fn to_last(self) -> LastCommand {
        match self {
            Update::Command(req) => LastCommand::Tmcc(*req),
            Update::Pdi(req) => LastCommand::Pdi(req.clone()),
        }
    }
}

/// The most recent input a state accepted.
#[derive(Debug, Clone, PartialEq)]
pub enum LastCommand {
    Tmcc(CommandReq),
    Pdi(PdiReq),
}

/// Fields common to every component state.
#[derive(Debug, Clone)]
pub(crate) struct Common {
    pub scope: Scope,
    pub address: Option<u16>,
    pub road_name: Option<String>,
    pub road_number: Option<String>,
    pub last_command: Option<LastCommand>,
    pub last_updated: Option<Instant>,
    pub settings: Settings,
}

impl Common {
    pub fn new(scope: Scope, address: Option<u16>, settings: Settings) -> Result<Self> {
        let address = address.map(|a| scope.validate_address(a)).transpose()?;
        Ok(Common {
            scope,
            address,
            road_name: None,
            road_number: None,
            last_command: None,
            last_updated: None,
            settings,
        })
    }

    /// Check that `update` is meant for this state, binding the address on
    /// first use.
    pub fn accept(&mut self, update: &Update<'_>) -> Result<()> {
        let Some((scope, address)) = update.target() else {
            return Err(Error::Protocol(format!(
                "update has no {} target",
                self.scope
            )));
        };
        if scope != self.scope && !update.is_halt() {
            return Err(Error::ScopeMismatch {
                expected: self.scope,
                received: scope,
            });
        }
        if address == BROADCAST_ADDRESS && self.scope != Scope::Sync {
            // A broadcast can reach a bound state but cannot bind one.
            return match self.address {
                Some(_) => Ok(()),
                None => Err(Error::InvalidAddress {
                    scope: self.scope,
                    address,
                }),
            };
        }
        match self.address {
            Some(bound) if bound != address && !self.is_alias(address) => Err(Error::AddressMismatch {
                scope: self.scope,
                bound,
                received: address,
            }),
            Some(_) => Ok(()),
            None => {
                self.address = Some(self.scope.validate_address(address)?);
                Ok(())
            }
        }
    }

    /// `true` if `address` is the four-digit road number an engine or
    /// train is also filed under.
    pub fn is_alias(&self, address: u16) -> bool {
        self.scope.is_motive()
            && address > 99
            && self.road_number.as_deref().and_then(|n| n.parse::<u16>().ok()) == Some(address)
    }

    /// Bind road name and number from a frame that carries them.
    pub fn bind_names(&mut self, name: Option<&str>, number: Option<&str>) {
        if let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) {
            self.road_name = Some(name.to_owned());
        }
        if let Some(number) = number.map(str::trim).filter(|n| !n.is_empty()) {
            self.road_number = Some(number.to_owned());
        }
    }

    pub fn record(&mut self, update: Update<'_>) {
        self.last_command = Some(update.to_last());
        self.last_updated = Some(Instant::now());
    }

    /// `true` if `update` repeats the last accepted input within the
    /// duplicate window.
    pub fn is_duplicate(&self, update: &Update<'_>) -> bool {
        let (Some(last), Some(at)) = (&self.last_command, self.last_updated) else {
            return false;
        };
        let same = match (update, last) {
            (Update::Command(req), LastCommand::Tmcc(prev)) => *req == prev,
            (Update::Pdi(req), LastCommand::Pdi(prev)) => *req == prev,
            _ => false,
        };
        same && at.elapsed() < self.settings.duplicate_window
    }

    /// Bound address as a Base record number.
    pub fn record_no(&self) -> Option<u8> {
        self.address.and_then(|a| u8::try_from(a).ok())
    }

    pub fn has_names(&self) -> bool {
        self.road_name.is_some() || self.road_number.is_some()
    }
}

/// Wrap a TMCC command for transmission through the Base.
pub(crate) fn tmcc_bytes(req: &CommandReq, codec: &dyn CommandCodec) -> Result<Vec<u8>> {
    Ok(TmccReq::from_command(req, codec)?.as_bytes())
}

/// Aux option-one toggle: on unless the output is already on.
pub(crate) fn pulse<T: Copy + PartialEq>(current: Option<T>, on: T, opt_two: T, off: T) -> T {
    match current {
        Some(c) if c == on || c == opt_two => off,
        _ => on,
    }
}

/// `true` if an option-one press now toggles, given the previous one.
/// Presses must be more than `window` apart.
pub(crate) fn pulse_due(previous: Option<Instant>, window: Duration) -> bool {
    previous.is_none_or(|at| at.elapsed() > window)
}

/// Believed state of one component.
#[derive(Debug, Clone)]
pub enum ComponentState {
    Engine(EngineState),
    Train(EngineState),
    Switch(SwitchState),
    Route(RouteState),
    Acc(AccessoryState),
    Irda(IrdaState),
    Block(BlockState),
    Base(BaseState),
    Sync(SyncState),
}

impl ComponentState {
    /// A fresh state for `scope`, optionally bound to `address`.
    pub fn new(scope: Scope, address: Option<u16>, settings: Settings) -> Result<Self> {
        Ok(match scope {
            Scope::Engine => ComponentState::Engine(EngineState::new(scope, address, settings)?),
            Scope::Train => ComponentState::Train(EngineState::new(scope, address, settings)?),
            Scope::Switch => ComponentState::Switch(SwitchState::new(address, settings)?),
            Scope::Route => ComponentState::Route(RouteState::new(address, settings)?),
            Scope::Acc => ComponentState::Acc(AccessoryState::new(address, settings)?),
            Scope::Irda => ComponentState::Irda(IrdaState::new(address, settings)?),
            Scope::Block => ComponentState::Block(BlockState::new(address, settings)?),
            Scope::Base => ComponentState::Base(BaseState::new(settings)?),
            Scope::Sync => ComponentState::Sync(SyncState::new(settings)?),
        })
    }

    fn common(&self) -> &Common {
        match self {
            ComponentState::Engine(s) | ComponentState::Train(s) => &s.common,
            ComponentState::Switch(s) => &s.common,
            ComponentState::Route(s) => &s.common,
            ComponentState::Acc(s) => &s.common,
            ComponentState::Irda(s) => &s.common,
            ComponentState::Block(s) => &s.common,
            ComponentState::Base(s) => &s.common,
            ComponentState::Sync(s) => &s.common,
        }
    }

    /// Apply `update`. Returns `Ok(true)` if the state changed.
    ///
    /// Updates for another scope or bound address are rejected with
    /// [`Error::ScopeMismatch`] or [`Error::AddressMismatch`] and leave the
    /// state untouched.
    pub fn update(&mut self, update: Update<'_>, deps: &DependencyCache) -> Result<bool> {
        match self {
            ComponentState::Engine(s) | ComponentState::Train(s) => s.update(update, deps),
            ComponentState::Switch(s) => s.update(update),
            ComponentState::Route(s) => s.update(update),
            ComponentState::Acc(s) => s.update(update, deps),
            ComponentState::Irda(s) => s.update(update),
            ComponentState::Block(s) => s.update(update),
            ComponentState::Base(s) => s.update(update),
            ComponentState::Sync(s) => s.update(update),
        }
    }

    /// Fold an engine sighting from a sensor track into an engine state.
    /// Other variants ignore it.
    pub fn record_sighting(&mut self, data: &IrdaData) -> bool {
        match self {
            ComponentState::Engine(s) => s.record_sighting(data),
            _ => false,
        }
    }

    /// Frames that bring a fresh state to this one.
    pub fn as_bytes(&self, codec: &dyn CommandCodec) -> Result<Vec<u8>> {
        match self {
            ComponentState::Engine(s) | ComponentState::Train(s) => s.as_bytes(codec),
            ComponentState::Switch(s) => s.as_bytes(codec),
            ComponentState::Route(s) => s.as_bytes(),
            ComponentState::Acc(s) => s.as_bytes(codec),
            ComponentState::Irda(s) => s.as_bytes(),
            ComponentState::Block(s) => s.as_bytes(),
            ComponentState::Base(s) => s.as_bytes(),
            ComponentState::Sync(_) => Ok(Vec::new()),
        }
    }

    /// `true` once anything beyond the address is known.
    pub fn is_known(&self) -> bool {
        match self {
            ComponentState::Engine(s) | ComponentState::Train(s) => s.is_known(),
            ComponentState::Switch(s) => s.is_known(),
            ComponentState::Route(s) => s.is_known(),
            ComponentState::Acc(s) => s.is_known(),
            ComponentState::Irda(s) => s.is_known(),
            ComponentState::Block(s) => s.is_known(),
            ComponentState::Base(s) => s.is_known(),
            ComponentState::Sync(s) => s.is_known(),
        }
    }

    pub fn scope(&self) -> Scope {
        self.common().scope
    }

    pub fn address(&self) -> Option<u16> {
        self.common().address
    }

    pub fn road_name(&self) -> Option<&str> {
        self.common().road_name.as_deref()
    }

    pub fn road_number(&self) -> Option<&str> {
        self.common().road_number.as_deref()
    }

    pub fn last_command(&self) -> Option<&LastCommand> {
        self.common().last_command.as_ref()
    }

    pub fn last_updated(&self) -> Option<Instant> {
        self.common().last_updated
    }

    pub fn as_engine(&self) -> Option<&EngineState> {
        match self {
            ComponentState::Engine(s) | ComponentState::Train(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_switch(&self) -> Option<&SwitchState> {
        match self {
            ComponentState::Switch(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_route(&self) -> Option<&RouteState> {
        match self {
            ComponentState::Route(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_accessory(&self) -> Option<&AccessoryState> {
        match self {
            ComponentState::Acc(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_irda(&self) -> Option<&IrdaState> {
        match self {
            ComponentState::Irda(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_block(&self) -> Option<&BlockState> {
        match self {
            ComponentState::Block(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_base(&self) -> Option<&BaseState> {
        match self {
            ComponentState::Base(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sync(&self) -> Option<&SyncState> {
        match self {
            ComponentState::Sync(s) => Some(s),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raillib_core::{CommandId, EngineOp, SwitchOp, Syntax};
    use raillib_pdi::asc2::Asc2Req;
    use raillib_pdi::bpc2::Bpc2Req;

    fn switch(op: SwitchOp, address: u16) -> CommandReq {
        CommandReq::build(CommandId::Switch(op), address, None, None).unwrap()
    }

    // ---------------------------------------------------------------
    // Routing
    // ---------------------------------------------------------------

    #[test]
    fn command_targets_its_scope() {
        let req = switch(SwitchOp::Out, 12);
        assert_eq!(Update::from(&req).target(), Some((Scope::Switch, 12)));
    }

    #[test]
    fn power_district_frames_target_the_accessory() {
        let req = PdiReq::Bpc2(Bpc2Req::power(8, true).unwrap());
        assert_eq!(Update::from(&req).target(), Some((Scope::Acc, 8)));
    }

    #[test]
    fn relay_frames_target_the_accessory() {
        let req = PdiReq::Asc2(Asc2Req::relay(5, true, None).unwrap());
        assert_eq!(Update::from(&req).target(), Some((Scope::Acc, 5)));
    }

    #[test]
    fn pings_have_no_target() {
        assert_eq!(Update::Pdi(&PdiReq::Ping).target(), None);
    }

    // ---------------------------------------------------------------
    // Address binding
    // ---------------------------------------------------------------

    #[test]
    fn first_update_binds_address() {
        let deps = DependencyCache::new();
        let mut state = ComponentState::new(Scope::Switch, None, Settings::default()).unwrap();
        assert_eq!(state.address(), None);
        state.update(Update::from(&switch(SwitchOp::Out, 7)), &deps).unwrap();
        assert_eq!(state.address(), Some(7));
    }

    #[test]
    fn other_address_is_rejected() {
        let deps = DependencyCache::new();
        let mut state = ComponentState::new(Scope::Switch, Some(7), Settings::default()).unwrap();
        let err = state
            .update(Update::from(&switch(SwitchOp::Out, 8)), &deps)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::AddressMismatch {
                bound: 7,
                received: 8,
                ..
            }
        ));
        assert!(!state.is_known());
    }

    #[test]
    fn broadcast_reaches_bound_state() {
        let deps = DependencyCache::new();
        let mut state = ComponentState::new(Scope::Switch, Some(7), Settings::default()).unwrap();
        assert!(state
            .update(Update::from(&switch(SwitchOp::Through, 99)), &deps)
            .unwrap());
        assert_eq!(state.as_switch().unwrap().is_thru(), Some(true));
    }

    #[test]
    fn broadcast_cannot_bind() {
        let deps = DependencyCache::new();
        let mut state = ComponentState::new(Scope::Switch, None, Settings::default()).unwrap();
        let err = state
            .update(Update::from(&switch(SwitchOp::Through, 99)), &deps)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidAddress { address: 99, .. }));
    }

    #[test]
    fn other_scope_is_rejected() {
        let deps = DependencyCache::new();
        let mut state = ComponentState::new(Scope::Acc, Some(7), Settings::default()).unwrap();
        let err = state
            .update(Update::from(&switch(SwitchOp::Out, 7)), &deps)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::ScopeMismatch {
                expected: Scope::Acc,
                received: Scope::Switch
            }
        ));
    }

    #[test]
    fn system_halt_accepted_by_trains() {
        let deps = DependencyCache::new();
        let mut state = ComponentState::new(Scope::Train, Some(4), Settings::default()).unwrap();
        let halt = CommandReq::build(
            CommandId::Engine(Syntax::Legacy, EngineOp::SystemHalt),
            99,
            None,
            None,
        )
        .unwrap();
        assert!(state.update(Update::from(&halt), &deps).unwrap());
        assert_eq!(state.as_engine().unwrap().speed(), Some(0));
    }

    #[test]
    fn out_of_range_construction_fails() {
        assert!(ComponentState::new(Scope::Switch, Some(100), Settings::default()).is_err());
        assert!(ComponentState::new(Scope::Engine, Some(9999), Settings::default()).is_ok());
        assert!(ComponentState::new(Scope::Engine, Some(0), Settings::default()).is_err());
    }

    // ---------------------------------------------------------------
    // Aux pulses
    // ---------------------------------------------------------------

    #[test]
    fn pulse_turns_on_unless_on() {
        assert_eq!(pulse(None, 1, 2, 0), 1);
        assert_eq!(pulse(Some(0), 1, 2, 0), 1);
        assert_eq!(pulse(Some(1), 1, 2, 0), 0);
        assert_eq!(pulse(Some(2), 1, 2, 0), 0);
    }

    #[test]
    fn first_pulse_is_always_due() {
        assert!(pulse_due(None, Duration::from_secs(3600)));
        assert!(!pulse_due(Some(Instant::now()), Duration::from_secs(3600)));
    }

    #[tokio::test(start_paused = true)]
    async fn pulse_needs_more_than_the_window() {
        let window = DEFAULT_AUX_PULSE_WINDOW;
        let at = Instant::now();
        tokio::time::advance(window).await;
        assert!(!pulse_due(Some(at), window));
        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(pulse_due(Some(at), window));
    }
}
