//! Symbolic TMCC command model.
//!
//! The legacy 3-byte TMCC protocol (and its Legacy/TMCC2 extension) is an
//! external collaborator: raillib never defines its byte layout. Instead it
//! works with *symbolic* commands ([`CommandId`]) addressed to a component
//! ([`CommandReq`]), and converts to and from bytes through a
//! caller-supplied [`CommandCodec`].
//!
//! # Aliases
//!
//! Several commands are data-qualified spellings of a canonical command.
//! `SpeedStopHold`, for instance, is the same wire command as
//! `AbsoluteSpeed` with data 0, and `Reset` is `Numeric` with data 0. The
//! alias table below lets the dependency cache treat either spelling as the
//! same trigger:
//!
//! ```text
//! SpeedStopHold       -> (AbsoluteSpeed, 0)
//! Reset               -> (Numeric, 0)
//! EngineLaborDefault  -> (EngineLabor, 12)
//! StartUpImmediate    -> (Numeric, 3)    TMCC only
//! ShutdownImmediate   -> (Numeric, 5)    TMCC only
//! ShutdownDelayed     -> (Numeric, 5)    Legacy only
//! SmokeOff / SmokeOn  -> (Numeric, 8/9)  TMCC only
//! ```

use crate::error::{Error, Result};
use crate::types::{BROADCAST_ADDRESS, Scope, Syntax};

/// Operations accepted by engines and trains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EngineOp {
    AbsoluteSpeed,
    StopImmediate,
    SpeedStopHold,
    ForwardDirection,
    ReverseDirection,
    ToggleDirection,
    Numeric,
    Reset,
    StartUpImmediate,
    StartUpDelayed,
    ShutdownImmediate,
    ShutdownDelayed,
    BellOn,
    BellOff,
    BlowHorn,
    DieselRpm,
    RpmUp,
    RpmDown,
    EngineLabor,
    EngineLaborDefault,
    Aux1On,
    Aux1Off,
    Aux1OptionOne,
    Aux1OptionTwo,
    Aux2On,
    Aux2Off,
    Aux2OptionOne,
    Aux2OptionTwo,
    TrainBrake,
    MomentumLow,
    MomentumMedium,
    MomentumHigh,
    Momentum,
    SmokeOn,
    SmokeOff,
    SmokeLow,
    SmokeMedium,
    SmokeHigh,
    SystemHalt,
    SetAddress,
}

/// Operations accepted by track switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SwitchOp {
    Through,
    Out,
    SetAddress,
}

/// Operations accepted by TMCC accessories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AuxOp {
    Aux1OptOne,
    Aux1On,
    Aux1Off,
    Aux1OptTwo,
    Aux2OptOne,
    Aux2On,
    Aux2Off,
    Aux2OptTwo,
    Numeric,
    SetAddress,
}

/// Operations accepted by routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RouteOp {
    Fire,
    SetAddress,
}

/// Synchronization markers emitted while the state engine catches up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SyncOp {
    Synchronizing,
    Synchronized,
}

/// A symbolic TMCC command identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CommandId {
    /// An engine/train command in the given protocol generation.
    Engine(Syntax, EngineOp),
    Switch(SwitchOp),
    Aux(AuxOp),
    Route(RouteOp),
    /// The TMCC emergency halt; applies to every component.
    Halt,
    Sync(SyncOp),
}

/// A command identifier, optionally qualified by a data value.
///
/// This is the node type of the dependency graph: `(Numeric, Some(0))` and
/// `Numeric` are distinct keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandKey {
    pub command: CommandId,
    pub data: Option<u16>,
}

impl CommandKey {
    /// A key with no data qualifier.
    pub const fn plain(command: CommandId) -> Self {
        CommandKey {
            command,
            data: None,
        }
    }

    /// A key qualified by `data`.
    pub const fn with_data(command: CommandId, data: u16) -> Self {
        CommandKey {
            command,
            data: Some(data),
        }
    }

    /// Returns the canonical form if this key is an unqualified alias.
    pub fn alias(&self) -> Option<CommandKey> {
        match self.data {
            None => self.command.alias(),
            Some(_) => None,
        }
    }
}

impl From<CommandId> for CommandKey {
    fn from(command: CommandId) -> Self {
        CommandKey::plain(command)
    }
}

const fn legacy(op: EngineOp) -> CommandId {
    CommandId::Engine(Syntax::Legacy, op)
}

const fn tmcc(op: EngineOp) -> CommandId {
    CommandId::Engine(Syntax::Tmcc, op)
}

const ALIASES: &[(CommandId, CommandKey)] = &[
    (
        legacy(EngineOp::SpeedStopHold),
        CommandKey::with_data(legacy(EngineOp::AbsoluteSpeed), 0),
    ),
    (
        tmcc(EngineOp::SpeedStopHold),
        CommandKey::with_data(tmcc(EngineOp::AbsoluteSpeed), 0),
    ),
    (
        legacy(EngineOp::Reset),
        CommandKey::with_data(legacy(EngineOp::Numeric), 0),
    ),
    (
        tmcc(EngineOp::Reset),
        CommandKey::with_data(tmcc(EngineOp::Numeric), 0),
    ),
    (
        legacy(EngineOp::EngineLaborDefault),
        CommandKey::with_data(legacy(EngineOp::EngineLabor), 12),
    ),
    (
        tmcc(EngineOp::StartUpImmediate),
        CommandKey::with_data(tmcc(EngineOp::Numeric), 3),
    ),
    (
        tmcc(EngineOp::ShutdownImmediate),
        CommandKey::with_data(tmcc(EngineOp::Numeric), 5),
    ),
    (
        legacy(EngineOp::ShutdownDelayed),
        CommandKey::with_data(legacy(EngineOp::Numeric), 5),
    ),
    (
        tmcc(EngineOp::SmokeOff),
        CommandKey::with_data(tmcc(EngineOp::Numeric), 8),
    ),
    (
        tmcc(EngineOp::SmokeOn),
        CommandKey::with_data(tmcc(EngineOp::Numeric), 9),
    ),
];

impl CommandId {
    /// Canonical data-qualified form, if this command is an alias.
    pub fn alias(&self) -> Option<CommandKey> {
        ALIASES
            .iter()
            .find(|(alias, _)| alias == self)
            .map(|(_, canonical)| *canonical)
    }

    /// Returns `true` if this command is a data-qualified alias.
    pub fn is_alias(&self) -> bool {
        self.alias().is_some()
    }

    /// Reverse alias lookup: the alias spelled by `(command, data)`.
    pub fn from_alias(key: CommandKey) -> Option<CommandId> {
        ALIASES
            .iter()
            .find(|(_, canonical)| *canonical == key)
            .map(|(alias, _)| *alias)
    }

    /// Protocol generation, for engine/train commands.
    pub fn syntax(&self) -> Option<Syntax> {
        match self {
            CommandId::Engine(syntax, _) => Some(*syntax),
            _ => None,
        }
    }

    /// Scope a command is addressed to when the caller does not say.
    pub fn default_scope(&self) -> Scope {
        match self {
            CommandId::Engine(..) | CommandId::Halt => Scope::Engine,
            CommandId::Switch(_) => Scope::Switch,
            CommandId::Aux(_) => Scope::Acc,
            CommandId::Route(_) => Scope::Route,
            CommandId::Sync(_) => Scope::Sync,
        }
    }

    /// Returns `true` if `scope` can receive this command.
    pub fn accepts_scope(&self, scope: Scope) -> bool {
        match self {
            CommandId::Engine(..) => scope.is_motive(),
            CommandId::Halt => true,
            other => other.default_scope() == scope,
        }
    }
}

/// A symbolic TMCC command addressed to one component.
///
/// Equality covers every field, which is what duplicate suppression
/// compares against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandReq {
    pub command: CommandId,
    pub address: u16,
    pub data: Option<u16>,
    pub scope: Scope,
}

impl CommandReq {
    /// Build a command, validating `address` against the target scope.
    ///
    /// When `scope` is `None` the command's [default
    /// scope](CommandId::default_scope) is used.
    ///
    /// # Example
    ///
    /// ```
    /// use raillib_core::command::{CommandId, CommandReq, EngineOp, SwitchOp};
    /// use raillib_core::types::{Scope, Syntax};
    ///
    /// let req = CommandReq::build(
    ///     CommandId::Engine(Syntax::Legacy, EngineOp::AbsoluteSpeed),
    ///     1234,
    ///     Some(40),
    ///     None,
    /// )
    /// .unwrap();
    /// assert_eq!(req.scope, Scope::Engine);
    /// let out = CommandId::Switch(SwitchOp::Out);
    /// assert!(CommandReq::build(out, 5, None, Some(Scope::Engine)).is_err());
    /// ```
    pub fn build(
        command: CommandId,
        address: u16,
        data: Option<u16>,
        scope: Option<Scope>,
    ) -> Result<Self> {
        let scope = scope.unwrap_or_else(|| command.default_scope());
        if !command.accepts_scope(scope) {
            return Err(Error::InvalidParameter(format!(
                "{command:?} cannot target {scope}"
            )));
        }
        scope.validate_address(address)?;
        Ok(CommandReq {
            command,
            address,
            data,
            scope,
        })
    }

    /// Returns `true` for the TMCC emergency halt.
    pub fn is_halt(&self) -> bool {
        self.command == CommandId::Halt
    }

    /// Returns `true` for the Legacy system halt (engines and trains only).
    pub fn is_system_halt(&self) -> bool {
        matches!(self.command, CommandId::Engine(_, EngineOp::SystemHalt))
    }

    /// Returns `true` if this command targets every component of its scope.
    pub fn is_broadcast(&self) -> bool {
        self.address == BROADCAST_ADDRESS && self.scope != Scope::Sync
    }

    /// Returns `true` for Legacy-generation commands.
    pub fn is_legacy(&self) -> bool {
        self.command.syntax() == Some(Syntax::Legacy)
    }

    /// Dependency-graph key for the bare command.
    pub fn key(&self) -> CommandKey {
        CommandKey::plain(self.command)
    }

    /// Dependency-graph key qualified by this command's data, if any.
    pub fn data_key(&self) -> Option<CommandKey> {
        self.data.map(|d| CommandKey::with_data(self.command, d))
    }

    /// Encode through an external codec.
    pub fn as_bytes(&self, codec: &dyn CommandCodec) -> Result<Vec<u8>> {
        codec.encode(self)
    }
}

/// Byte-level codec for TMCC commands.
///
/// raillib only produces and consumes [`CommandReq`] values; the concrete
/// 3-byte (or multi-word Legacy) layout is supplied by the application.
pub trait CommandCodec: Send + Sync {
    /// Encode a command to the bytes carried in a TMCC pass-through frame.
    fn encode(&self, req: &CommandReq) -> Result<Vec<u8>>;

    /// Decode the bytes of a TMCC pass-through frame.
    fn decode(&self, bytes: &[u8]) -> Result<CommandReq>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---------------------------------------------------------------
    // Aliases
    // ---------------------------------------------------------------

    #[test]
    fn speed_stop_hold_is_absolute_speed_zero() {
        let alias = legacy(EngineOp::SpeedStopHold).alias().unwrap();
        assert_eq!(
            alias,
            CommandKey::with_data(legacy(EngineOp::AbsoluteSpeed), 0)
        );
    }

    #[test]
    fn alias_keeps_syntax() {
        let alias = tmcc(EngineOp::Reset).alias().unwrap();
        assert_eq!(alias.command.syntax(), Some(Syntax::Tmcc));
    }

    #[test]
    fn canonical_commands_are_not_aliases() {
        assert!(!legacy(EngineOp::AbsoluteSpeed).is_alias());
        assert!(!CommandId::Switch(SwitchOp::Out).is_alias());
        assert!(!CommandId::Halt.is_alias());
    }

    #[test]
    fn qualified_key_is_never_an_alias() {
        let key = CommandKey::with_data(legacy(EngineOp::Reset), 3);
        assert_eq!(key.alias(), None);
    }

    #[test]
    fn reverse_alias_lookup() {
        let key = CommandKey::with_data(tmcc(EngineOp::Numeric), 9);
        assert_eq!(CommandId::from_alias(key), Some(tmcc(EngineOp::SmokeOn)));
        let unknown = CommandKey::with_data(tmcc(EngineOp::Numeric), 7);
        assert_eq!(CommandId::from_alias(unknown), None);
    }

    // ---------------------------------------------------------------
    // CommandReq
    // ---------------------------------------------------------------

    #[test]
    fn build_uses_default_scope() {
        let req = CommandReq::build(CommandId::Switch(SwitchOp::Out), 5, None, None).unwrap();
        assert_eq!(req.scope, Scope::Switch);
        assert!(!req.is_broadcast());
    }

    #[test]
    fn build_engine_command_for_train() {
        let req = CommandReq::build(
            legacy(EngineOp::ForwardDirection),
            3,
            None,
            Some(Scope::Train),
        )
        .unwrap();
        assert_eq!(req.scope, Scope::Train);
        assert!(req.is_legacy());
    }

    #[test]
    fn build_rejects_out_of_range_address() {
        let err = CommandReq::build(CommandId::Aux(AuxOp::Aux1On), 120, None, None).unwrap_err();
        assert!(matches!(err, Error::InvalidAddress { address: 120, .. }));
    }

    #[test]
    fn build_rejects_wrong_scope() {
        let err = CommandReq::build(
            CommandId::Switch(SwitchOp::Through),
            5,
            None,
            Some(Scope::Engine),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }

    #[test]
    fn broadcast_address_detected() {
        let req = CommandReq::build(CommandId::Aux(AuxOp::Aux1Off), 99, None, None).unwrap();
        assert!(req.is_broadcast());
    }

    #[test]
    fn halt_and_system_halt_predicates() {
        let halt = CommandReq::build(CommandId::Halt, 99, None, None).unwrap();
        assert!(halt.is_halt());
        assert!(!halt.is_system_halt());
        let system = CommandReq::build(legacy(EngineOp::SystemHalt), 99, None, None).unwrap();
        assert!(system.is_system_halt());
    }

    #[test]
    fn data_key_includes_data() {
        let req = CommandReq::build(legacy(EngineOp::Numeric), 8, Some(0), None).unwrap();
        assert_eq!(
            req.data_key(),
            Some(CommandKey::with_data(legacy(EngineOp::Numeric), 0))
        );
        assert_eq!(req.key(), CommandKey::plain(legacy(EngineOp::Numeric)));
    }
}
