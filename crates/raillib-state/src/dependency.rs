//! Cause/effect relationships between TMCC commands.
//!
//! Many commands change more state than they name. Sending Reset (numeric
//! 0) to a Legacy engine stops it, sets it forward, starts it up, silences
//! the bell, drops RPM and labor to their defaults, and turns both aux
//! outputs off. [`DependencyCache`] records those relationships so the
//! state machines can apply a command's full effect, and so observers can
//! work out which commands enable or disable an indicator.
//!
//! The graph is built once by [`DependencyCache::new`] and is read-only
//! afterwards.

use std::collections::{BTreeSet, HashMap};

use raillib_core::{AuxOp, CommandId, CommandKey, EngineOp, SwitchOp, Syntax};

/// A set of dependency-graph nodes, in a stable order.
pub type KeySet = BTreeSet<CommandKey>;

/// Static cause/effect and mutual-exclusion graph over [`CommandKey`]s.
#[derive(Debug, Clone, Default)]
pub struct DependencyCache {
    causes: HashMap<CommandKey, KeySet>,
    caused_by: HashMap<CommandKey, KeySet>,
    toggles: HashMap<CommandKey, KeySet>,
    toggled_by: HashMap<CommandKey, KeySet>,
}

fn legacy(op: EngineOp) -> CommandKey {
    CommandKey::plain(CommandId::Engine(Syntax::Legacy, op))
}

fn tmcc(op: EngineOp) -> CommandKey {
    CommandKey::plain(CommandId::Engine(Syntax::Tmcc, op))
}

fn aux(op: AuxOp) -> CommandKey {
    CommandKey::plain(CommandId::Aux(op))
}

fn switch(op: SwitchOp) -> CommandKey {
    CommandKey::plain(CommandId::Switch(op))
}

impl DependencyCache {
    /// Build the graph with every relationship raillib knows about.
    pub fn new() -> Self {
        let mut cache = DependencyCache::default();
        cache.register();
        cache
    }

    /// An empty graph, for callers that register their own relationships.
    pub fn empty() -> Self {
        DependencyCache::default()
    }

    fn register(&mut self) {
        use EngineOp::*;

        self.causes(legacy(SystemHalt), &[legacy(SpeedStopHold)]);

        // Legacy reset (numeric 0)
        self.causes(
            legacy(Reset),
            &[
                legacy(StopImmediate),
                legacy(ForwardDirection),
                legacy(StartUpImmediate),
                legacy(BellOff),
                legacy(DieselRpm),
                legacy(EngineLaborDefault),
                legacy(Aux1Off),
                legacy(Aux2Off),
                legacy(Numeric),
            ],
        );
        let stopped = [
            legacy(SpeedStopHold),
            legacy(DieselRpm),
            legacy(EngineLaborDefault),
        ];
        self.causes(
            legacy(StopImmediate),
            &[
                legacy(SpeedStopHold),
                legacy(DieselRpm),
                legacy(EngineLaborDefault),
            ],
        );
        for direction in [ForwardDirection, ReverseDirection, ToggleDirection] {
            self.causes(legacy(direction), &[legacy(StopImmediate)]);
            self.causes(legacy(direction), &stopped);
        }
        self.causes(
            legacy(ShutdownImmediate),
            &[
                legacy(SpeedStopHold),
                legacy(StopImmediate),
                legacy(DieselRpm),
                legacy(EngineLaborDefault),
            ],
        );

        // TMCC reset
        self.causes(
            tmcc(Reset),
            &[
                tmcc(SpeedStopHold),
                tmcc(ForwardDirection),
                tmcc(RpmDown),
                tmcc(Aux1Off),
                tmcc(Aux2Off),
                tmcc(Numeric),
            ],
        );
        for direction in [ForwardDirection, ReverseDirection, ToggleDirection] {
            self.causes(tmcc(direction), &[tmcc(SpeedStopHold)]);
        }

        self.toggles(switch(SwitchOp::Out), &[switch(SwitchOp::Through)]);
        self.toggles(switch(SwitchOp::Through), &[switch(SwitchOp::Out)]);

        self.toggles(aux(AuxOp::Aux1OptOne), &[aux(AuxOp::Aux2OptOne)]);
        self.toggles(aux(AuxOp::Aux2OptOne), &[aux(AuxOp::Aux1OptOne)]);

        self.toggles(legacy(ForwardDirection), &[legacy(ReverseDirection)]);
        self.toggles(legacy(ReverseDirection), &[legacy(ForwardDirection)]);

        let smoke = [SmokeOff, SmokeLow, SmokeMedium, SmokeHigh];
        for level in smoke {
            let others: Vec<CommandKey> = smoke
                .into_iter()
                .filter(|other| *other != level)
                .map(legacy)
                .collect();
            self.toggles(legacy(level), &others);
        }
    }

    /// Register the direct effects of `cause`.
    ///
    /// An alias cause also registers its canonical data-qualified form, so
    /// that `(Numeric, 0)` has the same effects as `Reset`.
    pub fn causes(&mut self, cause: CommandKey, results: &[CommandKey]) {
        for result in results {
            self.causes.entry(cause).or_default().insert(*result);
            self.caused_by.entry(*result).or_default().insert(cause);
        }
        if let Some(canonical) = cause.alias() {
            self.causes(canonical, results);
        }
    }

    /// Register `actor` as turning off each of `toggled`.
    ///
    /// The relationship is one-way; the reverse must be registered
    /// separately.
    pub fn toggles(&mut self, actor: CommandKey, toggled: &[CommandKey]) {
        for t in toggled {
            self.toggles.entry(actor).or_default().insert(*t);
            self.toggled_by.entry(*t).or_default().insert(actor);
        }
    }

    fn harvest<'a>(
        keys: impl IntoIterator<Item = &'a CommandKey>,
        dereference_aliases: bool,
        include_aliases: bool,
    ) -> KeySet {
        let mut out = KeySet::new();
        for key in keys {
            match key.alias() {
                Some(canonical) => {
                    if include_aliases {
                        out.insert(*key);
                    }
                    if dereference_aliases {
                        out.insert(canonical);
                    }
                }
                None => {
                    out.insert(*key);
                }
            }
        }
        out
    }

    /// Everything issuing `command` results in, including the command.
    ///
    /// An alias with no entry of its own falls back to the entry of its
    /// canonical form. A command with no entry results only in itself.
    pub fn results_in(
        &self,
        command: CommandKey,
        dereference_aliases: bool,
        include_aliases: bool,
    ) -> KeySet {
        if let Some(effects) = self.causes.get(&command) {
            let mut results = Self::harvest(effects, dereference_aliases, include_aliases);
            if !results.contains(&command) {
                results.extend(Self::harvest(
                    [&command],
                    dereference_aliases,
                    include_aliases,
                ));
            }
            return results;
        }
        if let Some(canonical) = command.alias() {
            if let Some(effects) = self.causes.get(&canonical) {
                let mut results = Self::harvest(effects, dereference_aliases, include_aliases);
                results.extend(Self::harvest(
                    [&command],
                    dereference_aliases,
                    include_aliases,
                ));
                return results;
            }
        }
        KeySet::from([command])
    }

    /// Every command that results in `command`, including the command.
    pub fn caused_by(
        &self,
        command: CommandKey,
        dereference_aliases: bool,
        include_aliases: bool,
    ) -> KeySet {
        match self.caused_by.get(&command) {
            Some(causes) => {
                let mut out = Self::harvest(causes, dereference_aliases, include_aliases);
                if !out.contains(&command) {
                    out.extend(Self::harvest(
                        [&command],
                        dereference_aliases,
                        include_aliases,
                    ));
                }
                out
            }
            None => KeySet::from([command]),
        }
    }

    /// Commands that switch on the state `command` represents.
    pub fn enabled_by(
        &self,
        command: CommandKey,
        dereference_aliases: bool,
        include_aliases: bool,
    ) -> KeySet {
        Self::harvest(
            &self.caused_by(command, false, true),
            dereference_aliases,
            include_aliases,
        )
    }

    /// Commands that switch off the state `command` represents.
    ///
    /// This is the toggles of `command`, each expanded once by its own
    /// causes. Causes of causes are not followed.
    pub fn disabled_by(
        &self,
        command: CommandKey,
        dereference_aliases: bool,
        include_aliases: bool,
    ) -> KeySet {
        let Some(toggled) = self.toggles.get(&command) else {
            return KeySet::new();
        };
        let first = Self::harvest(toggled, dereference_aliases, include_aliases);
        let mut disabled = first.clone();
        for state in &first {
            disabled.extend(Self::harvest(
                &self.caused_by(*state, false, true),
                dereference_aliases,
                include_aliases,
            ));
        }
        disabled
    }

    /// Commands registered as toggling `command` off.
    pub fn toggled_by(&self, command: CommandKey) -> KeySet {
        self.toggled_by.get(&command).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---------------------------------------------------------------
    // results_in
    // ---------------------------------------------------------------

    #[test]
    fn results_include_the_cause() {
        let deps = DependencyCache::new();
        let results = deps.results_in(legacy(EngineOp::StopImmediate), true, false);
        assert!(results.contains(&legacy(EngineOp::StopImmediate)));
        assert!(results.contains(&legacy(EngineOp::DieselRpm)));
    }

    #[test]
    fn aliases_are_dereferenced() {
        let deps = DependencyCache::new();
        let results = deps.results_in(legacy(EngineOp::StopImmediate), true, false);
        let absolute = CommandId::Engine(Syntax::Legacy, EngineOp::AbsoluteSpeed);
        let labor = CommandId::Engine(Syntax::Legacy, EngineOp::EngineLabor);
        assert!(results.contains(&CommandKey::with_data(absolute, 0)));
        assert!(results.contains(&CommandKey::with_data(labor, 12)));
        assert!(!results.contains(&legacy(EngineOp::SpeedStopHold)));
    }

    #[test]
    fn aliases_kept_when_asked() {
        let deps = DependencyCache::new();
        let results = deps.results_in(legacy(EngineOp::StopImmediate), false, true);
        assert!(results.contains(&legacy(EngineOp::SpeedStopHold)));
        assert!(results.contains(&legacy(EngineOp::EngineLaborDefault)));
    }

    #[test]
    fn canonical_form_shares_alias_effects() {
        let deps = DependencyCache::new();
        let numeric = CommandId::Engine(Syntax::Legacy, EngineOp::Numeric);
        let results = deps.results_in(CommandKey::with_data(numeric, 0), true, false);
        assert!(results.contains(&legacy(EngineOp::ForwardDirection)));
        assert!(results.contains(&legacy(EngineOp::StartUpImmediate)));
        assert!(results.contains(&CommandKey::with_data(numeric, 0)));
    }

    #[test]
    fn unregistered_alias_falls_back_to_canonical() {
        let mut deps = DependencyCache::empty();
        let numeric = CommandId::Engine(Syntax::Tmcc, EngineOp::Numeric);
        deps.causes(CommandKey::with_data(numeric, 5), &[tmcc(EngineOp::Aux1Off)]);
        let results = deps.results_in(tmcc(EngineOp::ShutdownImmediate), true, false);
        assert!(results.contains(&tmcc(EngineOp::Aux1Off)));
        assert!(results.contains(&CommandKey::with_data(numeric, 5)));
    }

    #[test]
    fn unknown_command_results_in_itself() {
        let deps = DependencyCache::new();
        let bell = legacy(EngineOp::BellOn);
        assert_eq!(deps.results_in(bell, true, false), KeySet::from([bell]));
    }

    #[test]
    fn effects_are_not_transitive() {
        let deps = DependencyCache::new();
        let results = deps.results_in(tmcc(EngineOp::Reset), true, false);
        assert!(results.contains(&tmcc(EngineOp::ForwardDirection)));
        // Forward causes SpeedStopHold too, but only one level is followed.
        assert!(!results.contains(&tmcc(EngineOp::StopImmediate)));
    }

    // ---------------------------------------------------------------
    // Reverse queries
    // ---------------------------------------------------------------

    #[test]
    fn caused_by_is_the_reverse() {
        let deps = DependencyCache::new();
        let causes = deps.caused_by(legacy(EngineOp::StartUpImmediate), false, true);
        assert!(causes.contains(&legacy(EngineOp::Reset)));
        assert!(causes.contains(&legacy(EngineOp::StartUpImmediate)));
    }

    #[test]
    fn enabled_by_matches_caused_by() {
        let deps = DependencyCache::new();
        let key = legacy(EngineOp::BellOff);
        assert_eq!(
            deps.enabled_by(key, false, true),
            deps.caused_by(key, false, true)
        );
    }

    #[test]
    fn toggles_are_one_way() {
        let mut deps = DependencyCache::empty();
        let a = aux(AuxOp::Aux1On);
        let b = aux(AuxOp::Aux1Off);
        deps.toggles(a, &[b]);
        assert_eq!(deps.disabled_by(a, false, true), KeySet::from([b]));
        assert!(deps.disabled_by(b, false, true).is_empty());
        assert_eq!(deps.toggled_by(b), KeySet::from([a]));
    }

    #[test]
    fn disabled_by_follows_two_hops_only() {
        let deps = DependencyCache::new();
        let disabled = deps.disabled_by(legacy(EngineOp::ReverseDirection), false, true);
        assert!(disabled.contains(&legacy(EngineOp::ForwardDirection)));
        // Reset causes ForwardDirection, so it disables Reverse too.
        assert!(disabled.contains(&legacy(EngineOp::Reset)));
        // Nothing causes Reset; the expansion stops there.
        assert!(!disabled.contains(&legacy(EngineOp::ReverseDirection)));
    }

    #[test]
    fn smoke_levels_exclude_each_other() {
        let deps = DependencyCache::new();
        let disabled = deps.disabled_by(legacy(EngineOp::SmokeHigh), false, true);
        assert_eq!(disabled.len(), 3);
        assert!(disabled.contains(&legacy(EngineOp::SmokeOff)));
        assert!(!disabled.contains(&legacy(EngineOp::SmokeHigh)));
    }

    #[test]
    fn switch_positions_toggle() {
        let deps = DependencyCache::new();
        let out = switch(SwitchOp::Out);
        let thru = switch(SwitchOp::Through);
        assert_eq!(deps.disabled_by(out, false, true), KeySet::from([thru]));
        assert_eq!(deps.disabled_by(thru, false, true), KeySet::from([out]));
    }
}
