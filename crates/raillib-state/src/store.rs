//! The component state store.
//!
//! One table per [`Scope`], each behind its own `RwLock`, maps addresses to
//! shared [`StateHandle`]s. [`dispatch`](ComponentStateStore::dispatch)
//! routes an update to the handles it concerns:
//!
//! - a halt reaches every component in every scope; a Legacy system halt
//!   reaches every engine and train;
//! - a command to the broadcast address reaches every component of its
//!   scope;
//! - anything else reaches the entry for its `(scope, address)`, which is
//!   created on first sight.
//!
//! An engine or train record whose road number is a four-digit TMCC id is
//! also filed under that id, so commands sent to either address find the
//! same state.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use raillib_core::{CommandCodec, Result, Scope, StateEvent};
use raillib_pdi::PdiReq;
use raillib_pdi::irda::IrdaBody;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::block::ComponentKey;
use crate::component::{ComponentState, Settings, Update};
use crate::dependency::DependencyCache;
use crate::handle::StateHandle;

type Table = BTreeMap<u16, Arc<StateHandle>>;

/// Order in which [`ComponentStateStore::as_bytes`] emits scopes.
const SYNTH_ORDER: [Scope; 9] = [
    Scope::Base,
    Scope::Engine,
    Scope::Train,
    Scope::Switch,
    Scope::Route,
    Scope::Acc,
    Scope::Irda,
    Scope::Block,
    Scope::Sync,
];

pub struct ComponentStateStore {
    tables: BTreeMap<Scope, RwLock<Table>>,
    deps: Arc<DependencyCache>,
    settings: Settings,
    events: broadcast::Sender<StateEvent>,
}

impl std::fmt::Debug for ComponentStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentStateStore")
            .field("len", &self.len())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl ComponentStateStore {
    pub fn new(deps: Arc<DependencyCache>, settings: Settings, event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));
        ComponentStateStore {
            tables: Scope::ALL
                .into_iter()
                .map(|scope| (scope, RwLock::new(Table::new())))
                .collect(),
            deps,
            settings,
            events,
        }
    }

    pub fn deps(&self) -> &Arc<DependencyCache> {
        &self.deps
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    /// Receive a [`StateEvent`] for every change, rejection and reset.
    pub fn subscribe(&self) -> broadcast::Receiver<StateEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: StateEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    /// Handles of `scope`, one per component, in address order.
    fn handles(&self, scope: Scope) -> Vec<Arc<StateHandle>> {
        let Some(table) = self.tables.get(&scope) else {
            return Vec::new();
        };
        let table = table.read().unwrap_or_else(PoisonError::into_inner);
        table
            .iter()
            .filter(|(key, handle)| **key == handle.address())
            .map(|(_, handle)| Arc::clone(handle))
            .collect()
    }

    /// The state at `(scope, address)`, if one exists. Never creates.
    pub fn query(&self, scope: Scope, address: u16) -> Option<Arc<StateHandle>> {
        let table = self.tables.get(&scope)?;
        let table = table.read().unwrap_or_else(PoisonError::into_inner);
        table.get(&address).cloned()
    }

    /// Follow a cross reference held by another state.
    pub fn resolve(&self, key: ComponentKey) -> Option<Arc<StateHandle>> {
        self.query(key.0, key.1)
    }

    /// Every state of `scope`, sorted by address. A state filed under a
    /// road-number alias appears once.
    pub fn get_all(&self, scope: Scope) -> Vec<Arc<StateHandle>> {
        self.handles(scope)
    }

    pub fn len(&self) -> usize {
        Scope::ALL.into_iter().map(|s| self.handles(s).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up `(scope, address)`, creating a fresh state if needed.
    pub fn get_or_create(&self, scope: Scope, address: u16) -> Result<Arc<StateHandle>> {
        if let Some(handle) = self.query(scope, address) {
            return Ok(handle);
        }
        let state = ComponentState::new(scope, Some(address), self.settings)?;
        let Some(table) = self.tables.get(&scope) else {
            return Ok(Arc::new(StateHandle::new(state, address)));
        };
        let mut table = table.write().unwrap_or_else(PoisonError::into_inner);
        let handle = table
            .entry(address)
            .or_insert_with(|| Arc::new(StateHandle::new(state, address)));
        Ok(Arc::clone(handle))
    }

    /// Discard every state.
    pub fn reset(&self) {
        for table in self.tables.values() {
            table.write().unwrap_or_else(PoisonError::into_inner).clear();
        }
        debug!("component state cleared");
        self.emit(StateEvent::Cleared);
    }

    /// Route `update` to the states it concerns. Returns how many changed.
    ///
    /// Rejections are logged, published as [`StateEvent::Rejected`] and
    /// otherwise dropped.
    pub fn dispatch(&self, update: Update<'_>) -> usize {
        if let Update::Command(req) = update {
            if req.is_halt() || req.is_system_halt() {
                let scopes: &[Scope] = if req.is_halt() {
                    &Scope::ALL
                } else {
                    &[Scope::Engine, Scope::Train]
                };
                return scopes
                    .iter()
                    .flat_map(|&scope| self.handles(scope))
                    .filter(|handle| self.apply(handle, update))
                    .count();
            }
            if req.is_broadcast() {
                return self
                    .handles(req.scope)
                    .iter()
                    .filter(|handle| self.apply(handle, update))
                    .count();
            }
        }

        let Some((scope, address)) = update.target() else {
            debug!(?update, "update has no component target");
            return 0;
        };
        let handle = match self.get_or_create(scope, address) {
            Ok(handle) => handle,
            Err(err) => {
                self.reject(scope, address, &err);
                return 0;
            }
        };
        usize::from(self.apply(&handle, update))
    }

    fn reject(&self, scope: Scope, address: u16, err: &raillib_core::Error) {
        warn!(scope = %scope, address, ?err, "update rejected");
        self.emit(StateEvent::Rejected {
            scope,
            address,
            reason: err.to_string(),
        });
    }

    fn apply(&self, handle: &Arc<StateHandle>, update: Update<'_>) -> bool {
        let (scope, address) = (handle.scope(), handle.address());
        match handle.update(update, &self.deps) {
            Ok(true) => {
                self.emit(StateEvent::Updated { scope, address });
                if scope.is_motive() {
                    self.file_alias(handle);
                }
                if let Update::Pdi(PdiReq::Irda(req)) = update {
                    if let IrdaBody::Data(data) = &req.body {
                        self.record_sighting(data);
                    }
                }
                true
            }
            Ok(false) => false,
            Err(err) => {
                self.reject(scope, address, &err);
                false
            }
        }
    }

    /// File a two-digit engine under its four-digit road number.
    fn file_alias(&self, handle: &Arc<StateHandle>) {
        if handle.address() > 99 {
            return;
        }
        let alias = handle.with(|s| s.road_number().and_then(|n| n.parse::<u16>().ok()));
        let Some(alias) = alias.filter(|n| (100..=9999).contains(n)) else {
            return;
        };
        let Some(table) = self.tables.get(&handle.scope()) else {
            return;
        };
        let mut table = table.write().unwrap_or_else(PoisonError::into_inner);
        table.entry(alias).or_insert_with(|| {
            debug!(
                scope = %handle.scope(),
                address = handle.address(),
                alias,
                "filed under road number"
            );
            Arc::clone(handle)
        });
    }

    fn record_sighting(&self, data: &raillib_pdi::irda::IrdaData) {
        if data.product.is_none() || data.engine_id == 0 {
            return;
        }
        let address = u16::from(data.engine_id);
        match self.get_or_create(Scope::Engine, address) {
            Ok(engine) => {
                if engine.record_sighting(data) {
                    self.emit(StateEvent::Updated {
                        scope: Scope::Engine,
                        address,
                    });
                    self.file_alias(&engine);
                }
            }
            Err(err) => self.reject(Scope::Engine, address, &err),
        }
    }

    /// Frames that rebuild every known state, Base first.
    pub fn as_bytes(&self, codec: &dyn CommandCodec) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        for scope in SYNTH_ORDER {
            for handle in self.handles(scope) {
                out.extend(handle.as_bytes(codec)?);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raillib_core::{AuxOp, CommandId, CommandReq, EngineOp, SwitchOp, Syntax};
    use raillib_pdi::action::{Bpc2Action, IrdaAction};
    use raillib_pdi::asc2::Asc2Req;
    use raillib_pdi::base::{BaseInfo, BaseRecord, BaseReq, BASE_SYNTH_VALID, MotiveRecord};
    use raillib_pdi::bpc2::{Bpc2Body, Bpc2Req};
    use raillib_pdi::irda::{IrdaData, IrdaProduct, IrdaReq};
    use raillib_test_harness::MockCodec;

    fn store() -> ComponentStateStore {
        ComponentStateStore::new(Arc::new(DependencyCache::new()), Settings::default(), 64)
    }

    fn cmd(command: CommandId, address: u16, data: Option<u16>) -> CommandReq {
        CommandReq::build(command, address, data, None).unwrap()
    }

    fn send(store: &ComponentStateStore, req: CommandReq) -> usize {
        store.dispatch(Update::Command(&req))
    }

    fn feed(store: &ComponentStateStore, req: impl Into<PdiReq>) -> usize {
        let req = req.into();
        store.dispatch(Update::Pdi(&req))
    }

    fn legacy(op: EngineOp) -> CommandId {
        CommandId::Engine(Syntax::Legacy, op)
    }

    fn engine_record(record_no: u8, number: &str) -> BaseReq {
        let record = MotiveRecord {
            name: Some("Hudson".into()),
            number: Some(number.into()),
            ..Default::default()
        };
        let valid = record.valid_mask();
        BaseReq::with_record(record_no, valid, BaseRecord::Engine(record)).unwrap()
    }

    // ---------------------------------------------------------------
    // Routing
    // ---------------------------------------------------------------

    #[test]
    fn creates_on_first_sight() {
        let s = store();
        assert!(s.query(Scope::Switch, 12).is_none());
        assert_eq!(send(&s, cmd(CommandId::Switch(SwitchOp::Out), 12, None)), 1);
        let h = s.query(Scope::Switch, 12).unwrap();
        assert_eq!(h.with(|st| st.as_switch().and_then(|sw| sw.is_out())), Some(true));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn query_never_creates() {
        let s = store();
        assert!(s.query(Scope::Engine, 7).is_none());
        assert!(s.is_empty());
    }

    #[test]
    fn broadcast_reaches_known_addresses() {
        let s = store();
        send(&s, cmd(CommandId::Switch(SwitchOp::Out), 3, None));
        send(&s, cmd(CommandId::Switch(SwitchOp::Out), 8, None));
        assert_eq!(send(&s, cmd(CommandId::Switch(SwitchOp::Through), 99, None)), 2);
        for h in s.get_all(Scope::Switch) {
            assert_eq!(h.with(|st| st.as_switch().and_then(|sw| sw.is_thru())), Some(true));
        }
        assert!(s.query(Scope::Switch, 99).is_none());
    }

    #[test]
    fn invalid_address_is_rejected() {
        let s = store();
        let mut events = s.subscribe();
        let req = PdiReq::Block(raillib_pdi::block::BlockReq::new(0));
        assert_eq!(s.dispatch(Update::Pdi(&req)), 0);
        assert!(matches!(events.try_recv(), Ok(StateEvent::Rejected { scope: Scope::Block, .. })));
        assert!(s.is_empty());
    }

    #[test]
    fn get_all_sorted() {
        let s = store();
        for addr in [40, 5, 17] {
            send(&s, cmd(CommandId::Aux(AuxOp::Aux1On), addr, None));
        }
        let addrs: Vec<u16> = s.get_all(Scope::Acc).iter().map(|h| h.address()).collect();
        assert_eq!(addrs, vec![5, 17, 40]);
    }

    #[test]
    fn reset_clears_and_notifies() {
        let s = store();
        send(&s, cmd(CommandId::Aux(AuxOp::Aux1On), 5, None));
        let mut events = s.subscribe();
        s.reset();
        assert!(s.is_empty());
        assert_eq!(events.try_recv().unwrap(), StateEvent::Cleared);
    }

    #[test]
    fn events_for_changes() {
        let s = store();
        let mut events = s.subscribe();
        send(&s, cmd(CommandId::Aux(AuxOp::Aux1On), 5, None));
        assert_eq!(
            events.try_recv().unwrap(),
            StateEvent::Updated {
                scope: Scope::Acc,
                address: 5
            }
        );
    }

    // ---------------------------------------------------------------
    // Road-number aliases
    // ---------------------------------------------------------------

    #[test]
    fn road_number_alias() {
        let s = store();
        feed(&s, engine_record(12, "2056"));
        let short = s.query(Scope::Engine, 12).unwrap();
        let long = s.query(Scope::Engine, 2056).unwrap();
        assert!(Arc::ptr_eq(&short, &long));
        assert_eq!(s.get_all(Scope::Engine).len(), 1);

        send(&s, cmd(legacy(EngineOp::AbsoluteSpeed), 2056, Some(30)));
        assert_eq!(short.with(|st| st.as_engine().and_then(|e| e.speed())), Some(30));
    }

    #[test]
    fn short_road_number_is_not_an_alias() {
        let s = store();
        feed(&s, engine_record(12, "42"));
        assert!(s.query(Scope::Engine, 42).is_none());
    }

    // ---------------------------------------------------------------
    // Scenarios
    // ---------------------------------------------------------------

    #[test]
    fn power_district_scenario() {
        let s = store();
        let on = Bpc2Req::rx(8, Bpc2Action::Control1, Bpc2Body::State(1)).unwrap();
        assert_eq!(feed(&s, on), 1);
        let h = s.query(Scope::Acc, 8).unwrap();
        h.with(|st| {
            let acc = st.as_accessory().unwrap();
            assert!(acc.is_power_district());
            assert_eq!(acc.aux(), Some(AuxOp::Aux1OptOne));
            assert_eq!(acc.aux1(), Some(AuxOp::Aux1On));
            assert_eq!(acc.aux2(), Some(AuxOp::Aux2On));
        });
        assert!(s.query(Scope::Train, 8).is_none());

        let off = Bpc2Req::rx(8, Bpc2Action::Control3, Bpc2Body::State(0)).unwrap();
        feed(&s, off);
        h.with(|st| {
            let acc = st.as_accessory().unwrap();
            assert_eq!(acc.aux(), Some(AuxOp::Aux2OptOne));
            assert_eq!(acc.aux1(), Some(AuxOp::Aux1Off));
            assert_eq!(acc.aux2(), Some(AuxOp::Aux2Off));
        });
    }

    #[test]
    fn halt_scenario() {
        let s = store();
        send(&s, cmd(legacy(EngineOp::AbsoluteSpeed), 12, Some(80)));
        send(&s, cmd(legacy(EngineOp::AbsoluteSpeed), 1234, Some(50)));
        send(&s, cmd(CommandId::Aux(AuxOp::Aux1On), 5, None));
        send(&s, cmd(CommandId::Switch(SwitchOp::Out), 3, None));

        let halt = cmd(CommandId::Halt, 99, None);
        assert_eq!(send(&s, halt), 3);
        for addr in [12, 1234] {
            let h = s.query(Scope::Engine, addr).unwrap();
            h.with(|st| {
                let e = st.as_engine().unwrap();
                assert_eq!(e.speed(), Some(0));
                assert_eq!(e.rpm(), Some(0));
                assert_eq!(e.labor(), Some(12));
                assert_eq!(e.numeric(), None);
            });
        }
        let acc = s.query(Scope::Acc, 5).unwrap();
        assert_eq!(acc.with(|st| st.as_accessory().unwrap().aux1()), Some(AuxOp::Aux1Off));
        let sw = s.query(Scope::Switch, 3).unwrap();
        assert_eq!(sw.with(|st| st.as_switch().unwrap().is_out()), Some(true));
    }

    #[test]
    fn system_halt_spares_accessories() {
        let s = store();
        send(&s, cmd(legacy(EngineOp::AbsoluteSpeed), 12, Some(80)));
        send(&s, cmd(CommandId::Aux(AuxOp::Aux1On), 5, None));
        assert_eq!(send(&s, cmd(legacy(EngineOp::SystemHalt), 99, None)), 1);
        let acc = s.query(Scope::Acc, 5).unwrap();
        assert_eq!(acc.with(|st| st.as_accessory().unwrap().aux1()), Some(AuxOp::Aux1On));
    }

    #[test]
    fn asc2_claim_scenario() {
        let s = store();
        send(&s, cmd(CommandId::Aux(AuxOp::Aux1On), 5, None));
        feed(&s, Asc2Req::relay(5, false, None).unwrap().as_rx());
        assert_eq!(send(&s, cmd(CommandId::Aux(AuxOp::Aux1On), 5, None)), 0);
        let h = s.query(Scope::Acc, 5).unwrap();
        h.with(|st| {
            let acc = st.as_accessory().unwrap();
            assert!(acc.is_lcs_claimed());
            assert!(!acc.is_aux_on());
        });
    }

    #[test]
    fn sighting_updates_engine() {
        let s = store();
        let data = IrdaData {
            valid1: 0,
            valid2: 0,
            dir: 0,
            engine_id: 18,
            train_id: 0,
            status: 0,
            fuel: 0,
            water: 0,
            burn: 0,
            fwb_mask: 0,
            product: Some(IrdaProduct {
                runtime: 0,
                prod_rev: 0,
                prod_id: 0,
                bt_id: 0,
                year: 2019,
                name: "Santa Fe".into(),
                number: "3751".into(),
                tsdb_left: 0,
                tsdb_right: 0,
                max_speed: 180,
                odometer: 0,
            }),
        };
        feed(&s, IrdaReq::rx(2, IrdaAction::Data, IrdaBody::Data(data)).unwrap());
        let sensor = s.query(Scope::Irda, 2).unwrap();
        assert_eq!(sensor.with(|st| st.as_irda().unwrap().last_engine_id()), Some(18));
        let engine = s.query(Scope::Engine, 18).unwrap();
        assert_eq!(engine.with(|st| st.road_name().map(str::to_owned)), Some("Santa Fe".into()));
        assert!(s.query(Scope::Engine, 3751).is_some());
    }

    #[test]
    fn rejected_update_is_published() {
        let s = store();
        feed(&s, Asc2Req::relay(5, true, None).unwrap());
        let mut events = s.subscribe();
        let district = Bpc2Req::rx(5, Bpc2Action::Control3, Bpc2Body::State(0)).unwrap();
        assert_eq!(feed(&s, district), 0);
        match events.try_recv() {
            Ok(StateEvent::Rejected { scope, address, reason }) => {
                assert_eq!((scope, address), (Scope::Acc, 5));
                assert!(!reason.is_empty());
            }
            other => panic!("expected rejection, got {other:?}"),
        }
        let h = s.query(Scope::Acc, 5).unwrap();
        assert!(h.with(|st| st.as_accessory().unwrap().is_aux_on()));
    }

    // ---------------------------------------------------------------
    // Re-synthesis
    // ---------------------------------------------------------------

    #[test]
    fn as_bytes_base_first_and_replays() {
        let codec = MockCodec::new();
        let s = store();
        send(&s, cmd(CommandId::Switch(SwitchOp::Out), 3, None));
        feed(
            &s,
            BaseReq::with_record(
                0,
                BASE_SYNTH_VALID,
                BaseRecord::Base(BaseInfo {
                    name: Some("Layout".into()),
                    ..Default::default()
                }),
            )
            .unwrap(),
        );
        feed(&s, Bpc2Req::rx(8, Bpc2Action::Control3, Bpc2Body::State(1)).unwrap());

        let wire = s.as_bytes(&codec).unwrap();
        assert_eq!(s.as_bytes(&codec).unwrap(), wire);
        let (first, _) = PdiReq::decode(&wire).unwrap();
        assert!(matches!(first, PdiReq::Base(ref r) if r.scope() == Scope::Base));

        let fresh = store();
        let mut rest = wire.as_slice();
        while !rest.is_empty() {
            let (req, tail) = PdiReq::decode(rest).unwrap();
            match req {
                PdiReq::Tmcc(_) => {
                    fresh.dispatch(Update::Command(&req.to_command(&codec).unwrap()));
                }
                other => {
                    fresh.dispatch(Update::Pdi(&other));
                }
            }
            rest = tail;
        }
        assert_eq!(fresh.as_bytes(&codec).unwrap(), wire);
        assert_eq!(fresh.len(), s.len());
    }
}
