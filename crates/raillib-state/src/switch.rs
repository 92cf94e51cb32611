//! Switch (turnout) and route state.

use raillib_core::{CommandCodec, CommandId, CommandReq, Result, RouteOp, Scope, SwitchOp};
use raillib_pdi::PdiReq;
use raillib_pdi::base::{BaseRecord, BaseReq, COMPONENT_SYNTH_VALID, ComponentRecord, RouteComponent};

use crate::component::{Common, Settings, Update, tmcc_bytes};

fn component_record(common: &Common, route: Vec<RouteComponent>) -> ComponentRecord {
    ComponentRecord {
        name: common.road_name.clone(),
        number: common.road_number.clone(),
        route,
        ..Default::default()
    }
}

/// The component record of a live, successful Base read.
fn live_record(rec: &BaseReq) -> Option<&ComponentRecord> {
    if rec.is_ack() || rec.status != 0 || !rec.is_active() {
        return None;
    }
    match &rec.record {
        BaseRecord::Switch(c) | BaseRecord::Route(c) => Some(c),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Switch
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SwitchState {
    pub(crate) common: Common,
    thru: Option<bool>,
}

impl SwitchState {
    pub(crate) fn new(address: Option<u16>, settings: Settings) -> Result<Self> {
        Ok(SwitchState {
            common: Common::new(Scope::Switch, address, settings)?,
            thru: None,
        })
    }

    pub(crate) fn update(&mut self, update: Update<'_>) -> Result<bool> {
        self.common.accept(&update)?;
        let thru = match update {
            Update::Command(req) => match req.command {
                CommandId::Switch(SwitchOp::Through) => Some(true),
                CommandId::Switch(SwitchOp::Out) => Some(false),
                _ => None,
            },
            Update::Pdi(PdiReq::Base(rec)) => {
                let Some(c) = live_record(rec) else {
                    return Ok(false);
                };
                self.common.bind_names(c.name.as_deref(), c.number.as_deref());
                self.common.record(update);
                return Ok(true);
            }
            Update::Pdi(PdiReq::Asc2(r)) if !r.is_error() => r.body.is_thru(),
            Update::Pdi(PdiReq::Stm2(r)) if !r.is_error() => r.body.is_thru(),
            Update::Pdi(_) => None,
        };
        let Some(thru) = thru else {
            return Ok(false);
        };
        self.thru = Some(thru);
        self.common.record(update);
        Ok(true)
    }

    /// Base record when names are known, then the position as a TMCC
    /// command.
    pub(crate) fn as_bytes(&self, codec: &dyn CommandCodec) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let Some(address) = self.common.address else {
            return Ok(out);
        };
        if self.common.has_names() {
            if let Some(record_no) = self.common.record_no() {
                let record = BaseRecord::Switch(component_record(&self.common, Vec::new()));
                out.extend(BaseReq::with_record(record_no, COMPONENT_SYNTH_VALID, record)?.as_bytes());
            }
        }
        if let Some(thru) = self.thru {
            let op = if thru { SwitchOp::Through } else { SwitchOp::Out };
            let req = CommandReq::build(CommandId::Switch(op), address, None, Some(Scope::Switch))?;
            out.extend(tmcc_bytes(&req, codec)?);
        }
        Ok(out)
    }

    pub(crate) fn is_known(&self) -> bool {
        self.thru.is_some() || self.common.has_names()
    }

    /// `Some(true)` when thrown through, `Some(false)` when out.
    pub fn is_thru(&self) -> Option<bool> {
        self.thru
    }

    pub fn is_out(&self) -> Option<bool> {
        self.thru.map(|t| !t)
    }
}

// ---------------------------------------------------------------------------
// Route
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RouteState {
    pub(crate) common: Common,
    components: Vec<RouteComponent>,
}

impl RouteState {
    pub(crate) fn new(address: Option<u16>, settings: Settings) -> Result<Self> {
        Ok(RouteState {
            common: Common::new(Scope::Route, address, settings)?,
            components: Vec::new(),
        })
    }

    pub(crate) fn update(&mut self, update: Update<'_>) -> Result<bool> {
        self.common.accept(&update)?;
        match update {
            Update::Command(req) => {
                // Firing changes no stored field beyond the last command.
                if req.command != CommandId::Route(RouteOp::Fire) {
                    return Ok(false);
                }
            }
            Update::Pdi(PdiReq::Base(rec)) => {
                let Some(c) = live_record(rec) else {
                    return Ok(false);
                };
                self.common.bind_names(c.name.as_deref(), c.number.as_deref());
                self.components = c.route.clone();
            }
            Update::Pdi(_) => return Ok(false),
        }
        self.common.record(update);
        Ok(true)
    }

    pub(crate) fn as_bytes(&self) -> Result<Vec<u8>> {
        let Some(record_no) = self.common.record_no() else {
            return Ok(Vec::new());
        };
        if !self.is_known() {
            return Ok(Vec::new());
        }
        let record = BaseRecord::Route(component_record(&self.common, self.components.clone()));
        Ok(BaseReq::with_record(record_no, COMPONENT_SYNTH_VALID, record)?.as_bytes())
    }

    pub(crate) fn is_known(&self) -> bool {
        !self.components.is_empty() || self.common.has_names()
    }

    /// Switch positions this route sets, in Base order.
    pub fn components(&self) -> &[RouteComponent] {
        &self.components
    }

    /// Switches thrown through and out by this route.
    pub fn switches(&self) -> impl Iterator<Item = (u8, bool)> + '_ {
        self.components.iter().map(|c| (c.switch(), !c.is_thrown()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::DependencyCache;
    use crate::component::ComponentState;
    use raillib_pdi::action::Stm2Action;
    use raillib_pdi::asc2::Asc2Req;
    use raillib_pdi::stm2::{Stm2Body, Stm2Req};
    use raillib_test_harness::MockCodec;

    fn switch(address: u16) -> SwitchState {
        SwitchState::new(Some(address), Settings::default()).unwrap()
    }

    fn throw(state: &mut SwitchState, op: SwitchOp, address: u16) -> bool {
        let req = CommandReq::build(CommandId::Switch(op), address, None, None).unwrap();
        state.update(Update::Command(&req)).unwrap()
    }

    fn feed(state: &mut SwitchState, req: impl Into<PdiReq>) -> bool {
        let req = req.into();
        state.update(Update::Pdi(&req)).unwrap()
    }

    fn route_record(address: u8, name: &str, comps: Vec<RouteComponent>) -> PdiReq {
        let record = ComponentRecord {
            name: Some(name.into()),
            route: comps,
            ..Default::default()
        };
        PdiReq::Base(BaseReq::with_record(address, COMPONENT_SYNTH_VALID, BaseRecord::Route(record)).unwrap())
    }

    // ---------------------------------------------------------------
    // Switch
    // ---------------------------------------------------------------

    #[test]
    fn tmcc_positions() {
        let mut s = switch(12);
        assert_eq!(s.is_thru(), None);
        assert!(throw(&mut s, SwitchOp::Out, 12));
        assert_eq!(s.is_out(), Some(true));
        assert!(throw(&mut s, SwitchOp::Through, 12));
        assert_eq!(s.is_thru(), Some(true));
        assert!(!throw(&mut s, SwitchOp::SetAddress, 12));
    }

    #[test]
    fn asc2_switch_driver() {
        let mut s = switch(7);
        assert!(feed(&mut s, Asc2Req::switch(7, false, None).unwrap().as_rx()));
        assert_eq!(s.is_thru(), Some(false));
        assert!(feed(&mut s, Asc2Req::switch(7, true, None).unwrap().as_rx()));
        assert_eq!(s.is_thru(), Some(true));
    }

    #[test]
    fn stm2_position() {
        let mut s = switch(4);
        let out = Stm2Req::rx(4, Stm2Action::Control1, Stm2Body::Position(1)).unwrap();
        assert!(feed(&mut s, out));
        assert_eq!(s.is_out(), Some(true));
    }

    #[test]
    fn halt_leaves_switch() {
        let mut s = switch(4);
        throw(&mut s, SwitchOp::Out, 4);
        let halt = CommandReq::build(CommandId::Halt, 99, None, None).unwrap();
        assert!(!s.update(Update::Command(&halt)).unwrap());
        assert_eq!(s.is_out(), Some(true));
    }

    #[test]
    fn switch_resynthesis() {
        let codec = MockCodec::new();
        let deps = DependencyCache::new();
        let mut s = switch(21);
        let record = ComponentRecord {
            name: Some("Yard Lead".into()),
            ..Default::default()
        };
        feed(
            &mut s,
            PdiReq::Base(BaseReq::with_record(21, COMPONENT_SYNTH_VALID, BaseRecord::Switch(record)).unwrap()),
        );
        throw(&mut s, SwitchOp::Out, 21);
        let wire = s.as_bytes(&codec).unwrap();
        assert_eq!(s.as_bytes(&codec).unwrap(), wire);

        let mut fresh = ComponentState::new(Scope::Switch, Some(21), Settings::default()).unwrap();
        let mut rest = wire.as_slice();
        while !rest.is_empty() {
            let (req, tail) = PdiReq::decode(rest).unwrap();
            match req {
                PdiReq::Tmcc(_) => {
                    let cmd = req.to_command(&codec).unwrap();
                    fresh.update(Update::Command(&cmd), &deps).unwrap();
                }
                other => {
                    fresh.update(Update::Pdi(&other), &deps).unwrap();
                }
            }
            rest = tail;
        }
        assert_eq!(fresh.road_name(), Some("Yard Lead"));
        assert_eq!(fresh.as_switch().unwrap().is_out(), Some(true));
        assert_eq!(fresh.as_bytes(&codec).unwrap(), wire);
    }

    // ---------------------------------------------------------------
    // Route
    // ---------------------------------------------------------------

    #[test]
    fn route_components_from_record() {
        let mut r = RouteState::new(Some(3), Settings::default()).unwrap();
        let rec = route_record(3, "Main", vec![RouteComponent::new(10, false), RouteComponent::new(11, true)]);
        assert!(r.update(Update::Pdi(&rec)).unwrap());
        assert_eq!(r.components().len(), 2);
        assert_eq!(r.switches().collect::<Vec<_>>(), vec![(10, true), (11, false)]);
        assert_eq!(r.common.road_name.as_deref(), Some("Main"));
    }

    #[test]
    fn route_fire_is_recorded() {
        let mut r = RouteState::new(Some(3), Settings::default()).unwrap();
        let fire = CommandReq::build(CommandId::Route(RouteOp::Fire), 3, None, None).unwrap();
        assert!(r.update(Update::Command(&fire)).unwrap());
        assert!(!r.is_known());
        assert!(r.common.last_command.is_some());
    }

    #[test]
    fn route_resynthesis() {
        let mut r = RouteState::new(Some(3), Settings::default()).unwrap();
        let rec = route_record(3, "Main", vec![RouteComponent::new(10, false), RouteComponent::new(11, true)]);
        r.update(Update::Pdi(&rec)).unwrap();
        let wire = r.as_bytes().unwrap();
        let (req, rest) = PdiReq::decode(&wire).unwrap();
        assert!(rest.is_empty());

        let mut fresh = RouteState::new(Some(3), Settings::default()).unwrap();
        fresh.update(Update::Pdi(&req)).unwrap();
        assert_eq!(fresh.components(), r.components());
        assert_eq!(fresh.as_bytes().unwrap(), wire);
    }
}
