//! Base command station and sync state.

use raillib_core::{BROADCAST_ADDRESS, CommandId, Result, Scope, SyncOp};
use raillib_pdi::PdiReq;
use raillib_pdi::base::{BASE_SYNTH_VALID, BaseInfo, BaseRecord, BaseReq};
use raillib_pdi::d4::{D4Action, D4Body, D4Req};

use crate::component::{Common, Settings, Update};

/// Per-database figures reported by D4 walks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct D4Figures {
    count: Option<u16>,
    first_record: Option<u16>,
}

#[derive(Debug, Clone)]
pub struct BaseState {
    pub(crate) common: Common,
    firmware_high: Option<u8>,
    firmware_low: Option<u8>,
    throw_rate: Option<f32>,
    engines: D4Figures,
    trains: D4Figures,
}

impl BaseState {
    pub(crate) fn new(settings: Settings) -> Result<Self> {
        Ok(BaseState {
            common: Common::new(Scope::Base, Some(0), settings)?,
            firmware_high: None,
            firmware_low: None,
            throw_rate: None,
            engines: D4Figures::default(),
            trains: D4Figures::default(),
        })
    }

    fn figures_mut(&mut self, database: Scope) -> &mut D4Figures {
        match database {
            Scope::Train => &mut self.trains,
            _ => &mut self.engines,
        }
    }

    pub(crate) fn update(&mut self, update: Update<'_>) -> Result<bool> {
        self.common.accept(&update)?;
        let Update::Pdi(req) = update else {
            return Ok(false);
        };
        let changed = match req {
            PdiReq::Base(rec) => match &rec.record {
                BaseRecord::Base(info) if !rec.is_ack() && rec.status == 0 => {
                    self.common.bind_names(info.name.as_deref(), None);
                    self.firmware_high = info.firmware_high.or(self.firmware_high);
                    self.firmware_low = info.firmware_low.or(self.firmware_low);
                    self.throw_rate = info.throw_rate.or(self.throw_rate);
                    true
                }
                _ => false,
            },
            PdiReq::D4(d4) => match d4.action {
                D4Action::Count => match d4.count_value() {
                    Some(count) => {
                        self.figures_mut(d4.database()).count = Some(count);
                        true
                    }
                    None => false,
                },
                D4Action::FirstRec => {
                    self.figures_mut(d4.database()).first_record = Some(d4.record_no);
                    true
                }
                _ => false,
            },
            _ => false,
        };
        if changed {
            self.common.record(update);
        }
        Ok(changed)
    }

    /// The Base record, then the D4 counts and first records.
    pub(crate) fn as_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        if self.has_info() {
            let info = BaseInfo {
                firmware_high: self.firmware_high,
                firmware_low: self.firmware_low,
                throw_rate: self.throw_rate,
                name: self.common.road_name.clone(),
            };
            out.extend(BaseReq::with_record(0, BASE_SYNTH_VALID, BaseRecord::Base(info))?.as_bytes());
        }
        for (database, figures) in [(Scope::Engine, self.engines), (Scope::Train, self.trains)] {
            if let Some(count) = figures.count {
                let mut req = D4Req::count(database)?;
                req.body = D4Body::Count {
                    post_action: 0,
                    count: Some(count),
                };
                out.extend(req.as_bytes());
            }
            if let Some(record_no) = figures.first_record {
                let mut req = D4Req::first_record(database)?;
                req.record_no = record_no;
                out.extend(req.as_bytes());
            }
        }
        Ok(out)
    }

    fn has_info(&self) -> bool {
        self.common.road_name.is_some()
            || self.firmware_high.is_some()
            || self.firmware_low.is_some()
            || self.throw_rate.is_some()
    }

    pub(crate) fn is_known(&self) -> bool {
        self.has_info() || self.engines != D4Figures::default() || self.trains != D4Figures::default()
    }

    /// Base name as set in the CAB.
    pub fn name(&self) -> Option<&str> {
        self.common.road_name.as_deref()
    }

    /// Firmware as "high.low", once known.
    pub fn firmware(&self) -> Option<String> {
        Some(format!("{}.{}", self.firmware_high?, self.firmware_low?))
    }

    /// Route throw rate, in seconds.
    pub fn throw_rate(&self) -> Option<f32> {
        self.throw_rate
    }

    /// Number of records in the engine or train D4 database.
    pub fn d4_count(&self, database: Scope) -> Option<u16> {
        match database {
            Scope::Engine => self.engines.count,
            Scope::Train => self.trains.count,
            _ => None,
        }
    }

    /// First record number of the engine or train D4 database.
    pub fn d4_first_record(&self, database: Scope) -> Option<u16> {
        match database {
            Scope::Engine => self.engines.first_record,
            Scope::Train => self.trains.first_record,
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Sync
// ---------------------------------------------------------------------------

/// Whether the Base's component database is being, or has been, read.
#[derive(Debug, Clone)]
pub struct SyncState {
    pub(crate) common: Common,
    synchronizing: Option<bool>,
    synchronized: Option<bool>,
}

impl SyncState {
    pub(crate) fn new(settings: Settings) -> Result<Self> {
        Ok(SyncState {
            common: Common::new(Scope::Sync, Some(BROADCAST_ADDRESS), settings)?,
            synchronizing: None,
            synchronized: None,
        })
    }

    pub(crate) fn update(&mut self, update: Update<'_>) -> Result<bool> {
        self.common.accept(&update)?;
        let Update::Command(req) = update else {
            return Ok(false);
        };
        let (synchronizing, synchronized) = match req.command {
            CommandId::Sync(SyncOp::Synchronizing) => (true, false),
            CommandId::Sync(SyncOp::Synchronized) => (false, true),
            _ => return Ok(false),
        };
        self.synchronizing = Some(synchronizing);
        self.synchronized = Some(synchronized);
        self.common.record(update);
        Ok(true)
    }

    pub(crate) fn is_known(&self) -> bool {
        self.synchronizing.is_some() || self.synchronized.is_some()
    }

    pub fn is_synchronizing(&self) -> bool {
        self.synchronizing == Some(true)
    }

    pub fn is_synchronized(&self) -> bool {
        self.synchronized == Some(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raillib_core::CommandReq;

    fn base() -> BaseState {
        BaseState::new(Settings::default()).unwrap()
    }

    fn feed(state: &mut BaseState, req: impl Into<PdiReq>) -> bool {
        let req = req.into();
        state.update(Update::Pdi(&req)).unwrap()
    }

    fn info() -> BaseReq {
        BaseReq::with_record(
            0,
            BASE_SYNTH_VALID,
            BaseRecord::Base(BaseInfo {
                firmware_high: Some(1),
                firmware_low: Some(62),
                throw_rate: Some(2.0),
                name: Some("Basement".into()),
            }),
        )
        .unwrap()
    }

    fn count(database: Scope, n: u16) -> D4Req {
        let mut req = D4Req::count(database).unwrap();
        req.body = D4Body::Count {
            post_action: 0,
            count: Some(n),
        };
        req
    }

    // ---------------------------------------------------------------
    // Base
    // ---------------------------------------------------------------

    #[test]
    fn base_record_fields() {
        let mut b = base();
        assert!(!b.is_known());
        assert!(feed(&mut b, info()));
        assert_eq!(b.name(), Some("Basement"));
        assert_eq!(b.firmware().as_deref(), Some("1.62"));
        assert_eq!(b.throw_rate(), Some(2.0));
    }

    #[test]
    fn d4_figures() {
        let mut b = base();
        assert!(feed(&mut b, count(Scope::Engine, 14)));
        assert!(feed(&mut b, count(Scope::Train, 3)));
        let mut first = D4Req::first_record(Scope::Train).unwrap();
        first.record_no = 2;
        assert!(feed(&mut b, first));
        assert_eq!(b.d4_count(Scope::Engine), Some(14));
        assert_eq!(b.d4_count(Scope::Train), Some(3));
        assert_eq!(b.d4_first_record(Scope::Train), Some(2));
        assert_eq!(b.d4_first_record(Scope::Engine), None);
        assert_eq!(b.d4_count(Scope::Switch), None);
    }

    #[test]
    fn count_request_is_ignored() {
        let mut b = base();
        assert!(!feed(&mut b, D4Req::count(Scope::Engine).unwrap()));
        assert!(!b.is_known());
    }

    #[test]
    fn resynthesis_round_trips() {
        let mut b = base();
        feed(&mut b, info());
        feed(&mut b, count(Scope::Engine, 14));
        let wire = b.as_bytes().unwrap();
        assert_eq!(b.as_bytes().unwrap(), wire);

        let mut fresh = base();
        let mut rest = wire.as_slice();
        while !rest.is_empty() {
            let (req, tail) = PdiReq::decode(rest).unwrap();
            fresh.update(Update::Pdi(&req)).unwrap();
            rest = tail;
        }
        assert_eq!(fresh.name(), Some("Basement"));
        assert_eq!(fresh.d4_count(Scope::Engine), Some(14));
        assert_eq!(fresh.as_bytes().unwrap(), wire);
    }

    // ---------------------------------------------------------------
    // Sync
    // ---------------------------------------------------------------

    fn sync_cmd(op: SyncOp) -> CommandReq {
        CommandReq::build(CommandId::Sync(op), BROADCAST_ADDRESS, None, None).unwrap()
    }

    #[test]
    fn sync_flags() {
        let mut s = SyncState::new(Settings::default()).unwrap();
        assert!(!s.is_known());
        let req = sync_cmd(SyncOp::Synchronizing);
        assert!(s.update(Update::Command(&req)).unwrap());
        assert!(s.is_synchronizing());
        assert!(!s.is_synchronized());
        let req = sync_cmd(SyncOp::Synchronized);
        assert!(s.update(Update::Command(&req)).unwrap());
        assert!(!s.is_synchronizing());
        assert!(s.is_synchronized());
        assert!(s.is_known());
    }
}
