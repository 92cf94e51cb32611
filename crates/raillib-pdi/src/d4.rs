//! D4 (four-digit address) engine and train records.
//!
//! Engines and trains with addresses above 99 live in a separate Base
//! database indexed by record number rather than by TMCC id.
//!
//! ```text
//! payload: <record_no:LE16> <action> [<post_action:LE16> <action fields>...]
//! ```

use bytes::{BufMut, BytesMut};
use raillib_core::{Error, Result, Scope};

use crate::command::PdiCommand;
use crate::frame::PdiFrame;
use crate::wire::Reader;

/// Record number the Base returns when a lookup finds nothing.
pub const NOT_FOUND: u16 = 0xFFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum D4Action {
    Query,
    Count,
    FirstRec,
    NextRec,
    Map,
}

impl D4Action {
    pub fn from_byte(b: u8) -> Option<Self> {
        Some(match b {
            0x01 => D4Action::Query,
            0x02 => D4Action::Count,
            0x03 => D4Action::FirstRec,
            0x04 => D4Action::NextRec,
            0x05 => D4Action::Map,
            _ => return None,
        })
    }

    pub fn as_byte(self) -> u8 {
        match self {
            D4Action::Query => 0x01,
            D4Action::Count => 0x02,
            D4Action::FirstRec => 0x03,
            D4Action::NextRec => 0x04,
            D4Action::Map => 0x05,
        }
    }
}

/// Action-specific fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum D4Body {
    /// A query, or a request with no further fields.
    Empty,
    Count {
        post_action: u16,
        count: Option<u16>,
    },
    FirstRec,
    NextRec {
        post_action: u16,
        start: Option<u8>,
        data_len: Option<u8>,
        next_record: Option<u16>,
    },
    /// Maps a TMCC id to a record number. `tmcc_id` is `None` in the
    /// request form and filled in by the Base.
    Map {
        post_action: u16,
        tmcc_id: Option<u16>,
    },
}

/// A D4 database request or response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct D4Req {
    pub command: PdiCommand,
    pub record_no: u16,
    pub action: D4Action,
    pub body: D4Body,
}

fn parse_tmcc_id(raw: &[u8]) -> Result<u16> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.trim_matches('\0').parse().ok())
        .ok_or_else(|| Error::Protocol(format!("bad D4 TMCC id {raw:02X?}")))
}

impl D4Req {
    fn command_for(scope: Scope) -> Result<PdiCommand> {
        match scope {
            Scope::Engine => Ok(PdiCommand::D4Engine),
            Scope::Train => Ok(PdiCommand::D4Train),
            other => Err(Error::InvalidParameter(format!(
                "D4 records hold engines and trains, not {other}"
            ))),
        }
    }

    /// Number of records in the engine or train database.
    pub fn count(scope: Scope) -> Result<Self> {
        Ok(D4Req {
            command: Self::command_for(scope)?,
            record_no: 0,
            action: D4Action::Count,
            body: D4Body::Count {
                post_action: 0,
                count: None,
            },
        })
    }

    pub fn first_record(scope: Scope) -> Result<Self> {
        Ok(D4Req {
            command: Self::command_for(scope)?,
            record_no: 0,
            action: D4Action::FirstRec,
            body: D4Body::FirstRec,
        })
    }

    pub fn next_record(scope: Scope, record_no: u16) -> Result<Self> {
        Ok(D4Req {
            command: Self::command_for(scope)?,
            record_no,
            action: D4Action::NextRec,
            body: D4Body::NextRec {
                post_action: 0,
                start: None,
                data_len: None,
                next_record: None,
            },
        })
    }

    /// Look up the record number of a four-digit TMCC id.
    pub fn map(scope: Scope, tmcc_id: u16) -> Result<Self> {
        if tmcc_id > 9999 {
            return Err(Error::InvalidParameter(format!(
                "TMCC id {tmcc_id} exceeds four digits"
            )));
        }
        Ok(D4Req {
            command: Self::command_for(scope)?,
            record_no: 0,
            action: D4Action::Map,
            body: D4Body::Map {
                post_action: 0,
                tmcc_id: Some(tmcc_id),
            },
        })
    }

    pub fn query(scope: Scope, record_no: u16) -> Result<Self> {
        Ok(D4Req {
            command: Self::command_for(scope)?,
            record_no,
            action: D4Action::Query,
            body: D4Body::Empty,
        })
    }

    pub fn from_frame(frame: &PdiFrame) -> Result<Self> {
        if !frame.command.is_d4() {
            return Err(Error::Protocol(format!("{} is not a D4 command", frame.command)));
        }
        let mut r = Reader::new(&frame.payload);
        let record_no = r.le16()?;
        let raw = r.u8()?;
        let action = D4Action::from_byte(raw)
            .ok_or_else(|| Error::Protocol(format!("unknown D4 action 0x{raw:02X}")))?;
        let body = match action {
            D4Action::Query => D4Body::Empty,
            D4Action::FirstRec => D4Body::FirstRec,
            D4Action::Count => D4Body::Count {
                post_action: r.le16().unwrap_or(0),
                count: r.le16().ok(),
            },
            D4Action::NextRec => D4Body::NextRec {
                post_action: r.le16().unwrap_or(0),
                start: r.opt_u8(),
                data_len: r.opt_u8(),
                next_record: r.le16().ok(),
            },
            D4Action::Map => {
                let post_action = r.le16().unwrap_or(0);
                let tmcc_id = match r.remaining() {
                    0 => None,
                    _ => Some(parse_tmcc_id(r.bytes(4)?)?),
                };
                D4Body::Map {
                    post_action,
                    tmcc_id,
                }
            }
        };
        Ok(D4Req {
            command: frame.command,
            record_no,
            action,
            body,
        })
    }

    pub fn to_frame(&self) -> PdiFrame {
        let mut buf = BytesMut::with_capacity(12);
        buf.put_u16_le(self.record_no);
        buf.put_u8(self.action.as_byte());
        match self.body {
            D4Body::Empty => {}
            D4Body::FirstRec => buf.put_u8(0),
            D4Body::Count { post_action, count } => {
                buf.put_u16_le(post_action);
                if let Some(count) = count {
                    buf.put_u16_le(count);
                }
            }
            D4Body::NextRec {
                post_action,
                start,
                data_len,
                next_record,
            } => {
                buf.put_u16_le(post_action);
                // Trailing fields are positional; stop at the first gap.
                if let Some(start) = start {
                    buf.put_u8(start);
                    if let Some(len) = data_len {
                        buf.put_u8(len);
                        if let Some(next) = next_record {
                            buf.put_u16_le(next);
                        }
                    }
                }
            }
            D4Body::Map {
                post_action,
                tmcc_id,
            } => {
                buf.put_u16_le(post_action);
                if let Some(id) = tmcc_id {
                    buf.put_slice(format!("{id:04}").as_bytes());
                }
            }
        }
        PdiFrame::new(self.command, buf.to_vec())
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        self.to_frame().encode()
    }

    /// Engine or train; record counts are reported against the Base.
    pub fn scope(&self) -> Scope {
        match (self.action, self.command) {
            (D4Action::Count, _) => Scope::Base,
            (_, PdiCommand::D4Train) => Scope::Train,
            _ => Scope::Engine,
        }
    }

    /// Scope of the database this request addresses.
    pub fn database(&self) -> Scope {
        if self.command == PdiCommand::D4Train {
            Scope::Train
        } else {
            Scope::Engine
        }
    }

    pub fn tmcc_id(&self) -> Option<u16> {
        match self.body {
            D4Body::Map { tmcc_id, .. } => tmcc_id,
            _ => None,
        }
    }

    pub fn count_value(&self) -> Option<u16> {
        match self.body {
            D4Body::Count { count, .. } => count,
            _ => None,
        }
    }

    pub fn next_record_no(&self) -> Option<u16> {
        match self.body {
            D4Body::NextRec { next_record, .. } => next_record,
            _ => None,
        }
    }

    /// `true` for a map response that found no record.
    pub fn is_not_found(&self) -> bool {
        self.action == D4Action::Map && self.record_no == NOT_FOUND
    }
}
