//! Core types used throughout raillib.
//!
//! These types describe *what* a command or frame is addressed to: the
//! device kind ([`Scope`]), the protocol generation ([`Syntax`]), and the
//! direction of travel reported by trackside sensors ([`Direction`]).

use std::fmt;
use std::ops::RangeInclusive;

use crate::error::{Error, Result};

/// The address that targets every component of a scope at once.
pub const BROADCAST_ADDRESS: u16 = 99;

/// Default engine labor value (the midpoint of the 0-31 labor range).
pub const DEFAULT_ENGINE_LABOR: u8 = 12;

/// Device-kind discriminator, the first dimension of the state-store key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    /// A single locomotive.
    Engine,
    /// A lashed-up consist of engines.
    Train,
    /// A track switch (turnout).
    Switch,
    /// A route (a named set of switch positions).
    Route,
    /// A TMCC accessory or an LCS accessory-class device.
    Acc,
    /// An IR sensor track.
    Irda,
    /// An occupancy block.
    Block,
    /// The Base command station itself.
    Base,
    /// The synchronization status of the state engine.
    Sync,
}

impl Scope {
    /// Every scope, in store iteration order.
    pub const ALL: [Scope; 9] = [
        Scope::Engine,
        Scope::Train,
        Scope::Switch,
        Scope::Route,
        Scope::Acc,
        Scope::Irda,
        Scope::Block,
        Scope::Base,
        Scope::Sync,
    ];

    /// Valid addresses for components of this scope.
    ///
    /// Engines accept 4-digit addresses; the Base is always address 0 and
    /// the sync pseudo-component lives at the broadcast address.
    pub fn address_range(&self) -> RangeInclusive<u16> {
        match self {
            Scope::Engine => 1..=9999,
            Scope::Base => 0..=0,
            Scope::Sync => BROADCAST_ADDRESS..=BROADCAST_ADDRESS,
            _ => 1..=99,
        }
    }

    /// Reject `address` if it lies outside [`address_range`](Self::address_range).
    pub fn validate_address(&self, address: u16) -> Result<u16> {
        if self.address_range().contains(&address) {
            Ok(address)
        } else {
            Err(Error::InvalidAddress {
                scope: *self,
                address,
            })
        }
    }

    /// Returns `true` for the scopes a System Halt applies to.
    pub fn is_motive(&self) -> bool {
        matches!(self, Scope::Engine | Scope::Train)
    }

    /// Byte used for this scope in Base block records.
    pub fn wire_value(&self) -> u8 {
        match self {
            Scope::Engine => 1,
            Scope::Train => 2,
            Scope::Switch => 3,
            Scope::Route => 4,
            Scope::Acc => 5,
            Scope::Irda => 10,
            Scope::Base => 12,
            Scope::Sync => 13,
            Scope::Block => 14,
        }
    }

    /// Inverse of [`wire_value`](Self::wire_value).
    pub fn from_wire(value: u8) -> Option<Scope> {
        Scope::ALL.into_iter().find(|s| s.wire_value() == value)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Scope::Engine => "Engine",
            Scope::Train => "Train",
            Scope::Switch => "Switch",
            Scope::Route => "Route",
            Scope::Acc => "Acc",
            Scope::Irda => "Irda",
            Scope::Block => "Block",
            Scope::Base => "Base",
            Scope::Sync => "Sync",
        };
        write!(f, "{s}")
    }
}

/// Protocol generation of a TMCC command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Syntax {
    /// Original TMCC (a.k.a. TMCC1).
    Tmcc,
    /// Legacy (a.k.a. TMCC2).
    Legacy,
}

/// Direction of travel past a trackside sensor or through a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    /// Not reported.
    #[default]
    Unknown,
    /// Left to right.
    LeftToRight,
    /// Right to left.
    RightToLeft,
}

impl Direction {
    /// Byte used for the direction in Base block records.
    pub fn wire_value(&self) -> u8 {
        match self {
            Direction::Unknown => 0,
            Direction::LeftToRight => 1,
            Direction::RightToLeft => 2,
        }
    }

    /// Inverse of [`wire_value`](Self::wire_value); unknown bytes map to
    /// [`Direction::Unknown`].
    pub fn from_wire(value: u8) -> Direction {
        match value {
            1 => Direction::LeftToRight,
            2 => Direction::RightToLeft,
            _ => Direction::Unknown,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::Unknown => "unknown",
            Direction::LeftToRight => "L -> R",
            Direction::RightToLeft => "R -> L",
        };
        write!(f, "{s}")
    }
}
