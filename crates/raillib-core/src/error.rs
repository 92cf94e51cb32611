//! Error types for raillib.
//!
//! All fallible operations across the library return [`Result<T>`], which
//! uses [`Error`] as the error type. Framing failures, malformed payloads,
//! state invariant violations, and transport failures are all captured here.
//!
//! Device-reported LCS errors (a response frame with its error bit set) are
//! *not* represented here: they are ordinary data attached to the decoded
//! request, since devices legitimately answer capability probes with
//! "command not supported".

use crate::types::Scope;

/// A link-layer framing failure reported by the PDI frame codec.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    /// A start marker was found but no end marker followed it.
    #[error("truncated frame: no end marker after {0} bytes")]
    Truncated(usize),

    /// The transmitted bytes between the markers did not sum to zero.
    #[error("checksum mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    Checksum {
        /// Checksum computed over the received bytes.
        expected: u8,
        /// Checksum byte carried by the frame.
        actual: u8,
    },

    /// The command byte does not name a known PDI command.
    #[error("unknown PDI command 0x{0:02X}")]
    UnknownCommand(u8),

    /// A start marker immediately followed by an end marker.
    #[error("empty frame")]
    Empty,
}

/// The error type for all raillib operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A PDI framing error (truncation, checksum, unknown command).
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// A payload that framed correctly but could not be interpreted.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A command was routed to a state object bound to another address.
    ///
    /// This indicates a routing bug or corrupted source data. Dispatch loops
    /// should log and drop the command rather than abort.
    #[error("address mismatch on {scope}: bound to {bound}, received {received}")]
    AddressMismatch {
        /// Scope of the state object.
        scope: Scope,
        /// Address the state object is bound to.
        bound: u16,
        /// Address carried by the offending command.
        received: u16,
    },

    /// A command was routed to a state object of another device kind.
    #[error("scope mismatch: state is {expected}, command is {received}")]
    ScopeMismatch {
        /// Scope of the state object.
        expected: Scope,
        /// Scope carried by the offending command.
        received: Scope,
    },

    /// An address outside the valid range for its scope.
    #[error("invalid address {address} for {scope}")]
    InvalidAddress {
        /// Scope the address was used with.
        scope: Scope,
        /// The rejected address.
        address: u16,
    },

    /// An invalid argument was passed to a request constructor.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The external TMCC command codec failed to encode or decode.
    #[error("codec error: {0}")]
    Codec(String),

    /// A transport-level error reported by an external link.
    #[error("transport error: {0}")]
    Transport(String),

    /// Timed out waiting for data or a state change.
    #[error("timeout")]
    Timeout,

    /// No link to the Base has been established.
    #[error("not connected")]
    NotConnected,

    /// The link to the Base was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;
