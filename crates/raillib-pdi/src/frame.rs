//! PDI frame encoder/decoder.
//!
//! Every message exchanged with the Base is wrapped in a PDI frame. This
//! module handles the pure byte-level concerns shared by all request types:
//! start/end markers, byte stuffing, and the additive checksum. It also
//! provides [`FrameBuffer`], which reassembles frames from a transport that
//! delivers arbitrary chunks.
//!
//! # Frame format
//!
//! ```text
//! 0xD1 <cmd> [<payload>...] [0xDE] <checksum> 0xDF
//! ```
//!
//! - `0xD1`: start of packet (SOP)
//! - `cmd`: [`PdiCommand`] byte
//! - `payload`: command-specific bytes
//! - `0xDE`: stuff byte (STF), placed before any inner byte equal to SOP,
//!   STF, or EOP, including the checksum itself
//! - `0xDF`: end of packet (EOP)
//!
//! The checksum is chosen so that every byte transmitted between SOP and
//! EOP, stuff bytes included, sums to zero modulo 256. This matches what
//! the Base itself emits and accepts.

use bytes::{Buf, BufMut, BytesMut};
use raillib_core::FrameError;
use tracing::{debug, warn};

use crate::command::PdiCommand;

/// Start-of-packet marker.
pub const SOP: u8 = 0xD1;

/// Stuff (escape) marker.
pub const STF: u8 = 0xDE;

/// End-of-packet marker.
pub const EOP: u8 = 0xDF;

/// Keep-alive frame sent periodically by the Base link.
pub const KEEP_ALIVE: [u8; 4] = [SOP, 0x29, 0xD7, EOP];

/// Default cap on bytes held by a [`FrameBuffer`].
pub const DEFAULT_MAX_BUFFER: usize = 4096;

/// Returns `true` if `byte` must be stuffed when it appears inside a frame.
pub fn is_marker(byte: u8) -> bool {
    matches!(byte, SOP | STF | EOP)
}

/// A validated, unstuffed PDI frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdiFrame {
    /// Command byte, already resolved to a known [`PdiCommand`].
    pub command: PdiCommand,
    /// Unstuffed payload (everything between the command and the checksum).
    pub payload: Vec<u8>,
}

impl PdiFrame {
    /// Create a frame from a command and payload.
    pub fn new(command: PdiCommand, payload: impl Into<Vec<u8>>) -> Self {
        PdiFrame {
            command,
            payload: payload.into(),
        }
    }

    /// Encode this frame for transmission.
    pub fn encode(&self) -> Vec<u8> {
        encode_frame(self.command, &self.payload)
    }

    /// Returns `true` for the keep-alive ping.
    pub fn is_ping(&self) -> bool {
        self.command.is_ping()
    }
}

/// Encode a PDI frame into raw bytes ready for transmission.
///
/// # Example
///
/// ```
/// use raillib_pdi::command::PdiCommand;
/// use raillib_pdi::frame::{KEEP_ALIVE, encode_frame};
///
/// assert_eq!(encode_frame(PdiCommand::Ping, &[]), KEEP_ALIVE.to_vec());
///
/// // 0xD1 in the payload is stuffed.
/// let bytes = encode_frame(PdiCommand::Asc2Get, &[0xD1]);
/// assert_eq!(&bytes[..4], &[0xD1, 0x3C, 0xDE, 0xD1]);
/// ```
pub fn encode_frame(command: PdiCommand, payload: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(2 * (payload.len() + 2) + 2);
    let mut sum: u8 = 0;
    buf.put_u8(SOP);
    for &b in std::iter::once(&command.as_byte()).chain(payload) {
        if is_marker(b) {
            buf.put_u8(STF);
            sum = sum.wrapping_add(STF);
        }
        buf.put_u8(b);
        sum = sum.wrapping_add(b);
    }
    let mut checksum = 0u8.wrapping_sub(sum);
    if is_marker(checksum) {
        buf.put_u8(STF);
        sum = sum.wrapping_add(STF);
        checksum = 0u8.wrapping_sub(sum);
    }
    buf.put_u8(checksum);
    buf.put_u8(EOP);
    buf.to_vec()
}

/// Result of attempting to decode a frame from a byte buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeResult {
    /// A complete frame was decoded. The `usize` is the number of bytes
    /// consumed from the input buffer, including any bytes skipped before
    /// the start marker.
    Frame(PdiFrame, usize),

    /// The buffer does not yet contain a complete frame.
    Incomplete,

    /// A complete but invalid frame was found. The `usize` is the number of
    /// bytes to discard before decoding resumes.
    Invalid(FrameError, usize),
}

/// Attempt to decode one PDI frame from a byte buffer.
///
/// Bytes before the first start marker are skipped. An unescaped start
/// marker inside a frame means the previous frame was cut short; that is
/// reported as [`FrameError::Truncated`] and decoding resumes at the new
/// start marker.
///
/// # Example
///
/// ```
/// use raillib_pdi::frame::{DecodeResult, KEEP_ALIVE, decode_frame};
///
/// match decode_frame(&KEEP_ALIVE) {
///     DecodeResult::Frame(frame, consumed) => {
///         assert!(frame.is_ping());
///         assert_eq!(consumed, 4);
///     }
///     other => panic!("expected a frame, got {other:?}"),
/// }
/// ```
pub fn decode_frame(buf: &[u8]) -> DecodeResult {
    let start = match buf.iter().position(|&b| b == SOP) {
        Some(pos) => pos,
        None => return DecodeResult::Incomplete,
    };

    let mut inner: Vec<u8> = Vec::new();
    let mut sum: u8 = 0;
    let mut escaped = false;
    let mut end = None;
    for (i, &b) in buf.iter().enumerate().skip(start + 1) {
        if escaped {
            inner.push(b);
            sum = sum.wrapping_add(b);
            escaped = false;
        } else if b == STF {
            sum = sum.wrapping_add(b);
            escaped = true;
        } else if b == EOP {
            end = Some(i);
            break;
        } else if b == SOP {
            return DecodeResult::Invalid(FrameError::Truncated(i - start), i);
        } else {
            inner.push(b);
            sum = sum.wrapping_add(b);
        }
    }

    let end = match end {
        Some(end) => end,
        None => return DecodeResult::Incomplete,
    };
    let consumed = end + 1;

    if inner.is_empty() {
        return DecodeResult::Invalid(FrameError::Empty, consumed);
    }
    if inner.len() < 2 {
        return DecodeResult::Invalid(FrameError::Truncated(consumed - start), consumed);
    }
    if sum != 0 {
        let actual = inner[inner.len() - 1];
        return DecodeResult::Invalid(
            FrameError::Checksum {
                expected: actual.wrapping_sub(sum),
                actual,
            },
            consumed,
        );
    }
    let command = match PdiCommand::from_byte(inner[0]) {
        Some(cmd) => cmd,
        None => return DecodeResult::Invalid(FrameError::UnknownCommand(inner[0]), consumed),
    };
    let payload = inner[1..inner.len() - 1].to_vec();
    DecodeResult::Frame(PdiFrame { command, payload }, consumed)
}

/// Decode the first frame in `buf`, returning it with the unconsumed remainder.
///
/// A buffer without a complete frame is reported as
/// [`FrameError::Truncated`]; use [`FrameBuffer`] when input arrives in
/// pieces.
pub fn decode(buf: &[u8]) -> Result<(PdiFrame, &[u8]), FrameError> {
    match decode_frame(buf) {
        DecodeResult::Frame(frame, consumed) => Ok((frame, &buf[consumed..])),
        DecodeResult::Incomplete => Err(FrameError::Truncated(buf.len())),
        DecodeResult::Invalid(err, _) => Err(err),
    }
}

/// Accumulates transport reads and yields complete frames.
///
/// Frames may be split across reads or packed several to a read. After a
/// bad frame the buffer resynchronizes at the next start marker, so one
/// corrupted frame never poisons the ones behind it.
///
/// # Example
///
/// ```
/// use raillib_pdi::frame::{FrameBuffer, KEEP_ALIVE};
///
/// let mut fb = FrameBuffer::new();
/// fb.extend(&KEEP_ALIVE[..2]);
/// assert!(fb.next_frame().is_none());
/// fb.extend(&KEEP_ALIVE[2..]);
/// assert!(fb.next_frame().unwrap().unwrap().is_ping());
/// ```
#[derive(Debug)]
pub struct FrameBuffer {
    buf: BytesMut,
    max_len: usize,
}

impl FrameBuffer {
    /// Create a buffer with the [default cap](DEFAULT_MAX_BUFFER).
    pub fn new() -> Self {
        Self::with_max_len(DEFAULT_MAX_BUFFER)
    }

    /// Create a buffer holding at most `max_len` bytes.
    pub fn with_max_len(max_len: usize) -> Self {
        FrameBuffer {
            buf: BytesMut::with_capacity(max_len.min(DEFAULT_MAX_BUFFER)),
            max_len: max_len.max(1),
        }
    }

    /// Append bytes read from the transport.
    ///
    /// If the buffer would exceed its cap, everything before the last start
    /// marker is discarded.
    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
        if self.buf.len() > self.max_len {
            let keep_from = self
                .buf
                .iter()
                .rposition(|&b| b == SOP)
                .filter(|&pos| self.buf.len() - pos <= self.max_len)
                .unwrap_or(self.buf.len());
            warn!(
                discarded = keep_from,
                max_len = self.max_len,
                "frame buffer overflow"
            );
            self.buf.advance(keep_from);
        }
    }

    /// Decode the next frame, if one is complete.
    ///
    /// Returns `Some(Err(_))` for a bad frame (already discarded), and
    /// `None` when more input is needed.
    pub fn next_frame(&mut self) -> Option<Result<PdiFrame, FrameError>> {
        match self.buf.iter().position(|&b| b == SOP) {
            Some(0) => {}
            Some(pos) => {
                warn!(discarded = pos, "dropping bytes before start marker");
                self.buf.advance(pos);
            }
            None => {
                if !self.buf.is_empty() {
                    warn!(discarded = self.buf.len(), "dropping bytes without start marker");
                    self.buf.clear();
                }
                return None;
            }
        }

        match decode_frame(&self.buf) {
            DecodeResult::Frame(frame, consumed) => {
                self.buf.advance(consumed);
                Some(Ok(frame))
            }
            DecodeResult::Incomplete => None,
            DecodeResult::Invalid(err, consumed) => {
                debug!(?err, consumed, "discarding invalid frame");
                self.buf.advance(consumed);
                Some(Err(err))
            }
        }
    }

    /// Decode every complete frame currently buffered.
    pub fn drain_frames(&mut self) -> Vec<Result<PdiFrame, FrameError>> {
        std::iter::from_fn(|| self.next_frame()).collect()
    }

    /// Bytes retained for the next read (an incomplete frame, if any).
    pub fn remainder(&self) -> &[u8] {
        &self.buf
    }

    /// Number of buffered bytes.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` if no bytes are buffered.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Discard all buffered bytes.
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}
