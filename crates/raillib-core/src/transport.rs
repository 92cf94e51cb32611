//! Transport trait for the Base link.
//!
//! The core never performs I/O itself. The [`Transport`] trait is the seam
//! through which an application hands raw bytes to raillib (and receives
//! encoded frames back): a TCP socket to the Base, a serial bridge, or a
//! mock transport for testing from the `raillib-test-harness` crate.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Asynchronous byte-level transport to a Base command station.
///
/// Reads may return any number of bytes: a fraction of a PDI frame, exactly
/// one frame, or several frames packed back to back. Reassembly is the job
/// of `raillib_pdi::FrameBuffer`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send an encoded frame (or a run of frames) to the Base.
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive bytes into `buf`, waiting up to `timeout`.
    ///
    /// Returns the number of bytes read, or
    /// [`Error::Timeout`](crate::error::Error::Timeout) if nothing arrived
    /// within the deadline.
    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Close the link. Later calls should fail with
    /// [`Error::NotConnected`](crate::error::Error::NotConnected).
    async fn close(&mut self) -> Result<()>;

    /// Check whether the link is currently open.
    fn is_connected(&self) -> bool;
}
