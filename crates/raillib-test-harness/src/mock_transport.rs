//! Mock transport for deterministic testing of the PDI pump.
//!
//! A Base pushes traffic on its own schedule, so [`MockTransport`] is
//! driven by an inbound byte stream rather than by request/response pairs
//! alone. Bytes queued with [`feed`](MockTransport::feed) are handed out
//! by `receive()` in chunks of at most [`chunk_size`](MockTransport::with_chunk_size)
//! bytes, which exercises frame reassembly the way a real socket does.
//!
//! # Example
//!
//! ```
//! use raillib_test_harness::MockTransport;
//!
//! let mut mock = MockTransport::new().with_chunk_size(3);
//! mock.feed(&[0xD1, 0x29, 0xD7, 0xDF]);
//! // When the host sends this, the Base answers with that.
//! mock.expect(&[0xD1, 0x29, 0xD7, 0xDF], &[0xD1, 0x29, 0xD7, 0xDF]);
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;

use raillib_core::error::{Error, Result};
use raillib_core::transport::Transport;

/// A pre-loaded request/response pair.
#[derive(Debug, Clone)]
struct Expectation {
    request: Vec<u8>,
    response: Vec<u8>,
}

/// A mock [`Transport`] backed by an in-memory byte queue.
///
/// Sends are always logged. While expectations are queued, each send must
/// match the next one, and its response is appended to the inbound queue.
/// With no expectations queued, sends are accepted silently.
///
/// `receive()` returns up to `chunk_size` queued bytes. When the queue is
/// empty it sleeps for the requested timeout and returns
/// [`Error::Timeout`].
#[derive(Debug)]
pub struct MockTransport {
    inbound: VecDeque<u8>,
    expectations: VecDeque<Expectation>,
    chunk_size: usize,
    connected: bool,
    /// Fail with [`Error::ConnectionLost`] once the inbound queue drains.
    hang_up_when_drained: bool,
    sent_log: Vec<Vec<u8>>,
}

impl MockTransport {
    /// A connected transport with an empty queue.
    pub fn new() -> Self {
        MockTransport {
            inbound: VecDeque::new(),
            expectations: VecDeque::new(),
            chunk_size: usize::MAX,
            connected: true,
            hang_up_when_drained: false,
            sent_log: Vec::new(),
        }
    }

    /// Deliver at most `n` bytes per `receive()` call.
    pub fn with_chunk_size(mut self, n: usize) -> Self {
        self.chunk_size = n.max(1);
        self
    }

    /// Report a lost connection once every queued byte has been read.
    pub fn hang_up_when_drained(mut self) -> Self {
        self.hang_up_when_drained = true;
        self
    }

    /// Queue bytes as if the Base had sent them.
    pub fn feed(&mut self, data: &[u8]) {
        self.inbound.extend(data);
    }

    /// Add an expected request/response pair.
    pub fn expect(&mut self, request: &[u8], response: &[u8]) {
        self.expectations.push_back(Expectation {
            request: request.to_vec(),
            response: response.to_vec(),
        });
    }

    /// Everything passed to `send()`, one entry per call.
    pub fn sent_data(&self) -> &[Vec<u8>] {
        &self.sent_log
    }

    pub fn remaining_expectations(&self) -> usize {
        self.expectations.len()
    }

    /// Bytes queued but not yet received.
    pub fn pending_bytes(&self) -> usize {
        self.inbound.len()
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        self.sent_log.push(data.to_vec());

        if let Some(expectation) = self.expectations.pop_front() {
            if data != expectation.request.as_slice() {
                return Err(Error::Protocol(format!(
                    "unexpected send data: expected {:02X?}, got {:02X?}",
                    expectation.request, data
                )));
            }
            self.inbound.extend(expectation.response);
        }
        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        if !self.connected {
            return Err(Error::NotConnected);
        }
        if self.inbound.is_empty() {
            if self.hang_up_when_drained {
                self.connected = false;
                return Err(Error::ConnectionLost);
            }
            tokio::time::sleep(timeout).await;
            return Err(Error::Timeout);
        }
        let n = self.inbound.len().min(buf.len()).min(self.chunk_size);
        for (slot, byte) in buf.iter_mut().zip(self.inbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    async fn close(&mut self) -> Result<()> {
        self.connected = false;
        self.inbound.clear();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
