//! Listener: the pump between a Base link and the state store.
//!
//! A [`Listener`] owns the transport, reassembles PDI frames from whatever
//! chunks the link delivers, and dispatches each decoded request to the
//! [`ComponentStateStore`](raillib_state::ComponentStateStore) held by its
//! [`Context`]. Bad frames, undecodable payloads and rejected updates are
//! logged and dropped; only a lost link stops the pump with an error.

use std::sync::Arc;
use std::time::Duration;

use raillib_core::error::{Error, Result};
use raillib_core::{CommandCodec, Transport};
use raillib_pdi::{FrameBuffer, PdiFrame, PdiReq};
use raillib_state::{Context, Update};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// How long one receive waits before the loop checks for cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

const READ_CHUNK: usize = 256;

/// Counters kept by a [`Listener`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerStats {
    /// Frames that passed the link-layer checks.
    pub frames: u64,
    /// Keep-alive pings.
    pub pings: u64,
    /// Frames dropped for truncation, checksum or an unknown command.
    pub bad_frames: u64,
    /// Frames that framed correctly but whose payload did not decode.
    pub undecodable: u64,
    /// Component states changed by dispatched requests.
    pub applied: u64,
}

pub struct Listener {
    transport: Box<dyn Transport>,
    frames: FrameBuffer,
    ctx: Arc<Context>,
    codec: Option<Arc<dyn CommandCodec>>,
    stats: ListenerStats,
}

impl Listener {
    pub fn new(transport: Box<dyn Transport>, ctx: Arc<Context>) -> Self {
        Listener {
            transport,
            frames: FrameBuffer::with_max_len(ctx.max_buffer()),
            ctx,
            codec: None,
            stats: ListenerStats::default(),
        }
    }

    /// Decode TMCC pass-through frames with `codec` and apply them as
    /// commands. Without a codec those frames are dropped.
    pub fn with_codec(mut self, codec: Arc<dyn CommandCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    pub fn context(&self) -> &Arc<Context> {
        &self.ctx
    }

    pub fn stats(&self) -> ListenerStats {
        self.stats
    }

    /// Bytes held back waiting for the rest of a frame.
    pub fn pending(&self) -> &[u8] {
        self.frames.remainder()
    }

    /// Send a request to the Base.
    pub async fn send(&mut self, req: &PdiReq) -> Result<()> {
        let bytes = req.as_bytes();
        trace!(command = %req.command(), len = bytes.len(), "sending request");
        self.transport.send(&bytes).await
    }

    /// Feed raw bytes and dispatch every frame they complete.
    ///
    /// Returns the number of component states changed.
    pub fn ingest(&mut self, data: &[u8]) -> usize {
        self.frames.extend(data);
        let mut changed = 0;
        while let Some(next) = self.frames.next_frame() {
            match next {
                Ok(frame) => changed += self.handle_frame(&frame),
                Err(err) => {
                    self.stats.bad_frames += 1;
                    warn!(?err, "dropping bad frame");
                }
            }
        }
        self.stats.applied += changed as u64;
        changed
    }

    fn handle_frame(&mut self, frame: &PdiFrame) -> usize {
        self.stats.frames += 1;
        if frame.is_ping() {
            self.stats.pings += 1;
            return 0;
        }
        let req = match PdiReq::from_frame(frame) {
            Ok(req) => req,
            Err(err) => {
                self.stats.undecodable += 1;
                warn!(command = %frame.command, ?err, "dropping undecodable frame");
                return 0;
            }
        };
        let store = self.ctx.store();
        match &req {
            PdiReq::Tmcc(tmcc) => {
                let Some(codec) = &self.codec else {
                    debug!(command = %tmcc.command, "no codec for TMCC pass-through, dropping");
                    return 0;
                };
                match tmcc.to_command(codec.as_ref()) {
                    Ok(cmd) => store.dispatch(Update::Command(&cmd)),
                    Err(err) => {
                        self.stats.undecodable += 1;
                        warn!(?err, "dropping undecodable TMCC command");
                        0
                    }
                }
            }
            _ => store.dispatch(Update::Pdi(&req)),
        }
    }

    /// Pump the transport until `cancel` fires or the link is lost.
    ///
    /// Receive timeouts are the idle case and never end the loop.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<()> {
        info!("listener started");
        let mut buf = [0u8; READ_CHUNK];
        loop {
            let received = tokio::select! {
                biased;

                _ = cancel.cancelled() => None,

                r = self.transport.receive(&mut buf, POLL_INTERVAL) => Some(r),
            };
            let Some(received) = received else {
                info!(stats = ?self.stats, "listener cancelled");
                return Ok(());
            };
            match received {
                Ok(0) | Err(Error::Timeout) => {}
                Ok(n) => {
                    trace!(n, "received bytes");
                    self.ingest(&buf[..n]);
                }
                Err(err) => {
                    warn!(?err, stats = ?self.stats, "listener stopped");
                    return Err(err);
                }
            }
        }
    }

    /// Close the transport and hand it back.
    pub async fn shutdown(mut self) -> Result<Box<dyn Transport>> {
        debug!("closing transport");
        self.transport.close().await?;
        Ok(self.transport)
    }
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listener")
            .field("connected", &self.transport.is_connected())
            .field("pending", &self.frames.len())
            .field("has_codec", &self.codec.is_some())
            .field("stats", &self.stats)
            .finish()
    }
}
