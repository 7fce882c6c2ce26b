//! TCP ingest server and the per-connection solve pipeline.
//!
//! One connection is serviced at a time: the tag is a single device and a
//! second connection while one is live would only interleave stale data.
//! The lifecycle is listen, serve until the peer goes away or idles out,
//! then listen again; only process shutdown leaves the loop.

use std::io::{self, Read};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime};

use log::{debug, info, warn};

use crate::algorithms::{solve, SolveError};
use crate::config::{AnchorRegistry, Settings};
use crate::core::{Fix, Point2};
use crate::error::Result;
use crate::output::FixSink;
use crate::processing::FrameDecoder;
use crate::validation::{AnchorSelector, RangeValidator};

const READ_BUFFER_LEN: usize = 4096;
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Decode, validate, select, solve: the full path from one received chunk
/// to at most one fix. Owns the connection's byte buffer; everything else
/// it borrows read-only.
pub struct Pipeline<'a> {
    registry: &'a AnchorRegistry,
    validator: RangeValidator<'a>,
    selector: AnchorSelector,
    decoder: FrameDecoder,
}

impl<'a> Pipeline<'a> {
    pub fn new(registry: &'a AnchorRegistry, settings: &Settings) -> Self {
        Self {
            registry,
            validator: RangeValidator::new(registry, settings),
            selector: AnchorSelector::new(settings),
            decoder: FrameDecoder::new(),
        }
    }

    /// Clear buffered bytes. Called when a connection is (re)established so
    /// no stale fragment from a previous session leaks into the new one.
    pub fn reset(&mut self) {
        self.decoder.reset();
    }

    /// Feed one received chunk through the whole pipeline.
    ///
    /// Every early return here is an expected per-frame outcome (incomplete
    /// message, nothing valid, too few anchors, degenerate geometry), not an
    /// error: the connection carries on and the next chunk gets a fresh try.
    pub fn ingest(&mut self, chunk: &[u8]) -> Option<Fix> {
        let frame = self.decoder.push(chunk);
        if frame.is_empty() {
            return None;
        }

        let selected = self.selector.select(self.validator.filter(&frame))?;

        let mut sites: Vec<(Point2, f64)> = Vec::with_capacity(selected.len());
        for reading in &selected {
            // Present in the registry or the validator would have dropped it.
            let anchor = self.registry.get(&reading.anchor_id)?;
            sites.push((anchor.position(), reading.range_m));
        }

        let position = match solve(&sites) {
            Ok(p) => p,
            Err(SolveError::DegenerateGeometry) => {
                debug!("degenerate geometry, fix suppressed");
                return None;
            }
            Err(e @ SolveError::TooFewAnchors { .. }) => {
                debug!("solve skipped: {}", e);
                return None;
            }
        };

        Some(Fix {
            anchor_count: selected.len(),
            anchor_ids: selected.iter().map(|r| r.anchor_id.clone()).collect(),
            ranges_m: selected.iter().map(|r| r.range_m).collect(),
            x: position.x,
            y: position.y,
            captured_at: SystemTime::now(),
        })
    }
}

/// Accept loop plus connection driver.
pub struct Server {
    registry: AnchorRegistry,
    settings: Settings,
    shutdown: Arc<AtomicBool>,
}

impl Server {
    pub fn new(registry: AnchorRegistry, settings: Settings) -> Self {
        Self {
            registry,
            settings,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag checked between accepts and between reads; setting it drains
    /// the server out of [`Server::run`].
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Bind the configured address and serve until shutdown.
    pub fn run(&self, sink: &mut dyn FixSink) -> Result<()> {
        let listener = TcpListener::bind(&self.settings.bind_addr)?;
        self.run_on(listener, sink)
    }

    /// Serve on an already-bound listener. Split out so callers (and tests)
    /// can bind an ephemeral port themselves.
    pub fn run_on(&self, listener: TcpListener, sink: &mut dyn FixSink) -> Result<()> {
        listener.set_nonblocking(true)?;
        info!("listening on {}", listener.local_addr()?);

        while !self.shutdown.load(Ordering::Relaxed) {
            match listener.accept() {
                Ok((stream, peer)) => {
                    info!("tag connected from {}", peer);
                    if let Err(e) = self.serve_connection(stream, sink) {
                        warn!("connection ended with error: {}", e);
                    }
                    info!("back to listening");
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => return Err(e.into()),
            }
        }
        info!("shutdown requested, listener closed");
        Ok(())
    }

    fn serve_connection(&self, mut stream: TcpStream, sink: &mut dyn FixSink) -> Result<()> {
        stream.set_nonblocking(false)?;
        stream.set_read_timeout(Some(self.settings.idle_timeout))?;

        let mut pipeline = Pipeline::new(&self.registry, &self.settings);
        pipeline.reset();

        let mut buf = [0u8; READ_BUFFER_LEN];
        while !self.shutdown.load(Ordering::Relaxed) {
            match stream.read(&mut buf) {
                Ok(0) => {
                    warn!("peer closed the connection");
                    break;
                }
                Ok(n) => {
                    if let Some(fix) = pipeline.ingest(&buf[..n]) {
                        info!(
                            "fix ({:.3}, {:.3}) from {} anchor(s)",
                            fix.x, fix.y, fix.anchor_count
                        );
                        sink.record(&fix)?;
                    }
                }
                Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                    warn!(
                        "no data for {:?}, dropping idle connection",
                        self.settings.idle_timeout
                    );
                    break;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}
