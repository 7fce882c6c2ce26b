//! Indoor positioning from ultra-wideband ranging streams.
//!
//! A tag device measures its distance to a set of fixed, surveyed anchors
//! and streams the readings as JSON over a long-lived TCP connection. This
//! crate turns that stream into 2-D position fixes:
//!
//! 1. [`processing::FrameDecoder`] slices the byte stream into complete
//!    ranging frames (latest complete message wins),
//! 2. [`validation::RangeValidator`] and [`validation::AnchorSelector`]
//!    gate the readings admitted into a solve,
//! 3. [`algorithms::solve`] computes the position, analytically for two
//!    anchors and by nonlinear least squares for three or more,
//! 4. [`net::Server`] drives the connection lifecycle and hands each fix
//!    to an [`output::FixSink`].
//!
//! The anchor registry is loaded once at startup and shared read-only;
//! all per-connection state lives in the pipeline instance.

pub mod algorithms;
pub mod config;
pub mod core;
pub mod error;
pub mod net;
pub mod output;
pub mod processing;
pub mod validation;

pub use algorithms::{solve, SolveError};
pub use config::{AnchorRegistry, Settings};
pub use crate::core::{Anchor, Fix, Frame, Point2, RangingReading};
pub use error::{Error, Result};
pub use net::{Pipeline, Server};
pub use output::{CsvSink, FixSink, MemorySink};
pub use processing::FrameDecoder;
