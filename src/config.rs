//! Static configuration: the anchor registry and runtime settings.
//!
//! The registry is loaded once at startup and shared read-only by every
//! pipeline instance; there is no mutable global state.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::core::Anchor;
use crate::error::{Error, Result};

/// Runtime knobs honored by the pipeline.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Address the TCP listener binds to.
    pub bind_addr: String,
    /// Minimum valid readings required before a frame yields a fix.
    /// Lower to 2 for calibration-style deployments.
    pub min_anchors: usize,
    /// Upper bound on anchors participating in one solve.
    pub max_anchors: usize,
    /// Inclusive lower bound of the per-reading plausibility window (m).
    pub min_range_m: f64,
    /// Inclusive upper bound of the per-reading plausibility window (m).
    pub max_range_m: f64,
    /// Idle-read timeout; exceeding it drops the connection and returns
    /// the server to listening.
    pub idle_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5000".to_string(),
            min_anchors: 3,
            max_anchors: 4,
            min_range_m: 0.0,
            max_range_m: 15.0,
            idle_timeout: Duration::from_secs(800),
        }
    }
}

/// On-disk registry schema: `{ "anchors": { "<id>": [x, y, z] } }`.
#[derive(Debug, Deserialize)]
struct RegistryFile {
    anchors: BTreeMap<String, [f64; 3]>,
}

/// Immutable set of surveyed anchors, keyed by identifier.
#[derive(Debug, Clone)]
pub struct AnchorRegistry {
    anchors: BTreeMap<String, Anchor>,
}

impl AnchorRegistry {
    /// Build a registry from already-constructed anchors.
    pub fn new(anchors: impl IntoIterator<Item = Anchor>) -> Self {
        Self {
            anchors: anchors
                .into_iter()
                .map(|a| (a.id.clone(), a))
                .collect(),
        }
    }

    /// Load the registry from a JSON configuration file.
    ///
    /// A missing or unreadable file is fatal: no component that needs anchor
    /// geometry may proceed to streaming without it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "anchor registry '{}' unreadable: {}",
                path.display(),
                e
            ))
        })?;

        let file: RegistryFile = serde_json::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "anchor registry '{}' malformed: {}",
                path.display(),
                e
            ))
        })?;

        if file.anchors.is_empty() {
            return Err(Error::Config(format!(
                "anchor registry '{}' contains no anchors",
                path.display()
            )));
        }

        Ok(Self {
            anchors: file
                .anchors
                .into_iter()
                .map(|(id, coords)| (id.clone(), Anchor::new(id, coords)))
                .collect(),
        })
    }

    pub fn get(&self, id: &str) -> Option<&Anchor> {
        self.anchors.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.anchors.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// Anchors in ascending-id order.
    pub fn iter(&self) -> impl Iterator<Item = &Anchor> {
        self.anchors.values()
    }
}
