//! Data model shared by all pipeline stages.
//!
//! Lifetimes follow the pipeline: the anchor registry lives for the whole
//! process, readings and frames for a single decode iteration, and a `Fix`
//! is write-once, handed to the output sink and never mutated afterwards.

use std::time::SystemTime;

/// A 2-D point in the deployment's local frame, meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Planar Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point2) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// A fixed-position ranging device with surveyed coordinates.
///
/// The third coordinate is carried for registry fidelity; the solver only
/// uses x and y.
#[derive(Debug, Clone, PartialEq)]
pub struct Anchor {
    pub id: String,
    pub coords: [f64; 3],
}

impl Anchor {
    pub fn new(id: impl Into<String>, coords: [f64; 3]) -> Self {
        Self {
            id: id.into(),
            coords,
        }
    }

    /// Planar position used for solving.
    pub fn position(&self) -> Point2 {
        Point2::new(self.coords[0], self.coords[1])
    }
}

/// One measured tag-to-anchor distance, as reported by the tag.
#[derive(Debug, Clone, PartialEq)]
pub struct RangingReading {
    pub anchor_id: String,
    pub range_m: f64,
}

/// One complete ranging message extracted from the byte stream.
///
/// A frame is all-or-nothing: either every reading of the message is here,
/// or the message was not yet complete and the frame is empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub readings: Vec<RangingReading>,
}

impl Frame {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

/// A computed 2-D position together with the evidence that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Fix {
    /// Number of anchors that participated in the solve.
    pub anchor_count: usize,
    /// Participating anchor ids, in selection order (ascending id).
    pub anchor_ids: Vec<String>,
    /// Measured ranges, aligned with `anchor_ids`.
    pub ranges_m: Vec<f64>,
    pub x: f64,
    pub y: f64,
    /// Wall-clock capture time of the solve.
    pub captured_at: SystemTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_distance() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(3.0, 4.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_anchor_planar_position() {
        let anchor = Anchor::new("1782", [1.5, 2.5, 3.5]);
        let pos = anchor.position();
        assert_eq!(pos.x, 1.5);
        assert_eq!(pos.y, 2.5);
    }

    #[test]
    fn test_empty_frame() {
        assert!(Frame::empty().is_empty());
    }
}
