//! Admission of raw readings into the solver.
//!
//! Two gates run in order on every frame: per-reading validation (known
//! anchor, plausible range) and anchor selection (stable ordering, bounded
//! count). A frame that fails selection yields no fix, and the stream simply
//! moves on to the next frame.

use log::debug;

use crate::config::{AnchorRegistry, Settings};
use crate::core::{Frame, RangingReading};

/// One admitted reading, resolved against the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidReading {
    pub anchor_id: String,
    pub range_m: f64,
}

/// Per-reading gate: membership in the anchor registry and an inclusive
/// plausibility window on the measured range.
#[derive(Debug)]
pub struct RangeValidator<'a> {
    registry: &'a AnchorRegistry,
    min_range_m: f64,
    max_range_m: f64,
}

impl<'a> RangeValidator<'a> {
    pub fn new(registry: &'a AnchorRegistry, settings: &Settings) -> Self {
        Self {
            registry,
            min_range_m: settings.min_range_m,
            max_range_m: settings.max_range_m,
        }
    }

    /// Keep the readings that pass both checks, preserving frame order.
    /// Rejections are logged and dropped; they never abort the frame.
    pub fn filter(&self, frame: &Frame) -> Vec<ValidReading> {
        frame
            .readings
            .iter()
            .filter(|r| self.admit(r))
            .map(|r| ValidReading {
                anchor_id: r.anchor_id.clone(),
                range_m: r.range_m,
            })
            .collect()
    }

    fn admit(&self, reading: &RangingReading) -> bool {
        if !self.registry.contains(&reading.anchor_id) {
            debug!("anchor {}: not in registry, reading dropped", reading.anchor_id);
            return false;
        }
        // Both bounds are inclusive: a reading exactly at the window edge
        // is still plausible. Tested positively so NaN, which satisfies no
        // comparison, never slips through.
        let within_window =
            reading.range_m >= self.min_range_m && reading.range_m <= self.max_range_m;
        if !within_window {
            debug!(
                "anchor {}: range {:.3} m outside [{:.3}, {:.3}], reading dropped",
                reading.anchor_id, reading.range_m, self.min_range_m, self.max_range_m
            );
            return false;
        }
        true
    }
}

/// Selection gate: orders admitted readings by ascending anchor id, keeps at
/// most `max_anchors`, and requires at least `min_anchors` to proceed.
#[derive(Debug)]
pub struct AnchorSelector {
    min_anchors: usize,
    max_anchors: usize,
}

impl AnchorSelector {
    pub fn new(settings: &Settings) -> Self {
        Self {
            min_anchors: settings.min_anchors,
            max_anchors: settings.max_anchors,
        }
    }

    /// Returns the participating readings for one solve, or `None` when the
    /// frame has too few admitted readings.
    ///
    /// When several readings name the same anchor, the last one in the frame
    /// wins; the tag reports each link once per message, so duplicates only
    /// occur on retransmission and the newer value is the fresher one.
    pub fn select(&self, mut readings: Vec<ValidReading>) -> Option<Vec<ValidReading>> {
        readings.sort_by(|a, b| a.anchor_id.cmp(&b.anchor_id));
        readings.dedup_by(|next, prev| {
            if next.anchor_id == prev.anchor_id {
                prev.range_m = next.range_m;
                true
            } else {
                false
            }
        });
        readings.truncate(self.max_anchors);

        if readings.len() < self.min_anchors {
            debug!(
                "{} valid reading(s), need {}; frame skipped",
                readings.len(),
                self.min_anchors
            );
            return None;
        }
        Some(readings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Anchor;

    fn registry() -> AnchorRegistry {
        AnchorRegistry::new(vec![
            Anchor::new("1782", [0.0, 0.0, 0.0]),
            Anchor::new("1783", [4.0, 0.0, 0.0]),
            Anchor::new("1784", [2.0, 3.0, 0.0]),
            Anchor::new("1785", [0.0, 3.0, 0.0]),
            Anchor::new("1786", [4.0, 3.0, 0.0]),
        ])
    }

    fn frame(readings: &[(&str, f64)]) -> Frame {
        Frame {
            readings: readings
                .iter()
                .map(|(id, r)| RangingReading {
                    anchor_id: id.to_string(),
                    range_m: *r,
                })
                .collect(),
        }
    }

    fn reading(id: &str, range_m: f64) -> ValidReading {
        ValidReading {
            anchor_id: id.to_string(),
            range_m,
        }
    }

    #[test]
    fn test_unknown_anchor_rejected() {
        let registry = registry();
        let validator = RangeValidator::new(&registry, &Settings::default());
        let kept = validator.filter(&frame(&[("9999", 2.0), ("1782", 2.0)]));
        assert_eq!(kept, vec![reading("1782", 2.0)]);
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let registry = registry();
        let validator = RangeValidator::new(&registry, &Settings::default());
        let kept = validator.filter(&frame(&[
            ("1782", 0.0),
            ("1783", 15.0),
            ("1784", 15.001),
            ("1785", -0.001),
        ]));
        assert_eq!(kept, vec![reading("1782", 0.0), reading("1783", 15.0)]);
    }

    #[test]
    fn test_nan_range_rejected() {
        let registry = registry();
        let validator = RangeValidator::new(&registry, &Settings::default());
        let kept = validator.filter(&frame(&[("1782", f64::NAN)]));
        assert!(kept.is_empty());
    }

    #[test]
    fn test_selector_orders_by_id_and_caps_at_four() {
        let selector = AnchorSelector::new(&Settings::default());
        let selected = selector
            .select(vec![
                reading("1786", 5.0),
                reading("1783", 2.0),
                reading("1782", 1.0),
                reading("1785", 4.0),
                reading("1784", 3.0),
            ])
            .unwrap();
        let ids: Vec<&str> = selected.iter().map(|r| r.anchor_id.as_str()).collect();
        // Four smallest ids, ascending; "1786" falls off the end.
        assert_eq!(ids, vec!["1782", "1783", "1784", "1785"]);
    }

    #[test]
    fn test_selector_requires_minimum() {
        let selector = AnchorSelector::new(&Settings::default());
        assert!(selector
            .select(vec![reading("1782", 1.0), reading("1783", 2.0)])
            .is_none());
        assert!(selector.select(vec![]).is_none());
    }

    #[test]
    fn test_calibration_minimum_of_two() {
        let settings = Settings {
            min_anchors: 2,
            ..Settings::default()
        };
        let selector = AnchorSelector::new(&settings);
        let selected = selector
            .select(vec![reading("1783", 2.0), reading("1782", 1.0)])
            .unwrap();
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].anchor_id, "1782");
    }

    #[test]
    fn test_duplicate_anchor_keeps_latest_reading() {
        let settings = Settings {
            min_anchors: 2,
            ..Settings::default()
        };
        let selector = AnchorSelector::new(&settings);
        let selected = selector
            .select(vec![
                reading("1782", 1.0),
                reading("1783", 2.0),
                reading("1782", 1.5),
            ])
            .unwrap();
        assert_eq!(selected, vec![reading("1782", 1.5), reading("1783", 2.0)]);
    }
}
