//! 2-D position solver.
//!
//! Two mutually exclusive algorithms, chosen by anchor count alone:
//! an analytic Law-of-Cosines construction for exactly two anchors, and
//! damped Gauss-Newton least squares for three or more. Both round their
//! result to millimeters.

use log::debug;
use nalgebra::{Matrix2, Vector2};
use thiserror::Error;

use crate::core::Point2;

/// Sentinel returned by [`two_anchor`] when the measured triangle cannot
/// close. Kept as a value (not an error) at this level so the construction
/// mirrors its geometric definition; [`solve`] maps it to
/// [`SolveError::DegenerateGeometry`].
pub const DEGENERATE: (f64, f64) = (-1.0, -1.0);

const MAX_ITERATIONS: usize = 100;
const COST_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Error, PartialEq)]
pub enum SolveError {
    /// Fewer than two sites were passed in. The selector normally prevents
    /// this; it is still a contract violation worth naming.
    #[error("{got} ranged site(s), need at least 2")]
    TooFewAnchors { got: usize },

    /// Two-anchor triangle inequality violated by measurement noise; there
    /// is no real intersection point and the fix must be discarded.
    #[error("degenerate two-anchor geometry")]
    DegenerateGeometry,
}

/// Round to millimeter precision.
fn round_mm(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

/// Two-anchor analytic solve in the baseline's local frame.
///
/// `b` is the measured distance from the left anchor (the local origin),
/// `a` the distance from the right anchor, `c` the separation between the
/// two. The solution lies on the positive-Y side of the baseline by
/// convention. Returns [`DEGENERATE`] when `cos_a` leaves `[-1, 1]`, and
/// `(0, 0)` when any side is zero (the construction is undefined there).
pub fn two_anchor(a: f64, b: f64, c: f64) -> (f64, f64) {
    if a == 0.0 || b == 0.0 || c == 0.0 {
        return (0.0, 0.0);
    }

    let cos_a = (b * b + c * c - a * a) / (2.0 * b * c);
    if cos_a * cos_a > 1.0 {
        return DEGENERATE;
    }

    let sin_a = (1.0 - cos_a * cos_a).sqrt();
    (round_mm(b * cos_a), round_mm(b * sin_a))
}

/// Solve for the tag position from `(anchor position, measured range)` pairs.
///
/// With exactly two sites the pair is ordered by ascending X before the
/// analytic construction, so the returned point is in the local frame of
/// the leftmost anchor. With three or more it is the least-squares point in
/// the anchors' own frame.
pub fn solve(sites: &[(Point2, f64)]) -> Result<Point2, SolveError> {
    match sites.len() {
        0 | 1 => Err(SolveError::TooFewAnchors { got: sites.len() }),
        2 => {
            let (left, right) = if sites[0].0.x <= sites[1].0.x {
                (&sites[0], &sites[1])
            } else {
                (&sites[1], &sites[0])
            };
            let c = left.0.distance_to(&right.0);
            let (x, y) = two_anchor(right.1, left.1, c);
            if (x, y) == DEGENERATE {
                debug!(
                    "two-anchor solve degenerate: a={:.3} b={:.3} c={:.3}",
                    right.1, left.1, c
                );
                return Err(SolveError::DegenerateGeometry);
            }
            Ok(Point2::new(x, y))
        }
        _ => Ok(least_squares(sites)),
    }
}

/// Residual sum of squares at a candidate point.
fn cost_at(sites: &[(Point2, f64)], p: &Vector2<f64>) -> f64 {
    sites
        .iter()
        .map(|(anchor, range)| {
            let dist = ((p.x - anchor.x).powi(2) + (p.y - anchor.y).powi(2)).sqrt();
            (dist - range).powi(2)
        })
        .sum()
}

/// Damped Gauss-Newton minimization of Σ (‖anchor − p‖ − range)², seeded at
/// the anchor centroid. Always produces a numeric point; residual quality
/// is not judged here.
fn least_squares(sites: &[(Point2, f64)]) -> Point2 {
    let n = sites.len() as f64;
    let mut p = Vector2::new(
        sites.iter().map(|(a, _)| a.x).sum::<f64>() / n,
        sites.iter().map(|(a, _)| a.y).sum::<f64>() / n,
    );
    let mut cost = cost_at(sites, &p);
    let mut lambda = 1e-3;

    for _ in 0..MAX_ITERATIONS {
        let mut jtj = Matrix2::zeros();
        let mut jtr = Vector2::zeros();
        for (anchor, range) in sites {
            let delta = Vector2::new(p.x - anchor.x, p.y - anchor.y);
            let dist = delta.norm();
            if dist < 1e-9 {
                // Gradient undefined when the candidate sits on an anchor.
                continue;
            }
            let jacobian = delta / dist;
            jtj += jacobian * jacobian.transpose();
            jtr += jacobian * (dist - range);
        }

        let damped = jtj + Matrix2::identity() * lambda;
        let step = match damped.try_inverse() {
            Some(inverse) => inverse * jtr,
            None => break,
        };

        let candidate = p - step;
        let candidate_cost = cost_at(sites, &candidate);
        if candidate_cost < cost {
            let improvement = cost - candidate_cost;
            p = candidate;
            cost = candidate_cost;
            if improvement < COST_TOLERANCE {
                break;
            }
            lambda = (lambda * 0.5).max(1e-12);
        } else {
            lambda *= 4.0;
            if lambda > 1e9 {
                break;
            }
        }
    }

    Point2::new(round_mm(p.x), round_mm(p.y))
}
